use std::sync::Arc;

use axum::{extract::Path, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Candidate, Identity, SwipeDirection};
use crate::services::cf::CfScoreCache;
use crate::services::preferences::TagWeights;
use crate::services::ranking;
use crate::services::session::{DeckPhase, SessionController};

use super::AppState;

// Request/Response types

#[derive(Debug, Serialize)]
pub struct CardResponse {
    pub id: String,
    pub name: String,
    pub handle: String,
    pub catchphrase: String,
    pub description: String,
    pub image_url: String,
    pub audio_url: Option<String>,
    pub tags: Vec<String>,
    pub color: String,
    pub promoted: bool,
    /// True when the collaborative signal drove this card's position
    /// ("popular with similar users" badge)
    pub recommended_by_cf: bool,
}

impl CardResponse {
    fn from_candidate(candidate: &Candidate, session: &SessionController) -> Self {
        Self {
            id: candidate.id.clone(),
            name: candidate.name.clone(),
            handle: candidate.handle.clone(),
            catchphrase: candidate.catchphrase.clone(),
            description: candidate.description.clone(),
            image_url: candidate.image_url.clone(),
            audio_url: candidate.audio_url.clone(),
            tags: candidate.tags.clone(),
            color: candidate.color.clone(),
            promoted: candidate.promoted,
            recommended_by_cf: ranking::cf_dominates(
                candidate,
                session.weights(),
                session.cf_scores(),
            ),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeckResponse {
    pub phase: DeckPhase,
    pub current: Option<CardResponse>,
    /// Pre-rendered peek card; receives no interaction
    pub next: Option<CardResponse>,
    pub liked_count: usize,
    pub remaining: usize,
    pub active_clip: Option<String>,
}

impl DeckResponse {
    fn from_session(session: &SessionController) -> Self {
        Self {
            phase: session.phase(),
            current: session
                .current()
                .map(|c| CardResponse::from_candidate(c, session)),
            next: session
                .next()
                .map(|c| CardResponse::from_candidate(c, session)),
            liked_count: session.liked_count(),
            remaining: session.remaining(),
            active_clip: session.active_clip().map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub direction: SwipeDirection,
}

#[derive(Debug, Serialize)]
pub struct SwipeResponse {
    /// Id of the candidate the swipe applied to; null when there was no
    /// current candidate (double-fire during a transition, loading, or
    /// exhausted deck)
    pub swiped: Option<String>,
    pub phase: DeckPhase,
    pub remaining: usize,
    pub liked_count: usize,
}

#[derive(Debug, Serialize)]
pub struct FavoritesResponse {
    pub hydrated: bool,
    pub favorites: Vec<CardResponse>,
}

#[derive(Debug, Serialize)]
pub struct PreferencesResponse {
    pub weights: TagWeights,
    pub has_history: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    pub candidate_id: String,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread: u64,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Current deck view: phase, current card, inert peek card
pub async fn get_deck(State(state): State<AppState>) -> Json<DeckResponse> {
    let session = state.session.read().await;
    Json(DeckResponse::from_session(&session))
}

/// Applies a swipe to the current candidate
///
/// The single entry point for both drag gestures and direction buttons, so
/// the two input modalities cannot diverge in side effects.
pub async fn swipe(
    State(state): State<AppState>,
    Json(request): Json<SwipeRequest>,
) -> Json<SwipeResponse> {
    let mut session = state.session.write().await;
    let swiped = session.swipe(request.direction);

    Json(SwipeResponse {
        swiped,
        phase: session.phase(),
        remaining: session.remaining(),
        liked_count: session.liked_count(),
    })
}

/// Clears the seen set so the deck can be swiped again
pub async fn reset_deck(State(state): State<AppState>) -> Json<DeckResponse> {
    let mut session = state.session.write().await;
    session.reset_seen();
    Json(DeckResponse::from_session(&session))
}

/// Liked candidates in first-liked-first order
pub async fn get_favorites(State(state): State<AppState>) -> Json<FavoritesResponse> {
    let session = state.session.read().await;

    let favorites = session
        .favorites()
        .ordered_ids()
        .iter()
        .filter_map(|id| session.candidate(id))
        .map(|c| CardResponse::from_candidate(c, &session))
        .collect();

    Json(FavoritesResponse {
        hydrated: session.favorites().hydrated(),
        favorites,
    })
}

/// Removes a favorite; idempotent
pub async fn remove_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> StatusCode {
    let mut session = state.session.write().await;
    session.remove_favorite(&id);
    StatusCode::OK
}

/// Current preference weights (debug surface)
pub async fn get_preferences(State(state): State<AppState>) -> Json<PreferencesResponse> {
    let session = state.session.read().await;
    Json(PreferencesResponse {
        weights: session.weights().clone(),
        has_history: session.has_history(),
    })
}

/// Establishes an identity and refreshes CF scores in the background
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> StatusCode {
    let identity = Identity(request.user_id);
    state.session.write().await.login(identity);

    // Detached refresh; apply_cf_scores re-checks the identity on
    // resolution, so a response racing a logout is discarded.
    let session = Arc::clone(&state.session);
    let backend = Arc::clone(&state.backend);
    tokio::spawn(async move {
        let scores = CfScoreCache::fetch_map(backend.as_ref(), identity).await;
        session.write().await.apply_cf_scores(identity, scores);
    });

    StatusCode::OK
}

/// Clears the identity and CF cache
pub async fn logout(State(state): State<AppState>) -> StatusCode {
    state.session.write().await.logout();
    StatusCode::OK
}

/// Starts playback for one candidate's voice clip
pub async fn play_clip(
    State(state): State<AppState>,
    Json(request): Json<PlayRequest>,
) -> AppResult<StatusCode> {
    let mut session = state.session.write().await;
    session.play_clip(&request.candidate_id)?;
    Ok(StatusCode::OK)
}

/// Stops whatever clip is playing
pub async fn stop_audio(State(state): State<AppState>) -> StatusCode {
    state.session.write().await.stop_audio();
    StatusCode::OK
}

/// Unread-notification badge count for the logged-in user
pub async fn unread_notifications(
    State(state): State<AppState>,
) -> AppResult<Json<UnreadCountResponse>> {
    let identity = state.session.read().await.identity();

    let unread = match identity {
        Some(identity) => state.backend.count_unread_notifications(identity).await?,
        None => 0,
    };

    Ok(Json(UnreadCountResponse { unread }))
}
