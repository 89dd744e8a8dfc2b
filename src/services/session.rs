use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::{
    backend::VoiceBackend,
    error::{AppError, AppResult},
    models::{Candidate, Identity, SwipeDirection},
    services::audio::{AudioFocus, ClipHandle},
    services::catalog::Catalog,
    services::cf::{CfScoreCache, CfScoreMap},
    services::favorites::FavoritesStore,
    services::preferences::{PreferenceStore, TagWeights},
    services::ranking,
};

/// Where the deck currently is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeckPhase {
    /// Catalog fetch in flight; no rankings are computed
    Loading,
    /// No preference history and no CF signal: promoted-first ordering
    Cold,
    /// Content scores only
    Content,
    /// Fused content and collaborative scores
    Hybrid,
    /// Every candidate has been seen
    Exhausted,
}

enum CatalogState {
    Loading,
    Ready(Catalog),
}

/// Owns the per-session swipe state and dispatches swipe outcomes
///
/// All mutations happen synchronously under the caller's lock before any
/// remote mirroring is dispatched, so a recomputed ranking is never stale
/// relative to local state. Ranking is re-derived by an explicit call after
/// each mutation rather than through reactive memoization.
pub struct SessionController {
    catalog: CatalogState,
    prefs: PreferenceStore,
    cf: CfScoreCache,
    favorites: FavoritesStore,
    identity: Option<Identity>,
    seen: HashSet<String>,
    /// Ordered unseen candidate ids, head first
    ranked: Vec<String>,
    audio: AudioFocus,
}

impl SessionController {
    /// Creates a session in the Loading phase
    ///
    /// Call [`install_catalog`](Self::install_catalog) once the candidate
    /// fetch resolves.
    pub fn new(prefs: PreferenceStore, cf: CfScoreCache, favorites: FavoritesStore) -> Self {
        Self {
            catalog: CatalogState::Loading,
            prefs,
            cf,
            favorites,
            identity: None,
            seen: HashSet::new(),
            ranked: Vec::new(),
            audio: AudioFocus::new(),
        }
    }

    /// Installs the loaded catalog and computes the first ranking
    pub fn install_catalog(&mut self, catalog: Catalog) {
        tracing::info!(candidate_count = catalog.len(), "Catalog installed");
        self.catalog = CatalogState::Ready(catalog);
        self.recompute();
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.catalog, CatalogState::Loading)
    }

    pub fn phase(&self) -> DeckPhase {
        match &self.catalog {
            CatalogState::Loading => DeckPhase::Loading,
            CatalogState::Ready(_) => {
                if self.ranked.is_empty() {
                    DeckPhase::Exhausted
                } else if !self.cf.is_empty() {
                    DeckPhase::Hybrid
                } else if self.prefs.has_history() {
                    DeckPhase::Content
                } else {
                    DeckPhase::Cold
                }
            }
        }
    }

    /// Looks up a candidate by id in the loaded catalog
    pub fn candidate(&self, id: &str) -> Option<&Candidate> {
        match &self.catalog {
            CatalogState::Ready(catalog) => catalog.get(id),
            CatalogState::Loading => None,
        }
    }

    /// The candidate currently presented for swiping
    pub fn current(&self) -> Option<&Candidate> {
        self.ranked.first().and_then(|id| self.candidate(id))
    }

    /// The candidate peeked behind the current card; inert, never interacted
    pub fn next(&self) -> Option<&Candidate> {
        self.ranked.get(1).and_then(|id| self.candidate(id))
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.catalog, CatalogState::Ready(_)) && self.ranked.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.ranked.len()
    }

    pub fn liked_count(&self) -> usize {
        self.favorites.liked_count()
    }

    pub fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }

    pub fn weights(&self) -> &TagWeights {
        self.prefs.weights()
    }

    pub fn has_history(&self) -> bool {
        self.prefs.has_history()
    }

    pub fn cf_scores(&self) -> &CfScoreMap {
        self.cf.scores()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity
    }

    /// Id of the clip currently holding audio focus
    pub fn active_clip(&self) -> Option<&str> {
        self.audio.active_clip()
    }

    /// Establishes an identity
    ///
    /// Any cached CF scores belong to the previous identity and are dropped
    /// immediately; the caller fetches a fresh map and hands it to
    /// [`apply_cf_scores`](Self::apply_cf_scores).
    pub fn login(&mut self, identity: Identity) {
        tracing::info!(user_id = %identity, "Identity established");
        self.identity = Some(identity);
        self.cf.clear();
        self.recompute();
    }

    /// Clears the identity and the CF cache
    pub fn logout(&mut self) {
        tracing::info!("Identity cleared");
        self.identity = None;
        self.cf.clear();
        self.recompute();
    }

    /// Installs a fetched CF score map, guarding against stale responses
    ///
    /// A map fetched for an identity that is no longer current (logout or
    /// re-login raced the fetch) is discarded silently.
    pub fn apply_cf_scores(&mut self, fetched_for: Identity, scores: CfScoreMap) -> bool {
        if self.identity != Some(fetched_for) {
            tracing::debug!(
                fetched_for = %fetched_for,
                "Discarding CF scores fetched for a stale identity"
            );
            return false;
        }
        self.cf.install(scores);
        self.recompute();
        true
    }

    /// Applies one swipe to the current candidate
    ///
    /// No current candidate (loading, exhausted, or a double-fire during a
    /// transition animation) is a no-op. Returns the swiped id otherwise.
    /// Both the direction buttons and the drag gesture land here.
    pub fn swipe(&mut self, direction: SwipeDirection) -> Option<String> {
        let (id, tags) = match self.current() {
            Some(current) => (current.id.clone(), current.tags.clone()),
            None => return None,
        };

        self.audio.stop();

        match direction {
            SwipeDirection::Like => {
                self.favorites.add(&id, self.identity);
                self.prefs.record_like(&tags);
                self.cf.record_action(self.identity, &id, direction);
            }
            SwipeDirection::Pass => {
                self.prefs.record_pass(&tags);
                self.cf.record_action(self.identity, &id, direction);
            }
        }

        // Seen insertion is the final mutation: the recomputation below
        // already sees the updated weights and favorites.
        self.seen.insert(id.clone());
        self.recompute();

        tracing::debug!(
            candidate_id = %id,
            action = direction.as_str(),
            remaining = self.ranked.len(),
            "Swipe applied"
        );

        Some(id)
    }

    /// Removes a favorite outside the swipe flow (favorites list)
    pub fn remove_favorite(&mut self, id: &str) -> bool {
        self.favorites.remove(id, self.identity)
    }

    /// Clears the seen set so the deck can be swiped again
    ///
    /// Preference weights and CF scores are deliberately untouched: taste
    /// accumulates across reset cycles.
    pub fn reset_seen(&mut self) {
        self.audio.stop();
        self.seen.clear();
        self.recompute();
    }

    /// Starts playback for one candidate's voice clip
    ///
    /// Whatever clip held focus before is paused and rewound first.
    pub fn play_clip(&mut self, candidate_id: &str) -> AppResult<()> {
        let candidate = self
            .candidate(candidate_id)
            .ok_or_else(|| AppError::NotFound(format!("unknown candidate: {}", candidate_id)))?;

        if candidate.audio_url.is_none() {
            return Err(AppError::InvalidInput(format!(
                "candidate has no voice clip: {}",
                candidate_id
            )));
        }

        self.audio
            .acquire(candidate_id, Box::new(ClipHandle::start()));
        Ok(())
    }

    /// Stops whatever clip is playing
    pub fn stop_audio(&mut self) {
        self.audio.stop();
    }

    fn recompute(&mut self) {
        let CatalogState::Ready(catalog) = &self.catalog else {
            self.ranked.clear();
            return;
        };

        self.ranked = ranking::rank(
            catalog.candidates(),
            &self.seen,
            self.prefs.weights(),
            self.cf.scores(),
            self.prefs.has_history(),
        )
        .into_iter()
        .map(|c| c.id.clone())
        .collect();
    }
}

/// Builds a session over freshly hydrated stores
pub fn build_session(
    store: crate::storage::LocalStore,
    backend: Arc<dyn VoiceBackend>,
) -> SessionController {
    let prefs = PreferenceStore::load(store.clone());
    let cf = CfScoreCache::new(Arc::clone(&backend));
    let favorites = FavoritesStore::load(store, backend);
    SessionController::new(prefs, cf, favorites)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockVoiceBackend;
    use crate::storage::LocalStore;
    use uuid::Uuid;

    fn candidate(id: &str, tags: &[&str], promoted: bool) -> Candidate {
        Candidate {
            id: id.to_string(),
            name: id.to_string(),
            handle: format!("@{}", id),
            catchphrase: String::new(),
            description: String::new(),
            image_url: String::new(),
            audio_url: Some(format!("https://cdn.test/{}.mp3", id)),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            color: "#FFFFFF".to_string(),
            promoted,
        }
    }

    fn stub_backend() -> Arc<MockVoiceBackend> {
        let mut mock = MockVoiceBackend::new();
        mock.expect_upsert_swipe_event().returning(|_| Ok(()));
        mock.expect_upsert_favorite().returning(|_| Ok(()));
        mock.expect_delete_favorite().returning(|_| Ok(()));
        Arc::new(mock)
    }

    async fn session_with(candidates: Vec<Candidate>) -> (SessionController, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let (store, _handle) = LocalStore::open(dir.path()).await.unwrap();
        let mut session = build_session(store, stub_backend());
        session.install_catalog(Catalog::from_candidates(candidates));
        (session, dir)
    }

    fn scenario_deck() -> Vec<Candidate> {
        vec![
            candidate("a", &["歌"], true),
            candidate("b", &["ゲーム"], false),
        ]
    }

    #[tokio::test]
    async fn test_full_swipe_scenario() {
        let (mut session, _dir) = session_with(scenario_deck()).await;

        // Cold start: promoted candidate leads
        assert_eq!(session.phase(), DeckPhase::Cold);
        assert_eq!(session.current().unwrap().id, "a");
        assert_eq!(session.next().unwrap().id, "b");

        // Like a: weights, favorites, seen all advance
        assert_eq!(session.swipe(SwipeDirection::Like), Some("a".to_string()));
        assert!((session.weights()["歌"] - 1.0).abs() < 1e-9);
        assert_eq!(session.favorites().ordered_ids(), ["a"]);
        assert_eq!(session.current().unwrap().id, "b");
        assert_eq!(session.phase(), DeckPhase::Content);

        // Pass b: penalty recorded, deck exhausted, liked count holds
        assert_eq!(session.swipe(SwipeDirection::Pass), Some("b".to_string()));
        assert!((session.weights()["ゲーム"] + 0.3).abs() < 1e-9);
        assert_eq!(session.phase(), DeckPhase::Exhausted);
        assert!(session.is_exhausted());
        assert_eq!(session.liked_count(), 1);
    }

    #[tokio::test]
    async fn test_swipe_with_no_current_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _handle) = LocalStore::open(dir.path()).await.unwrap();
        let mut session = build_session(store, stub_backend());

        // Still loading: nothing to swipe
        assert!(session.is_loading());
        assert_eq!(session.swipe(SwipeDirection::Like), None);

        // Exhausted: same guard
        session.install_catalog(Catalog::from_candidates(vec![candidate("a", &[], false)]));
        session.swipe(SwipeDirection::Pass);
        assert!(session.is_exhausted());
        assert_eq!(session.swipe(SwipeDirection::Like), None);
        assert_eq!(session.liked_count(), 0);
    }

    #[tokio::test]
    async fn test_swiped_candidate_never_reappears_until_reset() {
        let (mut session, _dir) = session_with(vec![
            candidate("a", &["歌"], false),
            candidate("b", &["ゲーム"], false),
            candidate("c", &["雑談"], false),
        ])
        .await;

        let first = session.swipe(SwipeDirection::Like).unwrap();
        for _ in 0..2 {
            assert_ne!(session.current().map(|c| c.id.clone()), Some(first.clone()));
            assert_ne!(session.next().map(|c| c.id.clone()), Some(first.clone()));
            session.swipe(SwipeDirection::Pass);
        }
        assert!(session.is_exhausted());

        session.reset_seen();
        assert_eq!(session.remaining(), 3);
    }

    #[tokio::test]
    async fn test_reset_keeps_weights_and_cf() {
        let (mut session, _dir) = session_with(scenario_deck()).await;

        let identity = Identity(Uuid::new_v4());
        session.login(identity);
        let mut cf = CfScoreMap::new();
        cf.insert("b".to_string(), 4.0);
        assert!(session.apply_cf_scores(identity, cf));

        session.swipe(SwipeDirection::Like);
        let weights_before = session.weights().clone();
        let cf_before = session.cf_scores().clone();

        session.reset_seen();

        assert_eq!(session.weights(), &weights_before);
        assert_eq!(session.cf_scores(), &cf_before);
        assert_eq!(session.remaining(), 2);
    }

    #[tokio::test]
    async fn test_swipe_stops_active_audio() {
        let (mut session, _dir) = session_with(scenario_deck()).await;

        let current_id = session.current().unwrap().id.clone();
        session.play_clip(&current_id).unwrap();
        assert_eq!(session.active_clip(), Some(current_id.as_str()));

        session.swipe(SwipeDirection::Pass);
        assert_eq!(session.active_clip(), None);
    }

    #[tokio::test]
    async fn test_play_switches_focus_between_candidates() {
        let (mut session, _dir) = session_with(scenario_deck()).await;

        session.play_clip("a").unwrap();
        session.play_clip("b").unwrap();
        assert_eq!(session.active_clip(), Some("b"));
    }

    #[tokio::test]
    async fn test_play_clip_rejects_unknown_and_silent_candidates() {
        let mut deck = scenario_deck();
        deck[1].audio_url = None;
        let (mut session, _dir) = session_with(deck).await;

        assert!(matches!(
            session.play_clip("nobody"),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            session.play_clip("b"),
            Err(AppError::InvalidInput(_))
        ));
        assert_eq!(session.active_clip(), None);
    }

    #[tokio::test]
    async fn test_reset_stops_audio() {
        let (mut session, _dir) = session_with(scenario_deck()).await;

        session.play_clip("a").unwrap();
        session.reset_seen();
        assert_eq!(session.active_clip(), None);
    }

    #[tokio::test]
    async fn test_stale_cf_map_is_discarded() {
        let (mut session, _dir) = session_with(scenario_deck()).await;

        let old_identity = Identity(Uuid::new_v4());
        let new_identity = Identity(Uuid::new_v4());
        session.login(old_identity);
        session.login(new_identity);

        // Response for the first login resolves late
        let mut stale = CfScoreMap::new();
        stale.insert("b".to_string(), 9.0);
        assert!(!session.apply_cf_scores(old_identity, stale));
        assert!(session.cf_scores().is_empty());

        let mut fresh = CfScoreMap::new();
        fresh.insert("b".to_string(), 2.0);
        assert!(session.apply_cf_scores(new_identity, fresh));
        assert_eq!(session.phase(), DeckPhase::Hybrid);
    }

    #[tokio::test]
    async fn test_logout_clears_cf_immediately() {
        let (mut session, _dir) = session_with(scenario_deck()).await;

        let identity = Identity(Uuid::new_v4());
        session.login(identity);
        let mut cf = CfScoreMap::new();
        cf.insert("a".to_string(), 1.0);
        session.apply_cf_scores(identity, cf);
        assert_eq!(session.phase(), DeckPhase::Hybrid);

        session.logout();
        assert!(session.cf_scores().is_empty());
        assert_eq!(session.identity(), None);
        assert_eq!(session.phase(), DeckPhase::Cold);
    }

    #[tokio::test]
    async fn test_hybrid_ranking_reorders_deck() {
        let (mut session, _dir) = session_with(vec![
            candidate("a", &["歌"], true),
            candidate("b", &["ゲーム"], false),
        ])
        .await;

        // Promoted candidate leads cold
        assert_eq!(session.current().unwrap().id, "a");

        let identity = Identity(Uuid::new_v4());
        session.login(identity);
        let mut cf = CfScoreMap::new();
        cf.insert("b".to_string(), 10.0);
        session.apply_cf_scores(identity, cf);

        // 0.6*10 = 6 beats a's 0.4*1.5 promoted bonus contribution
        assert_eq!(session.current().unwrap().id, "b");
    }

    #[tokio::test]
    async fn test_swipe_mirrors_when_logged_in() {
        let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
        let (favorite_tx, mut favorite_rx) = tokio::sync::mpsc::unbounded_channel();

        let mut mock = MockVoiceBackend::new();
        mock.expect_upsert_swipe_event().returning(move |event| {
            event_tx.send(event).unwrap();
            Ok(())
        });
        mock.expect_upsert_favorite().returning(move |row| {
            favorite_tx.send(row).unwrap();
            Ok(())
        });

        let dir = tempfile::tempdir().unwrap();
        let (store, _handle) = LocalStore::open(dir.path()).await.unwrap();
        let mut session = build_session(store, Arc::new(mock));
        session.install_catalog(Catalog::from_candidates(scenario_deck()));

        let identity = Identity(Uuid::new_v4());
        session.login(identity);
        session.swipe(SwipeDirection::Like);

        let event = event_rx.recv().await.unwrap();
        assert_eq!(event.user_id, identity.0);
        assert_eq!(event.action, SwipeDirection::Like);

        let row = favorite_rx.recv().await.unwrap();
        assert_eq!(row.post_id, "a");
    }
}
