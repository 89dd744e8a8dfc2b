use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Logged-in user identity, as issued by the hosted auth provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(pub Uuid);

impl Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Swipe outcome for a single candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Like,
    Pass,
}

impl SwipeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeDirection::Like => "like",
            SwipeDirection::Pass => "pass",
        }
    }
}

/// A displayable voice post eligible for ranking
///
/// Flattened from a voice post row joined with its owning profile.
/// Immutable for the duration of a session; the whole collection is
/// replaced on reload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub handle: String,
    pub catchphrase: String,
    pub description: String,
    pub image_url: String,
    pub audio_url: Option<String>,
    /// Category tags, unique within one candidate
    pub tags: Vec<String>,
    pub color: String,
    /// Paid-boost flag, ranked preferentially
    pub promoted: bool,
}

// ============================================================================
// Raw backend rows
// ============================================================================

/// Voice post row as returned by the backend, with the embedded profile join
#[derive(Debug, Clone, Deserialize)]
pub struct VoicePostRow {
    pub id: String,
    #[serde(default)]
    pub catch_copy: Option<String>,
    #[serde(default)]
    pub voice_path: Option<String>,
    #[serde(default)]
    pub is_boosted: bool,
    pub created_at: DateTime<Utc>,
    /// None when the profile join failed; such rows are skipped
    #[serde(default)]
    pub vliver_profiles: Option<ProfileRow>,
}

/// Owning profile row embedded in a voice post row
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
}

/// One row of the remote collaborative-filtering score RPC
#[derive(Debug, Clone, Deserialize)]
pub struct CfScoreRow {
    pub post_id: String,
    pub cf_score: f64,
}

/// Swipe event row upserted to the backend, keyed (user, post)
#[derive(Debug, Clone, Serialize)]
pub struct SwipeEventRow {
    pub user_id: Uuid,
    pub voice_post_id: String,
    pub action: SwipeDirection,
}

/// Favorite row mirrored to the backend
#[derive(Debug, Clone, Serialize)]
pub struct FavoriteRow {
    pub user_id: Uuid,
    pub post_id: String,
}
