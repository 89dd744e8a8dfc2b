/// Hosted backend abstraction
///
/// Everything the engine consumes from the backend-as-a-service goes through
/// this trait: the published catalog, the collaborative-filtering score RPC,
/// best-effort mirror writes, and object-storage URL resolution. Keeping it
/// behind a trait lets tests substitute a stub and keeps the core free of
/// transport details.
use crate::{
    error::AppResult,
    models::{CfScoreRow, FavoriteRow, Identity, SwipeEventRow, VoicePostRow},
};

pub mod http;

pub use http::HttpBackend;

/// Operations the engine consumes from the hosted backend
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait VoiceBackend: Send + Sync {
    /// Fetch all published voice posts joined with their owning profile
    ///
    /// Rows arrive server-ordered by promoted flag descending, then recency
    /// descending. The client does not re-sort at fetch time; only the
    /// ranking engine orders candidates for presentation.
    async fn fetch_published_posts(&self) -> AppResult<Vec<VoicePostRow>>;

    /// Fetch the full collaborative-filtering score map for one identity
    async fn fetch_cf_scores(&self, identity: Identity) -> AppResult<Vec<CfScoreRow>>;

    /// Upsert a swipe event keyed (user, post)
    ///
    /// A repeated action on the same post overwrites rather than duplicates.
    async fn upsert_swipe_event(&self, event: SwipeEventRow) -> AppResult<()>;

    /// Upsert a favorite row
    async fn upsert_favorite(&self, row: FavoriteRow) -> AppResult<()>;

    /// Delete a favorite row
    async fn delete_favorite(&self, row: FavoriteRow) -> AppResult<()>;

    /// Count unread notifications for one identity (badge data)
    async fn count_unread_notifications(&self, identity: Identity) -> AppResult<u64>;

    /// Resolve an object-storage path to a public URL
    ///
    /// Absolute URLs (sample data, external hosts) pass through unchanged.
    fn resolve_storage_url(&self, bucket: &str, path: &str) -> String;

    /// Backend name for logging and debugging
    fn name(&self) -> &'static str;
}
