use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    backend::VoiceBackend,
    models::{Identity, SwipeDirection, SwipeEventRow},
};

/// Candidate id → collaborative-filtering score; an absent id scores 0
pub type CfScoreMap = HashMap<String, f64>;

/// Cache of externally computed collaborative-filtering scores
///
/// Rebuilt wholesale on identity change and cleared on logout; never
/// persisted locally. Absence of CF data never blocks content scoring —
/// an empty map simply drops the engine back to content-only ranking.
pub struct CfScoreCache {
    scores: CfScoreMap,
    backend: Arc<dyn VoiceBackend>,
}

impl CfScoreCache {
    pub fn new(backend: Arc<dyn VoiceBackend>) -> Self {
        Self {
            scores: CfScoreMap::new(),
            backend,
        }
    }

    pub fn scores(&self) -> &CfScoreMap {
        &self.scores
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Replaces the cached map with freshly fetched scores
    pub fn install(&mut self, scores: CfScoreMap) {
        tracing::debug!(score_count = scores.len(), "CF score map installed");
        self.scores = scores;
    }

    /// Drops all cached scores (logout: no stale cross-identity leakage)
    pub fn clear(&mut self) {
        self.scores.clear();
    }

    /// Fetches the full score map for one identity, failing open
    ///
    /// Any fetch error degrades to an empty map so ranking always produces
    /// a usable order.
    pub async fn fetch_map(backend: &dyn VoiceBackend, identity: Identity) -> CfScoreMap {
        match backend.fetch_cf_scores(identity).await {
            Ok(rows) => rows
                .into_iter()
                .map(|row| (row.post_id, row.cf_score))
                .collect(),
            Err(e) => {
                tracing::warn!(user_id = %identity, error = %e, "CF score fetch failed, using empty map");
                CfScoreMap::new()
            }
        }
    }

    /// Records a swipe action against the backend, best-effort
    ///
    /// No identity means no-op. The upsert runs as a detached task: a
    /// repeated action on the same candidate overwrites, failures are
    /// logged and never retried, and the swipe path never waits on it.
    pub fn record_action(
        &self,
        identity: Option<Identity>,
        candidate_id: &str,
        action: SwipeDirection,
    ) {
        let Some(identity) = identity else {
            return;
        };

        let event = SwipeEventRow {
            user_id: identity.0,
            voice_post_id: candidate_id.to_string(),
            action,
        };
        let backend = Arc::clone(&self.backend);

        tokio::spawn(async move {
            if let Err(e) = backend.upsert_swipe_event(event).await {
                tracing::warn!(error = %e, "Swipe event upsert failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockVoiceBackend;
    use crate::error::AppError;
    use crate::models::CfScoreRow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn identity() -> Identity {
        Identity(Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_fetch_map_collects_rows() {
        let mut mock = MockVoiceBackend::new();
        mock.expect_fetch_cf_scores().returning(|_| {
            Ok(vec![
                CfScoreRow {
                    post_id: "a".to_string(),
                    cf_score: 3.5,
                },
                CfScoreRow {
                    post_id: "b".to_string(),
                    cf_score: 0.5,
                },
            ])
        });

        let map = CfScoreCache::fetch_map(&mock, identity()).await;
        assert_eq!(map.len(), 2);
        assert!((map["a"] - 3.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_fetch_map_fails_open() {
        let mut mock = MockVoiceBackend::new();
        mock.expect_fetch_cf_scores()
            .returning(|_| Err(AppError::Internal("backend down".to_string())));

        let map = CfScoreCache::fetch_map(&mock, identity()).await;
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_record_action_without_identity_is_noop() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let mut mock = MockVoiceBackend::new();
        mock.expect_upsert_swipe_event().returning(|_| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let cache = CfScoreCache::new(Arc::new(mock));
        cache.record_action(None, "post-1", SwipeDirection::Like);

        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_record_action_dispatches_upsert() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let mut mock = MockVoiceBackend::new();
        mock.expect_upsert_swipe_event().returning(move |event| {
            tx.send(event).unwrap();
            Ok(())
        });

        let cache = CfScoreCache::new(Arc::new(mock));
        let who = identity();
        cache.record_action(Some(who), "post-1", SwipeDirection::Pass);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.user_id, who.0);
        assert_eq!(event.voice_post_id, "post-1");
        assert_eq!(event.action, SwipeDirection::Pass);
    }

    #[tokio::test]
    async fn test_clear_empties_cache() {
        let mock = MockVoiceBackend::new();
        let mut cache = CfScoreCache::new(Arc::new(mock));

        let mut map = CfScoreMap::new();
        map.insert("a".to_string(), 1.0);
        cache.install(map);
        assert!(!cache.is_empty());

        cache.clear();
        assert!(cache.is_empty());
    }
}
