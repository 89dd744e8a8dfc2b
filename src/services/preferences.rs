use std::collections::HashMap;

use crate::storage::{LocalStore, StoreKey};

/// Tag → weight map; an absent tag weighs 0
pub type TagWeights = HashMap<String, f64>;

/// Weight added to each tag of a liked candidate
pub const LIKE_WEIGHT: f64 = 1.0;

/// Weight removed from each tag of a passed candidate
///
/// Kept small relative to [`LIKE_WEIGHT`]: a pass can mean "not right now"
/// rather than "never", and a heavy penalty would lock tags out of the deck
/// after a single rejection.
pub const PASS_PENALTY: f64 = 0.3;

/// Fixed score bonus for promoted candidates
pub const PROMOTED_BONUS: f64 = 1.5;

/// Content-based score for one candidate: sum of its tag weights, plus the
/// promoted bonus. Pure; no I/O.
pub fn score_candidate(tags: &[String], promoted: bool, weights: &TagWeights) -> f64 {
    let tag_score: f64 = tags
        .iter()
        .map(|tag| weights.get(tag).copied().unwrap_or(0.0))
        .sum();
    let promoted_bonus = if promoted { PROMOTED_BONUS } else { 0.0 };
    tag_score + promoted_bonus
}

/// Content-preference model derived from swipe history
///
/// Maintains the persistent tag-weight map. Hydrates once from the local
/// store at construction; every mutation re-persists the full map through
/// the store's background writer.
pub struct PreferenceStore {
    weights: TagWeights,
    store: LocalStore,
}

impl PreferenceStore {
    /// Hydrates the weight map from the local store
    ///
    /// Missing or corrupt state reads as an empty map; scoring degrades to
    /// 0 but never fails.
    pub fn load(store: LocalStore) -> Self {
        let weights: TagWeights = store.load(StoreKey::TagWeights).unwrap_or_default();

        tracing::debug!(tag_count = weights.len(), "Preference weights hydrated");

        Self { weights, store }
    }

    pub fn weights(&self) -> &TagWeights {
        &self.weights
    }

    /// True iff at least one tag carries a non-zero weight
    ///
    /// Distinguishes cold start from warm state.
    pub fn has_history(&self) -> bool {
        self.weights.values().any(|w| *w != 0.0)
    }

    /// Records a like: every tag of the candidate gains [`LIKE_WEIGHT`]
    pub fn record_like(&mut self, tags: &[String]) {
        self.apply_delta(tags, LIKE_WEIGHT);
    }

    /// Records a pass: every tag of the candidate loses [`PASS_PENALTY`]
    pub fn record_pass(&mut self, tags: &[String]) {
        self.apply_delta(tags, -PASS_PENALTY);
    }

    fn apply_delta(&mut self, tags: &[String], delta: f64) {
        for tag in tags {
            *self.weights.entry(tag.clone()).or_insert(0.0) += delta;
        }
        self.store
            .persist_in_background(StoreKey::TagWeights, &self.weights);
    }
}
