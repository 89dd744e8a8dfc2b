use std::collections::HashSet;

use crate::models::Candidate;
use crate::services::cf::CfScoreMap;
use crate::services::preferences::{score_candidate, TagWeights};

/// Content-score share of the hybrid fusion
pub const CONTENT_WEIGHT: f64 = 0.4;

/// Collaborative-score share of the hybrid fusion
///
/// CF is weighted above content when available: it carries signal from
/// users beyond this session's own swipe history.
pub const CF_WEIGHT: f64 = 0.6;

/// Orders the unseen candidates for presentation
///
/// Policy:
/// - true cold start (no preference history, empty CF map): promoted
///   candidates first, catalog order within each group;
/// - CF map non-empty: descending hybrid score
///   `CONTENT_WEIGHT * content + CF_WEIGHT * cf`;
/// - otherwise: descending content score alone.
///
/// The sort is stable and keyed only by score, so equal-scoring candidates
/// keep their catalog order across recomputations instead of flickering.
pub fn rank<'a>(
    candidates: &'a [Candidate],
    seen: &HashSet<String>,
    weights: &TagWeights,
    cf_scores: &CfScoreMap,
    has_history: bool,
) -> Vec<&'a Candidate> {
    let mut unseen: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| !seen.contains(&c.id))
        .collect();

    if !has_history && cf_scores.is_empty() {
        unseen.sort_by_key(|c| !c.promoted);
        return unseen;
    }

    let hybrid = !cf_scores.is_empty();
    unseen.sort_by(|a, b| {
        let score_a = total_score(a, weights, cf_scores, hybrid);
        let score_b = total_score(b, weights, cf_scores, hybrid);
        score_b
            .partial_cmp(&score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    unseen
}

fn total_score(
    candidate: &Candidate,
    weights: &TagWeights,
    cf_scores: &CfScoreMap,
    hybrid: bool,
) -> f64 {
    let content = score_candidate(&candidate.tags, candidate.promoted, weights);
    if hybrid {
        let cf = cf_scores.get(&candidate.id).copied().unwrap_or(0.0);
        CONTENT_WEIGHT * content + CF_WEIGHT * cf
    } else {
        content
    }
}

/// True when the collaborative signal outweighs the content signal
///
/// Drives the "popular with similar users" badge. Compares the fused
/// contributions over the candidate's raw tag score (promoted bonus
/// excluded, as boosting is not a taste signal).
pub fn cf_dominates(candidate: &Candidate, weights: &TagWeights, cf_scores: &CfScoreMap) -> bool {
    let cf = cf_scores.get(&candidate.id).copied().unwrap_or(0.0);
    if cf <= 0.0 {
        return false;
    }
    let content = score_candidate(&candidate.tags, false, weights);
    cf * CF_WEIGHT > content * CONTENT_WEIGHT
}
