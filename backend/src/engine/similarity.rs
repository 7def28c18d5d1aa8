//! Similarity engine
//!
//! Given a query profile, fetches a candidate pool through a bounding-box
//! window query, scores every candidate with a weighted L1 distance, and
//! returns the k nearest. Two weighting schemes coexist in the product
//! and both are kept as named strategies: the normalized classification
//! weighting feeds the class vote, the raw display weighting picks the
//! profiles shown back to the user.

use crate::store::{PopulationStore, ProfileWindow};
use fitscore_shared::models::{Profile, ReferenceRecord};
use tracing::warn;

/// Candidate pool cap when fetching for the class vote
pub const CLASSIFICATION_FETCH_LIMIT: i64 = 20;
/// Candidate pool cap when fetching user-facing similar profiles
pub const DISPLAY_FETCH_LIMIT: i64 = 30;

/// Bounding-box half-widths of the neighbor window
pub const AGE_WINDOW: i32 = 10;
pub const HEIGHT_WINDOW_CM: f64 = 15.0;
pub const WEIGHT_WINDOW_KG: f64 = 15.0;

/// Distance weighting strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weighting {
    /// Each dimension normalized by a fixed scale, performance dimensions
    /// double-weighted. Used to select voting neighbors.
    Classification,
    /// Raw absolute differences, 0.2 weight each. Used when presenting
    /// similar profiles to the end user.
    Display,
}

impl Weighting {
    /// Weighted L1 dissimilarity between a profile and a candidate.
    /// Lower is more similar; identical inputs score 0.
    ///
    /// A missing or zero sit-up/broad-jump reading on either side
    /// contributes nothing to the distance. That is a known
    /// approximation inherited from the product: such candidates rank
    /// closer than their performance data would justify.
    pub fn score(self, profile: &Profile, candidate: &ReferenceRecord) -> f64 {
        let age_diff = (candidate.age - profile.age).abs() as f64;
        let height_diff = (candidate.height_cm - profile.height_cm).abs();
        let weight_diff = (candidate.weight_kg - profile.weight_kg).abs();

        let sit_up_diff = match candidate.sit_ups {
            Some(sit_ups) if sit_ups > 0 && profile.sit_ups > 0 => {
                (sit_ups - profile.sit_ups).abs() as f64
            }
            _ => 0.0,
        };
        let broad_jump_diff = match candidate.broad_jump_cm {
            Some(jump) if jump > 0.0 && profile.broad_jump_cm > 0.0 => {
                (jump - profile.broad_jump_cm).abs()
            }
            _ => 0.0,
        };

        match self {
            Weighting::Classification => {
                age_diff / 10.0
                    + height_diff / 20.0
                    + weight_diff / 20.0
                    + sit_up_diff / 30.0 * 2.0
                    + broad_jump_diff / 100.0 * 2.0
            }
            Weighting::Display => {
                age_diff * 0.2
                    + height_diff * 0.2
                    + weight_diff * 0.2
                    + sit_up_diff * 0.2
                    + broad_jump_diff * 0.2
            }
        }
    }
}

/// A reference record annotated with its distance to one profile.
/// Ephemeral: created per request, discarded after ranking.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub record: ReferenceRecord,
    pub similarity: f64,
}

/// Score and rank a candidate pool, most similar first, keeping the
/// first `k`. The sort is stable, so candidates with equal scores keep
/// their fetch order.
pub fn rank_candidates(
    profile: &Profile,
    candidates: Vec<ReferenceRecord>,
    weighting: Weighting,
    k: usize,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|record| ScoredCandidate {
            similarity: weighting.score(profile, &record),
            record,
        })
        .collect();

    scored.sort_by(|a, b| {
        a.similarity
            .partial_cmp(&b.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(k);
    scored
}

/// Fetch the candidate pool for `profile` and return its k nearest
/// neighbors. A failed or empty fetch yields an empty sequence: "no
/// neighbors available" is not an error.
pub async fn find_neighbors(
    store: &dyn PopulationStore,
    profile: &Profile,
    weighting: Weighting,
    fetch_limit: i64,
    k: usize,
) -> Vec<ScoredCandidate> {
    let window = ProfileWindow::around(profile, AGE_WINDOW, HEIGHT_WINDOW_CM, WEIGHT_WINDOW_KG);
    let candidates = match store.fetch_window(&window, None, fetch_limit).await {
        Ok(candidates) => candidates,
        Err(err) => {
            warn!(error = %err, "candidate pool fetch failed, treating as empty");
            return Vec::new();
        }
    };
    rank_candidates(profile, candidates, weighting, k)
}
