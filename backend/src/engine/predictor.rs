//! Class predictor
//!
//! Votes a fitness class from the k nearest reference records. When no
//! neighbors are available the predictor abstains and the caller falls
//! back to the deterministic score formula.

use crate::engine::similarity::{
    find_neighbors, ScoredCandidate, Weighting, CLASSIFICATION_FETCH_LIMIT,
};
use crate::store::PopulationStore;
use fitscore_shared::models::{FitnessClass, Profile};
use std::collections::HashMap;
use tracing::debug;

/// Number of neighbors participating in the vote
pub const VOTE_NEIGHBORS: usize = 5;

/// Tally the class labels of the voting neighbors.
///
/// The class with the strict-max count wins. Ties are broken by class
/// quality, best first (A before B before C before D) — a fixed,
/// documented order rather than an incidental map-iteration one.
/// Returns `None` for an empty neighbor set.
pub fn vote(neighbors: &[ScoredCandidate]) -> Option<FitnessClass> {
    if neighbors.is_empty() {
        return None;
    }

    let mut tally: HashMap<FitnessClass, usize> = HashMap::new();
    for neighbor in neighbors {
        *tally.entry(neighbor.record.class).or_default() += 1;
    }

    let mut winner = None;
    let mut max_count = 0;
    for class in FitnessClass::ALL {
        let count = tally.get(&class).copied().unwrap_or(0);
        if count > max_count {
            max_count = count;
            winner = Some(class);
        }
    }
    winner
}

/// Predict a fitness class from the reference population.
///
/// Fetches up to 20 window candidates, keeps the 5 nearest under the
/// classification weighting, and votes. `None` means "no prediction":
/// the orchestrator then classifies by formula score instead.
pub async fn predict_class(store: &dyn PopulationStore, profile: &Profile) -> Option<FitnessClass> {
    let neighbors = find_neighbors(
        store,
        profile,
        Weighting::Classification,
        CLASSIFICATION_FETCH_LIMIT,
        VOTE_NEIGHBORS,
    )
    .await;

    let predicted = vote(&neighbors);
    if let Some(class) = predicted {
        debug!(
            class = %class,
            neighbors = neighbors.len(),
            "class voted from reference population"
        );
    }
    predicted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testutil::{profile, reference_record, FixturePool};
    use fitscore_shared::models::FitnessClass::{A, B, C, D};
    use rstest::rstest;

    fn scored(classes: &[FitnessClass]) -> Vec<ScoredCandidate> {
        classes
            .iter()
            .enumerate()
            .map(|(i, &class)| ScoredCandidate {
                record: reference_record(
                    i as i64,
                    30,
                    170.0,
                    70.0,
                    Some(30),
                    Some(200.0),
                    class,
                ),
                similarity: i as f64,
            })
            .collect()
    }

    #[rstest]
    #[case::majority_wins(vec![A, A, B, C, D], Some(A))]
    #[case::strict_majority_beats_quality(vec![D, D, D, A, B], Some(D))]
    #[case::tie_prefers_better_class(vec![B, B, A, A, D], Some(A))]
    #[case::tie_low_classes(vec![D, D, C, C], Some(C))]
    #[case::single_neighbor_decides(vec![C], Some(C))]
    #[case::no_neighbors_abstain(vec![], None)]
    fn test_vote(#[case] classes: Vec<FitnessClass>, #[case] expected: Option<FitnessClass>) {
        let neighbors = scored(&classes);
        assert_eq!(vote(&neighbors), expected);
    }

    #[tokio::test]
    async fn test_predict_class_empty_population() {
        let store = FixturePool::default();
        let query = profile(30, 170.0, 70.0, 30, 200.0);
        assert_eq!(predict_class(&store, &query).await, None);
    }

    #[tokio::test]
    async fn test_predict_class_votes_nearest_five() {
        // Five close A/B records and a crowd of distant D records: the
        // vote must only see the five nearest.
        let mut records = vec![
            reference_record(1, 30, 170.0, 70.0, Some(30), Some(200.0), A),
            reference_record(2, 30, 171.0, 70.0, Some(30), Some(200.0), A),
            reference_record(3, 31, 170.0, 71.0, Some(31), Some(201.0), A),
            reference_record(4, 31, 171.0, 71.0, Some(32), Some(202.0), B),
            reference_record(5, 32, 172.0, 72.0, Some(33), Some(203.0), B),
        ];
        for i in 0..10 {
            records.push(reference_record(
                100 + i,
                38,
                182.0,
                82.0,
                Some(10),
                Some(150.0),
                D,
            ));
        }
        let store = FixturePool::with_records(records);
        let query = profile(30, 170.0, 70.0, 30, 200.0);
        assert_eq!(predict_class(&store, &query).await, Some(A));
    }
}
