//! Prediction orchestrator
//!
//! Sequences the calculators and the engine for one request: BMI and
//! base score, neighbor class vote (formula fallback), class-midpoint
//! score substitution, recommendation composition, display-weighted
//! similar profiles, persistence, and the response envelope. Also serves
//! prediction history and per-prediction detail.

use crate::engine::predictor::predict_class;
use crate::engine::recommendation::compose;
use crate::engine::similarity::{find_neighbors, Weighting, DISPLAY_FETCH_LIMIT};
use crate::error::{ApiError, ApiResult};
use crate::store::{NewPrediction, PopulationStore, PredictionRecord, PredictionStore};
use chrono::Utc;
use fitscore_shared::models::{FitnessClass, Profile, RecommendationBlock};
use fitscore_shared::scoring;
use fitscore_shared::types::{
    AgeWindowComparison, Analysis, DetailResponse, HistoryQuery, HistoryResponse,
    PredictRequest, PredictResponse, PredictionData, PredictionDetail, PredictionDto,
    PredictionMetadata, Pagination, SimilarProfile, UserInfo,
};
use tracing::{info, warn};
use uuid::Uuid;

/// Similar profiles shown back to the user
const SIMILAR_PROFILES_SHOWN: usize = 5;
/// Age half-window of the detail comparison
const COMPARISON_AGE_WINDOW: i32 = 5;
/// History page defaults
const DEFAULT_HISTORY_LIMIT: i64 = 10;
const MAX_PAGE_LIMIT: i64 = 100;

/// Prediction service
pub struct PredictionService;

impl PredictionService {
    /// Run one prediction end to end.
    ///
    /// Persistence is fire-and-forget: a failed insert is logged and the
    /// response simply carries no prediction id.
    pub async fn predict(
        population: &dyn PopulationStore,
        predictions: &dyn PredictionStore,
        req: PredictRequest,
    ) -> ApiResult<PredictResponse> {
        let profile = Profile {
            name: Some(req.name.clone()),
            age: req.age,
            height_cm: req.height,
            weight_kg: req.weight,
            sit_ups: req.sit_up_counts,
            broad_jump_cm: req.broad_jump,
        };

        let bmi = scoring::bmi(profile.weight_kg, profile.height_cm);
        let bmi = (bmi * 100.0).round() / 100.0;
        let bmi_category = scoring::BmiCategory::from_bmi(bmi);
        let base_score = scoring::base_fitness_score(
            profile.age,
            profile.sit_ups,
            profile.broad_jump_cm,
            bmi,
        );

        // Neighbor vote first; the formula classification is the fallback
        let voted = predict_class(population, &profile).await;
        let class = voted.unwrap_or_else(|| FitnessClass::from_score(base_score));
        // The persisted score reflects the chosen class, not the raw formula
        let fitness_score = class.midpoint_score();

        let recommendations = compose(population, &profile, class).await;

        let similar = find_neighbors(
            population,
            &profile,
            Weighting::Display,
            DISPLAY_FETCH_LIMIT,
            SIMILAR_PROFILES_SHOWN,
        )
        .await;

        let recommendations_json = serde_json::to_value(&recommendations)
            .unwrap_or_else(|_| serde_json::Value::Array(Vec::new()));

        let prediction_id = match predictions
            .save(NewPrediction {
                user_name: req.name.clone(),
                age: profile.age,
                height_cm: profile.height_cm,
                weight_kg: profile.weight_kg,
                sit_ups: profile.sit_ups,
                broad_jump_cm: profile.broad_jump_cm,
                bmi,
                fitness_score,
                predicted_class: class,
                recommendations: recommendations_json,
            })
            .await
        {
            Ok(record) => Some(record.id),
            Err(err) => {
                warn!(error = %err, "failed to persist prediction, continuing");
                None
            }
        };

        info!(
            class = %class,
            score = fitness_score,
            voted = voted.is_some(),
            "prediction completed"
        );

        Ok(PredictResponse {
            success: true,
            data: PredictionData {
                user_info: UserInfo {
                    name: req.name,
                    age: profile.age,
                    age_group: scoring::age_group(profile.age).to_string(),
                    height: profile.height_cm,
                    weight: profile.weight_kg,
                    sit_up_counts: profile.sit_ups,
                    broad_jump: profile.broad_jump_cm,
                },
                analysis: Analysis {
                    bmi,
                    bmi_category: bmi_category.description().to_string(),
                    fitness_score,
                    fitness_class: class.to_string(),
                    interpretation: class.interpretation().to_string(),
                },
                recommendations,
                similar_profiles: similar
                    .into_iter()
                    .map(|candidate| SimilarProfile {
                        age: candidate.record.age,
                        gender: candidate.record.gender,
                        height: candidate.record.height_cm,
                        weight: candidate.record.weight_kg,
                        sit_ups: candidate.record.sit_ups,
                        broad_jump: candidate.record.broad_jump_cm,
                        class: candidate.record.class.to_string(),
                    })
                    .collect(),
                metadata: PredictionMetadata {
                    prediction_id,
                    timestamp: Utc::now(),
                    version: "1.0".to_string(),
                },
            },
        })
    }

    /// Paginated prediction history, newest first, optionally filtered
    /// by a user-name substring.
    pub async fn history(
        predictions: &dyn PredictionStore,
        query: HistoryQuery,
    ) -> ApiResult<HistoryResponse> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query
            .limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT);
        let offset = (page - 1) * limit;

        let (records, total) = predictions
            .page(query.user_name.as_deref(), limit, offset)
            .await
            .map_err(ApiError::Internal)?;

        Ok(HistoryResponse {
            success: true,
            data: records.into_iter().map(prediction_dto).collect(),
            pagination: Pagination {
                current_page: page,
                total_pages: total_pages(total, limit),
                total_records: total,
                limit,
            },
        })
    }

    /// One prediction plus its age-window percentile comparison.
    pub async fn detail(predictions: &dyn PredictionStore, id: Uuid) -> ApiResult<DetailResponse> {
        let record = predictions
            .by_id(id)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::NotFound("Prediction not found".to_string()))?;

        let comparison = match predictions
            .scores_in_age_window(record.age, COMPARISON_AGE_WINDOW)
            .await
        {
            Ok(window) if !window.is_empty() => {
                let n = window.len() as f64;
                let average = window.iter().map(|s| s.fitness_score as f64).sum::<f64>() / n;
                let mut class_distribution = std::collections::BTreeMap::new();
                for scored in &window {
                    *class_distribution
                        .entry(scored.class.to_string())
                        .or_default() += 1;
                }
                let at_or_below = window
                    .iter()
                    .filter(|s| s.fitness_score <= record.fitness_score)
                    .count() as f64;
                Some(AgeWindowComparison {
                    average_score_in_age_group: (average * 100.0).round() / 100.0,
                    class_distribution,
                    percentile: (at_or_below / n * 100.0).round() as i32,
                })
            }
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "age window comparison failed");
                None
            }
        };

        Ok(DetailResponse {
            success: true,
            data: PredictionDetail {
                prediction: prediction_dto(record),
                comparison,
            },
        })
    }
}

fn total_pages(total: i64, limit: i64) -> i64 {
    if total == 0 {
        0
    } else {
        (total + limit - 1) / limit
    }
}

fn prediction_dto(record: PredictionRecord) -> PredictionDto {
    // Corrupt recommendation payloads degrade to an empty list rather
    // than failing the listing
    let recommendations: Vec<RecommendationBlock> =
        serde_json::from_value(record.recommendations).unwrap_or_default();
    PredictionDto {
        id: record.id,
        user_name: record.user_name,
        age: record.age,
        height: record.height_cm,
        weight: record.weight_kg,
        sit_up_counts: record.sit_ups,
        broad_jump: record.broad_jump_cm,
        bmi: record.bmi,
        fitness_score: record.fitness_score,
        predicted_class: record.predicted_class.to_string(),
        recommendations,
        created_at: record.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testutil::{reference_record, FixturePool};
    use fitscore_shared::models::FitnessClass::{A, B};

    fn request() -> PredictRequest {
        PredictRequest {
            name: "Alex".to_string(),
            weight: 70.0,
            height: 175.0,
            age: 28,
            sit_up_counts: 35,
            broad_jump: 220.0,
        }
    }

    #[tokio::test]
    async fn test_predict_with_empty_population_falls_back_to_formula() {
        let population = FixturePool::default();
        let predictions = FixturePool::default();

        let response = PredictionService::predict(&population, &predictions, request())
            .await
            .unwrap();
        assert!(response.success);

        let analysis = &response.data.analysis;
        assert!((analysis.bmi - 22.86).abs() < 0.01);
        assert_eq!(analysis.bmi_category, "Normal");
        // base formula: sit-ups 25 + jump 25 + bmi 20 + age 18 = 88 -> A
        assert_eq!(analysis.fitness_class, "A");
        // persisted score is the class midpoint, not the raw 88
        assert_eq!(analysis.fitness_score, 93);

        assert!(!response.data.recommendations.is_empty());
        assert!(response.data.similar_profiles.is_empty());
        assert!(response.data.metadata.prediction_id.is_some());

        let saved = predictions.saved_predictions();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].fitness_score, 93);
        assert_eq!(saved[0].predicted_class, A);
    }

    #[tokio::test]
    async fn test_predict_uses_neighbor_vote() {
        // Five class-B neighbors around the query: the vote must win
        // over the formula's class A
        let population = FixturePool::with_records(vec![
            reference_record(1, 28, 175.0, 70.0, Some(35), Some(220.0), B),
            reference_record(2, 29, 176.0, 71.0, Some(34), Some(218.0), B),
            reference_record(3, 27, 174.0, 69.0, Some(36), Some(222.0), B),
            reference_record(4, 28, 175.0, 70.5, Some(35), Some(219.0), B),
            reference_record(5, 28, 175.5, 70.0, Some(33), Some(221.0), A),
        ]);
        let predictions = FixturePool::default();

        let response = PredictionService::predict(&population, &predictions, request())
            .await
            .unwrap();
        assert_eq!(response.data.analysis.fitness_class, "B");
        assert_eq!(response.data.analysis.fitness_score, 77);
        assert_eq!(response.data.similar_profiles.len(), 5);
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_fail_request() {
        let population = FixturePool::default();
        let predictions = FixturePool::failing();

        let response = PredictionService::predict(&population, &predictions, request())
            .await
            .unwrap();
        assert!(response.success);
        assert!(response.data.metadata.prediction_id.is_none());
    }

    #[tokio::test]
    async fn test_recommendations_round_trip_through_persistence() {
        let population = FixturePool::default();
        let predictions = FixturePool::default();

        let response = PredictionService::predict(&population, &predictions, request())
            .await
            .unwrap();
        let saved = predictions.saved_predictions();
        let restored: Vec<RecommendationBlock> =
            serde_json::from_value(saved[0].recommendations.clone()).unwrap();
        assert_eq!(restored, response.data.recommendations);
    }

    #[tokio::test]
    async fn test_history_pagination() {
        let population = FixturePool::default();
        let predictions = FixturePool::default();
        for i in 0..3 {
            let mut req = request();
            req.name = format!("Runner {i}");
            PredictionService::predict(&population, &predictions, req)
                .await
                .unwrap();
        }

        let page = PredictionService::history(
            &predictions,
            HistoryQuery {
                page: Some(1),
                limit: Some(2),
                user_name: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.pagination.total_records, 3);
        assert_eq!(page.pagination.total_pages, 2);
        // newest first
        assert_eq!(page.data[0].user_name, "Runner 2");

        let filtered = PredictionService::history(
            &predictions,
            HistoryQuery {
                page: None,
                limit: None,
                user_name: Some("runner 1".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(filtered.data.len(), 1);
        assert_eq!(filtered.data[0].user_name, "Runner 1");
    }

    #[tokio::test]
    async fn test_detail_not_found() {
        let predictions = FixturePool::default();
        let result = PredictionService::detail(&predictions, Uuid::new_v4()).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_detail_with_comparison() {
        let population = FixturePool::default();
        let predictions = FixturePool::default();
        let response = PredictionService::predict(&population, &predictions, request())
            .await
            .unwrap();
        let id = response.data.metadata.prediction_id.unwrap();

        let detail = PredictionService::detail(&predictions, id).await.unwrap();
        assert_eq!(detail.data.prediction.id, id);
        let comparison = detail.data.comparison.unwrap();
        // only this prediction in the window: it is its own percentile
        assert_eq!(comparison.percentile, 100);
        assert_eq!(comparison.class_distribution.get("A"), Some(&1));
    }
}
