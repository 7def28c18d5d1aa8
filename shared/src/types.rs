//! API request and response types
//!
//! Wire-format types for the prediction and dataset endpoints. All JSON
//! fields use camelCase to match the public API contract.

use crate::models::RecommendationBlock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

// ============================================================================
// Prediction
// ============================================================================

/// Body of `POST /api/prediction/predict`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    #[validate(length(min = 2, max = 50, message = "name must be 2-50 characters"))]
    pub name: String,
    #[validate(range(min = 30.0, max = 300.0, message = "weight must be 30-300 kg"))]
    pub weight: f64,
    #[validate(range(min = 100.0, max = 250.0, message = "height must be 100-250 cm"))]
    pub height: f64,
    #[validate(range(min = 10, max = 100, message = "age must be 10-100 years"))]
    pub age: i32,
    #[validate(range(min = 0, max = 100, message = "sitUpCounts must be 0-100"))]
    pub sit_up_counts: i32,
    #[validate(range(min = 50.0, max = 400.0, message = "broadJump must be 50-400 cm"))]
    pub broad_jump: f64,
}

/// Envelope of a successful prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    pub data: PredictionData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionData {
    pub user_info: UserInfo,
    pub analysis: Analysis,
    pub recommendations: Vec<RecommendationBlock>,
    pub similar_profiles: Vec<SimilarProfile>,
    pub metadata: PredictionMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub name: String,
    pub age: i32,
    pub age_group: String,
    pub height: f64,
    pub weight: f64,
    pub sit_up_counts: i32,
    pub broad_jump: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub bmi: f64,
    pub bmi_category: String,
    pub fitness_score: i32,
    pub fitness_class: String,
    pub interpretation: String,
}

/// A reference-population neighbor shown back to the user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarProfile {
    pub age: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    pub height: f64,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sit_ups: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broad_jump: Option<f64>,
    pub class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionMetadata {
    /// Absent when persistence failed; the prediction itself still succeeds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

// ============================================================================
// Prediction history
// ============================================================================

/// Query string of `GET /api/prediction/history`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub user_name: Option<String>,
}

/// Pagination envelope shared by history and dataset listings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_records: i64,
    pub limit: i64,
}

/// A persisted prediction, recommendations deserialized
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionDto {
    pub id: Uuid,
    pub user_name: String,
    pub age: i32,
    pub height: f64,
    pub weight: f64,
    pub sit_up_counts: i32,
    pub broad_jump: f64,
    pub bmi: f64,
    pub fitness_score: i32,
    pub predicted_class: String,
    pub recommendations: Vec<RecommendationBlock>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub data: Vec<PredictionDto>,
    pub pagination: Pagination,
}

/// Comparison of one prediction against the age-window population
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeWindowComparison {
    pub average_score_in_age_group: f64,
    pub class_distribution: BTreeMap<String, i64>,
    pub percentile: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailResponse {
    pub success: bool,
    pub data: PredictionDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionDetail {
    #[serde(flatten)]
    pub prediction: PredictionDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<AgeWindowComparison>,
}

// ============================================================================
// Reference dataset
// ============================================================================

/// Query string of `GET /api/data/fitness`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub class: Option<String>,
    pub gender: Option<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRecordDto {
    pub id: i64,
    pub age: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    pub height_cm: f64,
    pub weight_kg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_fat_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diastolic: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub systolic: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grip_force: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sit_and_bend_forward_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sit_ups_counts: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broad_jump_cm: Option<f64>,
    pub class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetResponse {
    pub success: bool,
    pub data: Vec<ReferenceRecordDto>,
    pub pagination: Pagination,
}

// ============================================================================
// Dataset statistics
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsResponse {
    pub success: bool,
    pub data: DatasetStatistics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStatistics {
    pub total_records: i64,
    pub dataset_statistics: PopulationBreakdown,
    pub prediction_statistics: PredictionBreakdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationBreakdown {
    pub class_distribution: BTreeMap<String, i64>,
    pub gender_distribution: BTreeMap<String, i64>,
    pub age_statistics: AgeStatistics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgeStatistics {
    pub min: i32,
    pub max: i32,
    pub average: f64,
}

/// Aggregates over the trailing 30 days of predictions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionBreakdown {
    pub total_predictions: i64,
    pub class_distribution: BTreeMap<String, i64>,
    pub average_fitness_score: f64,
}

// ============================================================================
// CSV upload
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub data: UploadSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub inserted_records: usize,
    pub total_processed: usize,
    pub skipped_rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_request_camel_case() {
        let body = r#"{
            "name": "Alex",
            "weight": 70.0,
            "height": 175.0,
            "age": 28,
            "sitUpCounts": 35,
            "broadJump": 220.0
        }"#;
        let req: PredictRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.sit_up_counts, 35);
        assert!((req.broad_jump - 220.0).abs() < f64::EPSILON);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_predict_request_rejects_out_of_range() {
        let req = PredictRequest {
            name: "A".to_string(),
            weight: 20.0,
            height: 175.0,
            age: 8,
            sit_up_counts: 150,
            broad_jump: 500.0,
        };
        let err = req.validate().unwrap_err();
        let fields: Vec<&str> = err.field_errors().keys().copied().collect();
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"weight"));
        assert!(fields.contains(&"age"));
        assert!(fields.contains(&"sitUpCounts") || fields.contains(&"sit_up_counts"));
    }

    #[test]
    fn test_boundary_values_accepted() {
        let req = PredictRequest {
            name: "Jo".to_string(),
            weight: 30.0,
            height: 250.0,
            age: 100,
            sit_up_counts: 0,
            broad_jump: 50.0,
        };
        assert!(req.validate().is_ok());
    }
}
