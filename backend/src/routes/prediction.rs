//! Prediction API routes

use crate::error::ApiError;
use crate::services::PredictionService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use fitscore_shared::types::{
    DetailResponse, HistoryQuery, HistoryResponse, PredictRequest, PredictResponse,
};
use uuid::Uuid;
use validator::Validate;

/// Create prediction routes
pub fn prediction_routes() -> Router<AppState> {
    Router::new()
        .route("/predict", post(predict))
        .route("/history", get(history))
        .route("/:prediction_id", get(detail))
}

/// POST /api/prediction/predict - Score a profile and recommend
///
/// Validates the five inputs against their documented ranges before any
/// engine work; a violation returns 400 with the offending field.
async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    req.validate().map_err(ApiError::from_validation)?;

    let response =
        PredictionService::predict(state.population(), state.predictions(), req).await?;
    Ok(Json(response))
}

/// GET /api/prediction/history - Paginated prediction history
async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let response = PredictionService::history(state.predictions(), query).await?;
    Ok(Json(response))
}

/// GET /api/prediction/:prediction_id - One prediction with its
/// age-window comparison
async fn detail(
    State(state): State<AppState>,
    Path(prediction_id): Path<Uuid>,
) -> Result<Json<DetailResponse>, ApiError> {
    let response = PredictionService::detail(state.predictions(), prediction_id).await?;
    Ok(Json(response))
}
