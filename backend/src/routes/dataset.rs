//! Reference dataset API routes

use crate::error::ApiError;
use crate::services::DatasetService;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use fitscore_shared::types::{DatasetQuery, DatasetResponse, StatisticsResponse, UploadResponse};

/// Create dataset routes
pub fn dataset_routes() -> Router<AppState> {
    Router::new()
        .route("/fitness", get(list_fitness_data))
        .route("/statistics", get(statistics))
        .route("/upload", post(upload_csv))
}

/// GET /api/data/fitness - Paginated reference records with filters
async fn list_fitness_data(
    State(state): State<AppState>,
    Query(query): Query<DatasetQuery>,
) -> Result<Json<DatasetResponse>, ApiError> {
    let response = DatasetService::list(state.population(), query).await?;
    Ok(Json(response))
}

/// GET /api/data/statistics - Dataset-wide distributions and recent
/// prediction aggregates
async fn statistics(
    State(state): State<AppState>,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let response = DatasetService::statistics(state.population(), state.predictions()).await?;
    Ok(Json(response))
}

/// POST /api/data/upload - Ingest a text/csv request body into the
/// reference table
async fn upload_csv(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    let response = DatasetService::ingest_csv(state.population(), &body).await?;
    Ok(Json(response))
}
