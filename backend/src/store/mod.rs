//! Population and prediction store interfaces
//!
//! The engine never talks to the database directly: it is handed a
//! [`PopulationStore`] (reference dataset queries) and the orchestrator a
//! [`PredictionStore`] (prediction history). Both are implemented by the
//! Postgres adapter in [`postgres`]; unit tests substitute in-memory
//! fixture pools.

pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fitscore_shared::models::{FitnessClass, Profile, ReferenceRecord};
use std::collections::BTreeMap;
use uuid::Uuid;

pub use postgres::PgStore;

/// Bounding-box filter over the reference population.
///
/// Each axis is optional; `None` leaves the axis unconstrained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileWindow {
    pub age: Option<(i32, i32)>,
    pub height_cm: Option<(f64, f64)>,
    pub weight_kg: Option<(f64, f64)>,
}

impl ProfileWindow {
    /// Box around a query profile on all three anthropometric axes.
    pub fn around(profile: &Profile, age_half: i32, height_half: f64, weight_half: f64) -> Self {
        Self {
            age: Some((profile.age - age_half, profile.age + age_half)),
            height_cm: Some((
                profile.height_cm - height_half,
                profile.height_cm + height_half,
            )),
            weight_kg: Some((
                profile.weight_kg - weight_half,
                profile.weight_kg + weight_half,
            )),
        }
    }

    /// Age-only band, used by the age-standards lookup.
    pub fn age_band(center: i32, half: i32) -> Self {
        Self {
            age: Some((center - half, center + half)),
            ..Default::default()
        }
    }

    /// Height-only band, used by the optimal-weight lookup.
    pub fn height_band(center_cm: f64, half_cm: f64) -> Self {
        Self {
            height_cm: Some((center_cm - half_cm, center_cm + half_cm)),
            ..Default::default()
        }
    }
}

/// Equality/range filters for the reference data listing.
#[derive(Debug, Clone, Default)]
pub struct ReferenceFilter {
    pub class: Option<FitnessClass>,
    pub gender: Option<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
}

/// A reference row to be ingested.
#[derive(Debug, Clone)]
pub struct NewReferenceRecord {
    pub age: i32,
    pub gender: Option<String>,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub body_fat_percent: Option<f64>,
    pub diastolic: Option<i32>,
    pub systolic: Option<i32>,
    pub grip_force: Option<f64>,
    pub sit_and_bend_forward_cm: Option<f64>,
    pub sit_ups: Option<i32>,
    pub broad_jump_cm: Option<f64>,
    pub class: FitnessClass,
}

/// Min/max/average of the population's age column.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeSummary {
    pub min: i32,
    pub max: i32,
    pub average: f64,
}

/// Read access to the reference population.
#[async_trait]
pub trait PopulationStore: Send + Sync {
    /// Fetch candidates inside a bounding box, optionally restricted to a
    /// class set, in stable (insertion) order, capped at `limit`.
    async fn fetch_window(
        &self,
        window: &ProfileWindow,
        classes: Option<&[FitnessClass]>,
        limit: i64,
    ) -> Result<Vec<ReferenceRecord>>;

    /// Every record of one class (class-statistics subsets).
    async fn records_by_class(&self, class: FitnessClass) -> Result<Vec<ReferenceRecord>>;

    /// Paged listing with equality/range filters; returns (rows, total).
    async fn reference_page(
        &self,
        filter: &ReferenceFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ReferenceRecord>, i64)>;

    async fn class_distribution(&self) -> Result<BTreeMap<String, i64>>;

    async fn gender_distribution(&self) -> Result<BTreeMap<String, i64>>;

    async fn age_summary(&self) -> Result<Option<AgeSummary>>;

    async fn total_records(&self) -> Result<i64>;

    /// Insert rows in sequential batches of 100. A failing batch aborts
    /// the remaining ones; earlier batches are not rolled back
    /// (at-most-partial ingestion). Returns the number inserted.
    async fn insert_batch(&self, rows: &[NewReferenceRecord]) -> Result<usize>;
}

/// A prediction to persist.
#[derive(Debug, Clone)]
pub struct NewPrediction {
    pub user_name: String,
    pub age: i32,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub sit_ups: i32,
    pub broad_jump_cm: f64,
    pub bmi: f64,
    pub fitness_score: i32,
    pub predicted_class: FitnessClass,
    /// Serialized recommendation list (JSONB column)
    pub recommendations: serde_json::Value,
}

/// A persisted prediction.
#[derive(Debug, Clone)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub user_name: String,
    pub age: i32,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub sit_ups: i32,
    pub broad_jump_cm: f64,
    pub bmi: f64,
    pub fitness_score: i32,
    pub predicted_class: FitnessClass,
    pub recommendations: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// (score, class) pair used for history aggregates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredClass {
    pub fitness_score: i32,
    pub class: FitnessClass,
}

/// Access to the prediction-history table.
#[async_trait]
pub trait PredictionStore: Send + Sync {
    async fn save(&self, prediction: NewPrediction) -> Result<PredictionRecord>;

    /// Newest-first page, optionally filtered by a case-insensitive
    /// user-name substring; returns (rows, total).
    async fn page(
        &self,
        user_name: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PredictionRecord>, i64)>;

    async fn by_id(&self, id: Uuid) -> Result<Option<PredictionRecord>>;

    /// Scores of all predictions whose subject age falls inside
    /// `center ± half`, for the age-window percentile comparison.
    async fn scores_in_age_window(&self, center: i32, half: i32) -> Result<Vec<ScoredClass>>;

    /// Predictions created at or after `since`.
    async fn recent(&self, since: DateTime<Utc>) -> Result<Vec<ScoredClass>>;
}
