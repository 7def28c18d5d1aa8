//! Postgres store adapter
//!
//! sqlx-backed implementation of [`PopulationStore`] and
//! [`PredictionStore`]. NUMERIC columns are read as `Decimal` and
//! converted to `f64` at this boundary; rows carrying an unknown class
//! label are skipped with a warning rather than failing the query.

use super::{
    AgeSummary, NewPrediction, NewReferenceRecord, PopulationStore, PredictionRecord,
    PredictionStore, ProfileWindow, ReferenceFilter, ScoredClass,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fitscore_shared::models::{FitnessClass, ReferenceRecord};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use tracing::warn;

/// Rows per INSERT statement during CSV ingestion
const INSERT_BATCH_SIZE: usize = 100;

const REFERENCE_COLUMNS: &str = "id, age, gender, height_cm, weight_kg, body_fat_percent, \
     diastolic, systolic, grip_force, sit_and_bend_forward_cm, sit_ups_counts, broad_jump_cm, class";

const PREDICTION_COLUMNS: &str = "id, user_name, age, height_cm, weight_kg, sit_ups_counts, \
     broad_jump_cm, bmi, fitness_score, predicted_class, recommendations, created_at";

/// Postgres-backed store for both the reference population and the
/// prediction history.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decimal_to_f64(value: &Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn f64_to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Raw reference row as stored
#[derive(Debug, sqlx::FromRow)]
struct ReferenceRow {
    id: i64,
    age: i32,
    gender: Option<String>,
    height_cm: Decimal,
    weight_kg: Decimal,
    body_fat_percent: Option<Decimal>,
    diastolic: Option<i32>,
    systolic: Option<i32>,
    grip_force: Option<Decimal>,
    sit_and_bend_forward_cm: Option<Decimal>,
    sit_ups_counts: Option<i32>,
    broad_jump_cm: Option<Decimal>,
    class: String,
}

impl ReferenceRow {
    fn into_domain(self) -> Option<ReferenceRecord> {
        let class = match self.class.parse::<FitnessClass>() {
            Ok(class) => class,
            Err(err) => {
                warn!(row_id = self.id, %err, "skipping reference row with unknown class");
                return None;
            }
        };
        Some(ReferenceRecord {
            id: self.id,
            age: self.age,
            gender: self.gender,
            height_cm: decimal_to_f64(&self.height_cm),
            weight_kg: decimal_to_f64(&self.weight_kg),
            body_fat_percent: self.body_fat_percent.as_ref().map(decimal_to_f64),
            diastolic: self.diastolic,
            systolic: self.systolic,
            grip_force: self.grip_force.as_ref().map(decimal_to_f64),
            sit_and_bend_forward_cm: self.sit_and_bend_forward_cm.as_ref().map(decimal_to_f64),
            sit_ups: self.sit_ups_counts,
            broad_jump_cm: self.broad_jump_cm.as_ref().map(decimal_to_f64),
            class,
        })
    }
}

/// Raw prediction row as stored
#[derive(Debug, sqlx::FromRow)]
struct PredictionRow {
    id: uuid::Uuid,
    user_name: String,
    age: i32,
    height_cm: Decimal,
    weight_kg: Decimal,
    sit_ups_counts: i32,
    broad_jump_cm: Decimal,
    bmi: Decimal,
    fitness_score: i32,
    predicted_class: String,
    recommendations: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl PredictionRow {
    fn into_domain(self) -> Option<PredictionRecord> {
        let class = match self.predicted_class.parse::<FitnessClass>() {
            Ok(class) => class,
            Err(err) => {
                warn!(id = %self.id, %err, "skipping prediction row with unknown class");
                return None;
            }
        };
        Some(PredictionRecord {
            id: self.id,
            user_name: self.user_name,
            age: self.age,
            height_cm: decimal_to_f64(&self.height_cm),
            weight_kg: decimal_to_f64(&self.weight_kg),
            sit_ups: self.sit_ups_counts,
            broad_jump_cm: decimal_to_f64(&self.broad_jump_cm),
            bmi: decimal_to_f64(&self.bmi),
            fitness_score: self.fitness_score,
            predicted_class: class,
            recommendations: self.recommendations,
            created_at: self.created_at,
        })
    }
}

/// Append the bounding-box and class predicates of a window query.
fn push_window_predicates<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
    window: &'a ProfileWindow,
    classes: Option<&'a [FitnessClass]>,
) {
    if let Some((lo, hi)) = window.age {
        qb.push(" AND age >= ").push_bind(lo);
        qb.push(" AND age <= ").push_bind(hi);
    }
    if let Some((lo, hi)) = window.height_cm {
        qb.push(" AND height_cm >= ").push_bind(f64_to_decimal(lo));
        qb.push(" AND height_cm <= ").push_bind(f64_to_decimal(hi));
    }
    if let Some((lo, hi)) = window.weight_kg {
        qb.push(" AND weight_kg >= ").push_bind(f64_to_decimal(lo));
        qb.push(" AND weight_kg <= ").push_bind(f64_to_decimal(hi));
    }
    if let Some(classes) = classes {
        let labels: Vec<String> = classes.iter().map(|c| c.to_string()).collect();
        qb.push(" AND class = ANY(").push_bind(labels).push(")");
    }
}

/// Append the listing filter predicates.
fn push_filter_predicates<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a ReferenceFilter) {
    if let Some(class) = filter.class {
        qb.push(" AND class = ").push_bind(class.as_str());
    }
    if let Some(gender) = &filter.gender {
        qb.push(" AND gender = ").push_bind(gender);
    }
    if let Some(age_min) = filter.age_min {
        qb.push(" AND age >= ").push_bind(age_min);
    }
    if let Some(age_max) = filter.age_max {
        qb.push(" AND age <= ").push_bind(age_max);
    }
}

#[async_trait]
impl PopulationStore for PgStore {
    async fn fetch_window(
        &self,
        window: &ProfileWindow,
        classes: Option<&[FitnessClass]>,
        limit: i64,
    ) -> Result<Vec<ReferenceRecord>> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {REFERENCE_COLUMNS} FROM fitness_data WHERE TRUE"
        ));
        push_window_predicates(&mut qb, window, classes);
        // id order keeps ranking ties stable across identical queries
        qb.push(" ORDER BY id LIMIT ").push_bind(limit);

        let rows: Vec<ReferenceRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .context("window query over fitness_data failed")?;

        Ok(rows.into_iter().filter_map(ReferenceRow::into_domain).collect())
    }

    async fn records_by_class(&self, class: FitnessClass) -> Result<Vec<ReferenceRecord>> {
        let rows: Vec<ReferenceRow> = sqlx::query_as(&format!(
            "SELECT {REFERENCE_COLUMNS} FROM fitness_data WHERE class = $1 ORDER BY id"
        ))
        .bind(class.as_str())
        .fetch_all(&self.pool)
        .await
        .context("class subset query failed")?;

        Ok(rows.into_iter().filter_map(ReferenceRow::into_domain).collect())
    }

    async fn reference_page(
        &self,
        filter: &ReferenceFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ReferenceRecord>, i64)> {
        let mut count_qb =
            QueryBuilder::new("SELECT COUNT(*) FROM fitness_data WHERE TRUE");
        push_filter_predicates(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .context("reference count query failed")?;

        let mut qb = QueryBuilder::new(format!(
            "SELECT {REFERENCE_COLUMNS} FROM fitness_data WHERE TRUE"
        ));
        push_filter_predicates(&mut qb, filter);
        qb.push(" ORDER BY id LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);

        let rows: Vec<ReferenceRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .context("reference page query failed")?;

        Ok((
            rows.into_iter().filter_map(ReferenceRow::into_domain).collect(),
            total,
        ))
    }

    async fn class_distribution(&self) -> Result<BTreeMap<String, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT class, COUNT(*) FROM fitness_data WHERE class IS NOT NULL GROUP BY class",
        )
        .fetch_all(&self.pool)
        .await
        .context("class distribution query failed")?;
        Ok(rows.into_iter().collect())
    }

    async fn gender_distribution(&self) -> Result<BTreeMap<String, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT gender, COUNT(*) FROM fitness_data WHERE gender IS NOT NULL GROUP BY gender",
        )
        .fetch_all(&self.pool)
        .await
        .context("gender distribution query failed")?;
        Ok(rows.into_iter().collect())
    }

    async fn age_summary(&self) -> Result<Option<AgeSummary>> {
        let row: (Option<i32>, Option<i32>, Option<f64>) = sqlx::query_as(
            "SELECT MIN(age), MAX(age), AVG(age)::float8 FROM fitness_data",
        )
        .fetch_one(&self.pool)
        .await
        .context("age summary query failed")?;

        Ok(match row {
            (Some(min), Some(max), Some(average)) => Some(AgeSummary { min, max, average }),
            _ => None,
        })
    }

    async fn total_records(&self) -> Result<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fitness_data")
            .fetch_one(&self.pool)
            .await
            .context("total count query failed")?;
        Ok(total)
    }

    async fn insert_batch(&self, rows: &[NewReferenceRecord]) -> Result<usize> {
        let mut inserted = 0usize;
        for chunk in rows.chunks(INSERT_BATCH_SIZE) {
            let mut qb = QueryBuilder::new(
                "INSERT INTO fitness_data (age, gender, height_cm, weight_kg, \
                 body_fat_percent, diastolic, systolic, grip_force, \
                 sit_and_bend_forward_cm, sit_ups_counts, broad_jump_cm, class) ",
            );
            qb.push_values(chunk, |mut b, row| {
                b.push_bind(row.age)
                    .push_bind(row.gender.clone())
                    .push_bind(f64_to_decimal(row.height_cm))
                    .push_bind(f64_to_decimal(row.weight_kg))
                    .push_bind(row.body_fat_percent.and_then(Decimal::from_f64))
                    .push_bind(row.diastolic)
                    .push_bind(row.systolic)
                    .push_bind(row.grip_force.and_then(Decimal::from_f64))
                    .push_bind(row.sit_and_bend_forward_cm.and_then(Decimal::from_f64))
                    .push_bind(row.sit_ups)
                    .push_bind(row.broad_jump_cm.and_then(Decimal::from_f64))
                    .push_bind(row.class.as_str());
            });
            qb.build()
                .execute(&self.pool)
                .await
                .with_context(|| format!("batch insert failed after {inserted} rows"))?;
            inserted += chunk.len();
        }
        Ok(inserted)
    }
}

#[async_trait]
impl PredictionStore for PgStore {
    async fn save(&self, prediction: NewPrediction) -> Result<PredictionRecord> {
        let row: PredictionRow = sqlx::query_as(&format!(
            "INSERT INTO predictions (user_name, age, height_cm, weight_kg, \
             sit_ups_counts, broad_jump_cm, bmi, fitness_score, predicted_class, recommendations) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {PREDICTION_COLUMNS}"
        ))
        .bind(&prediction.user_name)
        .bind(prediction.age)
        .bind(f64_to_decimal(prediction.height_cm))
        .bind(f64_to_decimal(prediction.weight_kg))
        .bind(prediction.sit_ups)
        .bind(f64_to_decimal(prediction.broad_jump_cm))
        .bind(f64_to_decimal(prediction.bmi))
        .bind(prediction.fitness_score)
        .bind(prediction.predicted_class.as_str())
        .bind(&prediction.recommendations)
        .fetch_one(&self.pool)
        .await
        .context("prediction insert failed")?;

        row.into_domain()
            .context("persisted prediction row failed to map back")
    }

    async fn page(
        &self,
        user_name: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PredictionRecord>, i64)> {
        let pattern = user_name.map(|name| format!("%{name}%"));

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM predictions WHERE TRUE");
        if let Some(pattern) = &pattern {
            count_qb.push(" AND user_name ILIKE ").push_bind(pattern);
        }
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .context("prediction count query failed")?;

        let mut qb = QueryBuilder::new(format!(
            "SELECT {PREDICTION_COLUMNS} FROM predictions WHERE TRUE"
        ));
        if let Some(pattern) = &pattern {
            qb.push(" AND user_name ILIKE ").push_bind(pattern);
        }
        qb.push(" ORDER BY created_at DESC LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);

        let rows: Vec<PredictionRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .context("prediction page query failed")?;

        Ok((
            rows.into_iter().filter_map(PredictionRow::into_domain).collect(),
            total,
        ))
    }

    async fn by_id(&self, id: uuid::Uuid) -> Result<Option<PredictionRecord>> {
        let row: Option<PredictionRow> = sqlx::query_as(&format!(
            "SELECT {PREDICTION_COLUMNS} FROM predictions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("prediction lookup failed")?;

        Ok(row.and_then(PredictionRow::into_domain))
    }

    async fn scores_in_age_window(&self, center: i32, half: i32) -> Result<Vec<ScoredClass>> {
        let rows: Vec<(i32, String)> = sqlx::query_as(
            "SELECT fitness_score, predicted_class FROM predictions \
             WHERE age >= $1 AND age <= $2",
        )
        .bind(center - half)
        .bind(center + half)
        .fetch_all(&self.pool)
        .await
        .context("age window score query failed")?;

        Ok(rows
            .into_iter()
            .filter_map(|(fitness_score, class)| {
                class.parse::<FitnessClass>().ok().map(|class| ScoredClass {
                    fitness_score,
                    class,
                })
            })
            .collect())
    }

    async fn recent(&self, since: DateTime<Utc>) -> Result<Vec<ScoredClass>> {
        let rows: Vec<(i32, String)> = sqlx::query_as(
            "SELECT fitness_score, predicted_class FROM predictions WHERE created_at >= $1",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .context("recent prediction query failed")?;

        Ok(rows
            .into_iter()
            .filter_map(|(fitness_score, class)| {
                class.parse::<FitnessClass>().ok().map(|class| ScoredClass {
                    fitness_score,
                    class,
                })
            })
            .collect())
    }
}
