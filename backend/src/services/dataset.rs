//! Reference dataset service
//!
//! Filtered listing of the reference population, dataset-wide
//! statistics, and CSV ingestion. Ingestion is tolerant of the source
//! data's header spellings, skips rows that fail to parse or validate,
//! and inserts in sequential batches with at-most-partial semantics.

use crate::error::{ApiError, ApiResult};
use crate::store::{
    NewReferenceRecord, PopulationStore, PredictionStore, ReferenceFilter,
};
use chrono::{DateTime, Duration, Utc};
use csv::StringRecord;
use fitscore_shared::models::{FitnessClass, ReferenceRecord};
use fitscore_shared::types::{
    AgeStatistics, DatasetQuery, DatasetResponse, DatasetStatistics, Pagination,
    PopulationBreakdown, PredictionBreakdown, ReferenceRecordDto, StatisticsResponse,
    UploadResponse, UploadSummary,
};
use fitscore_shared::validation::validate_reference_row;
use std::collections::BTreeMap;
use tracing::{info, warn};

const DEFAULT_PAGE_LIMIT: i64 = 20;
const MAX_PAGE_LIMIT: i64 = 100;
/// Trailing window of the prediction aggregates
const RECENT_PREDICTION_DAYS: i64 = 30;

/// Dataset service
pub struct DatasetService;

impl DatasetService {
    /// Paginated reference listing with class/gender/age filters.
    pub async fn list(
        population: &dyn PopulationStore,
        query: DatasetQuery,
    ) -> ApiResult<DatasetResponse> {
        let class = match &query.class {
            Some(raw) => Some(raw.parse::<FitnessClass>().map_err(|_| {
                ApiError::BadRequest(format!("unknown class filter: {raw}"))
            })?),
            None => None,
        };

        let filter = ReferenceFilter {
            class,
            gender: query.gender.clone(),
            age_min: query.age_min,
            age_max: query.age_max,
        };

        let page = query.page.unwrap_or(1).max(1);
        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT);
        let offset = (page - 1) * limit;

        let (records, total) = population
            .reference_page(&filter, limit, offset)
            .await
            .map_err(ApiError::Internal)?;

        Ok(DatasetResponse {
            success: true,
            data: records.into_iter().map(reference_dto).collect(),
            pagination: Pagination {
                current_page: page,
                total_pages: if total == 0 { 0 } else { (total + limit - 1) / limit },
                total_records: total,
                limit,
            },
        })
    }

    /// Dataset-wide distributions plus aggregates over the trailing 30
    /// days of predictions. A failing prediction query degrades to empty
    /// aggregates; the population queries are load-bearing and propagate.
    pub async fn statistics(
        population: &dyn PopulationStore,
        predictions: &dyn PredictionStore,
    ) -> ApiResult<StatisticsResponse> {
        let (total, classes, genders, ages) = tokio::join!(
            population.total_records(),
            population.class_distribution(),
            population.gender_distribution(),
            population.age_summary(),
        );
        let total = total.map_err(ApiError::Internal)?;
        let class_distribution = classes.map_err(ApiError::Internal)?;
        let gender_distribution = genders.map_err(ApiError::Internal)?;
        let age_summary = ages.map_err(ApiError::Internal)?;

        let recent = match predictions.recent(recent_window_start()).await {
            Ok(recent) => recent,
            Err(err) => {
                warn!(error = %err, "recent prediction aggregate failed, reporting empty");
                Vec::new()
            }
        };

        let mut prediction_classes: BTreeMap<String, i64> = BTreeMap::new();
        for scored in &recent {
            *prediction_classes.entry(scored.class.to_string()).or_default() += 1;
        }
        let average_fitness_score = if recent.is_empty() {
            0.0
        } else {
            let avg = recent.iter().map(|s| s.fitness_score as f64).sum::<f64>()
                / recent.len() as f64;
            (avg * 100.0).round() / 100.0
        };

        let age_statistics = match age_summary {
            Some(summary) => AgeStatistics {
                min: summary.min,
                max: summary.max,
                average: (summary.average * 10.0).round() / 10.0,
            },
            None => AgeStatistics {
                min: 0,
                max: 0,
                average: 0.0,
            },
        };

        Ok(StatisticsResponse {
            success: true,
            data: DatasetStatistics {
                total_records: total,
                dataset_statistics: PopulationBreakdown {
                    class_distribution,
                    gender_distribution,
                    age_statistics,
                },
                prediction_statistics: PredictionBreakdown {
                    total_predictions: recent.len() as i64,
                    class_distribution: prediction_classes,
                    average_fitness_score,
                },
            },
        })
    }

    /// Ingest a CSV body into the reference table.
    ///
    /// Unparsable or implausible rows are skipped and counted; batches
    /// of 100 are inserted sequentially, and a mid-ingestion store
    /// failure leaves earlier batches in place.
    pub async fn ingest_csv(
        population: &dyn PopulationStore,
        body: &[u8],
    ) -> ApiResult<UploadResponse> {
        if body.is_empty() {
            return Err(ApiError::BadRequest("CSV file is required".to_string()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(body);

        let headers = reader
            .headers()
            .map_err(|e| ApiError::BadRequest(format!("unreadable CSV header: {e}")))?
            .clone();
        let columns = ColumnMap::resolve(&headers)?;

        let mut rows = Vec::new();
        let mut total_processed = 0usize;
        let mut skipped = 0usize;

        for record in reader.records() {
            total_processed += 1;
            let record = match record {
                Ok(record) => record,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };
            match columns.parse_row(&record) {
                Some(row) => rows.push(row),
                None => skipped += 1,
            }
        }

        if rows.is_empty() {
            return Err(ApiError::BadRequest(
                "CSV contained no valid rows".to_string(),
            ));
        }

        let inserted = population
            .insert_batch(&rows)
            .await
            .map_err(ApiError::Internal)?;

        info!(inserted, skipped, "reference CSV ingested");

        Ok(UploadResponse {
            success: true,
            message: format!("Successfully ingested {inserted} reference records"),
            data: UploadSummary {
                inserted_records: inserted,
                total_processed,
                skipped_rows: skipped,
            },
        })
    }
}

/// 30 days before now, the start of the "recent predictions" window.
pub fn recent_window_start() -> DateTime<Utc> {
    Utc::now() - Duration::days(RECENT_PREDICTION_DAYS)
}

/// Header indices of the logical CSV columns.
///
/// The source dataset has been exported with several header spellings
/// (`weight*kg` vs `weight_kg`, `sit-ups counts` vs `sit_ups_counts`);
/// each logical column accepts its known aliases.
struct ColumnMap {
    age: usize,
    gender: Option<usize>,
    height_cm: usize,
    weight_kg: usize,
    body_fat_percent: Option<usize>,
    diastolic: Option<usize>,
    systolic: Option<usize>,
    grip_force: Option<usize>,
    sit_and_bend_forward_cm: Option<usize>,
    sit_ups: Option<usize>,
    broad_jump_cm: Option<usize>,
    class: usize,
}

impl ColumnMap {
    fn resolve(headers: &StringRecord) -> Result<Self, ApiError> {
        let find = |aliases: &[&str]| -> Option<usize> {
            headers
                .iter()
                .position(|h| aliases.iter().any(|a| h.eq_ignore_ascii_case(a)))
        };
        let required = |name: &str, aliases: &[&str]| -> Result<usize, ApiError> {
            find(aliases).ok_or_else(|| {
                ApiError::BadRequest(format!("missing required CSV column: {name}"))
            })
        };

        Ok(Self {
            age: required("age", &["age"])?,
            gender: find(&["gender"]),
            height_cm: required("height_cm", &["height_cm", "height"])?,
            weight_kg: required("weight_kg", &["weight_kg", "weight*kg", "weight"])?,
            body_fat_percent: find(&["body_fat_percent", "body fat*%", "body fat_%"]),
            diastolic: find(&["diastolic"]),
            systolic: find(&["systolic"]),
            grip_force: find(&["grip_force", "gripForce"]),
            sit_and_bend_forward_cm: find(&[
                "sit_and_bend_forward_cm",
                "sit and bend forward_cm",
            ]),
            sit_ups: find(&["sit_ups_counts", "sit-ups counts"]),
            broad_jump_cm: find(&["broad_jump_cm", "broad jump_cm"]),
            class: required("class", &["class"])?,
        })
    }

    /// Parse one CSV row. `None` means the row is skipped: a required
    /// field failed to parse, the class label is unknown, or the values
    /// are implausible.
    fn parse_row(&self, record: &StringRecord) -> Option<NewReferenceRecord> {
        let field = |idx: usize| record.get(idx).filter(|v| !v.is_empty());
        let opt_field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).filter(|v| !v.is_empty());

        let age: i32 = parse_number(field(self.age)?)?;
        let height_cm: f64 = field(self.height_cm)?.parse().ok()?;
        let weight_kg: f64 = field(self.weight_kg)?.parse().ok()?;
        let class: FitnessClass = field(self.class)?.parse().ok()?;

        let sit_ups: Option<i32> = opt_field(self.sit_ups).and_then(parse_number);
        let broad_jump_cm: Option<f64> =
            opt_field(self.broad_jump_cm).and_then(|v| v.parse().ok());

        validate_reference_row(age, height_cm, weight_kg, sit_ups, broad_jump_cm).ok()?;

        Some(NewReferenceRecord {
            age,
            gender: opt_field(self.gender).map(str::to_string),
            height_cm,
            weight_kg,
            body_fat_percent: opt_field(self.body_fat_percent).and_then(|v| v.parse().ok()),
            diastolic: opt_field(self.diastolic).and_then(parse_number),
            systolic: opt_field(self.systolic).and_then(parse_number),
            grip_force: opt_field(self.grip_force).and_then(|v| v.parse().ok()),
            sit_and_bend_forward_cm: opt_field(self.sit_and_bend_forward_cm)
                .and_then(|v| v.parse().ok()),
            sit_ups,
            broad_jump_cm,
            class,
        })
    }
}

/// Integer columns in the source data sometimes carry a decimal point
/// ("27.0"); accept both spellings.
fn parse_number(value: &str) -> Option<i32> {
    if let Ok(parsed) = value.parse::<i32>() {
        return Some(parsed);
    }
    value.parse::<f64>().ok().map(|v| v.round() as i32)
}

fn reference_dto(record: ReferenceRecord) -> ReferenceRecordDto {
    ReferenceRecordDto {
        id: record.id,
        age: record.age,
        gender: record.gender,
        height_cm: record.height_cm,
        weight_kg: record.weight_kg,
        body_fat_percent: record.body_fat_percent,
        diastolic: record.diastolic,
        systolic: record.systolic,
        grip_force: record.grip_force,
        sit_and_bend_forward_cm: record.sit_and_bend_forward_cm,
        sit_ups_counts: record.sit_ups,
        broad_jump_cm: record.broad_jump_cm,
        class: record.class.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testutil::{reference_record, FixturePool};
    use fitscore_shared::models::FitnessClass::{A, B, C};

    const SOURCE_HEADERS: &str = "age,gender,height_cm,weight*kg,body fat*%,diastolic,systolic,gripForce,sit and bend forward_cm,sit-ups counts,broad_jump_cm,class";

    #[tokio::test]
    async fn test_ingest_source_style_headers() {
        let store = FixturePool::default();
        let csv = format!(
            "{SOURCE_HEADERS}\n27,M,172.3,75.24,21.3,80,130,54.9,18.4,60,217,B\n25.0,F,165.0,55.8,28.0,77,126,36.4,16.3,53,229,A\n"
        );
        let response = DatasetService::ingest_csv(&store, csv.as_bytes())
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.data.inserted_records, 2);
        assert_eq!(response.data.total_processed, 2);
        assert_eq!(response.data.skipped_rows, 0);
        assert_eq!(store.total_records().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ingest_snake_case_headers() {
        let store = FixturePool::default();
        let csv = "age,gender,height_cm,weight_kg,sit_ups_counts,broad_jump_cm,class\n30,F,168.0,62.0,40,205,A\n";
        let response = DatasetService::ingest_csv(&store, csv.as_bytes())
            .await
            .unwrap();
        assert_eq!(response.data.inserted_records, 1);
    }

    #[tokio::test]
    async fn test_ingest_skips_bad_rows() {
        let store = FixturePool::default();
        // row 2: unparsable age; row 3: unknown class; row 4: implausible height
        let csv = "age,height_cm,weight_kg,class\n\
                   30,170.0,70.0,B\n\
                   abc,170.0,70.0,B\n\
                   30,170.0,70.0,X\n\
                   30,20.0,70.0,B\n";
        let response = DatasetService::ingest_csv(&store, csv.as_bytes())
            .await
            .unwrap();
        assert_eq!(response.data.inserted_records, 1);
        assert_eq!(response.data.total_processed, 4);
        assert_eq!(response.data.skipped_rows, 3);
    }

    #[tokio::test]
    async fn test_ingest_empty_body_rejected() {
        let store = FixturePool::default();
        let result = DatasetService::ingest_csv(&store, b"").await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_ingest_missing_required_column() {
        let store = FixturePool::default();
        let result =
            DatasetService::ingest_csv(&store, b"age,height_cm,weight_kg\n30,170,70\n").await;
        match result {
            Err(ApiError::BadRequest(message)) => assert!(message.contains("class")),
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let store = FixturePool::with_records(vec![
            reference_record(1, 25, 170.0, 70.0, Some(40), Some(220.0), A),
            reference_record(2, 35, 172.0, 72.0, Some(30), Some(200.0), B),
            reference_record(3, 45, 174.0, 74.0, Some(20), Some(180.0), C),
        ]);
        let response = DatasetService::list(
            &store,
            DatasetQuery {
                page: None,
                limit: None,
                class: Some("B".to_string()),
                gender: None,
                age_min: None,
                age_max: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.data[0].class, "B");
        assert_eq!(response.pagination.total_records, 1);

        let by_age = DatasetService::list(
            &store,
            DatasetQuery {
                page: None,
                limit: None,
                class: None,
                gender: None,
                age_min: Some(30),
                age_max: Some(50),
            },
        )
        .await
        .unwrap();
        assert_eq!(by_age.data.len(), 2);
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_class() {
        let store = FixturePool::default();
        let result = DatasetService::list(
            &store,
            DatasetQuery {
                page: None,
                limit: None,
                class: Some("Z".to_string()),
                gender: None,
                age_min: None,
                age_max: None,
            },
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_statistics_with_empty_stores() {
        let population = FixturePool::default();
        let predictions = FixturePool::default();
        let response = DatasetService::statistics(&population, &predictions)
            .await
            .unwrap();
        assert_eq!(response.data.total_records, 0);
        assert!(response.data.dataset_statistics.class_distribution.is_empty());
        assert_eq!(response.data.prediction_statistics.total_predictions, 0);
        assert_eq!(response.data.prediction_statistics.average_fitness_score, 0.0);
    }

    #[tokio::test]
    async fn test_statistics_distributions() {
        let population = FixturePool::with_records(vec![
            reference_record(1, 25, 170.0, 70.0, Some(40), Some(220.0), A),
            reference_record(2, 35, 172.0, 72.0, Some(30), Some(200.0), A),
            reference_record(3, 45, 174.0, 74.0, Some(20), Some(180.0), C),
        ]);
        let predictions = FixturePool::default();
        let response = DatasetService::statistics(&population, &predictions)
            .await
            .unwrap();
        let data = &response.data;
        assert_eq!(data.total_records, 3);
        assert_eq!(data.dataset_statistics.class_distribution.get("A"), Some(&2));
        assert_eq!(data.dataset_statistics.class_distribution.get("C"), Some(&1));
        assert_eq!(data.dataset_statistics.age_statistics.min, 25);
        assert_eq!(data.dataset_statistics.age_statistics.max, 45);
        assert!((data.dataset_statistics.age_statistics.average - 35.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_statistics_prediction_failure_degrades() {
        let population = FixturePool::default();
        let predictions = FixturePool::failing();
        let response = DatasetService::statistics(&population, &predictions)
            .await
            .unwrap();
        assert_eq!(response.data.prediction_statistics.total_predictions, 0);
    }
}
