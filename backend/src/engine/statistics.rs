//! Statistics aggregator
//!
//! Class-conditional and window-conditional descriptive statistics over
//! the reference population. Every aggregate is computed fresh from the
//! current population snapshot and degrades to fixed defaults when its
//! subset is empty or the store fails; nothing here returns an error or
//! a NaN.

use crate::store::{PopulationStore, ProfileWindow};
use fitscore_shared::models::{
    stat_defaults, ClassStatistics, FitnessClass, Profile, ReferenceRecord,
};
use tracing::warn;

/// Classes counted as "successful" for benchmark subsets
pub const SUCCESSFUL_CLASSES: [FitnessClass; 2] = [FitnessClass::A, FitnessClass::B];

/// Fetch cap for the windowed successful-profile benchmark
pub const SUCCESSFUL_FETCH_LIMIT: i64 = 10;
/// Fetch cap for the general successful-population fallback benchmark
pub const GENERAL_BENCHMARK_LIMIT: i64 = 20;
/// Fetch cap and half-width of the optimal-weight height band
pub const OPTIMAL_WEIGHT_LIMIT: i64 = 10;
pub const HEIGHT_BAND_CM: f64 = 5.0;
/// Fetch cap and half-width of the age-standards band
pub const AGE_BAND_LIMIT: i64 = 10;
pub const AGE_BAND_YEARS: i32 = 5;

/// Sit-up readings that actually carry information: present and non-zero.
/// A zero or missing reading must not suppress an average toward zero.
fn valid_sit_ups(records: &[ReferenceRecord]) -> Vec<i32> {
    records
        .iter()
        .filter_map(|r| r.sit_ups.filter(|&s| s > 0))
        .collect()
}

fn valid_broad_jumps(records: &[ReferenceRecord]) -> Vec<f64> {
    records
        .iter()
        .filter_map(|r| r.broad_jump_cm.filter(|&b| b > 0.0))
        .collect()
}

fn avg_rounded_i32(values: &[i32]) -> Option<i32> {
    if values.is_empty() {
        return None;
    }
    let sum: i64 = values.iter().map(|&v| v as i64).sum();
    Some((sum as f64 / values.len() as f64).round() as i32)
}

fn avg_rounded_f64(values: &[f64]) -> Option<i32> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    Some((sum / values.len() as f64).round() as i32)
}

/// Statistics of the target class plus targets from the next better
/// class. Each field independently falls back to its fixed default when
/// the backing subset has no valid readings, so an entirely empty store
/// yields exactly the documented fallback tuple.
pub async fn class_statistics(
    store: &dyn PopulationStore,
    target: FitnessClass,
) -> ClassStatistics {
    let next = target.next_better();
    let (class_records, next_records) = tokio::join!(
        store.records_by_class(target),
        store.records_by_class(next),
    );

    let (class_records, next_records) = match (class_records, next_records) {
        (Ok(class_records), Ok(next_records)) => (class_records, next_records),
        (class_result, next_result) => {
            let err = class_result.err().or(next_result.err());
            warn!(class = %target, error = ?err, "class statistics query failed, using defaults");
            return ClassStatistics::fallback(target);
        }
    };

    let class_sit_ups = valid_sit_ups(&class_records);
    let class_broad_jumps = valid_broad_jumps(&class_records);
    let next_sit_ups = valid_sit_ups(&next_records);
    let next_broad_jumps = valid_broad_jumps(&next_records);

    ClassStatistics {
        avg_sit_ups: avg_rounded_i32(&class_sit_ups).unwrap_or(stat_defaults::AVG_SIT_UPS),
        avg_broad_jump_cm: avg_rounded_f64(&class_broad_jumps)
            .unwrap_or(stat_defaults::AVG_BROAD_JUMP_CM),
        min_sit_ups: class_sit_ups
            .iter()
            .min()
            .copied()
            .unwrap_or(stat_defaults::MIN_SIT_UPS),
        min_broad_jump_cm: class_broad_jumps
            .iter()
            .fold(None, |min: Option<f64>, &b| {
                Some(min.map_or(b, |m| m.min(b)))
            })
            .map(|m| m.round() as i32)
            .unwrap_or(stat_defaults::MIN_BROAD_JUMP_CM),
        target_sit_ups: avg_rounded_i32(&next_sit_ups).unwrap_or(stat_defaults::TARGET_SIT_UPS),
        target_broad_jump_cm: avg_rounded_f64(&next_broad_jumps)
            .unwrap_or(stat_defaults::TARGET_BROAD_JUMP_CM),
        percentile: target.percentile(),
    }
}

/// Benchmark averages from a successful-profile subset. Per-metric
/// values are absent when the subset holds no valid readings for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceBenchmark {
    pub avg_sit_ups: Option<i32>,
    pub avg_broad_jump_cm: Option<i32>,
    pub sample_size: usize,
}

fn benchmark_from(records: &[ReferenceRecord]) -> PerformanceBenchmark {
    PerformanceBenchmark {
        avg_sit_ups: avg_rounded_i32(&valid_sit_ups(records)),
        avg_broad_jump_cm: avg_rounded_f64(&valid_broad_jumps(records)),
        sample_size: records.len(),
    }
}

/// Class A/B profiles anthropometrically comparable to the query
/// (age ±10, height ±15 cm, weight ±15 kg). `None` when the window is
/// empty or the store fails.
pub async fn successful_profile_statistics(
    store: &dyn PopulationStore,
    profile: &Profile,
) -> Option<PerformanceBenchmark> {
    let window = ProfileWindow::around(profile, 10, 15.0, 15.0);
    let records = match store
        .fetch_window(&window, Some(&SUCCESSFUL_CLASSES), SUCCESSFUL_FETCH_LIMIT)
        .await
    {
        Ok(records) => records,
        Err(err) => {
            warn!(error = %err, "successful profile query failed");
            return None;
        }
    };
    if records.is_empty() {
        return None;
    }
    Some(benchmark_from(&records))
}

/// Unwindowed class A/B sample, the benchmark of last resort for the
/// improvement blocks.
pub async fn general_successful_benchmark(
    store: &dyn PopulationStore,
) -> Option<PerformanceBenchmark> {
    let records = match store
        .fetch_window(
            &ProfileWindow::default(),
            Some(&SUCCESSFUL_CLASSES),
            GENERAL_BENCHMARK_LIMIT,
        )
        .await
    {
        Ok(records) => records,
        Err(err) => {
            warn!(error = %err, "general benchmark query failed");
            return None;
        }
    };
    if records.is_empty() {
        return None;
    }
    Some(benchmark_from(&records))
}

/// Average weight of successful profiles within ±5 cm of the query's
/// height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimalWeightStatistics {
    pub avg_weight_kg: i32,
    pub sample_size: usize,
}

pub async fn optimal_weight_statistics(
    store: &dyn PopulationStore,
    profile: &Profile,
) -> Option<OptimalWeightStatistics> {
    let window = ProfileWindow::height_band(profile.height_cm, HEIGHT_BAND_CM);
    let records = match store
        .fetch_window(&window, Some(&SUCCESSFUL_CLASSES), OPTIMAL_WEIGHT_LIMIT)
        .await
    {
        Ok(records) => records,
        Err(err) => {
            warn!(error = %err, "optimal weight query failed");
            return None;
        }
    };
    if records.is_empty() {
        return None;
    }
    let weights: Vec<f64> = records.iter().map(|r| r.weight_kg).collect();
    Some(OptimalWeightStatistics {
        avg_weight_kg: avg_rounded_f64(&weights)?,
        sample_size: records.len(),
    })
}

/// Performance standards among successful profiles within ±5 years of
/// the query's age. Metric averages fall back to the fixed defaults
/// when the band has records but no valid readings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgeGroupStatistics {
    pub avg_sit_ups: i32,
    pub avg_broad_jump_cm: i32,
    pub sample_size: usize,
}

pub async fn age_group_statistics(
    store: &dyn PopulationStore,
    age: i32,
) -> Option<AgeGroupStatistics> {
    let window = ProfileWindow::age_band(age, AGE_BAND_YEARS);
    let records = match store
        .fetch_window(&window, Some(&SUCCESSFUL_CLASSES), AGE_BAND_LIMIT)
        .await
    {
        Ok(records) => records,
        Err(err) => {
            warn!(error = %err, "age group query failed");
            return None;
        }
    };
    if records.is_empty() {
        return None;
    }
    Some(AgeGroupStatistics {
        avg_sit_ups: avg_rounded_i32(&valid_sit_ups(&records))
            .unwrap_or(stat_defaults::AVG_SIT_UPS),
        avg_broad_jump_cm: avg_rounded_f64(&valid_broad_jumps(&records))
            .unwrap_or(stat_defaults::AVG_BROAD_JUMP_CM),
        sample_size: records.len(),
    })
}
