//! Core domain model
//!
//! Types shared between the scoring engine, the store layer, and the API
//! surface: the query profile, the reference population record, the
//! ordinal fitness class, and the derived statistics/recommendation
//! structures.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Ordinal fitness tier, `A` (best) through `D` (worst).
///
/// Derived either from the deterministic score formula or from a
/// nearest-neighbor vote over the reference population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FitnessClass {
    A,
    B,
    C,
    D,
}

impl FitnessClass {
    /// All classes, best first. Also the deterministic tie-break order
    /// for the neighbor vote.
    pub const ALL: [FitnessClass; 4] = [
        FitnessClass::A,
        FitnessClass::B,
        FitnessClass::C,
        FitnessClass::D,
    ];

    /// The next better class. `A` has no better class and maps to itself,
    /// so class-A statistics double as their own target.
    pub fn next_better(self) -> FitnessClass {
        match self {
            FitnessClass::A => FitnessClass::A,
            FitnessClass::B => FitnessClass::A,
            FitnessClass::C => FitnessClass::B,
            FitnessClass::D => FitnessClass::C,
        }
    }

    /// Inclusive fitness-score range covered by this class.
    pub fn score_range(self) -> (i32, i32) {
        match self {
            FitnessClass::A => (85, 100),
            FitnessClass::B => (70, 84),
            FitnessClass::C => (55, 69),
            FitnessClass::D => (0, 54),
        }
    }

    /// Midpoint of the class score range, rounded to nearest integer.
    ///
    /// Once a class has been chosen the persisted score reflects the
    /// class rather than the raw formula: A=93, B=77, C=62, D=27.
    pub fn midpoint_score(self) -> i32 {
        let (min, max) = self.score_range();
        ((min + max) as f64 / 2.0).round() as i32
    }

    /// Fixed population percentile associated with this class.
    pub fn percentile(self) -> u8 {
        match self {
            FitnessClass::A => 95,
            FitnessClass::B => 75,
            FitnessClass::C => 50,
            FitnessClass::D => 25,
        }
    }

    /// Classify a fitness score into a class.
    pub fn from_score(score: i32) -> FitnessClass {
        if score >= 85 {
            FitnessClass::A
        } else if score >= 70 {
            FitnessClass::B
        } else if score >= 55 {
            FitnessClass::C
        } else {
            FitnessClass::D
        }
    }

    /// Human-readable interpretation of the class.
    pub fn interpretation(self) -> &'static str {
        match self {
            FitnessClass::A => "Excellent - outstanding physical condition",
            FitnessClass::B => "Good - solid physical condition",
            FitnessClass::C => "Fair - adequate physical condition",
            FitnessClass::D => "Poor - physical condition needs improvement",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FitnessClass::A => "A",
            FitnessClass::B => "B",
            FitnessClass::C => "C",
            FitnessClass::D => "D",
        }
    }
}

impl fmt::Display for FitnessClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown class label.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown fitness class: {0}")]
pub struct ParseClassError(pub String);

impl FromStr for FitnessClass {
    type Err = ParseClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(FitnessClass::A),
            "B" | "b" => Ok(FitnessClass::B),
            "C" | "c" => Ok(FitnessClass::C),
            "D" | "d" => Ok(FitnessClass::D),
            other => Err(ParseClassError(other.to_string())),
        }
    }
}

/// Query profile for one prediction request.
///
/// Immutable once received; exists only for the duration of the request.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: Option<String>,
    pub age: i32,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub sit_ups: i32,
    pub broad_jump_cm: f64,
}

/// One member of the reference population.
///
/// Bulk-loaded via CSV ingestion and read-only from the engine's
/// perspective. Performance readings may be absent in the source data.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRecord {
    pub id: i64,
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

/// Fallback constants used when a reference subset is empty.
pub mod stat_defaults {
    pub const AVG_SIT_UPS: i32 = 30;
    pub const AVG_BROAD_JUMP_CM: i32 = 200;
    pub const TARGET_SIT_UPS: i32 = 40;
    pub const TARGET_BROAD_JUMP_CM: i32 = 220;
    pub const MIN_SIT_UPS: i32 = 20;
    pub const MIN_BROAD_JUMP_CM: i32 = 180;
}

/// Class-conditional descriptive statistics.
///
/// Computed fresh per request from the current population snapshot;
/// never cached. Target fields describe the next better class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassStatistics {
    pub avg_sit_ups: i32,
    pub avg_broad_jump_cm: i32,
    pub min_sit_ups: i32,
    pub min_broad_jump_cm: i32,
    pub target_sit_ups: i32,
    pub target_broad_jump_cm: i32,
    pub percentile: u8,
}

impl ClassStatistics {
    /// The documented fallback tuple for an empty reference subset.
    pub fn fallback(class: FitnessClass) -> Self {
        Self {
            avg_sit_ups: stat_defaults::AVG_SIT_UPS,
            avg_broad_jump_cm: stat_defaults::AVG_BROAD_JUMP_CM,
            min_sit_ups: stat_defaults::MIN_SIT_UPS,
            min_broad_jump_cm: stat_defaults::MIN_BROAD_JUMP_CM,
            target_sit_ups: stat_defaults::TARGET_SIT_UPS,
            target_broad_jump_cm: stat_defaults::TARGET_BROAD_JUMP_CM,
            percentile: class.percentile(),
        }
    }
}

/// One block of the composed recommendation list.
///
/// Purely derived; embedded as serialized JSON in the persisted
/// prediction record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationBlock {
    pub title: String,
    pub message: String,
    pub tips: Vec<String>,
}

impl RecommendationBlock {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        tips: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            tips,
        }
    }
}
