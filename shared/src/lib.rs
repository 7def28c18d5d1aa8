//! Fitscore Shared Library
//!
//! This crate contains the pure domain layer shared by the backend and
//! its tests: fitness calculators, domain model types, API types, and
//! input validation. It has no database or HTTP dependencies.

pub mod models;
pub mod scoring;
pub mod types;
pub mod validation;

// Re-export commonly used items
pub use models::{
    ClassStatistics, FitnessClass, Profile, RecommendationBlock, ReferenceRecord,
};
pub use scoring::{age_group, base_fitness_score, bmi, ideal_weight_range, BmiCategory};
pub use types::*;
