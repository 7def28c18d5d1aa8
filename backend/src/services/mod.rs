//! Business logic services
//!
//! Services orchestrate the engine, the stores, and the wire types.
//! They take store trait objects so the full flows run against fixture
//! pools in tests.

pub mod dataset;
pub mod prediction;

pub use dataset::DatasetService;
pub use prediction::PredictionService;
