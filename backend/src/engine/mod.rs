//! Prediction engine
//!
//! The data-driven core: similarity ranking, class voting, population
//! statistics, and recommendation composition. Every component takes a
//! `&dyn PopulationStore`, so the whole engine runs unmodified against
//! the in-memory fixture pool used in tests.

pub mod predictor;
pub mod recommendation;
pub mod similarity;
pub mod statistics;
