//! VitalSync Shared Library
//!
//! This crate contains the types and pure calculations shared between the
//! backend service and its tests: API request/response shapes and the
//! insight analytics math (trends, scoring, streaks).

pub mod analytics;
pub mod types;

// Re-export commonly used items
pub use analytics::*;
pub use types::*;
