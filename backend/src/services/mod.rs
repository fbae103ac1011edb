//! Business logic services
//!
//! Services encapsulate the insight derivation logic and coordinate
//! between repositories and the pure analytics in the shared crate.

pub mod analyzer;
pub mod insights;
pub mod metrics;

pub use insights::InsightsService;
pub use metrics::MetricsService;
