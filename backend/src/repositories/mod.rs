//! Database repositories
//!
//! Provides data access layer for database operations.

pub mod metrics;

pub use metrics::{CreateMetricSnapshot, MetricSnapshot, MetricsRepository};
