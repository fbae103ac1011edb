//! API request and response types

use crate::analytics::{DataAvailability, WeightScheme};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Named numeric fields of one snapshot or aggregate
pub type MetricFields = BTreeMap<String, f64>;

// ============================================================================
// Metric Categories
// ============================================================================

/// Telemetry category pushed by client devices
///
/// Declaration order is the fixed processing order for insight synthesis,
/// which keeps recommendation and alert lists deterministic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    Activity,
    Heart,
    Sleep,
    Body,
    Vitals,
    /// Stored for history, excluded from analysis
    Health,
    /// Stored for history, excluded from analysis
    HealthHistory,
}

impl MetricCategory {
    /// Categories the insights engine analyzes, in processing order
    pub const ANALYZED: [MetricCategory; 5] = [
        MetricCategory::Activity,
        MetricCategory::Heart,
        MetricCategory::Sleep,
        MetricCategory::Body,
        MetricCategory::Vitals,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricCategory::Activity => "activity",
            MetricCategory::Heart => "heart",
            MetricCategory::Sleep => "sleep",
            MetricCategory::Body => "body",
            MetricCategory::Vitals => "vitals",
            MetricCategory::Health => "health",
            MetricCategory::HealthHistory => "health_history",
        }
    }

    pub fn is_analyzed(&self) -> bool {
        Self::ANALYZED.contains(self)
    }
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activity" => Ok(MetricCategory::Activity),
            "heart" => Ok(MetricCategory::Heart),
            "sleep" => Ok(MetricCategory::Sleep),
            "body" => Ok(MetricCategory::Body),
            "vitals" => Ok(MetricCategory::Vitals),
            "health" => Ok(MetricCategory::Health),
            "health_history" => Ok(MetricCategory::HealthHistory),
            other => Err(format!("unknown metric category: {other}")),
        }
    }
}

// ============================================================================
// Recommendations and Alerts
// ============================================================================

/// Recommendation priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Positive,
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Critical,
}

/// A rule-produced recommendation, built fresh per request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: MetricCategory,
    pub priority: Priority,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actionable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A rule-produced alert, built fresh per request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub level: AlertLevel,
    pub category: MetricCategory,
    pub message: String,
}

// ============================================================================
// Insight Response
// ============================================================================

/// Week-over-week trend for one category's headline field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTrend {
    pub field: String,
    pub percent: f64,
}

/// Composite health score plus how much data backed it
///
/// A score of 0 with `no_data` availability is "nothing recorded", not
/// "worst possible health"; the two are never conflated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthScoreInfo {
    pub score: u8,
    pub availability: DataAvailability,
    pub scheme: WeightScheme,
}

/// Aggregates over the 7-day activity and sleep windows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub total_steps: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_sleep_hours: Option<f64>,
    /// Days whose total exercise minutes exceed 30
    pub active_days: u32,
}

/// Streaks, bests, and debts derived from the fetched windows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Highlights {
    pub step_streak_days: u32,
    pub step_consistency: f64,
    pub sleep_debt_hours: f64,
    pub personal_bests: BTreeMap<MetricCategory, MetricFields>,
}

/// The full derived insight bundle for one user
///
/// Pure function of the fetched windows plus wall-clock time; constructed
/// fresh per request and never cached. Categories without data are absent
/// from every map rather than zero-filled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthInsights {
    pub greeting: String,
    pub current_metrics: BTreeMap<MetricCategory, MetricFields>,
    pub weekly_averages: BTreeMap<MetricCategory, MetricFields>,
    pub trends: BTreeMap<MetricCategory, CategoryTrend>,
    pub health_score: HealthScoreInfo,
    pub recommendations: Vec<Recommendation>,
    pub alerts: Vec<Alert>,
    pub weekly_summary: WeeklySummary,
    pub highlights: Highlights,
}

/// Envelope for the insights endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsResponse {
    pub success: bool,
    pub insights: HealthInsights,
}

// ============================================================================
// Daily Trend Types
// ============================================================================

/// Per-field averages for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAveragePoint {
    pub day: NaiveDate,
    pub fields: MetricFields,
}

/// Day-bucketed averages for one category, ascending by day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyTrendResponse {
    pub success: bool,
    pub category: MetricCategory,
    pub days: Vec<DailyAveragePoint>,
}

// ============================================================================
// Ingestion Types
// ============================================================================

/// Snapshot push request body
///
/// Fields may carry explicit nulls; null values are stored as-is and
/// resolved against per-field defaults at analysis time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogMetricRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
    pub fields: BTreeMap<String, Option<f64>>,
}

/// Stored snapshot, as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSnapshotResponse {
    pub id: String,
    pub category: MetricCategory,
    pub device: String,
    pub recorded_at: DateTime<Utc>,
    pub fields: MetricFields,
}

/// Query parameters for snapshot history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricHistoryQuery {
    /// Lookback window in days (default 30, max 365)
    #[serde(default)]
    pub days: Option<i64>,
}

impl MetricHistoryQuery {
    pub fn days_clamped(&self) -> i64 {
        self.days.unwrap_or(30).clamp(1, 365)
    }
}

/// Snapshot history response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricHistoryResponse {
    pub success: bool,
    pub category: MetricCategory,
    pub items: Vec<MetricSnapshotResponse>,
    pub count: usize,
}
