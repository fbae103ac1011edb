//! Metric snapshot repository for database operations
//!
//! Snapshots are append-only: devices push them, the insights engine reads
//! them back in recency windows. Per-category numeric fields live in a
//! JSONB column so one repository serves every category; explicit nulls
//! are preserved in storage and resolved against per-field defaults at
//! analysis time.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::PgPool;
use std::collections::BTreeMap;
use uuid::Uuid;
use vitalsync_shared::types::{DailyAveragePoint, MetricCategory, MetricFields};

/// Metric snapshot row from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MetricSnapshotRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub device: String,
    pub recorded_at: DateTime<Utc>,
    pub fields: Value,
}

/// In-memory snapshot view used by the analyzers
///
/// Null and non-numeric field values are dropped here; an absent key means
/// "not reported", and the analyzer's field defaults fill the gap.
#[derive(Debug, Clone)]
pub struct MetricSnapshot {
    pub id: Uuid,
    pub device: String,
    pub recorded_at: DateTime<Utc>,
    pub fields: MetricFields,
}

impl From<MetricSnapshotRecord> for MetricSnapshot {
    fn from(record: MetricSnapshotRecord) -> Self {
        Self {
            id: record.id,
            device: record.device,
            recorded_at: record.recorded_at,
            fields: numeric_fields(&record.fields),
        }
    }
}

/// Input for storing a snapshot
#[derive(Debug, Clone)]
pub struct CreateMetricSnapshot {
    pub user_id: Uuid,
    pub category: MetricCategory,
    pub device: String,
    pub recorded_at: DateTime<Utc>,
    pub fields: BTreeMap<String, Option<f64>>,
}

/// Metric snapshot repository
pub struct MetricsRepository;

impl MetricsRepository {
    /// Store a new snapshot
    pub async fn create(pool: &PgPool, input: CreateMetricSnapshot) -> Result<MetricSnapshot> {
        let fields = Value::Object(
            input
                .fields
                .into_iter()
                .map(|(name, value)| {
                    let json = value
                        .and_then(serde_json::Number::from_f64)
                        .map(Value::Number)
                        .unwrap_or(Value::Null);
                    (name, json)
                })
                .collect::<Map<String, Value>>(),
        );

        let record = sqlx::query_as::<_, MetricSnapshotRecord>(
            r#"
            INSERT INTO metric_snapshots (user_id, category, device, recorded_at, fields)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, category, device, recorded_at, fields
            "#,
        )
        .bind(input.user_id)
        .bind(input.category.as_str())
        .bind(&input.device)
        .bind(input.recorded_at)
        .bind(fields)
        .fetch_one(pool)
        .await?;

        Ok(record.into())
    }

    /// Fetch a user's snapshots for one category within a recency window,
    /// most recent first
    ///
    /// An empty result is the normal new-user case, not a fault.
    pub async fn fetch_window(
        pool: &PgPool,
        user_id: Uuid,
        category: MetricCategory,
        since: DateTime<Utc>,
    ) -> Result<Vec<MetricSnapshot>> {
        let records = sqlx::query_as::<_, MetricSnapshotRecord>(
            r#"
            SELECT id, user_id, category, device, recorded_at, fields
            FROM metric_snapshots
            WHERE user_id = $1 AND category = $2 AND recorded_at >= $3
            ORDER BY recorded_at DESC
            "#,
        )
        .bind(user_id)
        .bind(category.as_str())
        .bind(since)
        .fetch_all(pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Fetch per-field averages grouped by calendar day, ascending
    pub async fn fetch_daily_averages(
        pool: &PgPool,
        user_id: Uuid,
        category: MetricCategory,
    ) -> Result<Vec<DailyAveragePoint>> {
        let records = sqlx::query_as::<_, MetricSnapshotRecord>(
            r#"
            SELECT id, user_id, category, device, recorded_at, fields
            FROM metric_snapshots
            WHERE user_id = $1 AND category = $2
            ORDER BY recorded_at ASC
            "#,
        )
        .bind(user_id)
        .bind(category.as_str())
        .fetch_all(pool)
        .await?;

        let snapshots: Vec<MetricSnapshot> = records.into_iter().map(Into::into).collect();
        Ok(bucket_daily_averages(&snapshots))
    }
}

/// Extract the numeric fields of a JSONB object, dropping nulls and
/// anything non-numeric
fn numeric_fields(value: &Value) -> MetricFields {
    value
        .as_object()
        .map(|object| {
            object
                .iter()
                .filter_map(|(name, v)| v.as_f64().map(|n| (name.clone(), n)))
                .collect()
        })
        .unwrap_or_default()
}

/// Group snapshots by calendar day and average each field per day
///
/// Input must be ordered ascending by `recorded_at`; output days ascend.
/// A field only contributes to a day's average on the rows where it is
/// actually present.
pub fn bucket_daily_averages(snapshots: &[MetricSnapshot]) -> Vec<DailyAveragePoint> {
    let mut days: Vec<(chrono::NaiveDate, BTreeMap<String, (f64, u32)>)> = Vec::new();

    for snapshot in snapshots {
        let day = snapshot.recorded_at.date_naive();
        match days.last_mut() {
            Some((last_day, sums)) if *last_day == day => {
                accumulate(sums, &snapshot.fields);
            }
            _ => {
                let mut sums = BTreeMap::new();
                accumulate(&mut sums, &snapshot.fields);
                days.push((day, sums));
            }
        }
    }

    days.into_iter()
        .map(|(day, sums)| DailyAveragePoint {
            day,
            fields: sums
                .into_iter()
                .map(|(name, (sum, count))| (name, sum / f64::from(count)))
                .collect(),
        })
        .collect()
}

fn accumulate(sums: &mut BTreeMap<String, (f64, u32)>, fields: &MetricFields) {
    for (name, value) in fields {
        let entry = sums.entry(name.clone()).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(recorded_at: DateTime<Utc>, fields: &[(&str, f64)]) -> MetricSnapshot {
        MetricSnapshot {
            id: Uuid::new_v4(),
            device: "test-device".to_string(),
            recorded_at,
            fields: fields
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_numeric_fields_drops_nulls_and_strings() {
        let value = serde_json::json!({
            "steps": 8000,
            "calories": null,
            "device_note": "charging",
        });
        let fields = numeric_fields(&value);
        assert_eq!(fields.get("steps"), Some(&8000.0));
        assert!(!fields.contains_key("calories"));
        assert!(!fields.contains_key("device_note"));
    }

    #[test]
    fn test_bucket_same_day_averages_per_field() {
        let rows = vec![
            snapshot(at(2026, 3, 1, 8), &[("steps", 2_000.0)]),
            snapshot(at(2026, 3, 1, 20), &[("steps", 6_000.0), ("calories", 300.0)]),
            snapshot(at(2026, 3, 2, 9), &[("steps", 9_000.0)]),
        ];
        let buckets = bucket_daily_averages(&rows);

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].day, at(2026, 3, 1, 0).date_naive());
        assert_eq!(buckets[0].fields.get("steps"), Some(&4_000.0));
        // calories present on one row only; averaged over that row alone
        assert_eq!(buckets[0].fields.get("calories"), Some(&300.0));
        assert_eq!(buckets[1].fields.get("steps"), Some(&9_000.0));
    }

    #[test]
    fn test_bucket_days_ascend() {
        let rows = vec![
            snapshot(at(2026, 3, 1, 8), &[("steps", 1.0)]),
            snapshot(at(2026, 3, 3, 8), &[("steps", 2.0)]),
            snapshot(at(2026, 3, 5, 8), &[("steps", 3.0)]),
        ];
        let buckets = bucket_daily_averages(&rows);
        let days: Vec<_> = buckets.iter().map(|b| b.day).collect();
        let mut sorted = days.clone();
        sorted.sort();
        assert_eq!(days, sorted);
    }

    #[test]
    fn test_bucket_empty_input() {
        assert!(bucket_daily_averages(&[]).is_empty());
    }
}
