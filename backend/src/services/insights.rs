//! Insight synthesis service
//!
//! Orchestrates one insight request end to end: fans out window fetches
//! for the five analyzed categories (all drawing on the shared bounded
//! pool), runs the per-category analyzers in fixed order, feeds their
//! output to the composite scorer and the cross-cutting calculators, and
//! assembles the response. The whole fetch+compute path runs under a
//! request-level timeout; on expiry the in-flight futures are dropped,
//! which releases any held connections, and a single timeout error is
//! returned.
//!
//! Missing data never fails a request here. A user with no snapshots gets
//! a sparse response with a zero score flagged as no-data.

use crate::config::InsightsConfig;
use crate::error::ApiError;
use crate::repositories::metrics::bucket_daily_averages;
use crate::repositories::{MetricSnapshot, MetricsRepository};
use crate::services::analyzer::{self, CategoryAnalysis};
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::time::Duration as StdDuration;
use tracing::debug;
use uuid::Uuid;
use vitalsync_shared::analytics::{
    composite_score, consistency_score, personal_best, resting_hr_subscore, round1,
    sleep_debt_hours, sleep_subscore, spo2_subscore, steps_subscore, ScoreInputs,
};
use vitalsync_shared::types::{
    DailyAveragePoint, HealthInsights, HealthScoreInfo, Highlights, MetricCategory, MetricFields,
    WeeklySummary,
};

/// Insight synthesis service
pub struct InsightsService;

/// Both windows for one category
struct CategoryWindows {
    week: Vec<MetricSnapshot>,
    month: Vec<MetricSnapshot>,
}

impl InsightsService {
    /// Derive the full insight bundle for a user
    ///
    /// Bounded by `config.request_timeout_secs`; a slow storage layer
    /// surfaces as a single timeout error, never a partial result.
    pub async fn get_insights(
        db: &PgPool,
        config: &InsightsConfig,
        user_id: Uuid,
    ) -> Result<HealthInsights, ApiError> {
        let budget = StdDuration::from_secs(config.request_timeout_secs);
        match tokio::time::timeout(budget, Self::synthesize(db, config, user_id)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout),
        }
    }

    async fn synthesize(
        db: &PgPool,
        config: &InsightsConfig,
        user_id: Uuid,
    ) -> Result<HealthInsights, ApiError> {
        let now = Utc::now();
        let week_since = now - Duration::days(config.short_window_days);
        let month_since = now - Duration::days(config.long_window_days);

        // Fan out: the five categories are independent, so their window
        // fetches run concurrently against the shared pool.
        let [activity, heart, sleep, body, vitals] = {
            let (activity, heart, sleep, body, vitals) = tokio::try_join!(
                fetch_windows(db, user_id, MetricCategory::Activity, week_since, month_since),
                fetch_windows(db, user_id, MetricCategory::Heart, week_since, month_since),
                fetch_windows(db, user_id, MetricCategory::Sleep, week_since, month_since),
                fetch_windows(db, user_id, MetricCategory::Body, week_since, month_since),
                fetch_windows(db, user_id, MetricCategory::Vitals, week_since, month_since),
            )
            .map_err(ApiError::Internal)?;
            [activity, heart, sleep, body, vitals]
        };

        let windows: [(MetricCategory, &CategoryWindows); 5] = [
            (MetricCategory::Activity, &activity),
            (MetricCategory::Heart, &heart),
            (MetricCategory::Sleep, &sleep),
            (MetricCategory::Body, &body),
            (MetricCategory::Vitals, &vitals),
        ];

        let mut current_metrics = BTreeMap::new();
        let mut weekly_averages = BTreeMap::new();
        let mut trends = BTreeMap::new();
        let mut recommendations = Vec::new();
        let mut alerts = Vec::new();
        let mut analyses: BTreeMap<MetricCategory, CategoryAnalysis> = BTreeMap::new();

        // Fixed category order keeps recommendation/alert lists stable
        for &(category, category_windows) in &windows {
            let Some(spec) = analyzer::spec_for(category) else {
                continue;
            };
            let Some(analysis) = analyzer::analyze(spec, &category_windows.week) else {
                debug!(%user_id, %category, "no snapshots in window, skipping category");
                continue;
            };
            current_metrics.insert(category, analysis.current.clone());
            if !analysis.weekly_averages.is_empty() {
                weekly_averages.insert(category, analysis.weekly_averages.clone());
            }
            if let Some(trend) = analysis.trend.clone() {
                trends.insert(category, trend);
            }
            recommendations.extend(analysis.recommendations.clone());
            alerts.extend(analysis.alerts.clone());
            analyses.insert(category, analysis);
        }

        let week_step_values = field_values(&activity.week, "steps");
        let health_score = Self::score(config, &analyses, &week_step_values);
        let weekly_summary = Self::weekly_summary(&activity.week, &analyses);
        let highlights = Self::highlights(config, &windows, &activity, &sleep, &week_step_values);

        Ok(HealthInsights {
            greeting: greeting_for_hour(now.hour()),
            current_metrics,
            weekly_averages,
            trends,
            health_score,
            recommendations,
            alerts,
            weekly_summary,
            highlights,
        })
    }

    /// Composite score from the latest per-category readings
    fn score(
        config: &InsightsConfig,
        analyses: &BTreeMap<MetricCategory, CategoryAnalysis>,
        week_step_values: &[f64],
    ) -> HealthScoreInfo {
        let current = |category: MetricCategory, field: &str| -> Option<f64> {
            analyses
                .get(&category)
                .and_then(|a| a.current.get(field))
                .copied()
        };

        let inputs = ScoreInputs {
            steps: current(MetricCategory::Activity, "steps").map(steps_subscore),
            heart: current(MetricCategory::Heart, "resting_heart_rate").map(resting_hr_subscore),
            sleep: current(MetricCategory::Sleep, "sleep_hours").map(sleep_subscore),
            oxygen: current(MetricCategory::Vitals, "spo2").map(spo2_subscore),
            consistency: analyses
                .contains_key(&MetricCategory::Activity)
                .then(|| consistency_score(week_step_values)),
        };

        let scheme = config.weight_scheme;
        let composite = composite_score(&inputs, &scheme.weights());

        HealthScoreInfo {
            score: composite.score,
            availability: composite.availability,
            scheme,
        }
    }

    /// Totals over the 7-day windows: steps, sleep, active days
    fn weekly_summary(
        week_activity: &[MetricSnapshot],
        analyses: &BTreeMap<MetricCategory, CategoryAnalysis>,
    ) -> WeeklySummary {
        let total_steps: f64 = field_values(week_activity, "steps").iter().sum();

        let avg_sleep_hours = analyses
            .get(&MetricCategory::Sleep)
            .and_then(|a| a.weekly_averages.get("sleep_hours"))
            .copied();

        // Same-day sessions add up toward the 30-minute bar
        let mut daily_minutes: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for snapshot in week_activity {
            if let Some(minutes) = snapshot.fields.get("exercise_minutes") {
                *daily_minutes
                    .entry(snapshot.recorded_at.date_naive())
                    .or_insert(0.0) += minutes;
            }
        }
        let active_days = daily_minutes.values().filter(|&&m| m > 30.0).count() as u32;

        WeeklySummary {
            total_steps,
            avg_sleep_hours,
            active_days,
        }
    }

    /// Streaks, personal bests, sleep debt, step consistency
    fn highlights(
        config: &InsightsConfig,
        windows: &[(MetricCategory, &CategoryWindows); 5],
        activity: &CategoryWindows,
        sleep: &CategoryWindows,
        week_step_values: &[f64],
    ) -> Highlights {
        let step_streak_days = step_streak(&daily_points_desc(&activity.month), config.step_goal);

        // Bests span the full fetched window, per headline field
        let mut personal_bests = BTreeMap::new();
        for &(category, category_windows) in windows {
            let Some(spec) = analyzer::spec_for(category) else {
                continue;
            };
            let mut bests = MetricFields::new();
            for field in spec.weekly {
                let values = field_values(&category_windows.month, field.name);
                if let Some(best) = personal_best(&values) {
                    bests.insert(field.name.to_string(), best);
                }
            }
            if !bests.is_empty() {
                personal_bests.insert(category, bests);
            }
        }

        let nightly_hours: Vec<f64> = daily_points_desc(&sleep.week)
            .iter()
            .filter_map(|point| point.fields.get("sleep_hours").copied())
            .collect();

        Highlights {
            step_streak_days,
            step_consistency: round1(consistency_score(week_step_values)),
            sleep_debt_hours: round1(sleep_debt_hours(&nightly_hours, config.sleep_target_hours)),
            personal_bests,
        }
    }
}

async fn fetch_windows(
    db: &PgPool,
    user_id: Uuid,
    category: MetricCategory,
    week_since: DateTime<Utc>,
    month_since: DateTime<Utc>,
) -> anyhow::Result<CategoryWindows> {
    let (week, month) = tokio::try_join!(
        MetricsRepository::fetch_window(db, user_id, category, week_since),
        MetricsRepository::fetch_window(db, user_id, category, month_since),
    )?;
    Ok(CategoryWindows { week, month })
}

/// All present readings of one field across a window
fn field_values(window: &[MetricSnapshot], field: &str) -> Vec<f64> {
    window
        .iter()
        .filter_map(|s| s.fields.get(field).copied())
        .collect()
}

/// Day-bucket a most-recent-first window, returning days most-recent-first
fn daily_points_desc(window: &[MetricSnapshot]) -> Vec<DailyAveragePoint> {
    let ascending: Vec<MetricSnapshot> = window.iter().rev().cloned().collect();
    let mut points = bucket_daily_averages(&ascending);
    points.reverse();
    points
}

/// Consecutive most-recent days at or above the step goal
///
/// Input days are most-recent-first. A missed goal ends the streak, and so
/// does a calendar gap: a day with no data at all does not silently
/// continue a streak.
fn step_streak(days_desc: &[DailyAveragePoint], goal: f64) -> u32 {
    let mut streak = 0;
    let mut expected_day = None;

    for point in days_desc {
        if let Some(expected) = expected_day {
            if point.day != expected {
                break;
            }
        }
        let steps = point.fields.get("steps").copied().unwrap_or(0.0);
        if steps < goal {
            break;
        }
        streak += 1;
        expected_day = Some(point.day - Duration::days(1));
    }

    streak
}

/// Greeting text from the wall-clock hour
fn greeting_for_hour(hour: u32) -> String {
    let text = if hour < 12 {
        "Good morning"
    } else if hour < 18 {
        "Good afternoon"
    } else {
        "Good evening"
    };
    text.to_string()
}
