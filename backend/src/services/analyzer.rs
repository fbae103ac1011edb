//! Per-category metric analysis
//!
//! One generic analyzer serves all five analyzed categories. What differs
//! between categories lives in a static configuration table: the field
//! set with per-field defaults, which fields get weekly averages (and
//! whether zero readings are excluded from them), and which field drives
//! the week-over-week trend. The recommendation and alert thresholds are
//! fixed cut points; inclusive/exclusive boundaries are load-bearing.

use crate::repositories::MetricSnapshot;
use vitalsync_shared::analytics::{mean, trend_percent};
use vitalsync_shared::types::{
    Alert, AlertLevel, CategoryTrend, MetricCategory, MetricFields, Priority, Recommendation,
};

/// One named field of a category, with the neutral value used when a
/// snapshot carries null for it
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub default: f64,
}

/// A field that gets a weekly average
///
/// `exclude_zero` drops zero/absent readings from the mean so gaps in the
/// data do not skew physiological averages toward zero. Count-like fields
/// (steps, calories) keep zeros: a sedentary day is real data.
#[derive(Debug, Clone, Copy)]
pub struct WeeklyField {
    pub name: &'static str,
    pub exclude_zero: bool,
    pub decimals: u32,
}

/// Static per-category analyzer configuration
#[derive(Debug, Clone, Copy)]
pub struct CategorySpec {
    pub category: MetricCategory,
    pub fields: &'static [FieldSpec],
    pub weekly: &'static [WeeklyField],
    pub trend_field: &'static str,
}

const ACTIVITY: CategorySpec = CategorySpec {
    category: MetricCategory::Activity,
    fields: &[
        FieldSpec { name: "steps", default: 0.0 },
        FieldSpec { name: "calories", default: 0.0 },
        FieldSpec { name: "exercise_minutes", default: 0.0 },
    ],
    weekly: &[
        WeeklyField { name: "steps", exclude_zero: false, decimals: 0 },
        WeeklyField { name: "calories", exclude_zero: false, decimals: 0 },
        WeeklyField { name: "exercise_minutes", exclude_zero: false, decimals: 0 },
    ],
    trend_field: "steps",
};

const HEART: CategorySpec = CategorySpec {
    category: MetricCategory::Heart,
    fields: &[
        FieldSpec { name: "current_heart_rate", default: 0.0 },
        FieldSpec { name: "resting_heart_rate", default: 0.0 },
        FieldSpec { name: "hrv", default: 0.0 },
    ],
    weekly: &[
        WeeklyField { name: "resting_heart_rate", exclude_zero: true, decimals: 1 },
        WeeklyField { name: "hrv", exclude_zero: true, decimals: 1 },
    ],
    trend_field: "resting_heart_rate",
};

const SLEEP: CategorySpec = CategorySpec {
    category: MetricCategory::Sleep,
    fields: &[
        FieldSpec { name: "sleep_hours", default: 0.0 },
        FieldSpec { name: "deep_sleep_hours", default: 0.0 },
        FieldSpec { name: "awakenings", default: 0.0 },
    ],
    weekly: &[
        WeeklyField { name: "sleep_hours", exclude_zero: true, decimals: 1 },
        WeeklyField { name: "deep_sleep_hours", exclude_zero: true, decimals: 1 },
    ],
    trend_field: "sleep_hours",
};

const BODY: CategorySpec = CategorySpec {
    category: MetricCategory::Body,
    fields: &[
        FieldSpec { name: "weight_kg", default: 0.0 },
        FieldSpec { name: "bmi", default: 0.0 },
        FieldSpec { name: "body_fat_percent", default: 0.0 },
    ],
    weekly: &[
        WeeklyField { name: "weight_kg", exclude_zero: true, decimals: 1 },
        WeeklyField { name: "bmi", exclude_zero: true, decimals: 1 },
    ],
    trend_field: "weight_kg",
};

const VITALS: CategorySpec = CategorySpec {
    category: MetricCategory::Vitals,
    fields: &[
        FieldSpec { name: "spo2", default: 0.0 },
        FieldSpec { name: "systolic", default: 0.0 },
        FieldSpec { name: "diastolic", default: 0.0 },
        FieldSpec { name: "temperature_c", default: 0.0 },
    ],
    weekly: &[
        WeeklyField { name: "spo2", exclude_zero: true, decimals: 1 },
        WeeklyField { name: "systolic", exclude_zero: true, decimals: 1 },
        WeeklyField { name: "diastolic", exclude_zero: true, decimals: 1 },
    ],
    trend_field: "spo2",
};

/// Analyzer configurations in processing order
pub const SPECS: [&CategorySpec; 5] = [&ACTIVITY, &HEART, &SLEEP, &BODY, &VITALS];

/// Look up the analyzer configuration for a category
///
/// Returns `None` for the history-only categories.
pub fn spec_for(category: MetricCategory) -> Option<&'static CategorySpec> {
    SPECS.iter().copied().find(|s| s.category == category)
}

/// Everything one analyzer derives from one category's 7-day window
#[derive(Debug, Clone)]
pub struct CategoryAnalysis {
    pub current: MetricFields,
    pub weekly_averages: MetricFields,
    pub trend: Option<CategoryTrend>,
    pub recommendations: Vec<Recommendation>,
    pub alerts: Vec<Alert>,
}

/// Analyze one category's window, most-recent-first
///
/// An empty window contributes nothing: no current values, no averages,
/// no trend, no findings. That is the normal new-user case, never an
/// error.
pub fn analyze(spec: &CategorySpec, window: &[MetricSnapshot]) -> Option<CategoryAnalysis> {
    let latest = window.first()?;

    let current: MetricFields = spec
        .fields
        .iter()
        .map(|field| {
            let value = latest.fields.get(field.name).copied().unwrap_or(field.default);
            (field.name.to_string(), value)
        })
        .collect();

    let weekly_averages = weekly_averages(spec, window);
    let trend = category_trend(spec, window);
    let (recommendations, alerts) = evaluate_rules(spec.category, &current);

    Some(CategoryAnalysis {
        current,
        weekly_averages,
        trend,
        recommendations,
        alerts,
    })
}

/// Weekly mean per configured field
fn weekly_averages(spec: &CategorySpec, window: &[MetricSnapshot]) -> MetricFields {
    let mut averages = MetricFields::new();
    for field in spec.weekly {
        let values: Vec<f64> = if field.exclude_zero {
            window
                .iter()
                .filter_map(|s| s.fields.get(field.name).copied())
                .filter(|v| *v != 0.0)
                .collect()
        } else {
            // Count-like fields: absent readings count as zero days
            window
                .iter()
                .map(|s| s.fields.get(field.name).copied().unwrap_or(0.0))
                .collect()
        };
        if let Some(avg) = mean(&values) {
            averages.insert(field.name.to_string(), round_to(avg, field.decimals));
        }
    }
    averages
}

/// Trend over the window's first-3 vs next-3 entries
///
/// The window is most-recent-first, so indices 0..3 are the "recent" half
/// and 3..6 the "older" half. Both halves must carry at least one reading
/// of the trend field, and the older average must be non-zero; otherwise
/// the trend is omitted, never reported as zero.
fn category_trend(spec: &CategorySpec, window: &[MetricSnapshot]) -> Option<CategoryTrend> {
    let field_values = |slice: &[MetricSnapshot]| -> Vec<f64> {
        slice
            .iter()
            .filter_map(|s| s.fields.get(spec.trend_field).copied())
            .collect()
    };

    let recent = field_values(&window[..window.len().min(3)]);
    let older = field_values(&window[window.len().min(3)..window.len().min(6)]);

    trend_percent(&recent, &older).map(|percent| CategoryTrend {
        field: spec.trend_field.to_string(),
        percent,
    })
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Fixed-threshold recommendations and alerts for one category
///
/// Thresholds operate on the defaulted current values; cut points are
/// exact and must not drift.
fn evaluate_rules(
    category: MetricCategory,
    current: &MetricFields,
) -> (Vec<Recommendation>, Vec<Alert>) {
    let mut recs = Vec::new();
    let mut alerts = Vec::new();
    let get = |name: &str| current.get(name).copied().unwrap_or(0.0);

    match category {
        MetricCategory::Activity => {
            let steps = get("steps");
            if steps < 5_000.0 {
                recs.push(Recommendation {
                    category,
                    priority: Priority::High,
                    title: "Increase daily movement".to_string(),
                    message: format!(
                        "You logged {steps:.0} steps today. Aim for at least 5,000 to keep your activity on track."
                    ),
                    actionable: Some(true),
                    suggestion: Some("Try a short walk after meals".to_string()),
                });
            } else if steps >= 10_000.0 {
                recs.push(Recommendation {
                    category,
                    priority: Priority::Positive,
                    title: "Excellent activity".to_string(),
                    message: format!("{steps:.0} steps today. Keep it up!"),
                    actionable: None,
                    suggestion: None,
                });
            }
        }
        MetricCategory::Heart => {
            let resting = get("resting_heart_rate");
            if resting > 100.0 {
                alerts.push(Alert {
                    level: AlertLevel::Warning,
                    category,
                    message: format!(
                        "Resting heart rate of {resting:.0} bpm is elevated. Consider consulting a physician if this persists."
                    ),
                });
            } else if (50.0..=70.0).contains(&resting) {
                recs.push(Recommendation {
                    category,
                    priority: Priority::Positive,
                    title: "Healthy resting heart rate".to_string(),
                    message: format!("{resting:.0} bpm is in the optimal range."),
                    actionable: None,
                    suggestion: None,
                });
            }
        }
        MetricCategory::Sleep => {
            let hours = get("sleep_hours");
            if hours < 6.0 {
                alerts.push(Alert {
                    level: AlertLevel::Warning,
                    category,
                    message: format!("Only {hours:.1} hours of sleep recorded. Chronic short sleep affects recovery."),
                });
                recs.push(Recommendation {
                    category,
                    priority: Priority::High,
                    title: "Prioritize sleep".to_string(),
                    message: "You are sleeping less than 6 hours. Target 7-9 hours per night.".to_string(),
                    actionable: Some(true),
                    suggestion: Some("Set a consistent bedtime and avoid screens an hour before".to_string()),
                });
            } else if (7.0..=9.0).contains(&hours) {
                recs.push(Recommendation {
                    category,
                    priority: Priority::Positive,
                    title: "Great sleep duration".to_string(),
                    message: format!("{hours:.1} hours is right in the recommended range."),
                    actionable: None,
                    suggestion: None,
                });
            }
        }
        MetricCategory::Body => {
            let bmi = get("bmi");
            if (18.5..25.0).contains(&bmi) {
                recs.push(Recommendation {
                    category,
                    priority: Priority::Positive,
                    title: "Healthy BMI".to_string(),
                    message: format!("Your BMI of {bmi:.1} is in the healthy range."),
                    actionable: None,
                    suggestion: None,
                });
            } else if bmi >= 25.0 {
                recs.push(Recommendation {
                    category,
                    priority: Priority::Medium,
                    title: "Weight management".to_string(),
                    message: format!(
                        "Your BMI of {bmi:.1} is above the healthy range. Small, sustained changes work best."
                    ),
                    actionable: Some(true),
                    suggestion: Some("Combine daily movement with portion awareness".to_string()),
                });
            }
        }
        MetricCategory::Vitals => {
            let spo2 = get("spo2");
            if spo2 > 0.0 && spo2 < 90.0 {
                alerts.push(Alert {
                    level: AlertLevel::Critical,
                    category,
                    message: format!("Blood oxygen at {spo2:.0}% is critically low. Seek medical attention."),
                });
            } else if spo2 >= 95.0 {
                recs.push(Recommendation {
                    category,
                    priority: Priority::Positive,
                    title: "Healthy blood oxygen".to_string(),
                    message: format!("SpO2 of {spo2:.0}% is normal."),
                    actionable: None,
                    suggestion: None,
                });
            }

            let systolic = get("systolic");
            let diastolic = get("diastolic");
            if systolic > 140.0 || diastolic > 90.0 {
                alerts.push(Alert {
                    level: AlertLevel::Warning,
                    category,
                    message: format!(
                        "Blood pressure {systolic:.0}/{diastolic:.0} is elevated. Monitor and consult a physician."
                    ),
                });
            }
        }
        // History-only categories carry no rules
        MetricCategory::Health | MetricCategory::HealthHistory => {}
    }

    (recs, alerts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use proptest::prelude::*;
    use rstest::rstest;
    use uuid::Uuid;

    /// Build a window most-recent-first, one snapshot per day
    fn window(fields_per_day: &[&[(&str, f64)]]) -> Vec<MetricSnapshot> {
        let now = Utc::now();
        fields_per_day
            .iter()
            .enumerate()
            .map(|(i, fields)| MetricSnapshot {
                id: Uuid::new_v4(),
                device: "test-device".to_string(),
                recorded_at: now - Duration::days(i as i64),
                fields: fields
                    .iter()
                    .map(|(name, value)| (name.to_string(), *value))
                    .collect(),
            })
            .collect()
    }

    #[test]
    fn test_empty_window_contributes_nothing() {
        for spec in SPECS {
            assert!(analyze(spec, &[]).is_none());
        }
    }

    #[test]
    fn test_current_values_from_latest_with_defaults() {
        let rows = window(&[
            &[("steps", 4_200.0)],             // latest, no calories reported
            &[("steps", 9_000.0), ("calories", 500.0)],
        ]);
        let analysis = analyze(&ACTIVITY, &rows).unwrap();
        assert_eq!(analysis.current.get("steps"), Some(&4_200.0));
        // Missing on the latest row: falls back to the field default
        assert_eq!(analysis.current.get("calories"), Some(&0.0));
    }

    #[test]
    fn test_weekly_average_spec_scenario() {
        let rows = window(&[
            &[("steps", 12_000.0)],
            &[("steps", 11_000.0)],
            &[("steps", 10_500.0)],
            &[("steps", 9_000.0)],
            &[("steps", 8_500.0)],
            &[("steps", 8_000.0)],
        ]);
        let analysis = analyze(&ACTIVITY, &rows).unwrap();
        assert_eq!(analysis.weekly_averages.get("steps"), Some(&9_833.0));

        let trend = analysis.trend.unwrap();
        assert_eq!(trend.field, "steps");
        assert!((trend.percent - 31.4).abs() < 0.05, "got {}", trend.percent);
    }

    #[test]
    fn test_weekly_average_excludes_zero_heart_readings() {
        let rows = window(&[
            &[("resting_heart_rate", 60.0)],
            &[("resting_heart_rate", 0.0)], // watch was off, not a reading
            &[("resting_heart_rate", 70.0)],
        ]);
        let analysis = analyze(&HEART, &rows).unwrap();
        assert_eq!(analysis.weekly_averages.get("resting_heart_rate"), Some(&65.0));
    }

    #[test]
    fn test_weekly_average_includes_zero_step_days() {
        let rows = window(&[&[("steps", 6_000.0)], &[("steps", 0.0)]]);
        let analysis = analyze(&ACTIVITY, &rows).unwrap();
        assert_eq!(analysis.weekly_averages.get("steps"), Some(&3_000.0));
    }

    #[test]
    fn test_trend_omitted_when_older_half_empty() {
        // Three entries: recent half full, older half empty
        let rows = window(&[
            &[("steps", 9_000.0)],
            &[("steps", 8_000.0)],
            &[("steps", 7_000.0)],
        ]);
        let analysis = analyze(&ACTIVITY, &rows).unwrap();
        assert!(analysis.trend.is_none());
    }

    #[test]
    fn test_trend_omitted_on_zero_older_average() {
        let rows = window(&[
            &[("steps", 9_000.0)],
            &[("steps", 8_000.0)],
            &[("steps", 7_000.0)],
            &[("steps", 0.0)],
            &[("steps", 0.0)],
        ]);
        let analysis = analyze(&ACTIVITY, &rows).unwrap();
        assert!(analysis.trend.is_none());
    }

    #[test]
    fn test_trend_present_with_partial_older_half() {
        // Four entries: older half has a single reading, which is enough
        let rows = window(&[
            &[("steps", 9_000.0)],
            &[("steps", 9_000.0)],
            &[("steps", 9_000.0)],
            &[("steps", 6_000.0)],
        ]);
        let analysis = analyze(&ACTIVITY, &rows).unwrap();
        assert_eq!(analysis.trend.unwrap().percent, 50.0);
    }

    #[rstest]
    #[case(4_999.0, Some(Priority::High))]
    #[case(5_000.0, None)]
    #[case(9_999.0, None)]
    #[case(10_000.0, Some(Priority::Positive))]
    fn test_step_recommendation_boundaries(
        #[case] steps: f64,
        #[case] expected: Option<Priority>,
    ) {
        let rows = window(&[&[("steps", steps)]]);
        let analysis = analyze(&ACTIVITY, &rows).unwrap();
        assert_eq!(analysis.recommendations.first().map(|r| r.priority), expected);
    }

    #[rstest]
    #[case(101.0, true, false)]
    #[case(100.0, false, false)]
    #[case(65.0, false, true)]
    #[case(50.0, false, true)]
    #[case(70.0, false, true)]
    #[case(71.0, false, false)]
    #[case(49.0, false, false)]
    fn test_resting_hr_boundaries(
        #[case] bpm: f64,
        #[case] expect_alert: bool,
        #[case] expect_positive: bool,
    ) {
        let rows = window(&[&[("resting_heart_rate", bpm)]]);
        let analysis = analyze(&HEART, &rows).unwrap();
        assert_eq!(!analysis.alerts.is_empty(), expect_alert);
        assert_eq!(
            analysis.recommendations.iter().any(|r| r.priority == Priority::Positive),
            expect_positive
        );
    }

    #[test]
    fn test_short_sleep_emits_alert_and_high_priority() {
        let rows = window(&[&[("sleep_hours", 5.5)]]);
        let analysis = analyze(&SLEEP, &rows).unwrap();
        assert_eq!(analysis.alerts.len(), 1);
        assert_eq!(analysis.alerts[0].level, AlertLevel::Warning);
        assert_eq!(analysis.recommendations.len(), 1);
        assert_eq!(analysis.recommendations[0].priority, Priority::High);
        assert!(analysis.recommendations[0].suggestion.is_some());
    }

    #[rstest]
    #[case(22.0, Some(Priority::Positive))]
    #[case(27.0, Some(Priority::Medium))]
    #[case(18.5, Some(Priority::Positive))]
    #[case(25.0, Some(Priority::Medium))]
    #[case(17.0, None)]
    fn test_bmi_boundaries(#[case] bmi: f64, #[case] expected: Option<Priority>) {
        let rows = window(&[&[("bmi", bmi)]]);
        let analysis = analyze(&BODY, &rows).unwrap();
        assert_eq!(analysis.recommendations.first().map(|r| r.priority), expected);
    }

    #[test]
    fn test_low_spo2_is_critical_never_positive() {
        let rows = window(&[&[("spo2", 88.0)]]);
        let analysis = analyze(&VITALS, &rows).unwrap();
        assert_eq!(analysis.alerts.len(), 1);
        assert_eq!(analysis.alerts[0].level, AlertLevel::Critical);
        assert!(analysis.recommendations.is_empty());
    }

    #[test]
    fn test_healthy_spo2_is_positive_never_alerted() {
        let rows = window(&[&[("spo2", 97.0)]]);
        let analysis = analyze(&VITALS, &rows).unwrap();
        assert!(analysis.alerts.is_empty());
        assert_eq!(analysis.recommendations.len(), 1);
        assert_eq!(analysis.recommendations[0].priority, Priority::Positive);
    }

    #[test]
    fn test_missing_spo2_does_not_alert() {
        // Defaulted zero must not read as "critically low oxygen"
        let rows = window(&[&[("systolic", 120.0), ("diastolic", 80.0)]]);
        let analysis = analyze(&VITALS, &rows).unwrap();
        assert!(analysis.alerts.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_analysis_output_always_finite(
            steps in proptest::collection::vec(0.0f64..100_000.0, 1..14),
        ) {
            let days: Vec<Vec<(&str, f64)>> =
                steps.iter().map(|s| vec![("steps", *s)]).collect();
            let slices: Vec<&[(&str, f64)]> = days.iter().map(Vec::as_slice).collect();
            let rows = window(&slices);

            let analysis = analyze(&ACTIVITY, &rows).unwrap();
            for value in analysis.current.values().chain(analysis.weekly_averages.values()) {
                prop_assert!(value.is_finite());
            }
            if let Some(trend) = analysis.trend {
                prop_assert!(trend.percent.is_finite());
            }
        }
    }

    #[rstest]
    #[case(141.0, 80.0, true)]
    #[case(140.0, 90.0, false)]
    #[case(120.0, 91.0, true)]
    #[case(120.0, 80.0, false)]
    fn test_blood_pressure_boundaries(
        #[case] systolic: f64,
        #[case] diastolic: f64,
        #[case] expect_alert: bool,
    ) {
        let rows = window(&[&[("systolic", systolic), ("diastolic", diastolic)]]);
        let analysis = analyze(&VITALS, &rows).unwrap();
        assert_eq!(
            analysis.alerts.iter().any(|a| a.level == AlertLevel::Warning),
            expect_alert
        );
    }
}
