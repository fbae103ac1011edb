//! Insight analytics calculations module
//!
//! Provides the derived-metric math behind the insights endpoint: weekly
//! averages, week-over-week trends, consistency/streak statistics, and the
//! composite health score.
//!
//! # Design Principles
//!
//! 1. **Pure Functions**: All calculations are pure, no side effects
//! 2. **Guarded Arithmetic**: Division-by-zero and NaN are converted to
//!    `None`/0, never surfaced to callers
//! 3. **Configurable**: Score weighting is a value, not a constant
//! 4. **Type Safety**: Strong typing prevents mixing sub-scores and raw values

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Descriptive Statistics
// ============================================================================

/// Arithmetic mean of a sequence
///
/// Returns `None` for an empty slice rather than NaN.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation
///
/// Returns `None` when fewer than 2 samples are available.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ============================================================================
// Trend Calculation
// ============================================================================

/// Percentage change between a recent and an older sub-window
///
/// Formula: (mean(recent) − mean(older)) / mean(older) × 100, rounded to
/// one decimal. Returns `None` when either slice is empty or the older
/// average is zero; a trend is omitted, never fabricated as 0 or NaN.
pub fn trend_percent(recent: &[f64], older: &[f64]) -> Option<f64> {
    let recent_avg = mean(recent)?;
    let older_avg = mean(older)?;
    if older_avg == 0.0 {
        return None;
    }
    let pct = (recent_avg - older_avg) / older_avg * 100.0;
    if !pct.is_finite() {
        return None;
    }
    Some(round1(pct))
}

// ============================================================================
// Consistency, Bests, Sleep Debt
// ============================================================================

/// Consistency score over a numeric sequence
///
/// Formula: 100 × max(0, 1 − stddev/mean). A perfectly constant sequence
/// scores 100. Fewer than 2 samples, or a zero mean, scores 0.
pub fn consistency_score(values: &[f64]) -> f64 {
    let Some(sd) = std_dev(values) else {
        return 0.0;
    };
    let m = mean(values).unwrap_or(0.0);
    if m == 0.0 {
        return 0.0;
    }
    let score = 100.0 * (1.0 - sd / m).max(0.0);
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

/// Maximum observed value across a sequence
pub fn personal_best(values: &[f64]) -> Option<f64> {
    values.iter().copied().fold(None, |best, v| match best {
        Some(b) if b >= v => Some(b),
        _ => Some(v),
    })
}

/// Accumulated sleep debt in hours over a window of nightly durations
///
/// Each night short of the target contributes max(0, target − hours);
/// oversleeping never pays debt back.
pub fn sleep_debt_hours(nightly_hours: &[f64], target_hours: f64) -> f64 {
    nightly_hours
        .iter()
        .map(|h| (target_hours - h).max(0.0))
        .sum()
}

// ============================================================================
// Category Sub-Scores (0–100)
// ============================================================================

/// Steps sub-score: linear up to the 10k goal, capped at 100
pub fn steps_subscore(steps: f64) -> f64 {
    (steps / 10_000.0 * 100.0).clamp(0.0, 100.0)
}

/// Resting heart rate sub-score
///
/// 100 for [50, 70] bpm, 75 for (70, 90], 85 for [40, 50), else 50.
pub fn resting_hr_subscore(bpm: f64) -> f64 {
    if (50.0..=70.0).contains(&bpm) {
        100.0
    } else if bpm > 70.0 && bpm <= 90.0 {
        75.0
    } else if (40.0..50.0).contains(&bpm) {
        85.0
    } else {
        50.0
    }
}

/// Sleep duration sub-score
///
/// 100 for [7, 9] hours, 80 for [6, 7), 85 for (9, 10], else 50.
pub fn sleep_subscore(hours: f64) -> f64 {
    if (7.0..=9.0).contains(&hours) {
        100.0
    } else if (6.0..7.0).contains(&hours) {
        80.0
    } else if hours > 9.0 && hours <= 10.0 {
        85.0
    } else {
        50.0
    }
}

/// Blood oxygen sub-score: 100 at ≥95%, 75 at ≥90%, else 50
pub fn spo2_subscore(percent: f64) -> f64 {
    if percent >= 95.0 {
        100.0
    } else if percent >= 90.0 {
        75.0
    } else {
        50.0
    }
}

// ============================================================================
// Composite Health Score
// ============================================================================

/// Weighting scheme for the composite health score
///
/// The two schemes come from different revisions of the scoring rules and
/// are selected in configuration rather than hardcoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeightScheme {
    /// Four equal 25% weights: steps, heart, sleep, blood oxygen
    #[default]
    Baseline,
    /// Steps 30%, sleep 30%, heart 25%, consistency bonus 15%
    Enhanced,
}

impl WeightScheme {
    pub fn weights(&self) -> ScoreWeights {
        match self {
            WeightScheme::Baseline => ScoreWeights {
                steps: 0.25,
                heart: 0.25,
                sleep: 0.25,
                oxygen: 0.25,
                consistency: 0.0,
            },
            WeightScheme::Enhanced => ScoreWeights {
                steps: 0.30,
                heart: 0.25,
                sleep: 0.30,
                oxygen: 0.0,
                consistency: 0.15,
            },
        }
    }
}

impl FromStr for WeightScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baseline" => Ok(WeightScheme::Baseline),
            "enhanced" => Ok(WeightScheme::Enhanced),
            other => Err(format!("unknown weight scheme: {other}")),
        }
    }
}

/// Per-component weights for the composite score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub steps: f64,
    pub heart: f64,
    pub sleep: f64,
    pub oxygen: f64,
    pub consistency: f64,
}

/// Sub-score inputs to the composite score
///
/// `None` means the category had no data; it contributes neither
/// numerator nor denominator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreInputs {
    pub steps: Option<f64>,
    pub heart: Option<f64>,
    pub sleep: Option<f64>,
    pub oxygen: Option<f64>,
    pub consistency: Option<f64>,
}

/// How much of the weighted score inputs were actually present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataAvailability {
    /// No category carried any data; the score of 0 is not a health signal
    NoData,
    /// Some weighted categories were missing; weights renormalized
    Partial,
    /// Every weighted category contributed
    Complete,
}

/// Composite score with its data-availability flag
///
/// Score 0 with `NoData` is distinct from a genuinely poor score; callers
/// must check the flag before treating the number as a health signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub score: u8,
    pub availability: DataAvailability,
}

/// Weighted mean of whichever sub-scores are present
///
/// Components with zero weight are ignored entirely. Weights renormalize
/// over the present components: a missing category shrinks the divisor
/// instead of dragging the score down.
pub fn composite_score(inputs: &ScoreInputs, weights: &ScoreWeights) -> CompositeScore {
    let components = [
        (weights.steps, inputs.steps),
        (weights.heart, inputs.heart),
        (weights.sleep, inputs.sleep),
        (weights.oxygen, inputs.oxygen),
        (weights.consistency, inputs.consistency),
    ];

    let mut weighted_sum = 0.0;
    let mut weight_present = 0.0;
    let mut missing_weighted = 0usize;

    for (weight, input) in components {
        if weight <= 0.0 {
            continue;
        }
        match input {
            Some(subscore) => {
                weighted_sum += weight * subscore.clamp(0.0, 100.0);
                weight_present += weight;
            }
            None => missing_weighted += 1,
        }
    }

    if weight_present == 0.0 {
        return CompositeScore {
            score: 0,
            availability: DataAvailability::NoData,
        };
    }

    let score = (weighted_sum / weight_present).round().clamp(0.0, 100.0) as u8;
    let availability = if missing_weighted == 0 {
        DataAvailability::Complete
    } else {
        DataAvailability::Partial
    };

    CompositeScore {
        score,
        availability,
    }
}
