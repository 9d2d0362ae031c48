//! Views over the daily metrics history.
//!
//! History arrives from the caller as a slice. Every helper here sorts a
//! borrowed view by date first (stable, so same-day records keep caller
//! order) and never touches the caller's data.

use crate::types::DailyMetrics;

/// Minimum dated weight readings before a weekly trend is observable
pub const MIN_WEIGHT_READINGS: usize = 8;

/// Readings per trend window
pub const TREND_WINDOW: usize = 7;

/// References to `history` ordered by date ascending
pub fn sorted_by_date(history: &[DailyMetrics]) -> Vec<&DailyMetrics> {
    let mut view: Vec<&DailyMetrics> = history.iter().collect();
    view.sort_by_key(|m| m.date);
    view
}

/// The last `n` records by date, oldest first
pub fn tail(history: &[DailyMetrics], n: usize) -> Vec<&DailyMetrics> {
    let view = sorted_by_date(history);
    let skip = view.len().saturating_sub(n);
    view.into_iter().skip(skip).collect()
}

/// Exponentially weighted mean, seeded with the first value.
///
/// `s_0 = x_0`, `s_t = alpha * x_t + (1 - alpha) * s_{t-1}`. Returns `None`
/// for an empty series.
pub fn ema<I>(values: I, alpha: f64) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, x| match acc {
            None => Some(x),
            Some(prev) => Some(alpha * x + (1.0 - alpha) * prev),
        })
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Weekly loss estimate from the weight trend
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightTrend {
    /// Mean of the last 7 readings
    pub recent_mean: f64,
    /// Mean of the up to 7 readings before those
    pub previous_mean: f64,
}

impl WeightTrend {
    /// Observed loss in kg/week; gains count as zero loss
    pub fn weekly_loss(&self) -> f64 {
        (self.previous_mean - self.recent_mean).max(0.0)
    }
}

/// Compare the last 7 weight readings with the up to 7 before them.
///
/// Records without a weight are skipped. Needs at least
/// [`MIN_WEIGHT_READINGS`] readings.
pub fn weight_trend(history: &[DailyMetrics]) -> Option<WeightTrend> {
    let weights: Vec<f64> = sorted_by_date(history)
        .into_iter()
        .filter_map(|m| m.weight_kg)
        .filter(|w| w.is_finite())
        .collect();

    if weights.len() < MIN_WEIGHT_READINGS {
        tracing::debug!(
            "Weight trend needs {} readings, found {}",
            MIN_WEIGHT_READINGS,
            weights.len()
        );
        return None;
    }

    let split = weights.len() - TREND_WINDOW;
    let recent = &weights[split..];
    let previous = &weights[split.saturating_sub(TREND_WINDOW)..split];

    Some(WeightTrend {
        recent_mean: mean(recent)?,
        previous_mean: mean(previous)?,
    })
}

/// Observed weekly loss in kg, if the trend is observable
pub fn observed_weekly_loss(history: &[DailyMetrics]) -> Option<f64> {
    weight_trend(history).map(|t| t.weekly_loss())
}

/// EMA of the non-missing sleep hours among the last `days` records
pub fn recent_sleep_ema(history: &[DailyMetrics], days: usize, alpha: f64) -> Option<f64> {
    ema(tail(history, days).into_iter().filter_map(|m| m.sleep_h), alpha)
}
