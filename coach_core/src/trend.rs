//! Next-day readiness prediction from recent recovery and load.
//!
//! Rules, first match wins:
//!
//! 1. **Recovery**: fatigue ≥ 7, sleep < 6.5 h or performance ≤ −5 % → Low/Low
//! 2. **High load**: load ≥ 1600 → Medium/Medium
//! 3. **Ready**: load ≤ 900, fatigue ≤ 4, sleep ≥ 7.5 h, performance ≥ 0 → High/Medium
//! 4. **Neutral**: Medium/Medium
//!
//! Each signal is an EMA over the non-missing values in the last 14 records.
//! A signal with no values never satisfies a comparison.

use crate::history;
use crate::types::DailyMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TREND_DAYS: usize = 14;
pub const TREND_EMA_ALPHA: f64 = 0.3;

const HIGH_FATIGUE: f64 = 7.0;
const LOW_FATIGUE: f64 = 4.0;
const LOW_SLEEP_H: f64 = 6.5;
const GOOD_SLEEP_H: f64 = 7.5;
const HIGH_LOAD: f64 = 1600.0;
const LOW_LOAD: f64 = 900.0;
const POOR_PERF_PCT: f64 = -5.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Low,
    Medium,
    High,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::Low => f.write_str("low"),
            Band::Medium => f.write_str("medium"),
            Band::High => f.write_str("high"),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PredictionReason {
    NoHistory,
    Recovery,
    HighLoad,
    Ready,
    Neutral,
}

/// EMAs of the recent signals; `None` where a series had no values
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TrendSignals {
    pub fatigue: Option<f64>,
    pub sleep_h: Option<f64>,
    pub load_index: Option<f64>,
    pub perf_pct: Option<f64>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    pub train_band: Band,
    pub deficit_band: Band,
    pub reason: PredictionReason,
    pub signals: TrendSignals,
}

impl Prediction {
    pub fn note(&self) -> &'static str {
        match self.reason {
            PredictionReason::NoHistory => "No history yet, using the middle band.",
            PredictionReason::Recovery => "Fatigue, sleep or performance point to a recovery day.",
            PredictionReason::HighLoad => {
                "Recent load is high: moderate intensity and a moderate deficit."
            }
            PredictionReason::Ready => "Well recovered and load is low: a hard day is fine.",
            PredictionReason::Neutral => "Overall neutral, using the middle band.",
        }
    }
}

fn at_least(v: Option<f64>, threshold: f64) -> bool {
    v.is_some_and(|x| x >= threshold)
}

fn at_most(v: Option<f64>, threshold: f64) -> bool {
    v.is_some_and(|x| x <= threshold)
}

fn below(v: Option<f64>, threshold: f64) -> bool {
    v.is_some_and(|x| x < threshold)
}

/// EMA of each signal over the last [`TREND_DAYS`] records
pub fn signals(history: &[DailyMetrics]) -> TrendSignals {
    let recent = history::tail(history, TREND_DAYS);
    let series = |f: fn(&DailyMetrics) -> Option<f64>| {
        history::ema(recent.iter().filter_map(|m| f(*m)), TREND_EMA_ALPHA)
    };

    TrendSignals {
        fatigue: series(|m| m.fatigue.map(f64::from)),
        sleep_h: series(|m| m.sleep_h),
        load_index: series(|m| m.load_index),
        perf_pct: series(|m| m.perf_pct),
    }
}

/// Predict tomorrow's training and deficit bands
pub fn predict_next_day(history: &[DailyMetrics]) -> Prediction {
    if history.is_empty() {
        return Prediction {
            train_band: Band::Medium,
            deficit_band: Band::Medium,
            reason: PredictionReason::NoHistory,
            signals: TrendSignals::default(),
        };
    }

    let s = signals(history);
    let (train_band, deficit_band, reason) = if at_least(s.fatigue, HIGH_FATIGUE)
        || below(s.sleep_h, LOW_SLEEP_H)
        || at_most(s.perf_pct, POOR_PERF_PCT)
    {
        (Band::Low, Band::Low, PredictionReason::Recovery)
    } else if at_least(s.load_index, HIGH_LOAD) {
        (Band::Medium, Band::Medium, PredictionReason::HighLoad)
    } else if at_most(s.load_index, LOW_LOAD)
        && at_most(s.fatigue, LOW_FATIGUE)
        && at_least(s.sleep_h, GOOD_SLEEP_H)
        && at_least(s.perf_pct, 0.0)
    {
        (Band::High, Band::Medium, PredictionReason::Ready)
    } else {
        (Band::Medium, Band::Medium, PredictionReason::Neutral)
    };

    tracing::debug!("Trend signals {:?} -> {:?}", s, reason);

    Prediction {
        train_band,
        deficit_band,
        reason,
        signals: s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 1).unwrap() + Duration::days(offset)
    }

    fn record(
        offset: i64,
        fatigue: Option<u8>,
        sleep_h: Option<f64>,
        load_index: Option<f64>,
        perf_pct: Option<f64>,
    ) -> DailyMetrics {
        DailyMetrics {
            fatigue,
            sleep_h,
            load_index,
            perf_pct,
            ..DailyMetrics::new(day(offset))
        }
    }

    #[test]
    fn test_empty_history_is_neutral_default() {
        let p = predict_next_day(&[]);
        assert_eq!(p.train_band, Band::Medium);
        assert_eq!(p.deficit_band, Band::Medium);
        assert_eq!(p.reason, PredictionReason::NoHistory);
    }

    #[test]
    fn test_recovery_rule_wins() {
        let history: Vec<_> = (0..5)
            .map(|i| record(i, Some(8), Some(8.0), Some(2000.0), Some(2.0)))
            .collect();
        let p = predict_next_day(&history);
        assert_eq!((p.train_band, p.deficit_band), (Band::Low, Band::Low));
        assert_eq!(p.reason, PredictionReason::Recovery);
    }

    #[test]
    fn test_high_load() {
        let history: Vec<_> = (0..5)
            .map(|i| record(i, Some(5), Some(7.5), Some(1700.0), Some(0.0)))
            .collect();
        assert_eq!(predict_next_day(&history).reason, PredictionReason::HighLoad);
    }

    #[test]
    fn test_ready_day() {
        let history: Vec<_> = (0..5)
            .map(|i| record(i, Some(3), Some(8.0), Some(500.0), Some(1.0)))
            .collect();
        let p = predict_next_day(&history);
        assert_eq!((p.train_band, p.deficit_band), (Band::High, Band::Medium));
        assert_eq!(p.reason, PredictionReason::Ready);
    }

    #[test]
    fn test_missing_series_never_matches() {
        // No perf values: the ready rule cannot match
        let history: Vec<_> = (0..5)
            .map(|i| record(i, Some(3), Some(8.0), Some(500.0), None))
            .collect();
        let p = predict_next_day(&history);
        assert_eq!(p.reason, PredictionReason::Neutral);
        assert_eq!(p.signals.perf_pct, None);

        // Records with no signals at all fall through to neutral
        let history = vec![DailyMetrics::new(day(0))];
        assert_eq!(predict_next_day(&history).reason, PredictionReason::Neutral);
    }

    #[test]
    fn test_only_last_fourteen_records() {
        let mut history: Vec<_> = (0..5)
            .map(|i| record(i, Some(9), Some(4.0), None, None))
            .collect();
        history.extend((5..19).map(|i| record(i, Some(3), Some(8.0), Some(500.0), Some(1.0))));
        history.reverse();
        assert_eq!(predict_next_day(&history).reason, PredictionReason::Ready);
    }

    #[test]
    fn test_ema_weights_recent_days() {
        // 8, 8, 8, 5, 5 -> 7.1 -> 6.47
        let sleeps = [8.0, 8.0, 8.0, 5.0, 5.0];
        let history: Vec<_> = sleeps
            .iter()
            .enumerate()
            .map(|(i, s)| record(i as i64, None, Some(*s), None, None))
            .collect();
        let p = predict_next_day(&history);
        assert!((p.signals.sleep_h.unwrap() - 6.47).abs() < 1e-9);
        assert_eq!(p.reason, PredictionReason::Recovery);
    }
}
