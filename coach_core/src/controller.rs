//! Deficit controller.
//!
//! The deficit (fraction of TDEE withheld) is decided in three stages:
//!
//! 1. **Rate-based baseline**: derived straight from the target weekly loss,
//!    so a plan is available on day one without any history.
//! 2. **PID refinement**: when auto-adjust is on and at least
//!    [`MIN_WEIGHT_READINGS`](crate::history::MIN_WEIGHT_READINGS) weights
//!    exist, one control step nudges the deficit toward the target loss rate.
//! 3. **Sleep cap**: poor recent sleep caps the deficit at 0.10.
//!
//! Every stage clamps to the profile's `[min_deficit, max_deficit]`.

use crate::history;
use crate::types::{DailyMetrics, PidConfig, PidState, Profile};

/// Energy density of body fat, kcal/kg
pub const KCAL_PER_KG_FAT: f64 = 7700.0;

pub const SLEEP_CAP_THRESHOLD_H: f64 = 6.5;
pub const SLEEP_CAP_DEFICIT: f64 = 0.10;
pub const SLEEP_EMA_ALPHA: f64 = 0.5;
pub const SLEEP_WINDOW_DAYS: usize = 7;

/// Clamp without panicking on inverted bounds or NaN
pub fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    lo.max(hi.min(v))
}

/// One PID step.
///
/// Pure: the caller owns the state and threads the returned value forward
/// if it wants continuity across days.
pub fn pid_step(cfg: &PidConfig, state: PidState, error: f64) -> (PidState, f64) {
    let integral = clamp(state.integral + error, -cfg.integral_cap, cfg.integral_cap);
    let derivative = state.prev_error.map_or(0.0, |prev| error - prev);
    let output = cfg.kp * error + cfg.ki * integral + cfg.kd * derivative;

    (
        PidState {
            integral,
            prev_error: Some(error),
        },
        output,
    )
}

/// Deficit straight from the target loss rate
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateDeficit {
    /// `daily_deficit_kcal / TDEE`, 0 when TDEE is not positive
    pub raw: f64,
    /// Clamped deficit actually used
    pub deficit: f64,
}

/// Convert a weekly loss target into a deficit fraction.
///
/// Falls back to the profile's static deficit when the rate gives nothing
/// positive (zero target, or a degenerate TDEE).
pub fn rate_based_deficit(profile: &Profile, target_loss_week_kg: f64, tdee: f64) -> RateDeficit {
    let raw = if tdee > 0.0 {
        target_loss_week_kg * KCAL_PER_KG_FAT / 7.0 / tdee
    } else {
        0.0
    };
    let chosen = if raw > 0.0 { raw } else { profile.deficit };

    RateDeficit {
        raw,
        deficit: clamp(chosen, profile.min_deficit, profile.max_deficit),
    }
}

/// Outcome of the full three-stage decision
#[derive(Clone, Debug, PartialEq)]
pub struct DeficitDecision {
    pub deficit: f64,
    pub state: PidState,
    pub rate: RateDeficit,
    /// Observed loss used by the PID step, if it ran
    pub observed_loss: Option<f64>,
    pub notes: Vec<String>,
}

/// Inputs to [`decide_deficit`] beyond the profile
#[derive(Clone, Copy, Debug)]
pub struct DeficitInputs<'a> {
    pub tdee: f64,
    pub target_loss_week_kg: f64,
    pub auto_adjust: bool,
    pub pid: &'a PidConfig,
    pub state: PidState,
    pub history: &'a [DailyMetrics],
}

/// Run the rate baseline, PID refinement and sleep cap in order
pub fn decide_deficit(profile: &Profile, inputs: DeficitInputs<'_>) -> DeficitDecision {
    let (lo, hi) = (profile.min_deficit, profile.max_deficit);
    let rate = rate_based_deficit(profile, inputs.target_loss_week_kg, inputs.tdee);
    let mut deficit = rate.deficit;
    let mut state = inputs.state;
    let mut observed_loss = None;
    let mut notes = vec![format!(
        "Deficit from target weekly loss = {:.3} (clamped to [{:.2}, {:.2}] -> {:.3})",
        rate.raw, lo, hi, deficit
    )];

    if inputs.auto_adjust {
        match history::observed_weekly_loss(inputs.history) {
            Some(observed) => {
                let error = inputs.target_loss_week_kg - observed;
                let (next, output) = pid_step(inputs.pid, state, error);
                state = next;
                observed_loss = Some(observed);

                let before = deficit;
                deficit = clamp(deficit + output, lo, hi);
                tracing::debug!(
                    "PID step: error {:.3}, output {:.4}, integral {:.3}",
                    error,
                    output,
                    state.integral
                );
                if (deficit - before).abs() > 1e-6 {
                    notes.push(format!(
                        "PID: trend adjusted deficit {:.2} -> {:.2} (target {:.2} kg/week, observed {:.2})",
                        before, deficit, inputs.target_loss_week_kg, observed
                    ));
                }
            }
            None => {
                notes.push(
                    "Insufficient trend: too few recent weight readings, deficit taken directly from the target weekly loss"
                        .to_string(),
                );
            }
        }
    }

    if let Some(sleep) =
        history::recent_sleep_ema(inputs.history, SLEEP_WINDOW_DAYS, SLEEP_EMA_ALPHA)
    {
        if sleep < SLEEP_CAP_THRESHOLD_H {
            let before = deficit;
            deficit = clamp(deficit.min(SLEEP_CAP_DEFICIT), lo, hi);
            if deficit < before {
                notes.push(format!(
                    "Short-term sleep low (EMA {:.1} h): deficit capped at <= {:.2}",
                    sleep, SLEEP_CAP_DEFICIT
                ));
            }
        }
    }

    tracing::info!("Deficit decided: {:.3}", deficit);

    DeficitDecision {
        deficit,
        state,
        rate,
        observed_loss,
        notes,
    }
}
