//! Energy-availability guard.
//!
//! Runs after macro composition. It can only raise the day's intake, never
//! lower it, and never above maintenance (TDEE). Any increase goes entirely
//! to carbohydrate.

use crate::composer::{remainder_carbs, MacroGrams};
use crate::types::GuardConfig;
use serde::{Deserialize, Serialize};

/// Floor for FFM in denominators
const MIN_FFM_KG: f64 = 1e-6;

/// Energy availability, kcal per kg FFM per day
pub fn energy_availability(intake_kcal: f64, exercise_kcal: f64, ffm: f64) -> f64 {
    (intake_kcal - exercise_kcal) / ffm.max(MIN_FFM_KG)
}

/// Minimum intake that keeps EA at `ea_min`
pub fn ea_floor_kcal(exercise_kcal: f64, ffm: f64, ea_min: f64) -> f64 {
    exercise_kcal + ea_min * ffm
}

/// Where an EA value sits relative to the configured thresholds
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EaStatus {
    BelowMinimum,
    BelowPreferred,
    Adequate,
}

impl GuardConfig {
    pub fn classify(&self, ea: f64) -> EaStatus {
        if ea < self.ea_min {
            EaStatus::BelowMinimum
        } else if ea < self.ea_pref {
            EaStatus::BelowPreferred
        } else {
            EaStatus::Adequate
        }
    }
}

/// Result of running the guard over a composed plan
#[derive(Clone, Debug, PartialEq)]
pub struct GuardOutcome {
    pub final_kcal: f64,
    pub macros: MacroGrams,
    pub ea: f64,
    pub applied: bool,
    /// The guard's required minimum intake, whether or not it was applied
    pub ea_floor_kcal: f64,
    pub note: Option<String>,
}

/// Raise intake to satisfy `ea_min`, capped at TDEE.
pub fn apply(
    cfg: &GuardConfig,
    macros: MacroGrams,
    exercise_kcal: f64,
    ffm: f64,
    tdee: f64,
) -> GuardOutcome {
    let composed_kcal = macros.kcal();
    let floor = ea_floor_kcal(exercise_kcal, ffm, cfg.ea_min);
    let ea = energy_availability(composed_kcal, exercise_kcal, ffm);

    let mut outcome = GuardOutcome {
        final_kcal: composed_kcal,
        macros,
        ea,
        applied: false,
        ea_floor_kcal: floor,
        note: None,
    };

    if ea >= cfg.ea_min {
        return outcome;
    }

    let raised = floor.min(tdee);
    if raised > composed_kcal + 1e-6 {
        outcome.macros.carb_g = remainder_carbs(raised, macros.protein_g, macros.fat_g);
        outcome.final_kcal = raised;
        outcome.ea = energy_availability(raised, exercise_kcal, ffm);
        outcome.applied = true;
        outcome.note = Some(format!(
            "EA guard: to keep EA >= {:.0}, intake {:.0} -> {:.0} kcal (filled with carbs)",
            cfg.ea_min, composed_kcal, raised
        ));
        tracing::info!(
            "EA guard raised intake {:.0} -> {:.0} kcal (EA {:.1} -> {:.1})",
            composed_kcal,
            raised,
            ea,
            outcome.ea
        );
    } else {
        tracing::debug!(
            "EA {:.1} below {:.0} but maintenance caps the floor; intake unchanged",
            ea,
            cfg.ea_min
        );
    }

    outcome
}
