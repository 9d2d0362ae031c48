//! Daily planner: composes every estimator, the controller, the composer and
//! the EA guard into one day's targets.
//!
//! ## Pipeline
//!
//! 1. Effective body mass (fresh reading overrides the profile)
//! 2. FFM, effective PAL, BMR
//! 3. Exercise kcal and training load → TDEE
//! 4. Deficit (rate baseline → PID refinement → sleep cap)
//! 5. Macro composition (suggestions, training bump, periodization)
//! 6. Energy-availability guard
//!
//! Notes are collected in the order the adjustments happened.

use crate::composer::{self, ComposeInputs, Suggestion};
use crate::config::Config;
use crate::controller::{self, DeficitInputs};
use crate::guard::{self, EaStatus};
use crate::types::{
    ActivityBlock, Catalog, DailyMetrics, DailyTargets, DayType, GuardConfig, PidConfig,
    PidState, Profile, ProteinBasis, SubjectiveInputs, TrainingDayConfig,
};
use crate::{exercise, history, metabolic, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// All caller-supplied inputs for planning one day (history is passed separately)
#[derive(Clone, Debug)]
pub struct PlanRequest {
    pub profile: Profile,
    pub activities: Vec<ActivityBlock>,
    pub steps: Option<u32>,
    pub auto_adjust: bool,
    pub target_loss_week_kg: f64,
    pub pid: PidConfig,
    /// Controller state to start from; zero for a fresh session
    pub pid_state: PidState,
    pub subjective: SubjectiveInputs,
    pub apply_suggestions: bool,
    /// Morning weight, overriding the profile's body mass when positive
    pub today_weight: Option<f64>,
    pub protein_basis: ProteinBasis,
    pub protein_per_kg_ffm: f64,
    pub guard: GuardConfig,
    pub training: TrainingDayConfig,
}

impl Default for PlanRequest {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            activities: Vec::new(),
            steps: None,
            auto_adjust: true,
            target_loss_week_kg: 0.0,
            pid: PidConfig::default(),
            pid_state: PidState::default(),
            subjective: SubjectiveInputs::default(),
            apply_suggestions: false,
            today_weight: None,
            protein_basis: ProteinBasis::Ffm,
            protein_per_kg_ffm: 2.6,
            guard: GuardConfig::default(),
            training: TrainingDayConfig::default(),
        }
    }
}

impl PlanRequest {
    /// Request seeded from config.
    ///
    /// The weekly loss target is `loss_rate_pct` of the effective body mass,
    /// so a fresh morning weight moves the target with it.
    pub fn from_config(config: &Config, today_weight: Option<f64>) -> Self {
        let profile = config.profile();
        let mass = profile.with_weight(today_weight).weight_kg;
        Self {
            target_loss_week_kg: config.goals.target_loss_week_kg(mass),
            auto_adjust: config.goals.auto_adjust,
            protein_basis: config.goals.protein_basis,
            protein_per_kg_ffm: config.goals.protein_per_kg_ffm,
            pid: config.controller,
            guard: config.guard,
            training: config.training,
            today_weight,
            profile,
            ..Self::default()
        }
    }
}

/// A complete day plan.
///
/// Values are exact; use [`PlanResult::rounded`] for display.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlanResult {
    pub bmr: f64,
    pub pal: f64,
    pub exercise_kcal: f64,
    pub tdee: f64,
    pub deficit: f64,
    pub target_kcal: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carb_g: f64,
    pub load_index: f64,
    pub ffm: f64,
    pub ea: f64,
    pub ea_guard_applied: bool,
    pub is_training_day: bool,
    pub notes: Vec<String>,
    pub suggestions: Vec<Suggestion>,
    /// Observed weekly loss as % of body mass, when the trend is observable
    pub weekly_loss_pct: Option<f64>,
    pub target_loss_pct: Option<f64>,
    /// TDEE·(1 − deficit), before the guard
    pub intended_kcal: f64,
    /// Minimum intake the guard requires
    pub ea_floor_kcal: f64,
    pub pid_state: PidState,
}

pub(crate) fn round_to(v: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (v * factor).round() / factor
}

impl PlanResult {
    /// Copy rounded to display precision
    pub fn rounded(&self) -> PlanResult {
        PlanResult {
            bmr: round_to(self.bmr, 1),
            pal: round_to(self.pal, 2),
            exercise_kcal: round_to(self.exercise_kcal, 0),
            tdee: round_to(self.tdee, 0),
            deficit: round_to(self.deficit, 3),
            target_kcal: round_to(self.target_kcal, 0),
            protein_g: round_to(self.protein_g, 0),
            fat_g: round_to(self.fat_g, 0),
            carb_g: round_to(self.carb_g, 0),
            load_index: round_to(self.load_index, 0),
            ffm: round_to(self.ffm, 1),
            ea: round_to(self.ea, 1),
            weekly_loss_pct: self.weekly_loss_pct.map(|v| round_to(v, 2)),
            target_loss_pct: self.target_loss_pct.map(|v| round_to(v, 2)),
            intended_kcal: round_to(self.intended_kcal, 0),
            ea_floor_kcal: round_to(self.ea_floor_kcal, 0),
            ..self.clone()
        }
    }

    pub fn ea_status(&self, guard: &GuardConfig) -> EaStatus {
        guard.classify(self.ea)
    }

    /// Rounded persistence record for `date`
    pub fn to_targets(&self, date: NaiveDate) -> DailyTargets {
        let r = self.rounded();
        DailyTargets {
            date,
            target_kcal: r.target_kcal,
            protein_g: r.protein_g,
            fat_g: r.fat_g,
            carb_g: r.carb_g,
            bmr: r.bmr,
            pal: r.pal,
            tdee: r.tdee,
            deficit: r.deficit,
            ea: r.ea,
            ea_guard_applied: r.ea_guard_applied,
            notes: r.notes.join("; "),
            day_type: Some(if self.deficit > 0.0 {
                DayType::Deficit
            } else {
                DayType::Maintain
            }),
        }
    }
}

/// Plan one day.
///
/// Fails only when an activity block names an unknown (activity, intensity)
/// pair. History may be in any order; it is viewed sorted by date.
pub fn plan_day(
    request: &PlanRequest,
    catalog: &Catalog,
    history: &[DailyMetrics],
) -> Result<PlanResult> {
    let profile = request.profile.with_weight(request.today_weight);
    let weight = profile.weight_kg;

    let ffm = metabolic::ffm(weight, profile.body_fat_pct);
    let pal = metabolic::effective_pal(profile.baseline_pal, request.steps);
    let bmr = metabolic::bmr(&profile);
    let load = exercise::daily_exercise(catalog, weight, &request.activities)?;
    let tdee = exercise::tdee(bmr, pal, load.kcal);

    tracing::info!(
        "Planning: mass {:.1} kg, BMR {:.0}, PAL {:.3}, exercise {:.0} kcal, TDEE {:.0}",
        weight,
        bmr,
        pal,
        load.kcal,
        tdee
    );

    let decision = controller::decide_deficit(
        &profile,
        DeficitInputs {
            tdee,
            target_loss_week_kg: request.target_loss_week_kg,
            auto_adjust: request.auto_adjust,
            pid: &request.pid,
            state: request.pid_state,
            history,
        },
    );
    let mut notes = decision.notes;
    let deficit = decision.deficit;

    let intended_kcal = tdee * (1.0 - deficit);
    let suggestions = composer::suggestions(&request.subjective);

    let composition = composer::compose(ComposeInputs {
        profile: &profile,
        ffm,
        target_kcal: intended_kcal,
        load_index: load.load_index,
        protein_basis: request.protein_basis,
        protein_per_kg_ffm: request.protein_per_kg_ffm,
        suggestions: &suggestions,
        apply_suggestions: request.apply_suggestions,
        training: &request.training,
    });
    notes.extend(composition.notes);

    let guarded = guard::apply(&request.guard, composition.macros, load.kcal, ffm, tdee);
    notes.extend(guarded.note);

    let mass = weight.max(1e-6);
    let observed = history::observed_weekly_loss(history);
    let weekly_loss_pct = observed.map(|loss| loss / mass * 100.0);
    let target_loss_pct = observed.map(|_| request.target_loss_week_kg / mass * 100.0);

    Ok(PlanResult {
        bmr,
        pal,
        exercise_kcal: load.kcal,
        tdee,
        deficit,
        target_kcal: guarded.final_kcal,
        protein_g: guarded.macros.protein_g,
        fat_g: guarded.macros.fat_g,
        carb_g: guarded.macros.carb_g,
        load_index: load.load_index,
        ffm,
        ea: guarded.ea,
        ea_guard_applied: guarded.applied,
        is_training_day: composition.is_training_day,
        notes,
        suggestions,
        weekly_loss_pct,
        target_loss_pct,
        intended_kcal,
        ea_floor_kcal: guarded.ea_floor_kcal,
        pid_state: decision.state,
    })
}
