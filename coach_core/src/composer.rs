//! Macro composition: protein, fat and carbohydrate grams for a kcal target.
//!
//! Order of adjustments to carbohydrate grams:
//! 1. remainder of the kcal target after protein and fat
//! 2. carb-bump suggestions, only when the caller opts in
//! 3. training-day bump, always when the load threshold is met
//! 4. load-based periodization, when the profile enables it

use crate::types::{Profile, ProteinBasis, SubjectiveInputs, TrainingDayConfig};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
pub const KCAL_PER_G_FAT: f64 = 9.0;
pub const KCAL_PER_G_CARB: f64 = 4.0;

pub const HIGH_FATIGUE: u8 = 7;
pub const SHORT_SLEEP_H: f64 = 6.5;
pub const PERFORMANCE_DROP_PCT: f64 = -5.0;

/// Load (MET·min) where periodization starts adding carbs
pub const PERIODIZATION_LOAD: f64 = 1200.0;
pub const HIGH_LOAD: f64 = 1600.0;
/// Carb floors, g/kg body mass
pub const CARB_FLOOR_HIGH_LOAD: f64 = 4.0;
pub const CARB_FLOOR_MODERATE_LOAD: f64 = 3.0;

// ============================================================================
// Suggestions
// ============================================================================

/// What a suggestion proposes
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SuggestionKind {
    /// Lower the deficit by this much (advisory)
    DeficitDelta(f64),
    /// Cap the deficit at this value (advisory)
    DeficitCap(f64),
    /// Add carbohydrate, g per kg body mass (applied on opt-in)
    CarbBump(f64),
}

/// Which subjective signal triggered a suggestion
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionReason {
    HighFatigue,
    ShortSleep,
    PerformanceDrop,
}

impl SuggestionReason {
    fn label(&self) -> &'static str {
        match self {
            SuggestionReason::HighFatigue => "High fatigue",
            SuggestionReason::ShortSleep => "Short sleep",
            SuggestionReason::PerformanceDrop => "Performance drop",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub reason: SuggestionReason,
}

impl Suggestion {
    /// Carb grams this suggestion adds for a body mass, if it is a carb bump
    pub fn carb_grams(&self, weight_kg: f64) -> Option<f64> {
        match self.kind {
            SuggestionKind::CarbBump(g_per_kg) => Some(g_per_kg * weight_kg),
            SuggestionKind::DeficitDelta(_) | SuggestionKind::DeficitCap(_) => None,
        }
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.reason.label();
        match self.kind {
            SuggestionKind::DeficitDelta(d) => write!(f, "{} -> deficit {:+.2}", label, d),
            SuggestionKind::DeficitCap(v) => write!(f, "{} -> deficit <= {:.2}", label, v),
            SuggestionKind::CarbBump(g) => write!(f, "{} -> carbs {:+.1} g/kg", label, g),
        }
    }
}

/// Rule-based suggestions from today's subjective inputs
pub fn suggestions(inputs: &SubjectiveInputs) -> Vec<Suggestion> {
    let mut out = Vec::new();

    if inputs.fatigue >= HIGH_FATIGUE {
        out.push(Suggestion {
            kind: SuggestionKind::DeficitDelta(-0.03),
            reason: SuggestionReason::HighFatigue,
        });
        out.push(Suggestion {
            kind: SuggestionKind::CarbBump(0.8),
            reason: SuggestionReason::HighFatigue,
        });
    }
    if inputs.sleep_h < SHORT_SLEEP_H {
        out.push(Suggestion {
            kind: SuggestionKind::DeficitDelta(-0.02),
            reason: SuggestionReason::ShortSleep,
        });
    }
    if inputs.perf_change_pct <= PERFORMANCE_DROP_PCT {
        out.push(Suggestion {
            kind: SuggestionKind::DeficitCap(0.10),
            reason: SuggestionReason::PerformanceDrop,
        });
        out.push(Suggestion {
            kind: SuggestionKind::CarbBump(1.0),
            reason: SuggestionReason::PerformanceDrop,
        });
    }

    out
}

// ============================================================================
// Macro Grams
// ============================================================================

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct MacroGrams {
    pub protein_g: f64,
    pub fat_g: f64,
    pub carb_g: f64,
}

impl MacroGrams {
    pub fn protein_fat_kcal(&self) -> f64 {
        self.protein_g * KCAL_PER_G_PROTEIN + self.fat_g * KCAL_PER_G_FAT
    }

    pub fn kcal(&self) -> f64 {
        self.protein_fat_kcal() + self.carb_g * KCAL_PER_G_CARB
    }
}

/// Protein and fat grams for a profile (body mass already resolved)
pub fn base_protein_fat(
    profile: &Profile,
    ffm: f64,
    basis: ProteinBasis,
    protein_per_kg_ffm: f64,
) -> (f64, f64) {
    let protein_g = match basis {
        ProteinBasis::Ffm => protein_per_kg_ffm * ffm,
        ProteinBasis::BodyWeight => profile.protein_g_per_kg_bw * profile.weight_kg,
    };
    let fat_g = profile.fat_g_per_kg_bw * profile.weight_kg;
    (protein_g, fat_g)
}

/// Carbohydrate grams filling `target_kcal` after protein and fat, floored at 0
pub fn remainder_carbs(target_kcal: f64, protein_g: f64, fat_g: f64) -> f64 {
    let pf = protein_g * KCAL_PER_G_PROTEIN + fat_g * KCAL_PER_G_FAT;
    (target_kcal - pf).max(0.0) / KCAL_PER_G_CARB
}

/// Load-based carbohydrate periodization
pub fn carb_periodize(base_carb_g: f64, load_index: f64, weight_kg: f64) -> f64 {
    let adjusted = base_carb_g + 50.0 * (load_index - PERIODIZATION_LOAD).max(0.0) / 1000.0;
    if load_index >= HIGH_LOAD {
        adjusted.max(CARB_FLOOR_HIGH_LOAD * weight_kg)
    } else if load_index >= PERIODIZATION_LOAD {
        adjusted.max(CARB_FLOOR_MODERATE_LOAD * weight_kg)
    } else {
        adjusted
    }
}

// ============================================================================
// Composition
// ============================================================================

/// Everything [`compose`] needs
#[derive(Clone, Copy, Debug)]
pub struct ComposeInputs<'a> {
    /// Profile with the effective body mass for the day
    pub profile: &'a Profile,
    pub ffm: f64,
    pub target_kcal: f64,
    pub load_index: f64,
    pub protein_basis: ProteinBasis,
    pub protein_per_kg_ffm: f64,
    pub suggestions: &'a [Suggestion],
    pub apply_suggestions: bool,
    pub training: &'a TrainingDayConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Composition {
    pub macros: MacroGrams,
    pub is_training_day: bool,
    pub notes: Vec<String>,
}

impl Composition {
    /// Final kcal implied by the composed macros
    pub fn kcal(&self) -> f64 {
        self.macros.kcal()
    }
}

/// Allocate the kcal target into macros and apply carbohydrate adjustments
pub fn compose(inputs: ComposeInputs<'_>) -> Composition {
    let weight = inputs.profile.weight_kg;
    let mut notes = Vec::new();

    let (protein_g, fat_g) = base_protein_fat(
        inputs.profile,
        inputs.ffm,
        inputs.protein_basis,
        inputs.protein_per_kg_ffm,
    );
    let mut carb_g = remainder_carbs(inputs.target_kcal, protein_g, fat_g);

    if inputs.apply_suggestions {
        let bump: f64 = inputs
            .suggestions
            .iter()
            .filter_map(|s| s.carb_grams(weight))
            .sum();
        if bump > 0.0 {
            carb_g += bump;
            notes.push(format!("Applied suggestions: carbs +{:.0} g", bump));
        }
    }

    let is_training_day = inputs.load_index >= inputs.training.load_threshold;
    if is_training_day && inputs.training.carb_bump_g_per_kg > 0.0 {
        carb_g += inputs.training.carb_bump_g_per_kg * weight;
        notes.push(format!(
            "Training day bonus: +{:.1} g/kg carbs",
            inputs.training.carb_bump_g_per_kg
        ));
    }

    if inputs.profile.carb_periodization {
        carb_g = carb_periodize(carb_g, inputs.load_index, weight);
    }

    let macros = MacroGrams {
        protein_g,
        fat_g,
        carb_g,
    };
    tracing::debug!(
        "Composed P {:.0} g / F {:.0} g / C {:.0} g = {:.0} kcal",
        protein_g,
        fat_g,
        carb_g,
        macros.kcal()
    );

    Composition {
        macros,
        is_training_day,
        notes,
    }
}
