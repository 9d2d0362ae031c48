//! Core domain types for the energy and macro coach.
//!
//! This module defines the value types shared across the computation modules:
//! - The person's profile and a day's activity blocks
//! - Controller configuration and state
//! - Historical daily metrics (read-only input)
//! - Persistence records (targets, intake entries, training volume, day types)

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Profile Types
// ============================================================================

/// Biological sex, used only by the Mifflin-St Jeor BMR formula
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

/// The person being planned for.
///
/// Replaced wholesale on every planning call; a fresher morning weight passed
/// in the request overrides `weight_kg` for that call only.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Profile {
    pub sex: Sex,
    pub age: u32,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub body_fat_pct: Option<f64>,
    /// Physical activity level on a day without logged exercise
    pub baseline_pal: f64,
    pub protein_g_per_kg_bw: f64,
    pub fat_g_per_kg_bw: f64,
    /// Static deficit used when no rate-based estimate is available
    pub deficit: f64,
    pub min_deficit: f64,
    pub max_deficit: f64,
    pub carb_periodization: bool,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            sex: Sex::Male,
            age: 21,
            height_cm: 181.0,
            weight_kg: 88.2,
            body_fat_pct: Some(24.0),
            baseline_pal: 1.35,
            protein_g_per_kg_bw: 2.2,
            fat_g_per_kg_bw: 0.7,
            deficit: 0.20,
            min_deficit: 0.10,
            max_deficit: 0.30,
            carb_periodization: true,
        }
    }
}

impl Profile {
    /// Copy of this profile with the body mass replaced by a fresh reading.
    ///
    /// Non-positive or non-finite readings are ignored.
    pub fn with_weight(&self, weight_kg: Option<f64>) -> Self {
        let mut profile = self.clone();
        if let Some(w) = weight_kg.filter(|w| w.is_finite() && *w > 0.0) {
            profile.weight_kg = w;
        }
        profile
    }
}

// ============================================================================
// Activity Types
// ============================================================================

/// Subjective intensity of an activity block
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Low,
    Moderate,
    High,
}

impl Intensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Low => "low",
            Intensity::Moderate => "moderate",
            Intensity::High => "high",
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intensity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Intensity::Low),
            "moderate" | "mod" | "medium" => Ok(Intensity::Moderate),
            "high" => Ok(Intensity::High),
            other => Err(Error::Validation(format!("unknown intensity '{}'", other))),
        }
    }
}

/// One block of exercise performed on the planned day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActivityBlock {
    /// Catalog key, e.g. "badminton"
    pub name: String,
    pub minutes: f64,
    pub intensity: Intensity,
}

impl ActivityBlock {
    /// Build a block, rejecting negative or non-finite durations.
    ///
    /// The name is not checked against the catalog here; an unknown
    /// (name, intensity) pair surfaces when the day is estimated.
    pub fn new(name: impl Into<String>, minutes: f64, intensity: Intensity) -> Result<Self> {
        if !minutes.is_finite() || minutes < 0.0 {
            return Err(Error::Validation(format!(
                "activity duration must be >= 0 minutes, got {}",
                minutes
            )));
        }
        Ok(Self {
            name: name.into().trim().to_lowercase(),
            minutes,
            intensity,
        })
    }
}

impl FromStr for ActivityBlock {
    type Err = Error;

    /// Parse `name:minutes:intensity`. All three fields are required.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(Error::Validation(format!(
                "expected name:minutes:intensity, got '{}'",
                s
            )));
        }
        let minutes: f64 = parts[1]
            .trim()
            .parse()
            .map_err(|_| Error::Validation(format!("invalid minutes '{}'", parts[1])))?;
        let intensity: Intensity = parts[2].parse()?;
        ActivityBlock::new(parts[0], minutes, intensity)
    }
}

/// MET values for one activity, per intensity.
///
/// A missing intensity makes that (activity, intensity) pair unknown.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct MetValues {
    pub low: Option<f64>,
    pub moderate: Option<f64>,
    pub high: Option<f64>,
}

impl MetValues {
    pub fn new(low: f64, moderate: f64, high: f64) -> Self {
        Self {
            low: Some(low),
            moderate: Some(moderate),
            high: Some(high),
        }
    }

    pub fn get(&self, intensity: Intensity) -> Option<f64> {
        match intensity {
            Intensity::Low => self.low,
            Intensity::Moderate => self.moderate,
            Intensity::High => self.high,
        }
    }
}

/// The activity catalog: activity name → MET values
#[derive(Clone, Debug)]
pub struct Catalog {
    pub activities: HashMap<String, MetValues>,
}

// ============================================================================
// Controller Types
// ============================================================================

/// PID gains and integral clamp for the deficit controller
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PidConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub integral_cap: f64,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 0.35,
            ki: 0.05,
            kd: 0.0,
            integral_cap: 0.15,
        }
    }
}

/// Accumulated controller state.
///
/// One value per planning session; never shared between sessions.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PidState {
    pub integral: f64,
    pub prev_error: Option<f64>,
}

// ============================================================================
// Planning Inputs
// ============================================================================

/// Which body-mass measure drives the protein target
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProteinBasis {
    #[default]
    Ffm,
    BodyWeight,
}

/// Today's self-reported state
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SubjectiveInputs {
    /// 1 (fresh) to 10 (exhausted)
    pub fatigue: u8,
    pub sleep_h: f64,
    /// Recent performance change, percent
    pub perf_change_pct: f64,
}

impl Default for SubjectiveInputs {
    fn default() -> Self {
        Self {
            fatigue: 4,
            sleep_h: 7.5,
            perf_change_pct: 0.0,
        }
    }
}

/// Energy-availability thresholds, kcal per kg FFM per day
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuardConfig {
    /// Hard floor enforced by the guard
    pub ea_min: f64,
    /// Reporting threshold only
    pub ea_pref: f64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            ea_min: 30.0,
            ea_pref: 35.0,
        }
    }
}

/// Training-day detection and its carbohydrate bump
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingDayConfig {
    /// MET·min at or above which the day counts as a training day
    pub load_threshold: f64,
    pub carb_bump_g_per_kg: f64,
}

impl Default for TrainingDayConfig {
    fn default() -> Self {
        Self {
            load_threshold: 900.0,
            carb_bump_g_per_kg: 1.0,
        }
    }
}

// ============================================================================
// History Types
// ============================================================================

/// One day of observed metrics, as stored by the persistence collaborator
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub steps: Option<u32>,
    #[serde(default)]
    pub exercise_min: Option<f64>,
    #[serde(default)]
    pub sleep_h: Option<f64>,
    #[serde(default)]
    pub fatigue: Option<u8>,
    #[serde(default)]
    pub perf_pct: Option<f64>,
    #[serde(default)]
    pub avg_hr: Option<f64>,
    #[serde(default)]
    pub max_hr: Option<f64>,
    #[serde(default)]
    pub load_index: Option<f64>,
}

impl DailyMetrics {
    /// An empty record for `date`
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            weight_kg: None,
            steps: None,
            exercise_min: None,
            sleep_h: None,
            fatigue: None,
            perf_pct: None,
            avg_hr: None,
            max_hr: None,
            load_index: None,
        }
    }
}

// ============================================================================
// Output / Persistence Records
// ============================================================================

/// Classification of a calendar day for scheduling
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    Deficit,
    Maintain,
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayType::Deficit => f.write_str("deficit"),
            DayType::Maintain => f.write_str("maintain"),
        }
    }
}

/// A scheduled day type, emitted for persistence
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DayTypeEntry {
    pub date: NaiveDate,
    pub day_type: DayType,
}

/// Display-rounded targets for one date, as persisted
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DailyTargets {
    pub date: NaiveDate,
    pub target_kcal: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carb_g: f64,
    pub bmr: f64,
    pub pal: f64,
    pub tdee: f64,
    pub deficit: f64,
    pub ea: f64,
    pub ea_guard_applied: bool,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub day_type: Option<DayType>,
}

/// A single logged meal or snack
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IntakeEntry {
    pub id: Uuid,
    pub logged_at: DateTime<Utc>,
    pub date: NaiveDate,
    pub meal_tag: String,
    pub kcal: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carb_g: f64,
    #[serde(default)]
    pub note: String,
    /// Set on a reversal marker: the id of the entry it cancels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverses: Option<Uuid>,
}

impl IntakeEntry {
    /// Marker that cancels `entry` in an append-only log
    pub fn reversal_of(entry: &IntakeEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            logged_at: Utc::now(),
            date: entry.date,
            meal_tag: "undo".into(),
            kcal: 0.0,
            protein_g: 0.0,
            fat_g: 0.0,
            carb_g: 0.0,
            note: format!("undo {}", entry.meal_tag),
            reverses: Some(entry.id),
        }
    }

    pub fn is_reversal(&self) -> bool {
        self.reverses.is_some()
    }
}

/// Summed intake for one date
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct IntakeTotals {
    pub kcal: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carb_g: f64,
}

/// Working sets logged for one muscle group on one day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VolumeEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    pub muscle_group: String,
    pub sets: u32,
}

impl VolumeEntry {
    /// Muscle group names are trimmed and lowercased; zero sets is rejected
    pub fn new(date: NaiveDate, muscle_group: &str, sets: u32) -> Result<Self> {
        let muscle_group = muscle_group.trim().to_lowercase();
        if muscle_group.is_empty() {
            return Err(Error::Validation("muscle group must not be empty".into()));
        }
        if sets == 0 {
            return Err(Error::Validation(format!(
                "sets for {} must be at least 1",
                muscle_group
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            date,
            muscle_group,
            sets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_activity_block() {
        let block: ActivityBlock = "Badminton:60:moderate".parse().unwrap();
        assert_eq!(block.name, "badminton");
        assert_eq!(block.minutes, 60.0);
        assert_eq!(block.intensity, Intensity::Moderate);

        let block: ActivityBlock = "strength:45:high".parse().unwrap();
        assert_eq!(block.intensity, Intensity::High);
    }

    #[test]
    fn test_activity_requires_intensity() {
        let err = "strength:45".parse::<ActivityBlock>().unwrap_err();
        assert!(err.to_string().contains("name:minutes:intensity"));
        assert!("strength:45:".parse::<ActivityBlock>().is_err());
        assert!("strength:45:high:extra".parse::<ActivityBlock>().is_err());
    }

    #[test]
    fn test_reject_negative_minutes() {
        assert!(ActivityBlock::new("cardio", -5.0, Intensity::Low).is_err());
        assert!(ActivityBlock::new("cardio", f64::NAN, Intensity::Low).is_err());
        assert!("cardio:abc:low".parse::<ActivityBlock>().is_err());
        assert!("cardio".parse::<ActivityBlock>().is_err());
    }

    #[test]
    fn test_unknown_intensity() {
        assert!("extreme".parse::<Intensity>().is_err());
        assert_eq!("HIGH".parse::<Intensity>().unwrap(), Intensity::High);
    }

    #[test]
    fn test_with_weight_override() {
        let profile = Profile::default();
        assert_eq!(profile.with_weight(Some(85.0)).weight_kg, 85.0);
        assert_eq!(profile.with_weight(Some(0.0)).weight_kg, 88.2);
        assert_eq!(profile.with_weight(None).weight_kg, 88.2);
    }

    #[test]
    fn test_daily_metrics_partial_json() {
        let json = r#"{"date":"2024-03-01","weight_kg":88.0}"#;
        let m: DailyMetrics = serde_json::from_str(json).unwrap();
        assert_eq!(m.weight_kg, Some(88.0));
        assert!(m.sleep_h.is_none());
    }

    #[test]
    fn test_volume_entry_normalized() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let entry = VolumeEntry::new(date, " Chest ", 4).unwrap();
        assert_eq!(entry.muscle_group, "chest");
        assert!(VolumeEntry::new(date, "  ", 4).is_err());
        assert!(VolumeEntry::new(date, "back", 0).is_err());
    }

    #[test]
    fn test_intake_entry_without_reversal_field() {
        let json = r#"{"id":"67e55044-10b1-426f-9247-bb680e5fe0c8","logged_at":"2024-03-01T08:00:00Z","date":"2024-03-01","meal_tag":"breakfast","kcal":450.0,"protein_g":30.0,"fat_g":10.0,"carb_g":50.0}"#;
        let entry: IntakeEntry = serde_json::from_str(json).unwrap();
        assert!(!entry.is_reversal());

        let undo = IntakeEntry::reversal_of(&entry);
        assert_eq!(undo.reverses, Some(entry.id));
        assert_eq!(undo.date, entry.date);
        assert_eq!(undo.kcal, 0.0);
    }
}
