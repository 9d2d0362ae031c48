//! Phase scheduler: pre-generates day types and base targets for N days.
//!
//! Scheduled targets carry no exercise; the day's plan overwrites them once
//! real activity and recovery data exist.

use crate::composer::remainder_carbs;
use crate::planner::round_to;
use crate::types::{DailyTargets, DayType, DayTypeEntry, Profile};
use crate::{metabolic, Error, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deficit/maintenance alternation pattern
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SchedulePattern {
    /// Every day is a deficit day
    #[serde(rename = "continuous")]
    Continuous,
    /// Five deficit days, two maintenance days
    #[serde(rename = "5+2")]
    FivePlusTwo,
    /// Two-phase cycle: 14 deficit days then 14 maintenance days
    #[serde(rename = "matador_2+2")]
    Matador,
}

impl SchedulePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulePattern::Continuous => "continuous",
            SchedulePattern::FivePlusTwo => "5+2",
            SchedulePattern::Matador => "matador_2+2",
        }
    }

    /// Day type for the `index`-th day of the schedule (0-based)
    pub fn day_type(&self, index: usize) -> DayType {
        let maintain = match self {
            SchedulePattern::Continuous => false,
            SchedulePattern::FivePlusTwo => index % 7 >= 5,
            SchedulePattern::Matador => index % 28 >= 14,
        };
        if maintain {
            DayType::Maintain
        } else {
            DayType::Deficit
        }
    }
}

impl fmt::Display for SchedulePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchedulePattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "continuous" => Ok(SchedulePattern::Continuous),
            "5+2" => Ok(SchedulePattern::FivePlusTwo),
            "matador_2+2" | "matador" => Ok(SchedulePattern::Matador),
            other => Err(Error::UnknownPattern(other.to_string())),
        }
    }
}

/// One generated day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScheduledDay {
    pub entry: DayTypeEntry,
    pub targets: DailyTargets,
}

/// Generate `days` consecutive days starting at `start`.
///
/// TDEE is `BMR · pal` with no exercise; deficit days target
/// `TDEE · (1 − deficit)`, maintenance days target TDEE with zero deficit.
#[allow(clippy::too_many_arguments)]
pub fn schedule(
    profile: &Profile,
    start: NaiveDate,
    days: usize,
    pattern: SchedulePattern,
    deficit: f64,
    pal: f64,
    protein_g: f64,
    fat_g: f64,
) -> Vec<ScheduledDay> {
    let bmr = metabolic::bmr(profile);
    let tdee = bmr * pal;
    let notes = format!("pre-generated ({})", pattern);

    let out: Vec<ScheduledDay> = (0..days)
        .map(|i| {
            let date = start + Duration::days(i as i64);
            let day_type = pattern.day_type(i);
            let deficit_used = match day_type {
                DayType::Deficit => deficit,
                DayType::Maintain => 0.0,
            };
            let target_kcal = tdee * (1.0 - deficit_used);
            let carb_g = remainder_carbs(target_kcal, protein_g, fat_g);

            ScheduledDay {
                entry: DayTypeEntry { date, day_type },
                targets: DailyTargets {
                    date,
                    target_kcal: round_to(target_kcal, 0),
                    protein_g: round_to(protein_g, 0),
                    fat_g: round_to(fat_g, 0),
                    carb_g: round_to(carb_g, 0),
                    bmr: round_to(bmr, 1),
                    pal: round_to(pal, 2),
                    tdee: round_to(tdee, 0),
                    deficit: round_to(deficit_used, 3),
                    ea: 0.0,
                    ea_guard_applied: false,
                    notes: notes.clone(),
                    day_type: Some(day_type),
                },
            }
        })
        .collect();

    tracing::info!(
        "Scheduled {} days from {} ({}), TDEE {:.0}",
        out.len(),
        start,
        pattern,
        tdee
    );
    out
}
