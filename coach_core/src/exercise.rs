//! Exercise energy and training load from activity blocks.

use crate::types::{ActivityBlock, Catalog};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Exercise totals for one day
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ExerciseLoad {
    pub kcal: f64,
    /// Training-load index, MET·minutes
    pub load_index: f64,
}

/// kcal burned at a MET value over `minutes`
pub fn met_kcal(met: f64, weight_kg: f64, minutes: f64) -> f64 {
    met * 3.5 * weight_kg / 200.0 * minutes
}

/// kcal implied by a logged load index (MET·minutes) alone
pub fn kcal_from_load(load_index: f64, weight_kg: f64) -> f64 {
    met_kcal(load_index, weight_kg, 1.0)
}

/// Sum kcal and MET·minutes over all blocks with a positive duration.
///
/// Fails on the first block whose (activity, intensity) pair is not in the
/// catalog.
pub fn daily_exercise(
    catalog: &Catalog,
    weight_kg: f64,
    activities: &[ActivityBlock],
) -> Result<ExerciseLoad> {
    let mut total = ExerciseLoad::default();

    for block in activities.iter().filter(|b| b.minutes > 0.0) {
        let met = catalog.met(&block.name, block.intensity)?;
        let kcal = met_kcal(met, weight_kg, block.minutes);
        tracing::debug!(
            "{} {} for {} min: MET {} -> {:.1} kcal",
            block.name,
            block.intensity,
            block.minutes,
            met,
            kcal
        );
        total.kcal += kcal;
        total.load_index += met * block.minutes;
    }

    Ok(total)
}

/// Total daily energy expenditure
pub fn tdee(bmr: f64, pal: f64, exercise_kcal: f64) -> f64 {
    bmr * pal + exercise_kcal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_default_catalog;
    use crate::types::Intensity;
    use crate::Error;

    #[test]
    fn test_badminton_hour() {
        let catalog = build_default_catalog();
        let acts = vec![ActivityBlock::new("badminton", 60.0, Intensity::Moderate).unwrap()];

        let load = daily_exercise(&catalog, 88.2, &acts).unwrap();
        assert!((load.kcal - 555.66).abs() < 1e-6);
        assert!((load.load_index - 360.0).abs() < 1e-9);
    }

    #[test]
    fn test_multiple_blocks_sum() {
        let catalog = build_default_catalog();
        let acts = vec![
            ActivityBlock::new("badminton", 60.0, Intensity::Moderate).unwrap(),
            ActivityBlock::new("strength", 55.0, Intensity::Moderate).unwrap(),
        ];

        let load = daily_exercise(&catalog, 88.2, &acts).unwrap();
        assert!((load.load_index - (360.0 + 275.0)).abs() < 1e-9);
        assert!((load.kcal - (555.66 + met_kcal(5.0, 88.2, 55.0))).abs() < 1e-6);
    }

    #[test]
    fn test_zero_minute_blocks_skipped() {
        let catalog = build_default_catalog();
        // Unknown activity with zero minutes is never looked up
        let acts = vec![ActivityBlock::new("swimming", 0.0, Intensity::High).unwrap()];

        let load = daily_exercise(&catalog, 80.0, &acts).unwrap();
        assert_eq!(load, ExerciseLoad::default());
    }

    #[test]
    fn test_unknown_activity_aborts() {
        let catalog = build_default_catalog();
        let acts = vec![
            ActivityBlock::new("cardio", 30.0, Intensity::Low).unwrap(),
            ActivityBlock::new("swimming", 30.0, Intensity::Low).unwrap(),
        ];

        let err = daily_exercise(&catalog, 80.0, &acts).unwrap_err();
        assert!(matches!(err, Error::UnknownActivity { .. }));
    }

    #[test]
    fn test_tdee() {
        assert!((tdee(1800.0, 1.375, 500.0) - 2975.0).abs() < 1e-9);
    }

    #[test]
    fn test_kcal_from_load_matches_blocks() {
        let catalog = build_default_catalog();
        let blocks = [ActivityBlock::new("badminton", 60.0, Intensity::Moderate).unwrap()];
        let load = daily_exercise(&catalog, 88.0, &blocks).unwrap();
        assert!((kcal_from_load(load.load_index, 88.0) - load.kcal).abs() < 1e-9);
        assert_eq!(kcal_from_load(0.0, 88.0), 0.0);
    }
}
