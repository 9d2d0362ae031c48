//! Basal metabolic rate, fat-free mass and effective PAL.

use crate::types::{Profile, Sex};

/// Steps per day already covered by the baseline PAL
pub const BASELINE_STEPS: u32 = 7000;

/// PAL added per [`STEP_PAL_INTERVAL`] steps above the baseline
pub const STEP_PAL_INCREMENT: f64 = 0.05;
pub const STEP_PAL_INTERVAL: f64 = 2000.0;

/// FFM fraction assumed when body fat is unknown
pub const DEFAULT_FFM_FRACTION: f64 = 0.75;

/// Mifflin-St Jeor BMR, kcal/day
pub fn mifflin_bmr(sex: Sex, age: u32, height_cm: f64, weight_kg: f64) -> f64 {
    let offset = match sex {
        Sex::Male => 5.0,
        Sex::Female => -161.0,
    };
    10.0 * weight_kg + 6.25 * height_cm - 5.0 * age as f64 + offset
}

/// Katch-McArdle BMR, kcal/day
pub fn katch_bmr(weight_kg: f64, body_fat_pct: f64) -> f64 {
    370.0 + 21.6 * lean_mass(weight_kg, body_fat_pct)
}

fn lean_mass(weight_kg: f64, body_fat_pct: f64) -> f64 {
    weight_kg * (1.0 - body_fat_pct / 100.0)
}

/// Fat-free mass in kg, approximated as 75% of body mass when body fat is unknown
pub fn ffm(weight_kg: f64, body_fat_pct: Option<f64>) -> f64 {
    match body_fat_pct {
        Some(bf) => lean_mass(weight_kg, bf),
        None => weight_kg * DEFAULT_FFM_FRACTION,
    }
}

/// BMR for a profile: Katch-McArdle when body fat is known, else Mifflin-St Jeor
pub fn bmr(profile: &Profile) -> f64 {
    match profile.body_fat_pct {
        Some(bf) => katch_bmr(profile.weight_kg, bf),
        None => mifflin_bmr(profile.sex, profile.age, profile.height_cm, profile.weight_kg),
    }
}

/// Baseline PAL nudged up by steps beyond [`BASELINE_STEPS`]
pub fn effective_pal(baseline_pal: f64, steps: Option<u32>) -> f64 {
    match steps {
        Some(steps) => {
            let extra = steps.saturating_sub(BASELINE_STEPS) as f64;
            baseline_pal + extra / STEP_PAL_INTERVAL * STEP_PAL_INCREMENT
        }
        None => baseline_pal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_mifflin_male_and_female() {
        // 10*88.2 + 6.25*181 - 5*21 + 5
        assert!(approx(mifflin_bmr(Sex::Male, 21, 181.0, 88.2), 1913.25, 1e-9));
        assert!(approx(mifflin_bmr(Sex::Female, 21, 181.0, 88.2), 1747.25, 1e-9));
    }

    #[test]
    fn test_katch_used_when_body_fat_known() {
        let profile = Profile::default();
        assert!(approx(ffm(88.2, Some(24.0)), 67.032, 1e-9));
        assert!(approx(bmr(&profile), 370.0 + 21.6 * 67.032, 1e-9));
    }

    #[test]
    fn test_mifflin_used_when_body_fat_unknown() {
        let profile = Profile {
            body_fat_pct: None,
            ..Profile::default()
        };
        assert!(approx(bmr(&profile), 1913.25, 1e-9));
        assert!(approx(ffm(88.2, None), 66.15, 1e-9));
    }

    #[test]
    fn test_effective_pal_from_steps() {
        assert!(approx(effective_pal(1.35, Some(8000)), 1.375, 1e-12));
        assert!(approx(effective_pal(1.35, Some(11000)), 1.45, 1e-12));
        assert_eq!(effective_pal(1.35, Some(3000)), 1.35);
        assert_eq!(effective_pal(1.35, None), 1.35);
    }
}
