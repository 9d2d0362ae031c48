//! Activity catalog: MET values per (activity, intensity).
//!
//! The built-in table covers badminton, strength and cardio. Custom activities
//! from config can be merged in with [`Catalog::with_custom`].

use crate::config::CustomActivity;
use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog_internal);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog.
///
/// **Note**: prefer [`get_default_catalog`] unless the catalog is about to be
/// extended with custom activities.
pub fn build_default_catalog() -> Catalog {
    build_default_catalog_internal()
}

fn build_default_catalog_internal() -> Catalog {
    let mut activities = HashMap::new();
    activities.insert("badminton".into(), MetValues::new(4.5, 6.0, 7.0));
    activities.insert("strength".into(), MetValues::new(3.5, 5.0, 6.0));
    activities.insert("cardio".into(), MetValues::new(5.0, 7.0, 10.0));
    Catalog { activities }
}

impl Catalog {
    /// Look up the MET value for an (activity, intensity) pair.
    ///
    /// Unknown pairs are a hard error, never a default.
    pub fn met(&self, activity: &str, intensity: Intensity) -> Result<f64> {
        let key = activity.trim().to_lowercase();
        self.activities
            .get(&key)
            .and_then(|values| values.get(intensity))
            .ok_or_else(|| Error::UnknownActivity {
                activity: activity.to_string(),
                intensity: intensity.to_string(),
            })
    }

    /// Merge custom activities into a copy of this catalog.
    ///
    /// Custom names may not shadow an existing activity.
    pub fn with_custom(&self, custom: &[CustomActivity]) -> Result<Catalog> {
        let mut catalog = self.clone();
        for activity in custom {
            let key = activity.name.trim().to_lowercase();
            if key.is_empty() {
                return Err(Error::CatalogValidation(
                    "custom activity with empty name".into(),
                ));
            }
            if catalog.activities.contains_key(&key) {
                return Err(Error::CatalogValidation(format!(
                    "custom activity '{}' collides with an existing activity",
                    key
                )));
            }
            catalog.activities.insert(
                key,
                MetValues {
                    low: activity.low,
                    moderate: activity.moderate,
                    high: activity.high,
                },
            );
        }
        tracing::debug!(
            "Catalog has {} activities after merging {} custom",
            catalog.activities.len(),
            custom.len()
        );
        Ok(catalog)
    }

    /// Validate the catalog, returning every problem found
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (name, values) in &self.activities {
            let defined: Vec<(Intensity, f64)> = [Intensity::Low, Intensity::Moderate, Intensity::High]
                .into_iter()
                .filter_map(|i| values.get(i).map(|met| (i, met)))
                .collect();

            if defined.is_empty() {
                errors.push(format!("Activity '{}' has no MET values", name));
            }

            for (intensity, met) in defined {
                if !met.is_finite() || met <= 0.0 {
                    errors.push(format!(
                        "Activity '{}' has invalid MET {} for {}",
                        name, met, intensity
                    ));
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_met_values() {
        let catalog = build_default_catalog();
        assert_eq!(catalog.met("badminton", Intensity::Moderate).unwrap(), 6.0);
        assert_eq!(catalog.met("strength", Intensity::Low).unwrap(), 3.5);
        assert_eq!(catalog.met("cardio", Intensity::High).unwrap(), 10.0);
        assert_eq!(catalog.met(" Cardio ", Intensity::Low).unwrap(), 5.0);
    }

    #[test]
    fn test_unknown_activity_is_error() {
        let catalog = get_default_catalog();
        let err = catalog.met("swimming", Intensity::High).unwrap_err();
        assert!(matches!(err, Error::UnknownActivity { .. }));
        assert_eq!(err.to_string(), "Unknown MET for swimming-high");
    }

    #[test]
    fn test_custom_activity_partial_intensities() {
        let custom = vec![CustomActivity {
            name: "Rowing".into(),
            low: None,
            moderate: Some(7.0),
            high: Some(8.5),
        }];
        let catalog = build_default_catalog().with_custom(&custom).unwrap();

        assert_eq!(catalog.met("rowing", Intensity::High).unwrap(), 8.5);
        assert!(matches!(
            catalog.met("rowing", Intensity::Low),
            Err(Error::UnknownActivity { .. })
        ));
    }

    #[test]
    fn test_custom_cannot_shadow_builtin() {
        let custom = vec![CustomActivity {
            name: "badminton".into(),
            low: Some(1.0),
            moderate: None,
            high: None,
        }];
        assert!(build_default_catalog().with_custom(&custom).is_err());
    }

    #[test]
    fn test_default_catalog_validates() {
        let catalog = build_default_catalog();
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_validate_flags_bad_met() {
        let custom = vec![
            CustomActivity {
                name: "broken".into(),
                low: Some(-1.0),
                moderate: None,
                high: None,
            },
            CustomActivity {
                name: "empty".into(),
                low: None,
                moderate: None,
                high: None,
            },
        ];
        let catalog = build_default_catalog().with_custom(&custom).unwrap();
        assert_eq!(catalog.validate().len(), 2);
    }
}
