//! Configuration file support for mcoach.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/mcoach/config.toml`.

use crate::types::{GuardConfig, PidConfig, Profile, ProteinBasis, TrainingDayConfig};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub profile: Profile,

    #[serde(default)]
    pub controller: PidConfig,

    #[serde(default)]
    pub guard: GuardConfig,

    #[serde(default)]
    pub training: TrainingDayConfig,

    #[serde(default)]
    pub goals: GoalsConfig,

    #[serde(default)]
    pub activities: ActivitiesConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Rate and macro goals
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GoalsConfig {
    /// Target loss as percent of body mass per week
    #[serde(default = "default_loss_rate_pct")]
    pub loss_rate_pct: f64,

    /// Let the PID controller refine the deficit from the weight trend
    #[serde(default = "default_auto_adjust")]
    pub auto_adjust: bool,

    #[serde(default)]
    pub protein_basis: ProteinBasis,

    #[serde(default = "default_protein_per_kg_ffm")]
    pub protein_per_kg_ffm: f64,
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self {
            loss_rate_pct: default_loss_rate_pct(),
            auto_adjust: default_auto_adjust(),
            protein_basis: ProteinBasis::default(),
            protein_per_kg_ffm: default_protein_per_kg_ffm(),
        }
    }
}

impl GoalsConfig {
    /// Weekly loss target in kg for a given body mass
    pub fn target_loss_week_kg(&self, weight_kg: f64) -> f64 {
        weight_kg * self.loss_rate_pct / 100.0
    }
}

/// Custom activity definition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomActivity {
    pub name: String,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub moderate: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
}

/// Extra activities on top of the built-in MET table
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ActivitiesConfig {
    #[serde(default)]
    pub custom: Vec<CustomActivity>,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        PathBuf::from(home).join(".local/share")
    });
    base.join("mcoach")
}

fn default_loss_rate_pct() -> f64 {
    0.7
}

fn default_auto_adjust() -> bool {
    true
}

fn default_protein_per_kg_ffm() -> f64 {
    2.6
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".config")
        });
        base.join("mcoach").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// The configured profile; a body-fat value of 0 means "unknown".
    pub fn profile(&self) -> Profile {
        let mut profile = self.profile.clone();
        profile.body_fat_pct = profile.body_fat_pct.filter(|bf| *bf > 0.0);
        profile
    }

    /// Reject values the planner cannot work with
    pub fn validate(&self) -> Result<()> {
        let p = &self.profile;
        if !(p.weight_kg > 0.0) || !(p.height_cm > 0.0) {
            return Err(Error::Config(
                "profile weight_kg and height_cm must be positive".into(),
            ));
        }
        if let Some(bf) = p.body_fat_pct {
            if !(0.0..100.0).contains(&bf) {
                return Err(Error::Config(format!(
                    "profile body_fat_pct must be in [0, 100), got {}",
                    bf
                )));
            }
        }
        if !(p.baseline_pal > 0.0) {
            return Err(Error::Config("profile baseline_pal must be positive".into()));
        }
        if !(0.0..1.0).contains(&p.min_deficit)
            || !(0.0..1.0).contains(&p.max_deficit)
            || p.min_deficit > p.max_deficit
        {
            return Err(Error::Config(format!(
                "deficit bounds must satisfy 0 <= min <= max < 1, got [{}, {}]",
                p.min_deficit, p.max_deficit
            )));
        }
        if self.controller.integral_cap < 0.0 {
            return Err(Error::Config("controller integral_cap must be >= 0".into()));
        }
        if self.guard.ea_min < 0.0 {
            return Err(Error::Config("guard ea_min must be >= 0".into()));
        }
        if self.training.carb_bump_g_per_kg < 0.0 {
            return Err(Error::Config(
                "training carb_bump_g_per_kg must be >= 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sex;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.profile.sex, Sex::Male);
        assert_eq!(config.controller.kp, 0.35);
        assert_eq!(config.controller.integral_cap, 0.15);
        assert_eq!(config.guard.ea_min, 30.0);
        assert_eq!(config.training.load_threshold, 900.0);
        assert_eq!(config.goals.loss_rate_pct, 0.7);
        assert!(config.goals.auto_adjust);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.profile, parsed.profile);
        assert_eq!(config.controller, parsed.controller);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[profile]
weight_kg = 80.0
sex = "female"

[goals]
protein_basis = "body_weight"

[[activities.custom]]
name = "rowing"
moderate = 7.0
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.profile.weight_kg, 80.0);
        assert_eq!(config.profile.sex, Sex::Female);
        assert_eq!(config.profile.age, 21); // default
        assert_eq!(config.goals.protein_basis, ProteinBasis::BodyWeight);
        assert_eq!(config.goals.loss_rate_pct, 0.7); // default
        assert_eq!(config.activities.custom.len(), 1);
    }

    #[test]
    fn test_zero_body_fat_means_unknown() {
        let mut config = Config::default();
        config.profile.body_fat_pct = Some(0.0);
        assert!(config.profile().body_fat_pct.is_none());
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let mut config = Config::default();
        config.profile.min_deficit = 0.3;
        config.profile.max_deficit = 0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.goals.loss_rate_pct = 1.0;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.goals.loss_rate_pct, 1.0);
    }

    #[test]
    fn test_target_loss_week_kg() {
        let goals = GoalsConfig::default();
        assert!((goals.target_loss_week_kg(100.0) - 0.7).abs() < 1e-9);
    }
}
