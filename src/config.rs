//! Predictor configuration

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::clock::{DayClock, TimeOfDay};
use crate::error::ConfigError;
use crate::logging::LogFormat;

/// Main configuration for a predictor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub rules: RuleConfig,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub splash: SplashConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Manhattan radius of the scanned neighbourhood around the actor.
    #[serde(default = "default_tile_radius")]
    pub tile_radius: u32,
    /// Minutes between fresh snapshots of the live generator.
    #[serde(default = "default_respawn_interval")]
    pub respawn_interval_minutes: u32,
    /// Trials per seeded outcome before giving up.
    #[serde(default = "default_seeded_attempts")]
    pub seeded_attempts: u32,
    /// Multiplier applied to the occurrence count in trial seeds.
    #[serde(default = "default_seeded_seed_stride")]
    pub seeded_seed_stride: u64,
    #[serde(default)]
    pub enable_on_load: bool,
}

/// Every tile in the radius is probed each tick, so the neighbourhood stays small.
pub const MAX_TILE_RADIUS: u32 = 64;

fn default_tile_radius() -> u32 {
    8
}

fn default_respawn_interval() -> u32 {
    30
}

fn default_seeded_attempts() -> u32 {
    20
}

fn default_seeded_seed_stride() -> u64 {
    859
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            tile_radius: default_tile_radius(),
            respawn_interval_minutes: default_respawn_interval(),
            seeded_attempts: default_seeded_attempts(),
            seeded_seed_stride: default_seeded_seed_stride(),
            enable_on_load: false,
        }
    }
}

/// How the predictor reacts to rod activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default = "default_true")]
    pub freeze_on_cast: bool,
    #[serde(default = "default_true")]
    pub respawn_on_cancel: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            freeze_on_cast: true,
            respawn_on_cancel: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_start_of_day")]
    pub start_of_day: TimeOfDay,
    #[serde(default = "default_end_of_day")]
    pub end_of_day: TimeOfDay,
    #[serde(default = "default_step_minutes")]
    pub step_minutes: u32,
}

fn default_start_of_day() -> TimeOfDay {
    TimeOfDay::new(600)
}

fn default_end_of_day() -> TimeOfDay {
    TimeOfDay::new(2600)
}

fn default_step_minutes() -> u32 {
    10
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            start_of_day: default_start_of_day(),
            end_of_day: default_end_of_day(),
            step_minutes: default_step_minutes(),
        }
    }
}

impl ClockConfig {
    pub fn day_clock(&self) -> DayClock {
        DayClock {
            start: self.start_of_day,
            end: self.end_of_day,
            step_minutes: self.step_minutes,
        }
    }
}

/// Tuning of the splash (timed event) rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplashConfig {
    #[serde(default = "default_duration_weight")]
    pub duration_weight: f64,
    #[serde(default = "default_end_threshold")]
    pub end_threshold: f64,
    #[serde(default = "default_start_chance")]
    pub start_chance: f64,
    #[serde(default = "default_placement_tries")]
    pub placement_tries: u32,
    #[serde(default = "default_min_distance_to_land")]
    pub min_distance_to_land: u32,
    #[serde(default = "default_max_distance_to_land")]
    pub max_distance_to_land: u32,
    #[serde(default = "default_min_duration")]
    pub min_duration: u32,
    #[serde(default = "default_min_special_duration")]
    pub min_special_duration: u32,
    #[serde(default = "default_special_threshold")]
    pub default_special_threshold: f64,
    /// Upper bound for the special-variant roll range.
    #[serde(default = "default_special_roll_range")]
    pub special_roll_range: u32,
    #[serde(default = "default_max_special_start_time")]
    pub max_special_start_time: TimeOfDay,
    #[serde(default = "default_min_days_early")]
    pub min_days_early: u32,
    #[serde(default = "default_min_days_late")]
    pub min_days_late: u32,
    #[serde(default = "default_min_kinds_caught_early")]
    pub min_kinds_caught_early: u32,
}

fn default_duration_weight() -> f64 {
    1800.0
}

fn default_end_threshold() -> f64 {
    0.1
}

fn default_start_chance() -> f64 {
    0.5
}

fn default_placement_tries() -> u32 {
    2
}

fn default_min_distance_to_land() -> u32 {
    1
}

fn default_max_distance_to_land() -> u32 {
    4
}

fn default_min_duration() -> u32 {
    60
}

fn default_min_special_duration() -> u32 {
    120
}

fn default_special_threshold() -> f64 {
    0.01
}

fn default_special_roll_range() -> u32 {
    500
}

fn default_max_special_start_time() -> TimeOfDay {
    TimeOfDay::new(2300)
}

fn default_min_days_early() -> u32 {
    3
}

fn default_min_days_late() -> u32 {
    14
}

fn default_min_kinds_caught_early() -> u32 {
    3
}

impl Default for SplashConfig {
    fn default() -> Self {
        Self {
            duration_weight: default_duration_weight(),
            end_threshold: default_end_threshold(),
            start_chance: default_start_chance(),
            placement_tries: default_placement_tries(),
            min_distance_to_land: default_min_distance_to_land(),
            max_distance_to_land: default_max_distance_to_land(),
            min_duration: default_min_duration(),
            min_special_duration: default_min_special_duration(),
            default_special_threshold: default_special_threshold(),
            special_roll_range: default_special_roll_range(),
            max_special_start_time: default_max_special_start_time(),
            min_days_early: default_min_days_early(),
            min_days_late: default_min_days_late(),
            min_kinds_caught_early: default_min_kinds_caught_early(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preview.tile_radius == 0 {
            return Err(ConfigError::Validation(
                "preview.tile_radius must be at least 1".to_string(),
            ));
        }
        if self.preview.tile_radius > MAX_TILE_RADIUS {
            return Err(ConfigError::Validation(format!(
                "preview.tile_radius ({}) must not exceed {MAX_TILE_RADIUS}",
                self.preview.tile_radius
            )));
        }
        if self.clock.step_minutes == 0 {
            return Err(ConfigError::Validation(
                "clock.step_minutes must be at least 1".to_string(),
            ));
        }
        if self.clock.end_of_day <= self.clock.start_of_day {
            return Err(ConfigError::Validation(format!(
                "clock.end_of_day ({}) must be after clock.start_of_day ({})",
                self.clock.end_of_day.raw(),
                self.clock.start_of_day.raw()
            )));
        }
        if self.splash.duration_weight <= 0.0 {
            return Err(ConfigError::Validation(
                "splash.duration_weight must be positive".to_string(),
            ));
        }
        if self.splash.min_distance_to_land > self.splash.max_distance_to_land {
            return Err(ConfigError::Validation(
                "splash.min_distance_to_land exceeds max_distance_to_land".to_string(),
            ));
        }
        if self.splash.special_roll_range == 0 {
            return Err(ConfigError::Validation(
                "splash.special_roll_range must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
