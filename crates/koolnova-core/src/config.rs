// ── Runtime coordinator configuration ──
//
// Plain value types describing how the coordinator polls and which
// setpoints/modes the installation allows. An outer collaborator
// (config UI, file loader) constructs these -- core never reads files.

use koolnova_api::{ProjectMode, ZoneStatus};

use crate::error::CoreError;

pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 10;
pub const MIN_UPDATE_INTERVAL_SECS: u64 = 5;
pub const MAX_UPDATE_INTERVAL_SECS: u64 = 300;

/// Scheduled full refreshes happen every Nth tick; the default keeps
/// project-level data at most a minute stale at the default interval.
pub const DEFAULT_FULL_REFRESH_EVERY: u32 = 6;

pub const DEFAULT_MIN_TEMP: f64 = 21.0;
pub const DEFAULT_MAX_TEMP: f64 = 27.0;
pub const MIN_CONFIGURABLE_TEMP: f64 = 15.0;
pub const MAX_CONFIGURABLE_TEMP: f64 = 35.0;
pub const DEFAULT_TEMP_PRECISION: f64 = 0.5;

/// Configuration for a single coordinator instance.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Seconds between scheduled polling ticks.
    pub update_interval_secs: u64,
    /// Full refresh (projects + zones) every Nth tick; other ticks
    /// fetch zones only.
    pub full_refresh_every: u32,
    /// Lowest configurable setpoint, Celsius.
    pub min_temp: f64,
    /// Highest configurable setpoint, Celsius.
    pub max_temp: f64,
    /// Setpoint granularity: 0.5 or 1.0.
    pub temp_precision: f64,
    /// Operating modes offered at the project level.
    pub project_modes: Vec<ProjectMode>,
    /// Modes offered at the zone level.
    pub zone_modes: Vec<ZoneStatus>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            full_refresh_every: DEFAULT_FULL_REFRESH_EVERY,
            min_temp: DEFAULT_MIN_TEMP,
            max_temp: DEFAULT_MAX_TEMP,
            temp_precision: DEFAULT_TEMP_PRECISION,
            project_modes: vec![ProjectMode::Cool, ProjectMode::Heat],
            zone_modes: vec![ZoneStatus::Off, ZoneStatus::Auto],
        }
    }
}

impl CoordinatorConfig {
    /// Check the invariants an outer collaborator must uphold.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.full_refresh_every == 0 {
            return Err(CoreError::Config {
                message: "full_refresh_every must be at least 1".into(),
            });
        }
        if !(MIN_UPDATE_INTERVAL_SECS..=MAX_UPDATE_INTERVAL_SECS)
            .contains(&self.update_interval_secs)
        {
            return Err(CoreError::Config {
                message: format!(
                    "update_interval_secs must be within {MIN_UPDATE_INTERVAL_SECS}..={MAX_UPDATE_INTERVAL_SECS}, got {}",
                    self.update_interval_secs
                ),
            });
        }
        if self.min_temp < MIN_CONFIGURABLE_TEMP
            || self.max_temp > MAX_CONFIGURABLE_TEMP
            || self.min_temp >= self.max_temp
        {
            return Err(CoreError::Config {
                message: format!(
                    "temperature bounds {}..{} outside the configurable range {MIN_CONFIGURABLE_TEMP}..{MAX_CONFIGURABLE_TEMP}",
                    self.min_temp, self.max_temp
                ),
            });
        }
        if self.temp_precision != 0.5 && self.temp_precision != 1.0 {
            return Err(CoreError::Config {
                message: format!("temp_precision must be 0.5 or 1.0, got {}", self.temp_precision),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        CoordinatorConfig::default().validate().expect("valid");
    }

    #[test]
    fn zero_frequency_is_rejected() {
        let config = CoordinatorConfig {
            full_refresh_every: 0,
            ..CoordinatorConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config { .. })));
    }

    #[test]
    fn out_of_range_interval_is_rejected() {
        let config = CoordinatorConfig {
            update_interval_secs: 2,
            ..CoordinatorConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config { .. })));
    }

    #[test]
    fn inverted_temperature_bounds_are_rejected() {
        let config = CoordinatorConfig {
            min_temp: 28.0,
            max_temp: 21.0,
            ..CoordinatorConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config { .. })));
    }
}
