use serde::Deserialize;
use thiserror::Error;

use crate::acu::SimulatorConfig;
use crate::command::CommandContext;
use crate::controller::ControllerSettings;
use crate::envelope::KinematicEnvelope;
use crate::pattern::{Site, MIN_SAMPLE_SPACING_S};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid site coordinates: {0:?}")]
    Site(String),
    #[error("invalid duration for {field}: {message}")]
    Duration {
        field: &'static str,
        message: String,
    },
    #[error("sample interval {0}s is below the 0.05s minimum")]
    SampleInterval(f64),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub envelope: KinematicEnvelope,
    pub trajectory: TrajectoryConfig,
    pub controller: ControllerConfig,
    pub web: WebConfig,
    pub simulator: SimulatorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// `"lat, lon"` in degrees.
    pub coordinates: String,
    pub altitude_m: f64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            coordinates: "0, 0".to_string(),
            altitude_m: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrajectoryConfig {
    pub sample_interval_s: f64,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            sample_interval_s: 0.1,
        }
    }
}

/// Durations are humantime strings, e.g. `200ms` or `5m`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub poll_interval: String,
    pub settle_timeout: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: "200ms".to_string(),
            settle_timeout: "5m".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn site(&self) -> Result<Site, ConfigError> {
        Site::from_coordinates(&self.site.coordinates, Some(self.site.altitude_m))
            .ok_or_else(|| ConfigError::Site(self.site.coordinates.clone()))
    }

    pub fn context(&self) -> Result<CommandContext, ConfigError> {
        let interval = self.trajectory.sample_interval_s;
        if !(interval >= MIN_SAMPLE_SPACING_S) {
            return Err(ConfigError::SampleInterval(interval));
        }
        Ok(CommandContext {
            envelope: self.envelope,
            site: self.site()?,
            sample_interval: interval,
        })
    }

    pub fn controller_settings(&self) -> Result<ControllerSettings, ConfigError> {
        Ok(ControllerSettings {
            poll_interval: parse_duration("poll_interval", &self.controller.poll_interval)?,
            settle_timeout: parse_duration("settle_timeout", &self.controller.settle_timeout)?,
        })
    }
}

fn parse_duration(field: &'static str, s: &str) -> Result<std::time::Duration, ConfigError> {
    humantime::parse_duration(s.trim()).map_err(|e| ConfigError::Duration {
        field,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.web.bind, "0.0.0.0:8080");
        let ctx = config.context().unwrap();
        assert_eq!(ctx, CommandContext::default());
        assert_eq!(
            config.controller_settings().unwrap(),
            ControllerSettings::default()
        );
    }

    #[test]
    fn test_overrides() {
        let yaml = "
site:
  coordinates: \"-22.9856, -67.7404\"
  altitude_m: 5612
envelope:
  elevation:
    min: 15
    max: 90
    max_speed: 1.0
    max_accel: 1.0
    max_jerk: 4.0
trajectory:
  sample_interval_s: 0.05
controller:
  poll_interval: 1s
  settle_timeout: 90s
simulator:
  fail_uploads: true
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let ctx = config.context().unwrap();
        assert_eq!(ctx.site.latitude_deg, -22.9856);
        assert_eq!(ctx.site.altitude_m, 5612.0);
        assert_eq!(ctx.envelope.elevation.min, 15.0);
        assert_eq!(ctx.envelope.azimuth, KinematicEnvelope::default().azimuth);
        assert_eq!(ctx.sample_interval, 0.05);
        assert!(ctx.envelope.check_az_el(0.0, 10.0, 0.0, 0.0).is_err());

        let settings = config.controller_settings().unwrap();
        assert_eq!(settings.poll_interval, Duration::from_secs(1));
        assert_eq!(settings.settle_timeout, Duration::from_secs(90));
        assert!(config.simulator.fail_uploads);
        assert_eq!(config.simulator.initial_elevation, 90.0);
    }

    #[test]
    fn test_invalid_values() {
        let config: Config = serde_yaml::from_str("trajectory: {sample_interval_s: 0.01}").unwrap();
        assert!(matches!(
            config.context(),
            Err(ConfigError::SampleInterval(_))
        ));

        let config: Config = serde_yaml::from_str("controller: {poll_interval: soon}").unwrap();
        assert!(matches!(
            config.controller_settings(),
            Err(ConfigError::Duration {
                field: "poll_interval",
                ..
            })
        ));

        let config: Config = serde_yaml::from_str("site: {coordinates: nowhere}").unwrap();
        assert!(matches!(config.context(), Err(ConfigError::Site(_))));
    }
}
