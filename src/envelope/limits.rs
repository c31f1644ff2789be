use serde::{Deserialize, Serialize};
use strum_macros::Display;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Axis {
    Azimuth,
    Elevation,
}

/// Static limits for one mount axis. Units are degrees and seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AxisLimits {
    pub min: f64,
    pub max: f64,
    pub max_speed: f64,
    pub max_accel: f64,
    pub max_jerk: f64,
}

impl AxisLimits {
    pub fn contains(&self, position: f64) -> bool {
        (self.min..=self.max).contains(&position)
    }

    // NaN never satisfies `<=`, so it is reported as a violation.
    pub fn speed_ok(&self, velocity: f64) -> bool {
        velocity.abs() <= self.max_speed
    }

    pub fn accel_ok(&self, accel: f64) -> bool {
        accel.abs() <= self.max_accel
    }
}

/// Kinematic envelope of the mount.
///
/// Built once at start-up (defaults match the ACU datasheet, `envelope`
/// in the config file overrides them) and shared read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct KinematicEnvelope {
    pub azimuth: AxisLimits,
    pub elevation: AxisLimits,
}

impl Default for KinematicEnvelope {
    fn default() -> Self {
        Self {
            azimuth: AxisLimits {
                min: -180.0,
                max: 360.0,
                max_speed: 3.0,
                max_accel: 6.0,
                max_jerk: 12.0,
            },
            elevation: AxisLimits {
                min: 0.0,
                max: 180.0,
                max_speed: 1.5,
                max_accel: 1.5,
                max_jerk: 6.0,
            },
        }
    }
}

impl KinematicEnvelope {
    pub fn axis(&self, axis: Axis) -> &AxisLimits {
        match axis {
            Axis::Azimuth => &self.azimuth,
            Axis::Elevation => &self.elevation,
        }
    }
}
