use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::{start_pattern, CommandContext, CommandError, Started};
use crate::abort::AbortSignal;
use crate::acu::Mount;
use crate::envelope::Axis;
use crate::pattern::{AzimuthScanPattern, AzimuthScanSpec};

/// Back-and-forth sweep in azimuth at constant elevation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct AzimuthScanCommand {
    #[schema(value_type = Vec<f64>)]
    pub azimuth_range: [f64; 2],
    pub elevation: f64,
    pub num_scans: i64,
    pub start_time: DateTime<Utc>,
    /// Seconds spent reversing between legs.
    pub turnaround_time: f64,
    /// Sweep speed, deg/s.
    pub speed: f64,
}

impl AzimuthScanCommand {
    fn spec(&self) -> Result<AzimuthScanSpec, CommandError> {
        let num_scans = u32::try_from(self.num_scans)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| CommandError::Scan(format!("num_scans {} < 1", self.num_scans)))?;
        Ok(AzimuthScanSpec {
            start: self.start_time,
            azimuth_range: self.azimuth_range,
            elevation: self.elevation,
            num_scans,
            speed: self.speed,
            turnaround_s: self.turnaround_time,
        })
    }

    pub(super) fn pattern(&self, ctx: &CommandContext) -> Result<AzimuthScanPattern, CommandError> {
        Ok(AzimuthScanPattern::new(self.spec()?, ctx.sample_interval)?)
    }

    /// Checks the sweep shape and that the whole sweep, including the
    /// turnaround overshoot, stays inside the envelope.
    pub fn check(&self, ctx: &CommandContext) -> Result<(), CommandError> {
        let [lo, hi] = self.azimuth_range;
        let finite = [lo, hi, self.elevation, self.turnaround_time, self.speed];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(CommandError::Scan("parameters must be finite".into()));
        }
        if lo >= hi {
            return Err(CommandError::Scan(format!(
                "azimuth range [{lo}, {hi}] is not increasing"
            )));
        }
        if self.speed <= 0.0 {
            return Err(CommandError::Scan(format!(
                "speed {} must be positive",
                self.speed
            )));
        }
        if self.turnaround_time < 0.0 {
            return Err(CommandError::Scan(format!(
                "turnaround_time {} is negative",
                self.turnaround_time
            )));
        }
        let spec = self.spec()?;
        if spec.leg_duration() < ctx.sample_interval {
            return Err(CommandError::Scan(format!(
                "leg of {:.3}s is shorter than one sample",
                spec.leg_duration()
            )));
        }

        let overshoot = spec.overshoot();
        ctx.envelope
            .check_az_el(lo - overshoot, self.elevation, self.speed, 0.0)?;
        ctx.envelope
            .check_az_el(hi + overshoot, self.elevation, -self.speed, 0.0)?;
        if let Some(accel) = spec.turnaround_accel() {
            ctx.envelope.check_accel(Axis::Azimuth, accel)?;
        }
        Ok(())
    }

    pub async fn start(
        &self,
        ctx: &CommandContext,
        abort: &AbortSignal,
        mount: Arc<dyn Mount>,
    ) -> Result<Started, CommandError> {
        let pattern = self.pattern(ctx)?;
        start_pattern(abort, mount, Arc::new(pattern)).await
    }
}
