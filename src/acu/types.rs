use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use utoipa::ToSchema;

/// Number of entries in the ACU program-track stack.
pub const PROGRAM_TRACK_STACK_CAPACITY: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize, ToSchema)]
pub enum ControlMode {
    Stop,
    Preset,
    ProgramTrack,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AxisStatus {
    pub mode: ControlMode,
    pub commanded_position: f64,
    pub current_position: f64,
    pub current_velocity: f64,
}

impl AxisStatus {
    pub fn position_error(&self) -> f64 {
        (self.current_position - self.commanded_position).abs()
    }
}

/// One telemetry snapshot from the ACU general status dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Status {
    pub timestamp: DateTime<Utc>,
    pub azimuth: AxisStatus,
    pub elevation: AxisStatus,
    pub free_stack_slots: u32,
}
