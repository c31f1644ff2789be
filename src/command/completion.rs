use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::acu::{ControlMode, Status, PROGRAM_TRACK_STACK_CAPACITY};

pub const POSITION_TOLERANCE_DEG: f64 = 1e-4;
pub const SPEED_TOLERANCE_DEG_S: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompletionError {
    #[error("telemetry reports {free} free stack slots, capacity is {capacity}")]
    StackOverflow { free: u32, capacity: u32 },
}

/// The end state a started command is waiting for.
///
/// Evaluation looks at one snapshot at a time and keeps no state, so it
/// relies on snapshots arriving in time order: a stale snapshot can report
/// completion too early or too late.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Completion {
    /// Both axes settled on their preset setpoint.
    Preset {
        position_tolerance: f64,
        speed_tolerance: f64,
    },
    /// The program-track stack has drained to its final point and the mount
    /// has stopped.
    ProgramTrack {
        final_free_slots: u32,
        speed_tolerance: f64,
        /// Time of the last trajectory point. Snapshots stamped earlier are
        /// never complete: mid-upload the slot count can pass through
        /// `final_free_slots` before the last point is queued.
        not_before: Option<DateTime<Utc>>,
    },
}

impl Completion {
    pub fn preset() -> Self {
        Completion::Preset {
            position_tolerance: POSITION_TOLERANCE_DEG,
            speed_tolerance: SPEED_TOLERANCE_DEG_S,
        }
    }

    pub fn program_track(not_before: Option<DateTime<Utc>>) -> Self {
        Completion::ProgramTrack {
            final_free_slots: PROGRAM_TRACK_STACK_CAPACITY - 1,
            speed_tolerance: SPEED_TOLERANCE_DEG_S,
            not_before,
        }
    }

    pub fn evaluate(&self, status: &Status) -> Result<bool, CompletionError> {
        match *self {
            Completion::Preset {
                position_tolerance,
                speed_tolerance,
            } => Ok(status.azimuth.mode == ControlMode::Preset
                && status.elevation.mode == ControlMode::Preset
                && status.azimuth.position_error() < position_tolerance
                && status.elevation.position_error() < position_tolerance
                && stopped(status, speed_tolerance)),
            Completion::ProgramTrack {
                final_free_slots,
                speed_tolerance,
                not_before,
            } => {
                if status.free_stack_slots > PROGRAM_TRACK_STACK_CAPACITY {
                    return Err(CompletionError::StackOverflow {
                        free: status.free_stack_slots,
                        capacity: PROGRAM_TRACK_STACK_CAPACITY,
                    });
                }
                let reached_end = not_before.map_or(true, |end| status.timestamp >= end);
                Ok(status.free_stack_slots == final_free_slots
                    && stopped(status, speed_tolerance)
                    && reached_end)
            }
        }
    }
}

fn stopped(status: &Status, speed_tolerance: f64) -> bool {
    status.azimuth.current_velocity.abs() < speed_tolerance
        && status.elevation.current_velocity.abs() < speed_tolerance
}
