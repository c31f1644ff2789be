//! Boundary to the antenna control unit.
//!
//! The command layer only talks to the ACU through [`Mount`] (motion) and
//! [`TelemetrySource`] (status). Both are expected to serialize access to the
//! device connection themselves.

mod error;
mod sim;
mod types;

use async_trait::async_trait;
use std::sync::Arc;

use crate::abort::AbortSignal;
use crate::pattern::ScanPattern;

pub use error::MountError;
pub use sim::{SimulatedMount, SimulatorConfig};
pub use types::{AxisStatus, ControlMode, Status, PROGRAM_TRACK_STACK_CAPACITY};

#[async_trait]
pub trait Mount: Send + Sync {
    /// Command a preset move to a single azimuth/elevation setpoint.
    async fn move_to(&self, azimuth: f64, elevation: f64) -> Result<(), MountError>;

    /// Stream every point of `pattern` into the program-track stack,
    /// waiting for free slots as needed. Stops early when `abort` fires.
    async fn upload_pattern(
        &self,
        abort: AbortSignal,
        pattern: Arc<dyn ScanPattern>,
    ) -> Result<(), MountError>;

    async fn set_mode(&self, mode: ControlMode) -> Result<(), MountError>;
}

#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn status(&self) -> Result<Status, MountError>;
}
