use thiserror::Error;

use crate::acu::MountError;
use crate::command::CommandError;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("a command is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("telemetry: {0}")]
    Telemetry(MountError),
    #[error(transparent)]
    Mount(#[from] MountError),
}
