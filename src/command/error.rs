use thiserror::Error;

use crate::acu::MountError;
use crate::envelope::EnvelopeError;
use crate::pattern::PatternError;

#[derive(Debug, Clone, Error)]
pub enum CommandError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error("bad coordinate system: {0}")]
    CoordinateSystem(String),
    #[error("bad times: start={start}, stop={stop}")]
    Times { start: f64, stop: f64 },
    #[error("no points in path")]
    EmptyPath,
    #[error("points {} and {index} are separated by less than 50 ms", .index - 1)]
    Spacing { index: usize },
    #[error("point {index}: {source}")]
    Point {
        index: usize,
        source: EnvelopeError,
    },
    #[error("invalid azimuth scan: {0}")]
    Scan(String),
    #[error("trajectory: {0}")]
    Trajectory(#[from] PatternError),
    #[error("trajectory check did not finish: {0}")]
    Preflight(String),
    #[error("mount: {0}")]
    Mount(#[from] MountError),
}

impl CommandError {
    /// Whether the request itself is at fault, as opposed to the mount.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, CommandError::Mount(_))
    }
}
