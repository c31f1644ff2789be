use thiserror::Error;

use crate::pattern::PatternError;

#[derive(Debug, Clone, Error)]
pub enum MountError {
    #[error("ACU rejected {operation}: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },
    #[error("ACU connection error: {0}")]
    Connection(String),
    #[error("upload aborted after {sent} points: {reason}")]
    Aborted { sent: usize, reason: String },
    #[error("trajectory error: {0}")]
    Pattern(#[from] PatternError),
}
