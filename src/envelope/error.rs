use thiserror::Error;

use super::limits::Axis;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvelopeError {
    #[error("commanded {axis} ({value}) out of range [{min},{max}]")]
    Position {
        axis: Axis,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("commanded {axis} vel ({value}) out of range [-{limit},{limit}]")]
    Velocity { axis: Axis, value: f64, limit: f64 },
    #[error("commanded {axis} accel ({value}) exceeds limit {limit}")]
    Acceleration { axis: Axis, value: f64, limit: f64 },
}

impl EnvelopeError {
    pub fn axis(&self) -> Axis {
        match self {
            EnvelopeError::Position { axis, .. }
            | EnvelopeError::Velocity { axis, .. }
            | EnvelopeError::Acceleration { axis, .. } => *axis,
        }
    }
}
