use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatternError {
    #[error("pattern exhausted after {0} points")]
    Exhausted(usize),
    #[error("invalid time: {0}")]
    InvalidTime(f64),
    #[error("sample interval {0}s below hardware minimum of 0.05s")]
    SampleInterval(f64),
}
