//! Trajectory producers.
//!
//! A [`ScanPattern`] is a lazy, possibly unbounded sequence of timestamped
//! position/velocity points. Consumers walk it with an explicit
//! [`PatternCursor`]; a fresh cursor restarts the sequence from the first
//! point, and a cursor is only ever driven by one task at a time.

mod azimuth_scan;
mod error;
mod path;
mod sky;
mod track;

use chrono::{DateTime, Duration, Utc};
use std::fmt;

pub use azimuth_scan::{AzimuthScanPattern, AzimuthScanSpec};
pub use error::PatternError;
pub use path::PathPattern;
pub use sky::{CoordinateSystem, Site};
pub use track::TrackPattern;

/// ACU ICD 2.0, section 8.9.3: minimum time interval between two samples.
pub const MIN_SAMPLE_SPACING_S: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanPoint {
    pub time: DateTime<Utc>,
    pub azimuth: f64,
    pub elevation: f64,
    pub azimuth_velocity: f64,
    pub elevation_velocity: f64,
}

/// Position within a pattern. Opaque to consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternCursor {
    index: usize,
}

impl PatternCursor {
    fn step(&mut self) {
        self.index += 1;
    }
}

pub trait ScanPattern: Send + Sync + fmt::Debug {
    /// Number of points, `None` when the pattern is unbounded.
    fn len(&self) -> Option<usize>;

    /// Point at `index`. Only called for indices below [`Self::len`].
    fn point_at(&self, index: usize) -> Result<ScanPoint, PatternError>;

    /// Time of the last point, `None` when unbounded.
    fn end_time(&self) -> Option<DateTime<Utc>>;

    fn describe(&self) -> String;

    fn cursor(&self) -> PatternCursor {
        PatternCursor::default()
    }

    fn is_done(&self, cursor: &PatternCursor) -> bool {
        self.len().is_some_and(|len| cursor.index >= len)
    }

    /// Produce the point under the cursor and move past it.
    fn advance(&self, cursor: &mut PatternCursor) -> Result<ScanPoint, PatternError> {
        if self.is_done(cursor) {
            return Err(PatternError::Exhausted(cursor.index));
        }
        let point = self.point_at(cursor.index)?;
        cursor.step();
        Ok(point)
    }
}

/// Iterator over a pattern from its first point. Stops after the first error.
pub struct Points<'a> {
    pattern: &'a dyn ScanPattern,
    cursor: PatternCursor,
    failed: bool,
}

impl<'a> Points<'a> {
    pub fn new(pattern: &'a dyn ScanPattern) -> Self {
        Self {
            pattern,
            cursor: pattern.cursor(),
            failed: false,
        }
    }
}

impl Iterator for Points<'_> {
    type Item = Result<ScanPoint, PatternError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pattern.is_done(&self.cursor) {
            return None;
        }
        let item = self.pattern.advance(&mut self.cursor);
        self.failed = item.is_err();
        Some(item)
    }
}

pub fn unix_to_utc(seconds: f64) -> Result<DateTime<Utc>, PatternError> {
    if !seconds.is_finite() {
        return Err(PatternError::InvalidTime(seconds));
    }
    let whole = seconds.floor();
    let nanos = (((seconds - whole) * 1e9).round() as u32).min(999_999_999);
    DateTime::from_timestamp(whole as i64, nanos).ok_or(PatternError::InvalidTime(seconds))
}

pub fn utc_to_unix(time: DateTime<Utc>) -> f64 {
    time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) * 1e-9
}

pub fn offset_seconds(time: DateTime<Utc>, seconds: f64) -> DateTime<Utc> {
    time + Duration::nanoseconds((seconds * 1e9).round() as i64)
}

pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_nanoseconds() {
        Some(ns) => ns as f64 * 1e-9,
        None => delta.num_milliseconds() as f64 * 1e-3,
    }
}

/// Number of samples covering `[0, duration]` at `interval`, always ending
/// on `duration` and never spacing two samples closer than the hardware
/// minimum.
fn sample_count(duration: f64, interval: f64) -> usize {
    if duration < MIN_SAMPLE_SPACING_S {
        return 1;
    }
    let regular = ((duration - MIN_SAMPLE_SPACING_S) / interval + 1e-9).floor() as usize + 1;
    regular + 1
}

fn sample_offset(index: usize, count: usize, duration: f64, interval: f64) -> f64 {
    if index + 1 >= count {
        if count == 1 {
            0.0
        } else {
            duration
        }
    } else {
        index as f64 * interval
    }
}
