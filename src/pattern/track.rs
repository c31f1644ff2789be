use chrono::{DateTime, Utc};

use super::{
    offset_seconds, sample_count, sample_offset, seconds_between, CoordinateSystem, PatternError,
    ScanPattern, ScanPoint, Site, MIN_SAMPLE_SPACING_S,
};

/// Follows a fixed target between two times. In the horizon frame the
/// target is a fixed az/el; in ICRS it is a sidereal position.
#[derive(Debug, Clone)]
pub struct TrackPattern {
    site: Site,
    coordsys: CoordinateSystem,
    coord1: f64,
    coord2: f64,
    start: DateTime<Utc>,
    duration: f64,
    interval: f64,
    count: usize,
}

impl TrackPattern {
    pub fn new(
        site: Site,
        coordsys: CoordinateSystem,
        coord1: f64,
        coord2: f64,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
        interval: f64,
    ) -> Result<Self, PatternError> {
        if !(interval >= MIN_SAMPLE_SPACING_S) {
            return Err(PatternError::SampleInterval(interval));
        }
        let duration = seconds_between(start, stop).max(0.0);
        Ok(Self {
            site,
            coordsys,
            coord1,
            coord2,
            start,
            duration,
            interval,
            count: sample_count(duration, interval),
        })
    }
}

impl ScanPattern for TrackPattern {
    fn len(&self) -> Option<usize> {
        Some(self.count)
    }

    fn point_at(&self, index: usize) -> Result<ScanPoint, PatternError> {
        let t = sample_offset(index, self.count, self.duration, self.interval);
        let time = offset_seconds(self.start, t);
        let point = match self.coordsys {
            CoordinateSystem::Horizon => ScanPoint {
                time,
                azimuth: self.coord1,
                elevation: self.coord2,
                azimuth_velocity: 0.0,
                elevation_velocity: 0.0,
            },
            CoordinateSystem::Icrs => {
                let (azimuth, elevation, azimuth_velocity, elevation_velocity) = self
                    .site
                    .horizon_with_rates(self.coord1, self.coord2, 0.0, 0.0, time);
                ScanPoint {
                    time,
                    azimuth,
                    elevation,
                    azimuth_velocity,
                    elevation_velocity,
                }
            }
        };
        Ok(point)
    }

    fn end_time(&self) -> Option<DateTime<Utc>> {
        Some(offset_seconds(self.start, self.duration))
    }

    fn describe(&self) -> String {
        format!(
            "{} track ({}, {}) for {:.1}s",
            self.coordsys, self.coord1, self.coord2, self.duration
        )
    }
}
