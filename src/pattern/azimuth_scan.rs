use chrono::{DateTime, Utc};

use super::{
    offset_seconds, sample_count, sample_offset, PatternError, ScanPattern, ScanPoint,
    MIN_SAMPLE_SPACING_S,
};

/// Parameters of a back-and-forth constant-elevation azimuth sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AzimuthScanSpec {
    pub start: DateTime<Utc>,
    pub azimuth_range: [f64; 2],
    pub elevation: f64,
    pub num_scans: u32,
    pub speed: f64,
    pub turnaround_s: f64,
}

impl AzimuthScanSpec {
    pub fn leg_duration(&self) -> f64 {
        (self.azimuth_range[1] - self.azimuth_range[0]) / self.speed
    }

    pub fn duration(&self) -> f64 {
        let legs = f64::from(self.num_scans);
        legs * self.leg_duration() + (legs - 1.0).max(0.0) * self.turnaround_s
    }

    fn has_turnarounds(&self) -> bool {
        self.num_scans > 1
    }

    /// How far past either end of the range the mount travels while reversing.
    pub fn overshoot(&self) -> f64 {
        if self.has_turnarounds() {
            self.speed * self.turnaround_s / 4.0
        } else {
            0.0
        }
    }

    /// Constant deceleration during a turnaround, infinite for an instant
    /// reversal.
    pub fn turnaround_accel(&self) -> Option<f64> {
        if !self.has_turnarounds() {
            return None;
        }
        if self.turnaround_s > 0.0 {
            Some(2.0 * self.speed / self.turnaround_s)
        } else {
            Some(f64::INFINITY)
        }
    }

    /// Azimuth and azimuth velocity `t` seconds after the start.
    fn state_at(&self, t: f64) -> (f64, f64) {
        let [lo, hi] = self.azimuth_range;
        let leg = self.leg_duration();
        let cycle = leg + self.turnaround_s;
        let last = self.num_scans.saturating_sub(1);

        let scan = ((t / cycle).floor() as u32).min(last);
        let local = t - f64::from(scan) * cycle;
        let (from, dir) = if scan % 2 == 0 { (lo, 1.0) } else { (hi, -1.0) };

        if local <= leg || scan == last || self.turnaround_s <= 0.0 {
            let local = local.min(leg);
            return (from + dir * self.speed * local, dir * self.speed);
        }

        let tau = local - leg;
        let end = from + dir * (hi - lo);
        let v = self.speed;
        let t_rev = self.turnaround_s;
        (
            end + dir * (v * tau - v * tau * tau / t_rev),
            dir * v * (1.0 - 2.0 * tau / t_rev),
        )
    }
}

#[derive(Debug, Clone)]
pub struct AzimuthScanPattern {
    spec: AzimuthScanSpec,
    interval: f64,
    count: usize,
}

impl AzimuthScanPattern {
    pub fn new(spec: AzimuthScanSpec, interval: f64) -> Result<Self, PatternError> {
        if !(interval >= MIN_SAMPLE_SPACING_S) {
            return Err(PatternError::SampleInterval(interval));
        }
        let count = sample_count(spec.duration(), interval);
        Ok(Self {
            spec,
            interval,
            count,
        })
    }
}

impl ScanPattern for AzimuthScanPattern {
    fn len(&self) -> Option<usize> {
        Some(self.count)
    }

    fn point_at(&self, index: usize) -> Result<ScanPoint, PatternError> {
        let t = sample_offset(index, self.count, self.spec.duration(), self.interval);
        let (azimuth, azimuth_velocity) = self.spec.state_at(t);
        Ok(ScanPoint {
            time: offset_seconds(self.spec.start, t),
            azimuth,
            elevation: self.spec.elevation,
            azimuth_velocity,
            elevation_velocity: 0.0,
        })
    }

    fn end_time(&self) -> Option<DateTime<Utc>> {
        Some(offset_seconds(self.spec.start, self.spec.duration()))
    }

    fn describe(&self) -> String {
        format!(
            "azimuth scan {}..{} @ el {} x{}",
            self.spec.azimuth_range[0],
            self.spec.azimuth_range[1],
            self.spec.elevation,
            self.spec.num_scans
        )
    }
}
