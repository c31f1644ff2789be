use chrono::{DateTime, Utc};
use strum_macros::Display;

use super::{offset_seconds, utc_to_unix};

/// Unix time of J2000.0 (2000-01-01T12:00:00Z).
const J2000_UNIX_SECONDS: f64 = 946_728_000.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Half-width of the central difference used for rates.
const RATE_STEP_S: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CoordinateSystem {
    /// Mount frame: coordinates are already azimuth/elevation.
    Horizon,
    #[strum(serialize = "ICRS")]
    Icrs,
}

impl CoordinateSystem {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Horizon" => Some(CoordinateSystem::Horizon),
            "ICRS" => Some(CoordinateSystem::Icrs),
            _ => None,
        }
    }
}

/// Geodetic location of the telescope.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Site {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl Site {
    /// Parse `"lat, lon"` in degrees.
    pub fn from_coordinates(coordinates: &str, altitude_m: Option<f64>) -> Option<Self> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() < 2 {
            return None;
        }
        let lat = parts[0].parse().ok()?;
        let lon = parts[1].parse().ok()?;
        Some(Self {
            latitude_deg: lat,
            longitude_deg: lon,
            altitude_m: altitude_m.unwrap_or(0.0),
        })
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn local_sidereal_deg(&self, time: DateTime<Utc>) -> f64 {
        (gmst_deg(time) + self.longitude_deg).rem_euclid(360.0)
    }

    /// Apparent azimuth/elevation (degrees) of an ICRS position. Ignores
    /// precession, nutation, aberration and refraction.
    pub fn horizon(&self, ra_deg: f64, dec_deg: f64, time: DateTime<Utc>) -> (f64, f64) {
        let hour_angle = (self.local_sidereal_deg(time) - ra_deg).to_radians();
        let dec = dec_deg.to_radians();
        let lat = self.lat_rad();

        let sin_el = lat.sin() * dec.sin() + lat.cos() * dec.cos() * hour_angle.cos();
        let elevation = sin_el.clamp(-1.0, 1.0).asin();

        let y = -hour_angle.sin() * dec.cos();
        let x = dec.sin() * lat.cos() - dec.cos() * lat.sin() * hour_angle.cos();
        let azimuth = y.atan2(x).to_degrees().rem_euclid(360.0);

        (azimuth, elevation.to_degrees())
    }

    /// Horizon position and rates of an ICRS position moving at
    /// `(ra_rate, dec_rate)` degrees per second.
    pub fn horizon_with_rates(
        &self,
        ra_deg: f64,
        dec_deg: f64,
        ra_rate: f64,
        dec_rate: f64,
        time: DateTime<Utc>,
    ) -> (f64, f64, f64, f64) {
        let (az, el) = self.horizon(ra_deg, dec_deg, time);
        let (az_before, el_before) = self.horizon(
            ra_deg - ra_rate * RATE_STEP_S,
            dec_deg - dec_rate * RATE_STEP_S,
            offset_seconds(time, -RATE_STEP_S),
        );
        let (az_after, el_after) = self.horizon(
            ra_deg + ra_rate * RATE_STEP_S,
            dec_deg + dec_rate * RATE_STEP_S,
            offset_seconds(time, RATE_STEP_S),
        );

        // Azimuth may wrap through 0/360 between the two samples.
        let az_delta = (az_after - az_before + 540.0).rem_euclid(360.0) - 180.0;
        let az_vel = az_delta / (2.0 * RATE_STEP_S);
        let el_vel = (el_after - el_before) / (2.0 * RATE_STEP_S);

        (az, el, az_vel, el_vel)
    }
}

/// Greenwich mean sidereal time in degrees.
pub fn gmst_deg(time: DateTime<Utc>) -> f64 {
    let days = (utc_to_unix(time) - J2000_UNIX_SECONDS) / SECONDS_PER_DAY;
    (280.460_618_37 + 360.985_647_366_29 * days).rem_euclid(360.0)
}
