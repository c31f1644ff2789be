use chrono::{DateTime, Utc};

use super::{unix_to_utc, CoordinateSystem, PatternError, ScanPattern, ScanPoint, Site};

/// An explicit list of `(time, coord1, coord2, vel1, vel2)` samples, one
/// trajectory point each. Times are unix seconds.
#[derive(Debug, Clone)]
pub struct PathPattern {
    site: Site,
    coordsys: CoordinateSystem,
    points: Vec<[f64; 5]>,
}

impl PathPattern {
    pub fn new(site: Site, coordsys: CoordinateSystem, points: Vec<[f64; 5]>) -> Self {
        Self {
            site,
            coordsys,
            points,
        }
    }
}

impl ScanPattern for PathPattern {
    fn len(&self) -> Option<usize> {
        Some(self.points.len())
    }

    fn point_at(&self, index: usize) -> Result<ScanPoint, PatternError> {
        let [t, c1, c2, v1, v2] = self.points[index];
        let time = unix_to_utc(t)?;
        let point = match self.coordsys {
            CoordinateSystem::Horizon => ScanPoint {
                time,
                azimuth: c1,
                elevation: c2,
                azimuth_velocity: v1,
                elevation_velocity: v2,
            },
            CoordinateSystem::Icrs => {
                let (azimuth, elevation, azimuth_velocity, elevation_velocity) =
                    self.site.horizon_with_rates(c1, c2, v1, v2, time);
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
        self.points.last().and_then(|p| unix_to_utc(p[0]).ok())
    }

    fn describe(&self) -> String {
        format!("{} path of {} points", self.coordsys, self.points.len())
    }
}
