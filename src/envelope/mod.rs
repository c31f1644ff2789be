mod error;
mod limits;

pub use error::EnvelopeError;
pub use limits::{Axis, AxisLimits, KinematicEnvelope};

impl KinematicEnvelope {
    /// Check a commanded position/velocity pair against the envelope.
    ///
    /// Bounds are inclusive. Only position and velocity are checked here; the
    /// first violation (azimuth, elevation, azimuth vel, elevation vel) is
    /// logged and returned, so callers should not log it again.
    pub fn check_az_el(
        &self,
        az: f64,
        el: f64,
        az_vel: f64,
        el_vel: f64,
    ) -> Result<(), EnvelopeError> {
        let result = self
            .check_position(Axis::Azimuth, az)
            .and_then(|_| self.check_position(Axis::Elevation, el))
            .and_then(|_| self.check_velocity(Axis::Azimuth, az_vel))
            .and_then(|_| self.check_velocity(Axis::Elevation, el_vel));

        if let Err(e) = &result {
            log::warn!("Envelope violation on {}: {}", e.axis(), e);
        }
        result
    }

    /// Check a planned acceleration. Not part of [`Self::check_az_el`]: a single
    /// setpoint carries no acceleration, only generated patterns do.
    pub fn check_accel(&self, axis: Axis, accel: f64) -> Result<(), EnvelopeError> {
        let limits = self.axis(axis);
        if limits.accel_ok(accel) {
            return Ok(());
        }
        let err = EnvelopeError::Acceleration {
            axis,
            value: accel,
            limit: limits.max_accel,
        };
        log::warn!("Envelope violation on {}: {}", axis, err);
        Err(err)
    }

    fn check_position(&self, axis: Axis, value: f64) -> Result<(), EnvelopeError> {
        let limits = self.axis(axis);
        if limits.contains(value) {
            Ok(())
        } else {
            Err(EnvelopeError::Position {
                axis,
                value,
                min: limits.min,
                max: limits.max,
            })
        }
    }

    fn check_velocity(&self, axis: Axis, value: f64) -> Result<(), EnvelopeError> {
        let limits = self.axis(axis);
        if limits.speed_ok(value) {
            Ok(())
        } else {
            Err(EnvelopeError::Velocity {
                axis,
                value,
                limit: limits.max_speed,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Next representable value further from zero.
    fn ulp_beyond(x: f64) -> f64 {
        if x == 0.0 {
            -f64::from_bits(1)
        } else {
            f64::from_bits(x.to_bits() + 1)
        }
    }

    fn envelope() -> KinematicEnvelope {
        KinematicEnvelope::default()
    }

    #[test]
    fn test_accepts_interior_and_boundaries() {
        let env = envelope();
        for az in [-180.0, -12.5, 0.0, 359.9, 360.0] {
            for el in [0.0, 45.0, 180.0] {
                for vaz in [-3.0, 0.0, 3.0] {
                    for vel in [-1.5, 0.0, 1.5] {
                        assert!(
                            env.check_az_el(az, el, vaz, vel).is_ok(),
                            "rejected az={az} el={el} vaz={vaz} vel={vel}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_azimuth_one_ulp_beyond() {
        let env = envelope();
        for az in [ulp_beyond(-180.0), ulp_beyond(360.0), -180.0001, 360.0001] {
            let err = env.check_az_el(az, 10.0, 0.0, 0.0).unwrap_err();
            assert!(matches!(
                err,
                EnvelopeError::Position {
                    axis: Axis::Azimuth,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_elevation_one_ulp_beyond() {
        let env = envelope();
        for el in [ulp_beyond(0.0), ulp_beyond(180.0)] {
            let err = env.check_az_el(0.0, el, 0.0, 0.0).unwrap_err();
            assert_eq!(err.axis(), Axis::Elevation);
        }
    }

    #[test]
    fn test_velocity_one_ulp_beyond() {
        let env = envelope();
        for vaz in [ulp_beyond(3.0), ulp_beyond(-3.0)] {
            let err = env.check_az_el(0.0, 10.0, vaz, 0.0).unwrap_err();
            assert!(matches!(
                err,
                EnvelopeError::Velocity {
                    axis: Axis::Azimuth,
                    ..
                }
            ));
        }
        for vel in [ulp_beyond(1.5), ulp_beyond(-1.5)] {
            let err = env.check_az_el(0.0, 10.0, 0.0, vel).unwrap_err();
            assert!(matches!(
                err,
                EnvelopeError::Velocity {
                    axis: Axis::Elevation,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_first_violation_reported() {
        let err = envelope().check_az_el(400.0, -1.0, 9.0, 9.0).unwrap_err();
        assert_eq!(err.axis(), Axis::Azimuth);
        assert_eq!(
            err.to_string(),
            "commanded azimuth (400) out of range [-180,360]"
        );
    }

    #[test]
    fn test_nan_is_rejected() {
        assert!(envelope().check_az_el(f64::NAN, 0.0, 0.0, 0.0).is_err());
        assert!(envelope().check_az_el(0.0, 0.0, 0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_overridden_limits() {
        let mut env = envelope();
        env.elevation.min = 15.0;
        assert!(env.check_az_el(0.0, 10.0, 0.0, 0.0).is_err());
        assert!(env.check_az_el(0.0, 15.0, 0.0, 0.0).is_ok());
    }

    #[test]
    fn test_accel_limit() {
        let env = envelope();
        assert!(env.check_accel(Axis::Azimuth, 6.0).is_ok());
        assert!(env.check_accel(Axis::Azimuth, -6.5).is_err());
        assert!(env.check_accel(Axis::Elevation, 1.6).is_err());
    }
}
