use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::{check_points, start_pattern, CommandContext, CommandError, Started};
use crate::abort::AbortSignal;
use crate::acu::Mount;
use crate::pattern::{unix_to_utc, CoordinateSystem, TrackPattern};

/// Follow a fixed target between two unix times.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct TrackCommand {
    pub start_time: f64,
    pub stop_time: f64,
    #[serde(alias = "ra", alias = "RA")]
    pub right_ascension: f64,
    #[serde(alias = "dec", alias = "Dec")]
    pub declination: f64,
    /// `Horizon` or `ICRS`.
    #[serde(alias = "coordsys", alias = "Coordsys")]
    pub coordinate_system: String,
}

impl TrackCommand {
    fn coordsys(&self) -> Result<CoordinateSystem, CommandError> {
        CoordinateSystem::parse(&self.coordinate_system)
            .ok_or_else(|| CommandError::CoordinateSystem(self.coordinate_system.clone()))
    }

    pub(super) fn pattern(&self, ctx: &CommandContext) -> Result<TrackPattern, CommandError> {
        Ok(TrackPattern::new(
            ctx.site,
            self.coordsys()?,
            self.right_ascension,
            self.declination,
            unix_to_utc(self.start_time)?,
            unix_to_utc(self.stop_time)?,
            ctx.sample_interval,
        )?)
    }

    pub fn check(&self, _ctx: &CommandContext) -> Result<(), CommandError> {
        self.coordsys()?;
        if !(self.stop_time >= self.start_time) {
            return Err(CommandError::Times {
                start: self.start_time,
                stop: self.stop_time,
            });
        }
        Ok(())
    }

    /// Generates the whole trajectory and checks every point before any
    /// motion is issued. The check runs on the blocking pool.
    pub async fn start(
        &self,
        ctx: &CommandContext,
        abort: &AbortSignal,
        mount: Arc<dyn Mount>,
    ) -> Result<Started, CommandError> {
        let pattern = Arc::new(self.pattern(ctx)?);
        let checked = pattern.clone();
        let envelope = ctx.envelope;
        tokio::task::spawn_blocking(move || {
            check_points(checked.as_ref(), &envelope, usize::MAX)
        })
        .await
        .map_err(|e| CommandError::Preflight(e.to_string()))??;
        start_pattern(abort, mount, pattern).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::RecordingMount;
    use crate::pattern::Site;
    use std::sync::atomic::{AtomicBool, Ordering};

    const T0: f64 = 1_748_746_800.0;

    fn track(coordsys: &str, start: f64, stop: f64) -> TrackCommand {
        TrackCommand {
            start_time: start,
            stop_time: stop,
            right_ascension: 120.0,
            declination: 40.0,
            coordinate_system: coordsys.into(),
        }
    }

    #[test]
    fn test_coordinate_systems() {
        let ctx = CommandContext::default();
        let err = track("Galactic", T0, T0 + 10.0).check(&ctx).unwrap_err();
        assert!(matches!(err, CommandError::CoordinateSystem(ref s) if s == "Galactic"));
        assert!(track("icrs", T0, T0 + 10.0).check(&ctx).is_err());
        assert!(track("Horizon", T0, T0 + 10.0).check(&ctx).is_ok());
        assert!(track("ICRS", T0, T0 + 10.0).check(&ctx).is_ok());
    }

    #[test]
    fn test_times() {
        let ctx = CommandContext::default();
        assert!(matches!(
            track("Horizon", T0, T0 - 1.0).check(&ctx),
            Err(CommandError::Times { .. })
        ));
        assert!(track("ICRS", T0, T0).check(&ctx).is_ok());
        assert!(track("ICRS", T0, f64::NAN).check(&ctx).is_err());
    }

    #[test]
    fn test_check_is_repeatable() {
        let ctx = CommandContext::default();
        let cmd = track("Galactic", T0, T0);
        assert_eq!(
            cmd.check(&ctx).unwrap_err().to_string(),
            cmd.check(&ctx).unwrap_err().to_string()
        );
    }

    #[tokio::test]
    async fn test_horizon_track_starts() {
        let mount = RecordingMount::new();
        let mut cmd = track("Horizon", T0, T0 + 5.0);
        cmd.right_ascension = 200.0;
        cmd.declination = 30.0;
        let started = cmd
            .start(&CommandContext::default(), &AbortSignal::never(), mount.clone())
            .await
            .unwrap();
        started.upload.unwrap().finished().await;
        assert_eq!(mount.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_long_track_check_yields_to_runtime() {
        let mount = RecordingMount::new();
        let mut cmd = track("Horizon", T0, T0 + 3600.0);
        cmd.right_ascension = 200.0;
        cmd.declination = 30.0;

        let ticked = Arc::new(AtomicBool::new(false));
        let ticker = {
            let ticked = ticked.clone();
            tokio::spawn(async move { ticked.store(true, Ordering::SeqCst) })
        };

        cmd.start(&CommandContext::default(), &AbortSignal::never(), mount.clone())
            .await
            .unwrap();
        assert!(ticked.load(Ordering::SeqCst));
        ticker.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_target_issues_no_motion() {
        let ctx = CommandContext {
            site: Site {
                latitude_deg: 52.0,
                longitude_deg: 0.0,
                altitude_m: 0.0,
            },
            ..CommandContext::default()
        };
        let mount = RecordingMount::new();
        // Never rises at this latitude.
        let mut cmd = track("ICRS", T0, T0 + 60.0);
        cmd.declination = -60.0;
        assert!(cmd.check(&ctx).is_ok());
        let err = cmd
            .start(&ctx, &AbortSignal::never(), mount.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Point { index: 0, .. }));
        assert!(mount.calls().is_empty());
    }
}
