//! Observation commands.
//!
//! Every command goes through the same two phases: `check` validates it
//! without touching the mount, then `start` issues the motion and returns
//! the [`Completion`] to evaluate against incoming telemetry. A command
//! whose `check` failed must never be started.

mod azimuth_scan;
mod completion;
mod error;
mod path;
mod point;
mod track;
mod upload;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::abort::AbortSignal;
use crate::acu::{ControlMode, Mount};
use crate::envelope::KinematicEnvelope;
use crate::pattern::{Points, ScanPattern, Site};

pub use azimuth_scan::AzimuthScanCommand;
pub use completion::Completion;
pub use error::CommandError;
pub use path::PathCommand;
pub use point::PointCommand;
pub use track::TrackCommand;
pub use upload::{UploadHandle, UploadState};
use upload::spawn_upload;

/// Deployment constants every command is checked and started against.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandContext {
    pub envelope: KinematicEnvelope,
    pub site: Site,
    /// Spacing of generated trajectory points, seconds.
    pub sample_interval: f64,
}

impl Default for CommandContext {
    fn default() -> Self {
        Self {
            envelope: KinematicEnvelope::default(),
            site: Site::default(),
            sample_interval: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Point(PointCommand),
    AzimuthScan(AzimuthScanCommand),
    Track(TrackCommand),
    Path(PathCommand),
}

/// Result of a successful `start`.
#[derive(Debug)]
pub struct Started {
    pub completion: Completion,
    /// Present for trajectory commands while their points stream to the
    /// mount in the background.
    pub upload: Option<UploadHandle>,
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Point(_) => "point",
            Command::AzimuthScan(_) => "azimuth_scan",
            Command::Track(_) => "track",
            Command::Path(_) => "path",
        }
    }

    pub fn check(&self, ctx: &CommandContext) -> Result<(), CommandError> {
        match self {
            Command::Point(cmd) => cmd.check(ctx),
            Command::AzimuthScan(cmd) => cmd.check(ctx),
            Command::Track(cmd) => cmd.check(ctx),
            Command::Path(cmd) => cmd.check(ctx),
        }
    }

    pub async fn start(
        &self,
        ctx: &CommandContext,
        abort: &AbortSignal,
        mount: Arc<dyn Mount>,
    ) -> Result<Started, CommandError> {
        match self {
            Command::Point(cmd) => cmd.start(mount).await,
            Command::AzimuthScan(cmd) => cmd.start(ctx, abort, mount).await,
            Command::Track(cmd) => cmd.start(ctx, abort, mount).await,
            Command::Path(cmd) => cmd.start(ctx, abort, mount).await,
        }
    }

    /// Time after which the command should have completed, when it follows
    /// a trajectory with a known end.
    pub fn planned_end(&self, ctx: &CommandContext) -> Option<chrono::DateTime<chrono::Utc>> {
        match self {
            Command::Point(_) => None,
            Command::AzimuthScan(cmd) => cmd.pattern(ctx).ok().and_then(|p| p.end_time()),
            Command::Track(cmd) => cmd.pattern(ctx).ok().and_then(|p| p.end_time()),
            Command::Path(cmd) => cmd.pattern(ctx).ok().and_then(|p| p.end_time()),
        }
    }
}

/// Shared start for trajectory commands: upload in the background, switch
/// the mount to program track, and wait for the stack to drain.
async fn start_pattern(
    abort: &AbortSignal,
    mount: Arc<dyn Mount>,
    pattern: Arc<dyn ScanPattern>,
) -> Result<Started, CommandError> {
    let not_before = pattern.end_time();
    log::info!("Starting {}", pattern.describe());

    let upload = spawn_upload(mount.clone(), abort.clone(), pattern);
    mount.set_mode(ControlMode::ProgramTrack).await?;

    Ok(Started {
        completion: Completion::program_track(not_before),
        upload: Some(upload),
    })
}

/// Check up to `limit` points of `pattern` against the envelope.
fn check_points(
    pattern: &dyn ScanPattern,
    envelope: &KinematicEnvelope,
    limit: usize,
) -> Result<(), CommandError> {
    for (index, point) in Points::new(pattern).take(limit).enumerate() {
        let p = point?;
        envelope
            .check_az_el(
                p.azimuth,
                p.elevation,
                p.azimuth_velocity,
                p.elevation_velocity,
            )
            .map_err(|source| CommandError::Point { index, source })?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    use crate::abort::AbortSignal;
    use crate::acu::{ControlMode, Mount, MountError};
    use crate::pattern::{Points, ScanPattern};

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        MoveTo(f64, f64),
        Upload(usize),
        SetMode(ControlMode),
    }

    /// Mount that records calls and can be told to fail.
    #[derive(Default)]
    pub struct RecordingMount {
        pub calls: Mutex<Vec<Call>>,
        pub fail_moves: bool,
        pub fail_uploads: bool,
        pub fail_mode: bool,
    }

    impl RecordingMount {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn fault(operation: &'static str) -> MountError {
            MountError::Rejected {
                operation,
                reason: "test fault".into(),
            }
        }
    }

    #[async_trait]
    impl Mount for RecordingMount {
        async fn move_to(&self, azimuth: f64, elevation: f64) -> Result<(), MountError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::MoveTo(azimuth, elevation));
            if self.fail_moves {
                return Err(Self::fault("move"));
            }
            Ok(())
        }

        async fn upload_pattern(
            &self,
            _abort: AbortSignal,
            pattern: Arc<dyn ScanPattern>,
        ) -> Result<(), MountError> {
            let count = Points::new(pattern.as_ref()).count();
            self.calls.lock().unwrap().push(Call::Upload(count));
            if self.fail_uploads {
                return Err(Self::fault("upload"));
            }
            Ok(())
        }

        async fn set_mode(&self, mode: ControlMode) -> Result<(), MountError> {
            self.calls.lock().unwrap().push(Call::SetMode(mode));
            if self.fail_mode {
                return Err(Self::fault("mode"));
            }
            Ok(())
        }
    }
}
