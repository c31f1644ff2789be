//! Runs one command at a time against the mount and watches telemetry
//! until it completes, fails, times out or is stopped.

mod error;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::abort::{abort_pair, AbortHandle};
use crate::acu::{ControlMode, Mount, Status, TelemetrySource};
use crate::command::{Command, CommandContext, Completion, UploadHandle, UploadState};
use crate::envelope::KinematicEnvelope;

pub use error::ControllerError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    pub poll_interval: Duration,
    /// Extra time allowed after the planned end before giving up.
    pub settle_timeout: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            settle_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    Completed,
    Failed { reason: String },
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Idle | SessionState::Running)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionStatus {
    pub id: Option<Uuid>,
    pub command: Option<String>,
    #[serde(flatten)]
    pub state: SessionState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub completion: Option<Completion>,
    pub last_status: Option<Status>,
}

impl SessionStatus {
    fn idle() -> Self {
        Self {
            id: None,
            command: None,
            state: SessionState::Idle,
            started_at: None,
            finished_at: None,
            completion: None,
            last_status: None,
        }
    }
}

#[derive(Debug)]
struct Shared {
    status: SessionStatus,
}

impl Shared {
    fn finish(&mut self, state: SessionState, at: Option<DateTime<Utc>>) {
        match &state {
            SessionState::Failed { reason } => log::error!("Session failed: {}", reason),
            other => log::info!("Session finished: {:?}", other),
        }
        self.status.state = state;
        self.status.finished_at = at.or(self.status.finished_at);
    }
}

#[derive(Debug)]
struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

pub struct Controller {
    ctx: Arc<CommandContext>,
    settings: ControllerSettings,
    mount: Arc<dyn Mount>,
    telemetry: Arc<dyn TelemetrySource>,
    shared: Arc<StdMutex<Shared>>,
    worker: Option<WorkerHandle>,
}

impl Controller {
    pub fn new(
        ctx: CommandContext,
        settings: ControllerSettings,
        mount: Arc<dyn Mount>,
        telemetry: Arc<dyn TelemetrySource>,
    ) -> Self {
        Self {
            ctx: Arc::new(ctx),
            settings,
            mount,
            telemetry,
            shared: Arc::new(StdMutex::new(Shared {
                status: SessionStatus::idle(),
            })),
            worker: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.shared.lock().unwrap().status.clone()
    }

    pub async fn telemetry(&self) -> Result<Status, ControllerError> {
        self.telemetry
            .status()
            .await
            .map_err(ControllerError::Telemetry)
    }

    pub fn envelope(&self) -> &KinematicEnvelope {
        &self.ctx.envelope
    }

    pub fn validate(&self, command: &Command) -> Result<(), ControllerError> {
        command.check(&self.ctx)?;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.join.is_finished())
    }

    /// Check and start `command`, then watch it from a background worker.
    /// A command that fails its check never reaches the mount.
    pub async fn submit(&mut self, command: Command) -> Result<SessionStatus, ControllerError> {
        if self.is_running() {
            return Err(ControllerError::AlreadyRunning);
        }
        self.worker = None;

        command.check(&self.ctx)?;

        let snapshot = self.telemetry().await?;
        let (abort, signal) = abort_pair();
        let started = match command.start(&self.ctx, &signal, self.mount.clone()).await {
            Ok(started) => started,
            Err(e) => {
                // An upload spawned before the failure must not outlive it.
                abort.abort(format!("start failed: {}", e));
                return Err(e.into());
            }
        };

        // Deadline runs on the mount clock, anchored to the snapshot above.
        let end = command
            .planned_end(&self.ctx)
            .filter(|end| *end > snapshot.timestamp)
            .unwrap_or(snapshot.timestamp);
        let until_end = (end - snapshot.timestamp).to_std().unwrap_or_default();
        let deadline = Instant::now() + until_end + self.settings.settle_timeout;

        let id = Uuid::new_v4();
        log::info!("Session {} started: {}", id, command.kind());
        {
            let mut locked = self.shared.lock().unwrap();
            locked.status = SessionStatus {
                id: Some(id),
                command: Some(command.kind().to_string()),
                state: SessionState::Running,
                started_at: Some(snapshot.timestamp),
                finished_at: None,
                completion: Some(started.completion),
                last_status: Some(snapshot),
            };
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let watch = Watch {
            shared: self.shared.clone(),
            telemetry: self.telemetry.clone(),
            completion: started.completion,
            upload: started.upload,
            abort,
            poll_interval: self.settings.poll_interval,
            deadline,
        };
        let join = tokio::spawn(watch.run(stop_rx));
        self.worker = Some(WorkerHandle { stop_tx, join });

        Ok(self.status())
    }

    /// Wait for the running session, if any, to reach a terminal state.
    pub async fn wait(&mut self) -> SessionStatus {
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.join.await {
                log::error!("Session worker panicked: {}", e);
            }
        }
        self.status()
    }

    /// Cancel the running session, abort its upload and put the mount in
    /// stop mode.
    pub async fn stop(&mut self) -> Result<SessionStatus, ControllerError> {
        let Some(worker) = self.worker.take() else {
            return Ok(self.status());
        };
        let was_running = !self.status().state.is_terminal();
        let _ = worker.stop_tx.send(());
        let _ = worker.join.await;
        if was_running {
            self.mount.set_mode(ControlMode::Stop).await?;
        }
        Ok(self.status())
    }
}

/// State moved into the session worker.
struct Watch {
    shared: Arc<StdMutex<Shared>>,
    telemetry: Arc<dyn TelemetrySource>,
    completion: Completion,
    upload: Option<UploadHandle>,
    abort: AbortHandle,
    poll_interval: Duration,
    deadline: Instant,
}

impl Watch {
    async fn run(self, mut stop_rx: oneshot::Receiver<()>) {
        let state = loop {
            let should_stop = tokio::select! {
                _ = sleep(self.poll_interval) => false,
                _ = &mut stop_rx => true,
            };
            if should_stop {
                self.abort.abort("stopped by operator");
                break SessionState::Cancelled;
            }

            if let Some(SessionState::Failed { reason }) = self.upload_failure() {
                break SessionState::Failed { reason };
            }

            match self.telemetry.status().await {
                Ok(status) => {
                    self.shared.lock().unwrap().status.last_status = Some(status);
                    match self.completion.evaluate(&status) {
                        Ok(true) => break SessionState::Completed,
                        Ok(false) => {}
                        Err(e) => {
                            self.abort.abort(e.to_string());
                            break SessionState::Failed {
                                reason: e.to_string(),
                            };
                        }
                    }
                }
                Err(e) => log::warn!("Telemetry unavailable: {}", e),
            }

            if Instant::now() >= self.deadline {
                self.abort.abort("deadline passed");
                break SessionState::Failed {
                    reason: "did not complete before the deadline".into(),
                };
            }
        };

        let mut locked = self.shared.lock().unwrap();
        let at = locked.status.last_status.map(|s| s.timestamp);
        locked.finish(state, at);
    }

    fn upload_failure(&self) -> Option<SessionState> {
        match self.upload.as_ref()?.state() {
            UploadState::Failed(e) => Some(SessionState::Failed {
                reason: format!("upload failed: {}", e),
            }),
            UploadState::Running | UploadState::Finished => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abort::AbortSignal;
    use crate::acu::{AxisStatus, MountError, SimulatedMount, SimulatorConfig};
    use crate::command::{CommandError, PathCommand, PointCommand};
    use crate::pattern::{utc_to_unix, ScanPattern};
    use async_trait::async_trait;

    fn controller(
        config: SimulatorConfig,
        settings: ControllerSettings,
    ) -> (Controller, Arc<SimulatedMount>) {
        let mount = SimulatedMount::new(KinematicEnvelope::default(), config);
        let controller = Controller::new(
            CommandContext::default(),
            settings,
            mount.clone(),
            mount.clone(),
        );
        (controller, mount)
    }

    fn point(azimuth: f64, elevation: f64) -> Command {
        Command::Point(PointCommand {
            azimuth,
            elevation,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_point_runs_to_completion() {
        let (mut controller, _) =
            controller(SimulatorConfig::default(), ControllerSettings::default());
        let status = controller.submit(point(10.0, 80.0)).await.unwrap();
        assert_eq!(status.state, SessionState::Running);
        assert_eq!(status.command.as_deref(), Some("point"));
        assert!(status.id.is_some());

        let status = controller.wait().await;
        assert_eq!(status.state, SessionState::Completed);
        let last = status.last_status.unwrap();
        assert_eq!(last.azimuth.current_position, 10.0);
        assert_eq!(last.elevation.current_position, 80.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_command_never_moves() {
        let (mut controller, mount) =
            controller(SimulatorConfig::default(), ControllerSettings::default());
        let err = controller.submit(point(10.0, 200.0)).await.unwrap_err();
        assert!(matches!(err, ControllerError::Command(_)));
        assert_eq!(controller.status().state, SessionState::Idle);
        let status = mount.status().await.unwrap();
        assert_eq!(status.azimuth.mode, ControlMode::Stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_command_at_a_time() {
        let (mut controller, _) =
            controller(SimulatorConfig::default(), ControllerSettings::default());
        controller.submit(point(100.0, 20.0)).await.unwrap();
        assert!(matches!(
            controller.submit(point(0.0, 20.0)).await,
            Err(ControllerError::AlreadyRunning)
        ));

        let status = controller.stop().await.unwrap();
        assert_eq!(status.state, SessionState::Cancelled);
        controller.submit(point(0.0, 80.0)).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_path_completes_after_last_point() {
        let (mut controller, mount) =
            controller(SimulatorConfig::default(), ControllerSettings::default());
        let t0 = utc_to_unix(mount.now());
        let command = Command::Path(PathCommand {
            coordinate_system: "Horizon".into(),
            points: vec![
                [t0 + 30.0, 0.0, 80.0, 0.0, 0.0],
                [t0 + 31.0, 0.5, 80.0, 0.5, 0.0],
                [t0 + 32.0, 1.0, 80.0, 0.0, 0.0],
            ],
        });
        controller.submit(command).await.unwrap();

        let status = controller.wait().await;
        assert_eq!(status.state, SessionState::Completed);
        let last = status.last_status.unwrap();
        assert!(utc_to_unix(last.timestamp) > t0 + 31.9);
        assert_eq!(last.free_stack_slots, 9999);
        assert_eq!(last.azimuth.current_position, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_failure_fails_session() {
        let (mut controller, mount) = controller(
            SimulatorConfig {
                fail_uploads: true,
                ..SimulatorConfig::default()
            },
            ControllerSettings::default(),
        );
        let t0 = utc_to_unix(mount.now());
        let command = Command::Path(PathCommand {
            coordinate_system: "Horizon".into(),
            points: vec![[t0 + 1.0, 0.0, 80.0, 0.0, 0.0]],
        });
        controller.submit(command).await.unwrap();

        match controller.wait().await.state {
            SessionState::Failed { reason } => assert!(reason.starts_with("upload failed")),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline() {
        let settings = ControllerSettings {
            poll_interval: Duration::from_millis(200),
            settle_timeout: Duration::from_secs(2),
        };
        let (mut controller, _) = controller(SimulatorConfig::default(), settings);
        // 180 degrees at 3 deg/s takes a minute.
        controller.submit(point(180.0, 90.0)).await.unwrap();
        assert!(matches!(
            controller.wait().await.state,
            SessionState::Failed { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_failure_is_returned() {
        let (mut controller, _) = controller(
            SimulatorConfig {
                fail_moves: true,
                ..SimulatorConfig::default()
            },
            ControllerSettings::default(),
        );
        assert!(matches!(
            controller.submit(point(10.0, 10.0)).await,
            Err(ControllerError::Command(CommandError::Mount(_)))
        ));
        assert_eq!(controller.status().state, SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_path_after_stop_completes() {
        let (mut controller, mount) =
            controller(SimulatorConfig::default(), ControllerSettings::default());
        let t0 = utc_to_unix(mount.now());
        let far = Command::Path(PathCommand {
            coordinate_system: "Horizon".into(),
            points: vec![
                [t0 + 1000.0, 90.0, 60.0, 0.0, 0.0],
                [t0 + 1001.0, 91.0, 60.0, 0.0, 0.0],
                [t0 + 1002.0, 92.0, 60.0, 0.0, 0.0],
            ],
        });
        controller.submit(far).await.unwrap();
        sleep(Duration::from_millis(500)).await;
        assert_eq!(
            controller.stop().await.unwrap().state,
            SessionState::Cancelled
        );

        let t1 = utc_to_unix(mount.now());
        let near = Command::Path(PathCommand {
            coordinate_system: "Horizon".into(),
            points: vec![
                [t1 + 30.0, 0.0, 80.0, 0.0, 0.0],
                [t1 + 31.0, 1.0, 80.0, 0.0, 0.0],
            ],
        });
        controller.submit(near).await.unwrap();

        let status = controller.wait().await;
        assert_eq!(status.state, SessionState::Completed);
        let last = status.last_status.unwrap();
        assert_eq!(last.free_stack_slots, 9999);
        assert_eq!(last.azimuth.current_position, 1.0);
    }

    /// Mount whose uploads wait for an abort and whose mode changes fail.
    #[derive(Default)]
    struct StuckMount {
        upload_abort: StdMutex<Option<String>>,
    }

    #[async_trait]
    impl Mount for StuckMount {
        async fn move_to(&self, _azimuth: f64, _elevation: f64) -> Result<(), MountError> {
            Ok(())
        }

        async fn upload_pattern(
            &self,
            abort: AbortSignal,
            _pattern: Arc<dyn ScanPattern>,
        ) -> Result<(), MountError> {
            match tokio::time::timeout(Duration::from_secs(60), abort.aborted()).await {
                Ok(reason) => {
                    *self.upload_abort.lock().unwrap() = Some(reason.clone());
                    Err(MountError::Aborted { sent: 0, reason })
                }
                Err(_) => Ok(()),
            }
        }

        async fn set_mode(&self, _mode: ControlMode) -> Result<(), MountError> {
            Err(MountError::Rejected {
                operation: "mode change",
                reason: "test fault".into(),
            })
        }
    }

    #[async_trait]
    impl TelemetrySource for StuckMount {
        async fn status(&self) -> Result<Status, MountError> {
            let axis = AxisStatus {
                mode: ControlMode::Stop,
                commanded_position: 0.0,
                current_position: 0.0,
                current_velocity: 0.0,
            };
            Ok(Status {
                timestamp: Utc::now(),
                azimuth: axis,
                elevation: axis,
                free_stack_slots: 10_000,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_start_aborts_upload() {
        let mount = Arc::new(StuckMount::default());
        let mut controller = Controller::new(
            CommandContext::default(),
            ControllerSettings::default(),
            mount.clone(),
            mount.clone(),
        );
        let t0 = utc_to_unix(Utc::now());
        let command = Command::Path(PathCommand {
            coordinate_system: "Horizon".into(),
            points: vec![[t0 + 30.0, 0.0, 80.0, 0.0, 0.0]],
        });

        assert!(matches!(
            controller.submit(command).await,
            Err(ControllerError::Command(CommandError::Mount(_)))
        ));
        assert_eq!(controller.status().state, SessionState::Idle);

        sleep(Duration::from_secs(1)).await;
        let reason = mount.upload_abort.lock().unwrap().clone();
        assert!(reason.is_some_and(|r| r.starts_with("start failed")));
    }
}
