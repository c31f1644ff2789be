use std::sync::Arc;
use tokio::sync::watch;

use crate::abort::AbortSignal;
use crate::acu::{Mount, MountError};
use crate::pattern::ScanPattern;

#[derive(Debug, Clone)]
pub enum UploadState {
    Running,
    Finished,
    Failed(MountError),
}

impl UploadState {
    pub fn is_running(&self) -> bool {
        matches!(self, UploadState::Running)
    }
}

/// Observer for a detached trajectory upload. Dropping it does not stop the
/// upload; abort the signal passed to `start` for that.
#[derive(Debug, Clone)]
pub struct UploadHandle {
    state: watch::Receiver<UploadState>,
}

impl UploadHandle {
    pub fn state(&self) -> UploadState {
        self.state.borrow().clone()
    }

    /// Wait until the upload task has ended.
    pub async fn finished(&self) -> UploadState {
        let mut rx = self.state.clone();
        let ended = match rx.wait_for(|state| !state.is_running()).await {
            Ok(state) => Some(state.clone()),
            Err(_) => None,
        };
        ended.unwrap_or_else(|| {
            UploadState::Failed(MountError::Connection(
                "upload task ended without reporting".into(),
            ))
        })
    }
}

/// Hand `pattern` to the mount on a detached task. Failures are logged
/// here and published on the returned handle; they never reach the caller
/// that started the command.
pub fn spawn_upload(
    mount: Arc<dyn Mount>,
    abort: AbortSignal,
    pattern: Arc<dyn ScanPattern>,
) -> UploadHandle {
    let (tx, rx) = watch::channel(UploadState::Running);
    let description = pattern.describe();

    tokio::spawn(async move {
        let state = match mount.upload_pattern(abort.clone(), pattern).await {
            Ok(()) => {
                log::info!("Upload of {} complete", description);
                UploadState::Finished
            }
            Err(e) if abort.is_aborted() => {
                log::info!("Upload of {} stopped: {}", description, e);
                UploadState::Failed(e)
            }
            Err(e) => {
                log::error!("Upload of {} failed: {}", description, e);
                UploadState::Failed(e)
            }
        };
        tx.send_replace(state);
    });

    UploadHandle { state: rx }
}
