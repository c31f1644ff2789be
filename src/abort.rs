use tokio::sync::watch;

/// Abort signal observed by a started command and the background tasks it
/// spawns. Cloning is cheap; every clone sees the same abort.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<Option<String>>,
}

/// Sending side of an [`AbortSignal`].
#[derive(Debug)]
pub struct AbortHandle {
    tx: watch::Sender<Option<String>>,
}

pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(None);
    (AbortHandle { tx }, AbortSignal { rx })
}

impl AbortHandle {
    /// Abort with a reason. Later calls keep the first reason.
    pub fn abort(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
    }
}

impl AbortSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        abort_pair().1
    }

    pub fn is_aborted(&self) -> bool {
        self.rx.borrow().is_some()
    }

    pub fn reason(&self) -> Option<String> {
        self.rx.borrow().clone()
    }

    /// Resolves with the abort reason. Pends forever if the handle is
    /// dropped without aborting.
    pub async fn aborted(&self) -> String {
        let mut rx = self.rx.clone();
        let reason = match rx.wait_for(|reason| reason.is_some()).await {
            Ok(reason) => reason.clone(),
            Err(_) => None,
        };
        match reason {
            Some(reason) => reason,
            None => std::future::pending().await,
        }
    }
}
