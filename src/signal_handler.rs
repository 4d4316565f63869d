use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Process-wide shutdown flag. Every command runs under a child token of the
/// root, so Ctrl-C or SIGTERM cancels in-flight queries and mutations.
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    root: CancellationToken,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for one unit of work; cancelled with the root.
    pub fn child_token(&self) -> CancellationToken {
        self.root.child_token()
    }

    pub fn request_shutdown(&self) {
        if !self.root.is_cancelled() {
            warn!("Shutdown requested, cancelling in-flight requests");
        }
        self.root.cancel();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Wait for Ctrl-C (and SIGTERM on unix) in the background.
    pub fn listen(&self) -> JoinHandle<()> {
        let shutdown = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.root.cancelled() => {}
                received = wait_for_signal() => {
                    if received {
                        shutdown.request_shutdown();
                    }
                }
            }
        })
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> bool {
    let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            return ctrl_c().await;
        }
    };

    tokio::select! {
        received = ctrl_c() => received,
        _ = sigterm.recv() => {
            debug!("Received SIGTERM");
            true
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> bool {
    ctrl_c().await
}

async fn ctrl_c() -> bool {
    match signal::ctrl_c().await {
        Ok(()) => {
            debug!("Received Ctrl-C");
            true
        }
        Err(e) => {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<bool>().await
        }
    }
}
