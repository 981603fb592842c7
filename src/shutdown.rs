//! Cancellation of in-flight report loads.
//!
//! A [`ShutdownCoordinator`] is a one-way flag: once a Ctrl+C (or a test)
//! requests it, every `load_reports` call watching it aborts its fetch tasks and
//! returns `LoadError::Cancelled`. Loaders built with `ReportLoader::new` pick up
//! the process-wide handle registered by the binary.

use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::warn;

pub type SharedShutdown = Arc<ShutdownCoordinator>;

static PROCESS_SHUTDOWN: OnceCell<SharedShutdown> = OnceCell::new();

/// Register the handle loaders use by default. Only the first call takes effect.
pub fn set_global_shutdown(handle: SharedShutdown) {
    let _ = PROCESS_SHUTDOWN.set(handle);
}

pub fn get_global_shutdown() -> Option<SharedShutdown> {
    PROCESS_SHUTDOWN.get().cloned()
}

/// Request cancellation of `shutdown` on the first Ctrl+C
pub fn cancel_on_ctrl_c(shutdown: SharedShutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received, cancelling in-flight reports");
            shutdown.request_shutdown();
        }
    })
}

/// Cancellation flag with async wake-up
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    cancelled: AtomicBool,
    wake: Notify,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedShutdown {
        Arc::new(Self::new())
    }

    /// Flip the flag; only the first request wakes waiters
    pub fn request_shutdown(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.wake.notify_waiters();
        }
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once cancellation is requested, immediately if it already was
    pub async fn wait_for_shutdown(&self) {
        let notified = self.wake.notified();
        tokio::pin!(notified);
        // Registered before the flag check so a concurrent request is not lost
        notified.as_mut().enable();

        if self.is_shutdown_requested() {
            return;
        }
        notified.await;
    }
}
