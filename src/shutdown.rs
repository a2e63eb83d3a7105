//! Process shutdown.
//!
//! The server claims GPIO pins that must be released on every exit path,
//! including an interrupt that lands while it is still starting up. Install
//! [`ShutdownSignals`] before claiming anything; from then on SIGINT and
//! SIGTERM are queued instead of killing the process.

use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::debug;

use crate::error::{Error, Result};
use crate::sampling::SamplingHandle;

/// Captured SIGINT and SIGTERM.
pub struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
}

impl ShutdownSignals {
    /// Replace the default SIGINT and SIGTERM handlers.
    ///
    /// Must be called from within a tokio runtime. Signals delivered after
    /// this returns are kept until [`ShutdownSignals::recv`] is polled.
    pub fn install() -> Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the next shutdown request. Returns the signal name.
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

/// Run `job` on the blocking thread pool and wait for it.
pub async fn run_blocking<T, F>(job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| Error::Internal(e.to_string()))?
}

/// Stop the sampling thread and release its lines without blocking a
/// runtime worker.
pub async fn stop_sampling(handle: SamplingHandle) -> Result<()> {
    run_blocking(move || {
        handle.stop();
        Ok(())
    })
    .await?;
    debug!("Sampling stopped off the runtime");
    Ok(())
}
