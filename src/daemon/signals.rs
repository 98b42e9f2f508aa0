//! Signal handling: SIGTERM/SIGINT close the dashboard gracefully.
//!
//! Uses the `signal-hook` crate for safe signal registration. A watcher
//! thread polls the shutdown flag and turns it into a cancelled
//! [`CancelToken`] that can be handed to a session as its context.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{info, warn};

use crate::core::cancel::{CancelToken, Canceller};
use crate::core::errors::{Result, TunError};

/// Default flag poll interval for [`SignalHandler::watch`].
pub const SIGNAL_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ──────────────────── signal handler ────────────────────

/// Shutdown flag shared between the signal hooks and the watcher.
#[derive(Debug, Clone)]
pub struct SignalHandler {
    shutdown_flag: Arc<AtomicBool>,
}

impl SignalHandler {
    /// Create a handler and register SIGTERM/SIGINT. Registration is
    /// best-effort; failures are logged.
    pub fn new() -> Self {
        let handler = Self::unregistered();
        handler.register_signals();
        handler
    }

    fn unregistered() -> Self {
        Self {
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn should_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }

    /// Programmatically request shutdown.
    pub fn request_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::Relaxed);
    }

    /// Spawn a watcher that cancels the returned signal's token once a
    /// shutdown is requested.
    pub fn watch(&self, interval: Duration) -> Result<ShutdownSignal> {
        let fired = Arc::new(Canceller::new());
        let token = fired.token();
        let stop = Canceller::new();
        let stop_token = stop.token();
        let flag = Arc::clone(&self.shutdown_flag);

        let thread = thread::Builder::new()
            .name("tundash-signals".to_string())
            .spawn(move || {
                loop {
                    if flag.load(Ordering::Relaxed) {
                        info!("shutdown signal received");
                        fired.cancel();
                        return;
                    }
                    if !stop_token.sleep(interval) {
                        return;
                    }
                }
            })
            .map_err(|e| TunError::Runtime {
                details: format!("failed to spawn signal watcher: {e}"),
            })?;

        Ok(ShutdownSignal {
            token,
            stop,
            thread: Some(thread),
        })
    }

    fn register_signals(&self) {
        if let Err(e) = signal_hook::flag::register(SIGTERM, Arc::clone(&self.shutdown_flag)) {
            warn!(error = %e, "failed to register SIGTERM");
        }
        if let Err(e) = signal_hook::flag::register(SIGINT, Arc::clone(&self.shutdown_flag)) {
            warn!(error = %e, "failed to register SIGINT");
        }
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

// ──────────────────── shutdown signal ────────────────────

/// Token cancelled on SIGTERM/SIGINT. Dropping it stops the watcher.
#[derive(Debug)]
pub struct ShutdownSignal {
    token: CancelToken,
    stop: Canceller,
    thread: Option<JoinHandle<()>>,
}

impl ShutdownSignal {
    #[must_use]
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    #[must_use]
    pub fn fired(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for ShutdownSignal {
    fn drop(&mut self) {
        self.stop.cancel();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

// ──────────────────── tests ────────────────────
