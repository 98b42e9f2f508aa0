//! Blocking session API over the message loop.
//!
//! [`Session::start`] spawns the loop thread (plus the input thread for an
//! interactive terminal) and returns a [`SessionHandle`]. Every handle method
//! is a message into the loop or a blocking read of the event channel; the
//! handle never touches the model directly.
//!
//! The loop may emit its last event and stop in the same instant. Waits
//! therefore select on both the event channel and the done channel, and after
//! done fires they drain one already-buffered event before reporting
//! [`SessionError::SessionClosed`].

#![allow(missing_docs)]

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, select, unbounded};
use crossterm::event::KeyEvent;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::fatal::FatalReport;
use super::model::{RuntimeActivation, SessionEvent, SessionModel, SessionMsg};
use super::preferences::{MemoryPreferencesStore, Preferences, PreferencesStore, load_or_default};
use super::runtime::{Driver, EventQueue, FrameOutput, spawn_input_thread};
use super::terminal_guard::TerminalGuard;
use super::theme::ColorMode;
use crate::core::cancel::{CancelToken, Canceller};
use crate::core::config::Config;
use crate::core::errors::{SessionError, TunError};
use crate::core::mode::TunnelMode;
use crate::logger::{EmptyFeed, LogCapture, LogSource};

/// Capacity of the outbound event channel.
pub const EVENT_CAPACITY: usize = 16;

// ──────────────────── options ────────────────────

pub struct SessionOptions {
    pub config: Config,
    /// Own the terminal (raw mode, alternate screen, input thread).
    pub interactive: bool,
    /// Starting size; defaults to the terminal's size, or 80x24 headless.
    pub initial_size: Option<(u16, u16)>,
    /// Headless frame sink. Ignored when interactive.
    pub output: Option<Box<dyn Write + Send>>,
    /// Closes the session when cancelled.
    pub context: Option<CancelToken>,
    pub color: ColorMode,
}

impl SessionOptions {
    #[must_use]
    pub fn interactive(config: Config) -> Self {
        Self {
            config,
            interactive: true,
            initial_size: None,
            output: None,
            context: None,
            color: ColorMode::from_environment(),
        }
    }

    #[must_use]
    pub fn headless(config: Config, size: (u16, u16)) -> Self {
        Self {
            config,
            interactive: false,
            initial_size: Some(size),
            output: None,
            context: None,
            color: ColorMode::Disabled,
        }
    }

    #[must_use]
    pub fn with_output(mut self, output: Box<dyn Write + Send>) -> Self {
        self.output = Some(output);
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: CancelToken) -> Self {
        self.context = Some(context);
        self
    }

    #[must_use]
    pub const fn with_color(mut self, color: ColorMode) -> Self {
        self.color = color;
        self
    }
}

impl std::fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOptions")
            .field("interactive", &self.interactive)
            .field("initial_size", &self.initial_size)
            .field("has_output", &self.output.is_some())
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

/// Collaborators injected into a session.
#[derive(Debug)]
pub struct SessionDeps {
    pub preferences: Arc<dyn PreferencesStore>,
    /// Log source for the Logs screen. Defaults to the capture buffer, or an
    /// empty feed without one.
    pub logs: Option<LogSource>,
    /// Enabled while the loop runs so log output lands in the buffer instead
    /// of on the dashboard's terminal.
    pub capture: Option<LogCapture>,
}

impl Default for SessionDeps {
    fn default() -> Self {
        Self {
            preferences: Arc::new(MemoryPreferencesStore::default()),
            logs: None,
            capture: None,
        }
    }
}

// ──────────────────── start ────────────────────

pub struct Session;

impl Session {
    /// Spawn the session and return its handle.
    ///
    /// # Errors
    /// Terminal setup failures and thread spawn failures.
    pub fn start(options: SessionOptions, deps: SessionDeps) -> Result<SessionHandle, TunError> {
        let SessionOptions {
            config,
            interactive,
            initial_size,
            output,
            context,
            color,
        } = options;
        let SessionDeps {
            preferences,
            logs,
            mut capture,
        } = deps;

        let prefs = load_or_default(preferences.as_ref());
        let size = initial_size.unwrap_or_else(|| {
            if interactive {
                TerminalGuard::terminal_size()
            } else {
                (80, 24)
            }
        });
        let logs = logs.unwrap_or_else(|| match capture.as_ref() {
            Some(capture) => LogSource::observe(capture.buffer()),
            None => LogSource::poll(Arc::new(EmptyFeed)),
        });
        let model = SessionModel::new(&config, prefs, logs, size);

        let (msg_tx, msg_rx) = unbounded();
        let (event_tx, event_rx) = bounded(EVENT_CAPACITY);
        let (done_tx, done_rx) = bounded::<()>(0);
        let shutdown = Canceller::new();
        let shutdown_token = shutdown.token();

        if let Some(capture) = capture.as_mut() {
            capture.enable();
        }
        let guard = if interactive {
            Some(TerminalGuard::new().map_err(|source| TunError::Terminal { source })?)
        } else {
            None
        };
        let output = match (interactive, output) {
            (true, _) => FrameOutput::Terminal,
            (false, Some(writer)) => FrameOutput::Writer(writer),
            (false, None) => FrameOutput::Discard,
        };

        let input = if interactive {
            Some(
                spawn_input_thread(msg_tx.clone(), shutdown_token.clone())
                    .map_err(|e| spawn_error("input", &e))?,
            )
        } else {
            None
        };

        if let Some(context) = context {
            let tx = msg_tx.clone();
            let scope = shutdown_token.clone();
            thread::Builder::new()
                .name("tundash-context".to_string())
                .spawn(move || {
                    if context.race(&scope) {
                        info!("session context cancelled; closing dashboard");
                        let _ = tx.send(SessionMsg::Close);
                    }
                })
                .map_err(|e| spawn_error("context", &e))?;
        }

        let driver = Driver::new(
            model,
            color,
            msg_tx.clone(),
            msg_rx,
            EventQueue::new(event_tx, event_rx.clone()),
            shutdown,
            preferences,
            output,
        );

        let thread = thread::Builder::new()
            .name("tundash-session".to_string())
            .spawn(move || {
                driver.run();
                if let Some(input) = input
                    && input.join().is_err()
                {
                    warn!("input thread panicked");
                }
                drop(capture);
                drop(guard);
                drop(done_tx);
            })
            .map_err(|e| spawn_error("session", &e))?;

        debug!(interactive, cols = size.0, rows = size.1, "session started");
        Ok(SessionHandle {
            msgs: msg_tx,
            events: event_rx,
            done: done_rx,
            closed: AtomicBool::new(false),
            thread: Mutex::new(Some(thread)),
        })
    }
}

fn spawn_error(component: &str, err: &std::io::Error) -> TunError {
    TunError::Runtime {
        details: format!("failed to spawn {component} thread: {err}"),
    }
}

// ──────────────────── handle ────────────────────

#[derive(Debug)]
pub struct SessionHandle {
    msgs: Sender<SessionMsg>,
    events: Receiver<SessionEvent>,
    done: Receiver<()>,
    closed: AtomicBool,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl SessionHandle {
    /// Hand a started data plane to the dashboard. Ignored unless the
    /// session is waiting for a runtime.
    ///
    /// # Errors
    /// Once the loop has stopped: [`SessionError::UserExit`] or the emitted
    /// error when the session ended that way, else
    /// [`SessionError::SessionClosed`].
    pub fn activate_runtime(&self, activation: RuntimeActivation) -> Result<(), SessionError> {
        self.send(SessionMsg::ActivateRuntime(activation))
            .map_err(|err| self.ending(err))
    }

    /// Block until the operator picks a mode.
    ///
    /// # Errors
    /// [`SessionError::UserExit`] when the operator quits, the emitted error
    /// when the configurator fails, or [`SessionError::SessionClosed`].
    pub fn wait_mode_selected(&self) -> Result<TunnelMode, SessionError> {
        loop {
            match self.next_event() {
                Some(SessionEvent::ModeSelected(mode)) => return Ok(mode),
                Some(SessionEvent::Exit) => return Err(SessionError::UserExit),
                Some(SessionEvent::Error(err)) => return Err(err),
                Some(other) => debug!(event = ?other, "ignoring event while waiting for mode"),
                None => return Err(SessionError::SessionClosed),
            }
        }
    }

    /// Block until the runtime phase ends. `Ok(true)` means the operator
    /// asked to reconfigure.
    ///
    /// # Errors
    /// [`SessionError::RuntimeDisconnected`] when the data plane's context
    /// ended (the session stays usable), [`SessionError::UserExit`],
    /// an emitted error, or [`SessionError::SessionClosed`].
    pub fn wait_runtime_exit(&self) -> Result<bool, SessionError> {
        loop {
            match self.next_event() {
                Some(SessionEvent::Reconfigure) => return Ok(true),
                Some(SessionEvent::RuntimeDisconnected) => {
                    return Err(SessionError::RuntimeDisconnected);
                }
                Some(SessionEvent::Exit) => return Err(SessionError::UserExit),
                Some(SessionEvent::Error(err)) => return Err(err),
                Some(other) => debug!(event = ?other, "ignoring event while waiting for runtime exit"),
                None => return Err(SessionError::SessionClosed),
            }
        }
    }

    /// Show a fatal error and block until the operator dismisses it.
    ///
    /// # Errors
    /// [`SessionError::UserExit`] when the operator already left, an emitted
    /// error, or [`SessionError::SessionClosed`].
    pub fn show_fatal(&self, message: impl Into<String>) -> Result<(), SessionError> {
        self.send(SessionMsg::ShowFatal(FatalReport::new(message)))
            .map_err(|err| self.ending(err))?;
        loop {
            match self.next_event() {
                Some(SessionEvent::Exit) => return Ok(()),
                Some(SessionEvent::Error(err)) => return Err(err),
                Some(other) => debug!(event = ?other, "ignoring event while fatal screen is up"),
                None => return Err(SessionError::SessionClosed),
            }
        }
    }

    /// Ask the loop to exit. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.msgs.send(SessionMsg::Close);
        }
    }

    /// Disconnects once the loop has stopped and the terminal is restored.
    #[must_use]
    pub fn done(&self) -> Receiver<()> {
        self.done.clone()
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(
            self.done.try_recv(),
            Err(crossbeam_channel::TryRecvError::Disconnected)
        )
    }

    /// Wait for the loop thread. Later calls return immediately.
    pub fn join(&self) {
        let handle = self.thread.lock().take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            warn!("session loop thread panicked");
        }
    }

    /// Inject a key press (headless use).
    ///
    /// # Errors
    /// [`SessionError::SessionClosed`] once the loop has stopped.
    pub fn send_key(&self, key: KeyEvent) -> Result<(), SessionError> {
        self.send(SessionMsg::Key(key))
    }

    /// # Errors
    /// [`SessionError::SessionClosed`] once the loop has stopped.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), SessionError> {
        self.send(SessionMsg::Resize { cols, rows })
    }

    /// Push preferences changed outside the dashboard.
    ///
    /// # Errors
    /// [`SessionError::SessionClosed`] once the loop has stopped.
    pub fn set_preferences(&self, prefs: Preferences) -> Result<(), SessionError> {
        self.send(SessionMsg::PreferencesUpdated(prefs))
    }

    fn send(&self, msg: SessionMsg) -> Result<(), SessionError> {
        if self.is_done() {
            return Err(SessionError::SessionClosed);
        }
        self.msgs.send(msg).map_err(|_| SessionError::SessionClosed)
    }

    /// Replace `SessionClosed` with the terminal event the loop left behind.
    fn ending(&self, err: SessionError) -> SessionError {
        if !matches!(err, SessionError::SessionClosed) {
            return err;
        }
        while let Ok(event) = self.events.try_recv() {
            match event {
                SessionEvent::Exit => return SessionError::UserExit,
                SessionEvent::Error(err) => return err,
                other => debug!(event = ?other, "discarding event from a stopped session"),
            }
        }
        err
    }

    /// Next event, or `None` once the loop is done and nothing is buffered.
    fn next_event(&self) -> Option<SessionEvent> {
        select! {
            recv(self.events) -> event => event.ok(),
            recv(self.done) -> _ => self.events.try_recv().ok(),
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.close();
        self.join();
    }
}
