//! Elm-style session model for the dashboard.
//!
//! All session state lives in [`SessionModel`]. Terminal input, task results
//! and external API calls arrive as [`SessionMsg`] values; side effects are
//! represented as [`SessionCmd`] values returned from
//! [`update`](super::update::update) and executed by the driver.
//!
//! **Design invariant:** the model is deterministic and testable; no I/O
//! happens here.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use crossterm::event::KeyEvent;

use super::configurator::ConfiguratorModel;
use super::dashboard::{RuntimeModel, RuntimeMsg};
use super::fatal::{FatalModel, FatalReport};
use super::preferences::Preferences;
use super::telemetry::TrafficSource;
use crate::core::cancel::CancelToken;
use crate::core::config::{Config, DashboardConfig};
use crate::core::errors::SessionError;
use crate::core::mode::TunnelMode;
use crate::logger::{LogFeed, LogSource};

// ──────────────────── phases ────────────────────

/// Top-level session phase. Exactly one submodel is live per phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Configuring,
    WaitingForRuntime,
    Runtime,
    FatalError,
}

// ──────────────────── activation ────────────────────

/// Everything the dashboard needs to follow one data-plane run.
#[derive(Debug)]
pub struct RuntimeActivation {
    pub mode: TunnelMode,
    /// Cancelled when the data plane stops.
    pub context: CancelToken,
    pub telemetry: Arc<dyn TrafficSource>,
    /// Fires (or disconnects) once the data plane is up. Without one the
    /// runtime is shown as connected immediately.
    pub ready: Option<Receiver<()>>,
    pub started_at: DateTime<Utc>,
}

impl RuntimeActivation {
    #[must_use]
    pub fn new(mode: TunnelMode, context: CancelToken, telemetry: Arc<dyn TrafficSource>) -> Self {
        Self {
            mode,
            context,
            telemetry,
            ready: None,
            started_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_ready(mut self, ready: Receiver<()>) -> Self {
        self.ready = Some(ready);
        self
    }
}

// ──────────────────── messages ────────────────────

#[derive(Debug)]
pub enum SessionMsg {
    Key(KeyEvent),
    Resize { cols: u16, rows: u16 },
    ActivateRuntime(RuntimeActivation),
    /// The activation context of runtime `seq` was cancelled.
    RuntimeContextDone { seq: u64 },
    /// Result of a task issued by runtime `seq`.
    Runtime { seq: u64, msg: RuntimeMsg },
    ShowFatal(FatalReport),
    /// Preferences changed outside the settings screen.
    PreferencesUpdated(Preferences),
    /// Graceful close: external call, signal, or session context.
    Close,
}

/// Outbound notifications consumed by the blocking session API.
#[derive(Debug)]
pub enum SessionEvent {
    ModeSelected(TunnelMode),
    Reconfigure,
    RuntimeDisconnected,
    Exit,
    Error(SessionError),
}

impl SessionEvent {
    /// `Exit` and `Error` end the session; nothing follows them.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Exit | Self::Error(_))
    }
}

// ──────────────────── commands ────────────────────

/// Side effects requested by the reducer.
///
/// Every wait carries the scope token it must observe in addition to the
/// session shutdown token the driver merges in.
#[derive(Debug)]
pub enum SessionCmd {
    None,
    Batch(Vec<Self>),
    Emit(SessionEvent),
    /// Terminate the message loop.
    Quit,
    /// Force a full repaint on the next frame.
    ClearScreen,
    ScheduleTick {
        seq: u64,
        tick_seq: u64,
        after: Duration,
        stop: CancelToken,
    },
    ScheduleLogTick {
        seq: u64,
        log_seq: u64,
        after: Duration,
        stop: CancelToken,
    },
    WatchLogChanges {
        seq: u64,
        log_seq: u64,
        changes: Receiver<()>,
        stop: CancelToken,
    },
    FetchLogs {
        seq: u64,
        log_seq: u64,
        feed: Arc<dyn LogFeed>,
        limit: usize,
    },
    SampleTraffic {
        seq: u64,
        tick_seq: u64,
        source: Arc<dyn TrafficSource>,
    },
    WaitRuntimeDone {
        seq: u64,
        context: CancelToken,
        stop: CancelToken,
    },
    WaitRuntimeReady {
        seq: u64,
        ready: Receiver<()>,
        stop: CancelToken,
    },
    SavePreferences(Preferences),
}

impl SessionCmd {
    /// Collapse a command list: `None`s are dropped and a single survivor is
    /// returned unwrapped.
    #[must_use]
    pub fn batch(cmds: Vec<Self>) -> Self {
        let mut cmds: Vec<Self> = cmds.into_iter().filter(|c| !c.is_none()).collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or(Self::None),
            _ => Self::Batch(cmds),
        }
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Depth-first list of the leaf commands.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<Self>) {
        match self {
            Self::None => {}
            Self::Batch(cmds) => {
                for cmd in cmds {
                    cmd.flatten_into(out);
                }
            }
            other => out.push(other),
        }
    }
}

// ──────────────────── session model ────────────────────

#[derive(Debug)]
pub struct SessionModel {
    pub phase: Phase,
    pub terminal_size: (u16, u16),
    /// Bumped on every runtime activation; results tagged with an older
    /// value are stale.
    pub runtime_seq: u64,
    pub prefs: Preferences,
    pub configurator: Option<ConfiguratorModel>,
    pub runtime: Option<RuntimeModel>,
    pub fatal: Option<FatalModel>,
    /// Mode chosen in the configurator, awaiting activation.
    pub pending_mode: Option<TunnelMode>,
    /// Mode of the most recent activation, preselected on reconfigure.
    pub last_mode: Option<TunnelMode>,
    /// Latched once the session has quit; every later message is ignored.
    pub terminated: bool,
    pub settings: DashboardConfig,
    pub modes: Vec<TunnelMode>,
    pub logs: LogSource,
    startup_error: Option<SessionError>,
}

impl SessionModel {
    #[must_use]
    pub fn new(config: &Config, prefs: Preferences, logs: LogSource, terminal_size: (u16, u16)) -> Self {
        let modes = config.modes.available.clone();
        let (configurator, startup_error) = match ConfiguratorModel::new(&modes, None) {
            Ok(c) => (Some(c), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            phase: Phase::Configuring,
            terminal_size,
            runtime_seq: 0,
            prefs,
            configurator,
            runtime: None,
            fatal: None,
            pending_mode: None,
            last_mode: None,
            terminated: false,
            settings: config.dashboard.clone(),
            modes,
            logs,
            startup_error,
        }
    }

    /// Start-up command: an error and quit when the configurator could not
    /// be built.
    pub fn init(&mut self) -> SessionCmd {
        match self.startup_error.take() {
            Some(err) => {
                self.terminated = true;
                SessionCmd::Batch(vec![
                    SessionCmd::Emit(SessionEvent::Error(err)),
                    SessionCmd::Quit,
                ])
            }
            None => SessionCmd::None,
        }
    }
}

// ──────────────────── tests ────────────────────
