//! Session driver: the single message loop that owns the model.
//!
//! The loop receives [`SessionMsg`] values, runs them through
//! [`update`], executes the returned [`SessionCmd`] list and paints one frame
//! per drained batch. Waits run on named threads that post exactly one
//! message back; every wait observes the session shutdown token in addition
//! to its own scope.

#![allow(missing_docs)]

use std::io::{self, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::{cursor, queue, style, terminal};
use tracing::{debug, warn};

use super::dashboard::RuntimeMsg;
use super::model::{SessionCmd, SessionEvent, SessionModel, SessionMsg};
use super::preferences::{Preferences, PreferencesStore, PreferencesWriter};
use super::render::Renderer;
use super::theme::ColorMode;
use super::update::update;
use crate::core::cancel::{CancelToken, Canceller, Waited};
use crate::core::errors::{SessionError, TunError};

/// Input poll timeout; bounds how long the input thread takes to notice
/// shutdown.
pub const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(50);

// ──────────────────── output ────────────────────

/// Where frames go.
pub enum FrameOutput {
    /// The alternate screen, diffed row by row.
    Terminal,
    /// Headless: every frame written in full, rows separated by `\n`.
    Writer(Box<dyn Write + Send>),
    Discard,
}

impl std::fmt::Debug for FrameOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Terminal => "Terminal",
            Self::Writer(_) => "Writer",
            Self::Discard => "Discard",
        })
    }
}

// ──────────────────── events ────────────────────

/// Bounded outbound event buffer.
///
/// A full buffer drops ordinary events, but a terminal event evicts the
/// oldest buffered ones until it fits, so a caller that reads late still sees
/// how the session ended.
#[derive(Debug, Clone)]
pub struct EventQueue {
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
}

impl EventQueue {
    /// `rx` must be a clone of the receiver the handle reads from.
    #[must_use]
    pub const fn new(tx: Sender<SessionEvent>, rx: Receiver<SessionEvent>) -> Self {
        Self { tx, rx }
    }

    pub fn push(&self, event: SessionEvent) {
        let mut event = event;
        loop {
            match self.tx.try_send(event) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) if rejected.is_terminal() => {
                    if let Ok(evicted) = self.rx.try_recv() {
                        warn!(?evicted, "session event buffer full; evicting oldest event");
                    }
                    event = rejected;
                }
                Err(TrySendError::Full(rejected)) => {
                    warn!(event = ?rejected, "session event buffer full; dropping event");
                    return;
                }
                Err(TrySendError::Disconnected(rejected)) => {
                    debug!(event = ?rejected, "no session event listener");
                    return;
                }
            }
        }
    }
}

// ──────────────────── driver ────────────────────

pub struct Driver {
    model: SessionModel,
    renderer: Renderer,
    msg_tx: Sender<SessionMsg>,
    msg_rx: Receiver<SessionMsg>,
    events: EventQueue,
    shutdown: Canceller,
    preferences: Arc<dyn PreferencesStore>,
    writer: Option<PreferencesWriter>,
    output: FrameOutput,
    last_frame: Vec<String>,
    force_clear: bool,
    quit: bool,
}

impl Driver {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        model: SessionModel,
        color: ColorMode,
        msg_tx: Sender<SessionMsg>,
        msg_rx: Receiver<SessionMsg>,
        events: EventQueue,
        shutdown: Canceller,
        preferences: Arc<dyn PreferencesStore>,
        output: FrameOutput,
    ) -> Self {
        let writer = match PreferencesWriter::spawn(Arc::clone(&preferences)) {
            Ok(writer) => Some(writer),
            Err(err) => {
                warn!(error = %err, "failed to spawn preferences writer; saving inline");
                None
            }
        };
        Self {
            model,
            renderer: Renderer::new(color),
            msg_tx,
            msg_rx,
            events,
            shutdown,
            preferences,
            writer,
            output,
            last_frame: Vec::new(),
            force_clear: true,
            quit: false,
        }
    }

    /// Run until the reducer quits or every sender is gone. Cancels the
    /// session shutdown scope on the way out.
    pub fn run(mut self) {
        let init = self.model.init();
        self.execute(init);
        if !self.quit {
            self.paint_or_fail();
        }

        while !self.quit {
            let Ok(msg) = self.msg_rx.recv() else {
                debug!("session message channel closed");
                break;
            };
            self.dispatch(msg);
            while !self.quit {
                match self.msg_rx.try_recv() {
                    Ok(msg) => self.dispatch(msg),
                    Err(_) => break,
                }
            }
            if !self.quit {
                self.paint_or_fail();
            }
        }

        self.shutdown.cancel();
        if let Some(runtime) = self.model.runtime.as_mut() {
            runtime.stop_waits();
        }
        debug!("session loop finished");
    }

    fn dispatch(&mut self, msg: SessionMsg) {
        let cmd = update(&mut self.model, msg);
        self.execute(cmd);
    }

    fn paint_or_fail(&mut self) {
        if let Err(err) = self.paint() {
            warn!(error = %err, "frame write failed; closing session");
            self.model.terminated = true;
            self.emit(SessionEvent::Error(SessionError::Internal(err)));
            self.quit = true;
        }
    }

    // ── commands ──

    fn execute(&mut self, cmd: SessionCmd) {
        for cmd in cmd.flatten() {
            match cmd {
                SessionCmd::None | SessionCmd::Batch(_) => {}
                SessionCmd::Emit(event) => self.emit(event),
                SessionCmd::Quit => self.quit = true,
                SessionCmd::ClearScreen => self.force_clear = true,
                SessionCmd::ScheduleTick {
                    seq,
                    tick_seq,
                    after,
                    stop,
                } => self.spawn_wait("tick", &stop, move |scope, tx| {
                    if scope.sleep(after) {
                        let _ = tx.send(SessionMsg::Runtime {
                            seq,
                            msg: RuntimeMsg::Tick { tick_seq },
                        });
                    }
                }),
                SessionCmd::ScheduleLogTick {
                    seq,
                    log_seq,
                    after,
                    stop,
                } => self.spawn_wait("log-tick", &stop, move |scope, tx| {
                    if scope.sleep(after) {
                        let _ = tx.send(SessionMsg::Runtime {
                            seq,
                            msg: RuntimeMsg::LogTick { log_seq },
                        });
                    }
                }),
                SessionCmd::WatchLogChanges {
                    seq,
                    log_seq,
                    changes,
                    stop,
                } => self.spawn_wait("log-watch", &stop, move |scope, tx| {
                    if let Waited::Ready(()) = scope.recv(&changes) {
                        let _ = tx.send(SessionMsg::Runtime {
                            seq,
                            msg: RuntimeMsg::LogsChanged { log_seq },
                        });
                    }
                }),
                SessionCmd::FetchLogs {
                    seq,
                    log_seq,
                    feed,
                    limit,
                } => {
                    let lines = feed.tail(limit);
                    self.post(SessionMsg::Runtime {
                        seq,
                        msg: RuntimeMsg::LogsFetched { log_seq, lines },
                    });
                }
                SessionCmd::SampleTraffic {
                    seq,
                    tick_seq,
                    source,
                } => {
                    let snapshot = source.snapshot();
                    self.post(SessionMsg::Runtime {
                        seq,
                        msg: RuntimeMsg::TrafficSampled { tick_seq, snapshot },
                    });
                }
                SessionCmd::WaitRuntimeDone { seq, context, stop } => {
                    self.spawn_wait("runtime-done", &stop, move |scope, tx| {
                        if context.race(&scope) {
                            let _ = tx.send(SessionMsg::RuntimeContextDone { seq });
                        }
                    });
                }
                SessionCmd::WaitRuntimeReady { seq, ready, stop } => {
                    self.spawn_wait("runtime-ready", &stop, move |scope, tx| {
                        if let Waited::Ready(()) | Waited::Closed = scope.recv(&ready) {
                            let _ = tx.send(SessionMsg::Runtime {
                                seq,
                                msg: RuntimeMsg::Ready,
                            });
                        }
                    });
                }
                SessionCmd::SavePreferences(prefs) => self.save_preferences(prefs),
            }
        }
    }

    fn save_preferences(&mut self, prefs: Preferences) {
        if let Some(writer) = self.writer.as_ref() {
            match writer.request_save(prefs) {
                Ok(()) => return,
                Err(err) => {
                    warn!(error = %err, code = err.code(), "preferences writer gone; saving inline");
                    self.writer = None;
                }
            }
        }
        if let Err(err) = self.preferences.save(&prefs) {
            warn!(error = %err, code = err.code(), "failed to save preferences");
        }
    }

    fn post(&self, msg: SessionMsg) {
        // The loop holds its own receiver, so this only fails after shutdown.
        let _ = self.msg_tx.send(msg);
    }

    fn emit(&self, event: SessionEvent) {
        self.events.push(event);
    }

    fn spawn_wait<F>(&self, name: &str, stop: &CancelToken, task: F)
    where
        F: FnOnce(CancelToken, Sender<SessionMsg>) + Send + 'static,
    {
        let scope = stop.merge(&self.shutdown.token());
        let tx = self.msg_tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("tundash-{name}"))
            .spawn(move || task(scope, tx));
        if let Err(err) = spawned {
            warn!(error = %err, task = name, "failed to spawn wait task");
        }
    }

    // ── output ──

    fn paint(&mut self) -> Result<(), TunError> {
        let frame = self.renderer.render(&self.model, Utc::now());
        let result = match &mut self.output {
            FrameOutput::Discard => Ok(()),
            FrameOutput::Writer(writer) => write_full(writer.as_mut(), &frame),
            FrameOutput::Terminal => {
                let stdout = io::stdout();
                let mut lock = stdout.lock();
                write_diff(&mut lock, &frame, &self.last_frame, self.force_clear)
            }
        };
        result.map_err(|source| TunError::Terminal { source })?;
        self.last_frame = frame;
        self.force_clear = false;
        Ok(())
    }
}

fn write_full(out: &mut dyn Write, frame: &[String]) -> io::Result<()> {
    for line in frame {
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

fn write_diff<W: Write>(out: &mut W, frame: &[String], last: &[String], clear: bool) -> io::Result<()> {
    if clear {
        queue!(out, terminal::Clear(terminal::ClearType::All))?;
    }
    for (row, line) in frame.iter().enumerate() {
        if !clear && last.get(row) == Some(line) {
            continue;
        }
        let row = u16::try_from(row).unwrap_or(u16::MAX);
        queue!(out, cursor::MoveTo(0, row), style::Print(line))?;
    }
    out.flush()
}

// ──────────────────── input ────────────────────

/// Forward key presses and resizes until shutdown or the loop goes away.
pub fn spawn_input_thread(tx: Sender<SessionMsg>, shutdown: CancelToken) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("tundash-input".to_string())
        .spawn(move || {
            while !shutdown.is_cancelled() {
                let msg = match event::poll(INPUT_POLL_INTERVAL) {
                    Ok(false) => continue,
                    Ok(true) => match event::read() {
                        Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => SessionMsg::Key(key),
                        Ok(Event::Resize(cols, rows)) => SessionMsg::Resize { cols, rows },
                        Ok(_) => continue,
                        Err(err) => {
                            warn!(error = %err, "terminal input read failed");
                            break;
                        }
                    },
                    Err(err) => {
                        warn!(error = %err, "terminal input poll failed");
                        break;
                    }
                };
                if tx.send(msg).is_err() {
                    break;
                }
            }
            debug!("input thread stopped");
        })
}

// ──────────────────── tests ────────────────────
