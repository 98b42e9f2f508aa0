//! Runtime dashboard submodel: dataplane, settings and logs screens.
//!
//! The submodel is owned by the session while the phase is `Runtime`. It
//! never performs I/O; it returns commands tagged with its runtime sequence
//! number and a per-purpose sequence (`tick_seq`, `log_tick_seq`) so results
//! that arrive after a screen change or a new activation are recognised as
//! stale and dropped.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::input::KeyAction;
use super::model::{RuntimeActivation, SessionCmd};
use super::preferences::Preferences;
use super::telemetry::{TrafficSnapshot, TrafficSource};
use super::widgets::SampleRing;
use crate::core::cancel::{CancelToken, Canceller};
use crate::core::config::DashboardConfig;
use crate::core::mode::TunnelMode;
use crate::logger::LogSource;

// ──────────────────── screens ────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Screen {
    #[default]
    Dataplane,
    Settings,
    Logs,
}

/// Tab labels in navigation order.
pub const SCREEN_LABELS: &[&str] = &["Dataplane", "Settings", "Logs"];

impl Screen {
    pub const ALL: [Self; 3] = [Self::Dataplane, Self::Settings, Self::Logs];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Dataplane => 0,
            Self::Settings => 1,
            Self::Logs => 2,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        SCREEN_LABELS[self.index()]
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    #[must_use]
    pub const fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Choice in the stop-confirmation dialog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfirmChoice {
    #[default]
    Continue,
    Stop,
}

impl ConfirmChoice {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Continue => Self::Stop,
            Self::Stop => Self::Continue,
        }
    }
}

/// Editable rows on the settings screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsRow {
    Theme,
    Units,
    StatsPanel,
    TrafficGraph,
    Footer,
}

impl SettingsRow {
    pub const ALL: [Self; 5] = [
        Self::Theme,
        Self::Units,
        Self::StatsPanel,
        Self::TrafficGraph,
        Self::Footer,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Theme => "Theme",
            Self::Units => "Units",
            Self::StatsPanel => "Stats panel",
            Self::TrafficGraph => "Traffic graph",
            Self::Footer => "Footer",
        }
    }
}

/// Rows of log text visible on the logs screen for a terminal height.
///
/// Card chrome: two borders, tab line, spacer, status line, and the footer
/// spacer plus hint line when the footer is shown.
#[must_use]
pub fn log_viewport_rows(term_rows: u16, show_footer: bool) -> usize {
    let chrome = if show_footer { 7 } else { 5 };
    usize::from(term_rows).saturating_sub(chrome).max(1)
}

// ──────────────────── messages ────────────────────

/// Task results addressed to the runtime submodel.
#[derive(Debug)]
pub enum RuntimeMsg {
    Ready,
    Tick { tick_seq: u64 },
    TrafficSampled { tick_seq: u64, snapshot: TrafficSnapshot },
    LogTick { log_seq: u64 },
    LogsChanged { log_seq: u64 },
    LogsFetched { log_seq: u64, lines: Vec<String> },
}

/// Requests the runtime submodel makes of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeRequest {
    Reconfigure,
    PreferencesChanged(Preferences),
}

#[derive(Debug)]
pub struct RuntimeUpdate {
    pub cmd: SessionCmd,
    pub request: Option<RuntimeRequest>,
}

impl RuntimeUpdate {
    const fn none() -> Self {
        Self {
            cmd: SessionCmd::None,
            request: None,
        }
    }

    const fn cmd(cmd: SessionCmd) -> Self {
        Self { cmd, request: None }
    }
}

// ──────────────────── model ────────────────────

#[derive(Debug)]
pub struct RuntimeModel {
    pub seq: u64,
    pub mode: TunnelMode,
    pub started_at: DateTime<Utc>,
    pub prefs: Preferences,
    pub screen: Screen,
    pub connected: bool,
    pub confirm: Option<ConfirmChoice>,
    pub settings_row: usize,
    pub tick_seq: u64,
    pub log_tick_seq: u64,
    pub traffic: TrafficSnapshot,
    pub rx_samples: SampleRing,
    pub tx_samples: SampleRing,
    pub log_lines: Vec<String>,
    /// Lines scrolled up from the bottom of the log.
    pub log_scroll: usize,
    pub log_follow: bool,
    pub terminal_size: (u16, u16),
    telemetry: Arc<dyn TrafficSource>,
    logs: LogSource,
    tick_interval: Duration,
    log_poll_interval: Duration,
    log_tail_lines: usize,
    /// Runtime scope: cancelled when this submodel is torn down.
    stop: Canceller,
    /// Log-wait scope: present only while the logs screen is showing.
    log_wait: Option<Canceller>,
}

impl RuntimeModel {
    /// Build the submodel for activation `seq` and its start-up commands.
    #[must_use]
    pub fn start(
        seq: u64,
        activation: RuntimeActivation,
        prefs: Preferences,
        logs: LogSource,
        config: &DashboardConfig,
        terminal_size: (u16, u16),
    ) -> (Self, SessionCmd) {
        let RuntimeActivation {
            mode,
            context,
            telemetry,
            ready,
            started_at,
        } = activation;

        let mut model = Self {
            seq,
            mode,
            started_at,
            prefs,
            screen: Screen::Dataplane,
            connected: ready.is_none(),
            confirm: None,
            settings_row: 0,
            tick_seq: 0,
            log_tick_seq: 0,
            traffic: TrafficSnapshot::default(),
            rx_samples: SampleRing::new(),
            tx_samples: SampleRing::new(),
            log_lines: Vec::new(),
            log_scroll: 0,
            log_follow: true,
            terminal_size,
            telemetry,
            logs,
            tick_interval: config.tick_interval(),
            log_poll_interval: config.log_poll_interval(),
            log_tail_lines: config.log_tail_lines,
            stop: Canceller::new(),
            log_wait: None,
        };

        let stop = model.stop.token();
        let mut cmds = vec![SessionCmd::WaitRuntimeDone {
            seq,
            context,
            stop: stop.clone(),
        }];
        if let Some(ready) = ready {
            cmds.push(SessionCmd::WaitRuntimeReady { seq, ready, stop });
        }
        cmds.push(model.start_ticks());
        (model, SessionCmd::batch(cmds))
    }

    /// Token observed by every wait this submodel issues.
    #[must_use]
    pub fn stop_token(&self) -> CancelToken {
        self.stop.token()
    }

    /// Whether a logs-screen wait is currently armed.
    #[must_use]
    pub const fn log_wait_active(&self) -> bool {
        self.log_wait.is_some()
    }

    /// Cancel every outstanding wait and invalidate in-flight results.
    pub fn stop_waits(&mut self) {
        self.stop.cancel();
        self.stop_log_wait();
        self.tick_seq += 1;
    }

    pub fn set_terminal_size(&mut self, size: (u16, u16)) {
        self.terminal_size = size;
        self.clamp_scroll();
    }

    /// Adopt preferences changed elsewhere.
    pub fn apply_preferences(&mut self, prefs: Preferences) {
        if prefs.show_graph != self.prefs.show_graph {
            self.rx_samples.clear();
            self.tx_samples.clear();
        }
        self.prefs = prefs;
        self.clamp_scroll();
    }

    #[must_use]
    pub fn viewport_rows(&self) -> usize {
        log_viewport_rows(self.terminal_size.1, self.prefs.show_footer)
    }

    #[must_use]
    pub fn max_scroll(&self) -> usize {
        self.log_lines.len().saturating_sub(self.viewport_rows())
    }

    // ── task results ──

    pub fn handle_msg(&mut self, msg: RuntimeMsg) -> SessionCmd {
        match msg {
            RuntimeMsg::Ready => {
                self.connected = true;
                SessionCmd::None
            }
            RuntimeMsg::Tick { tick_seq } => {
                if tick_seq != self.tick_seq || self.screen != Screen::Dataplane {
                    return SessionCmd::None;
                }
                SessionCmd::batch(vec![self.sample_cmd(), self.schedule_tick()])
            }
            RuntimeMsg::TrafficSampled { tick_seq, snapshot } => {
                if tick_seq == self.tick_seq {
                    self.record_sample(snapshot);
                }
                SessionCmd::None
            }
            RuntimeMsg::LogTick { log_seq } | RuntimeMsg::LogsChanged { log_seq } => {
                if log_seq != self.log_tick_seq || self.screen != Screen::Logs {
                    return SessionCmd::None;
                }
                SessionCmd::batch(vec![self.fetch_logs(), self.arm_log_wait()])
            }
            RuntimeMsg::LogsFetched { log_seq, lines } => {
                if log_seq == self.log_tick_seq {
                    self.apply_log_lines(lines);
                }
                SessionCmd::None
            }
        }
    }

    fn record_sample(&mut self, snapshot: TrafficSnapshot) {
        self.traffic = snapshot;
        if self.prefs.show_graph {
            self.rx_samples.push(snapshot.rx_rate);
            self.tx_samples.push(snapshot.tx_rate);
        }
    }

    fn apply_log_lines(&mut self, lines: Vec<String>) {
        if !self.log_follow && lines.len() > self.log_lines.len() {
            // Keep a paused view anchored while the buffer is still growing.
            self.log_scroll += lines.len() - self.log_lines.len();
        }
        self.log_lines = lines;
        self.clamp_scroll();
    }

    fn clamp_scroll(&mut self) {
        if self.log_follow {
            self.log_scroll = 0;
        } else {
            self.log_scroll = self.log_scroll.min(self.max_scroll());
        }
    }

    // ── command builders ──

    fn start_ticks(&mut self) -> SessionCmd {
        self.tick_seq += 1;
        SessionCmd::batch(vec![self.sample_cmd(), self.schedule_tick()])
    }

    fn sample_cmd(&self) -> SessionCmd {
        if !(self.prefs.show_graph || self.prefs.show_stats) {
            return SessionCmd::None;
        }
        SessionCmd::SampleTraffic {
            seq: self.seq,
            tick_seq: self.tick_seq,
            source: Arc::clone(&self.telemetry),
        }
    }

    fn schedule_tick(&self) -> SessionCmd {
        SessionCmd::ScheduleTick {
            seq: self.seq,
            tick_seq: self.tick_seq,
            after: self.tick_interval,
            stop: self.stop.token(),
        }
    }

    fn start_log_watch(&mut self) -> SessionCmd {
        self.stop_log_wait();
        self.log_wait = Some(Canceller::new());
        SessionCmd::batch(vec![self.fetch_logs(), self.arm_log_wait()])
    }

    fn stop_log_wait(&mut self) {
        if let Some(wait) = self.log_wait.take() {
            wait.cancel();
        }
        self.log_tick_seq += 1;
    }

    fn fetch_logs(&self) -> SessionCmd {
        SessionCmd::FetchLogs {
            seq: self.seq,
            log_seq: self.log_tick_seq,
            feed: Arc::clone(self.logs.feed()),
            limit: self.log_tail_lines,
        }
    }

    fn arm_log_wait(&self) -> SessionCmd {
        let Some(wait) = &self.log_wait else {
            return SessionCmd::None;
        };
        let stop = wait.token().merge(&self.stop.token());
        match &self.logs {
            LogSource::Observable { changes, .. } => SessionCmd::WatchLogChanges {
                seq: self.seq,
                log_seq: self.log_tick_seq,
                changes: changes.clone(),
                stop,
            },
            LogSource::Pollable(_) => SessionCmd::ScheduleLogTick {
                seq: self.seq,
                log_seq: self.log_tick_seq,
                after: self.log_poll_interval,
                stop,
            },
        }
    }

    fn switch_screen(&mut self, target: Screen) -> SessionCmd {
        if target == self.screen {
            return SessionCmd::None;
        }
        match self.screen {
            Screen::Logs => self.stop_log_wait(),
            Screen::Dataplane => self.tick_seq += 1,
            Screen::Settings => {}
        }
        self.screen = target;
        match target {
            Screen::Dataplane => self.start_ticks(),
            Screen::Logs => self.start_log_watch(),
            Screen::Settings => SessionCmd::None,
        }
    }

    // ── keys ──

    pub fn handle_key(&mut self, action: KeyAction) -> RuntimeUpdate {
        if let Some(choice) = self.confirm {
            return self.handle_confirm_key(choice, action);
        }
        match action {
            KeyAction::NextTab => RuntimeUpdate::cmd(self.switch_screen(self.screen.next())),
            KeyAction::PrevTab => RuntimeUpdate::cmd(self.switch_screen(self.screen.prev())),
            _ => match self.screen {
                Screen::Dataplane => {
                    if matches!(action, KeyAction::Select | KeyAction::Back) {
                        self.confirm = Some(ConfirmChoice::Continue);
                    }
                    RuntimeUpdate::none()
                }
                Screen::Settings => self.handle_settings_key(action),
                Screen::Logs => self.handle_logs_key(action),
            },
        }
    }

    fn handle_confirm_key(&mut self, choice: ConfirmChoice, action: KeyAction) -> RuntimeUpdate {
        match action {
            KeyAction::Left
            | KeyAction::Right
            | KeyAction::Up
            | KeyAction::Down
            | KeyAction::NextTab
            | KeyAction::PrevTab => {
                self.confirm = Some(choice.toggled());
                RuntimeUpdate::none()
            }
            KeyAction::Select => {
                self.confirm = None;
                match choice {
                    ConfirmChoice::Stop => RuntimeUpdate {
                        cmd: SessionCmd::None,
                        request: Some(RuntimeRequest::Reconfigure),
                    },
                    ConfirmChoice::Continue => RuntimeUpdate::none(),
                }
            }
            KeyAction::Back => {
                self.confirm = None;
                RuntimeUpdate::none()
            }
            _ => RuntimeUpdate::none(),
        }
    }

    fn handle_settings_key(&mut self, action: KeyAction) -> RuntimeUpdate {
        let rows = SettingsRow::ALL.len();
        match action {
            KeyAction::Up => {
                self.settings_row = (self.settings_row + rows - 1) % rows;
                RuntimeUpdate::none()
            }
            KeyAction::Down => {
                self.settings_row = (self.settings_row + 1) % rows;
                RuntimeUpdate::none()
            }
            KeyAction::Home => {
                self.settings_row = 0;
                RuntimeUpdate::none()
            }
            KeyAction::End => {
                self.settings_row = rows - 1;
                RuntimeUpdate::none()
            }
            KeyAction::Left => self.change_setting(false),
            KeyAction::Right | KeyAction::Select | KeyAction::Space => self.change_setting(true),
            KeyAction::Back => RuntimeUpdate::cmd(self.switch_screen(Screen::Dataplane)),
            _ => RuntimeUpdate::none(),
        }
    }

    fn change_setting(&mut self, forward: bool) -> RuntimeUpdate {
        let before = self.prefs;
        let mut prefs = self.prefs;
        match SettingsRow::ALL[self.settings_row.min(SettingsRow::ALL.len() - 1)] {
            SettingsRow::Theme => {
                prefs.theme = if forward {
                    prefs.theme.next()
                } else {
                    prefs.theme.prev()
                };
            }
            SettingsRow::Units => prefs.stats_unit = prefs.stats_unit.toggled(),
            SettingsRow::StatsPanel => prefs.show_stats = !prefs.show_stats,
            SettingsRow::TrafficGraph => prefs.show_graph = !prefs.show_graph,
            SettingsRow::Footer => prefs.show_footer = !prefs.show_footer,
        }
        self.apply_preferences(prefs);

        let mut cmds = vec![SessionCmd::SavePreferences(prefs)];
        if prefs.theme != before.theme {
            cmds.push(SessionCmd::ClearScreen);
        }
        RuntimeUpdate {
            cmd: SessionCmd::batch(cmds),
            request: Some(RuntimeRequest::PreferencesChanged(prefs)),
        }
    }

    fn handle_logs_key(&mut self, action: KeyAction) -> RuntimeUpdate {
        let page = self.viewport_rows();
        match action {
            KeyAction::Up => self.scroll_up(1),
            KeyAction::Down => self.scroll_down(1),
            KeyAction::PageUp => self.scroll_up(page),
            KeyAction::PageDown => self.scroll_down(page),
            KeyAction::Home => {
                self.log_follow = false;
                self.log_scroll = self.max_scroll();
            }
            KeyAction::End => {
                self.log_follow = true;
                self.log_scroll = 0;
            }
            KeyAction::Space => {
                self.log_follow = !self.log_follow;
                self.clamp_scroll();
            }
            KeyAction::Back => return RuntimeUpdate::cmd(self.switch_screen(Screen::Dataplane)),
            _ => {}
        }
        RuntimeUpdate::none()
    }

    fn scroll_up(&mut self, lines: usize) {
        let target = (self.log_scroll + lines).min(self.max_scroll());
        if target > 0 {
            self.log_follow = false;
        }
        self.log_scroll = target;
    }

    fn scroll_down(&mut self, lines: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(lines);
        if self.log_scroll == 0 {
            self.log_follow = true;
        }
    }
}

// ──────────────────── tests ────────────────────
