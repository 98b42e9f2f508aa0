//! Frame renderer: session model → full-screen ANSI rows.
//!
//! Rendering is a pure function of the model plus the wall clock. Each phase
//! builds a list of styled content lines that is boxed into a card, centered,
//! and filled to exactly the terminal size. Rendering never fails: tiny
//! terminals clip the card instead of erroring.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};

use super::dashboard::{ConfirmChoice, RuntimeModel, SCREEN_LABELS, Screen, SettingsRow};
use super::frame::{card, center, fill};
use super::input::{HintContext, hint_line};
use super::layout::{label_row, strip_ansi, truncate, wrap};
use super::model::{Phase, SessionModel};
use super::preferences::{Preferences, StatsUnit};
use super::styles::{Role, StyleCache, StyleSet, TabLineCache};
use super::theme::ColorMode;
use super::widgets::{Sparkline, format_bytes, format_duration, format_rate};

const LABEL_WIDTH: usize = 12;
const SETTINGS_LABEL_WIDTH: usize = 16;

/// Renderer with its own style, tab-line and baseline caches.
#[derive(Debug)]
pub struct Renderer {
    styles: StyleCache,
    tabs: TabLineCache,
    sparkline: Sparkline,
}

impl Renderer {
    #[must_use]
    pub fn new(color: ColorMode) -> Self {
        Self {
            styles: StyleCache::new(color),
            tabs: TabLineCache::new(SCREEN_LABELS),
            sparkline: Sparkline::new(),
        }
    }

    /// Render one frame: exactly `rows` lines of exactly `cols` visible
    /// columns each.
    #[must_use]
    pub fn render(&self, model: &SessionModel, now: DateTime<Utc>) -> Vec<String> {
        let (cols, rows) = model.terminal_size;
        let width = usize::from(cols).max(1);
        let height = usize::from(rows).max(1);
        let styles = self.styles.get(model.prefs.theme);
        let inner = width
            .saturating_sub(4)
            .min(model.settings.max_card_width)
            .max(1);

        let body = match model.phase {
            Phase::Configuring => configurator_lines(model, &styles, inner),
            Phase::WaitingForRuntime => waiting_lines(model, &styles, inner),
            Phase::Runtime => match model.runtime.as_ref() {
                Some(runtime) => self.runtime_lines(runtime, &styles, inner, now),
                None => waiting_lines(model, &styles, inner),
            },
            Phase::FatalError => fatal_lines(model, &styles, inner),
        };

        let boxed = card(&body, inner, &styles);
        let placed = center(&boxed, width, height);
        fill(placed, width, height, styles.base(), styles.reset())
    }

    fn runtime_lines(
        &self,
        runtime: &RuntimeModel,
        styles: &StyleSet,
        inner: usize,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        if let Some(choice) = runtime.confirm {
            return confirm_lines(runtime, choice, styles, inner);
        }

        let mut lines = vec![
            self.tabs.get(styles, runtime.screen.index(), inner).to_string(),
            String::new(),
        ];
        let context = match runtime.screen {
            Screen::Dataplane => {
                lines.extend(self.dataplane_lines(runtime, styles, inner, now));
                HintContext::Dataplane
            }
            Screen::Settings => {
                lines.extend(settings_lines(&runtime.prefs, runtime.settings_row, styles, inner));
                HintContext::Settings
            }
            Screen::Logs => {
                lines.extend(logs_lines(runtime, styles, inner));
                HintContext::Logs
            }
        };
        push_footer(&mut lines, &runtime.prefs, context, styles, inner);
        lines
    }

    fn dataplane_lines(
        &self,
        runtime: &RuntimeModel,
        styles: &StyleSet,
        inner: usize,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let prefs = &runtime.prefs;
        let status = if runtime.connected {
            styles.brand("● connected")
        } else {
            styles.accent("○ connecting...")
        };
        let uptime = u64::try_from((now - runtime.started_at).num_seconds()).unwrap_or(0);

        let mut lines = vec![
            label_row("Mode", LABEL_WIDTH, &styles.text(runtime.mode.title())),
            label_row("Status", LABEL_WIDTH, &status),
            label_row("Uptime", LABEL_WIDTH, &styles.muted(&format_duration(uptime))),
        ];

        if prefs.show_stats {
            let unit = prefs.stats_unit;
            let traffic = runtime.traffic;
            lines.push(String::new());
            lines.push(label_row(
                "Download",
                LABEL_WIDTH,
                &traffic_value(styles, traffic.rx_rate, traffic.rx_total, unit),
            ));
            lines.push(label_row(
                "Upload",
                LABEL_WIDTH,
                &traffic_value(styles, traffic.tx_rate, traffic.tx_total, unit),
            ));
        }

        if prefs.show_graph {
            let graph_width = inner.saturating_sub(LABEL_WIDTH).max(1);
            lines.push(String::new());
            lines.push(label_row(
                "RX",
                LABEL_WIDTH,
                &styles.brand(&self.sparkline.render(&runtime.rx_samples, graph_width)),
            ));
            lines.push(label_row(
                "TX",
                LABEL_WIDTH,
                &styles.accent(&self.sparkline.render(&runtime.tx_samples, graph_width)),
            ));
        }
        lines
    }
}

fn traffic_value(styles: &StyleSet, rate: u64, total: u64, unit: StatsUnit) -> String {
    format!(
        "{}  {}",
        styles.text(&format_rate(rate, unit)),
        styles.muted(&format!("total {}", format_bytes(total, unit)))
    )
}

fn title_line(styles: &StyleSet, subtitle: &str) -> String {
    format!("{}  {}", styles.brand("tundash"), styles.muted(subtitle))
}

fn push_footer(
    lines: &mut Vec<String>,
    prefs: &Preferences,
    context: HintContext,
    styles: &StyleSet,
    inner: usize,
) {
    if prefs.show_footer {
        lines.push(String::new());
        lines.push(styles.muted(&truncate(&hint_line(context), inner)));
    }
}

fn push_wrapped(lines: &mut Vec<String>, text: &str, role: Role, styles: &StyleSet, inner: usize) {
    for line in wrap(text, inner) {
        lines.push(styles.paint(role, &line));
    }
}

fn configurator_lines(model: &SessionModel, styles: &StyleSet, inner: usize) -> Vec<String> {
    let mut lines = vec![title_line(styles, "select tunnel mode"), String::new()];
    let Some(configurator) = model.configurator.as_ref() else {
        return lines;
    };

    for (idx, mode) in configurator.modes().iter().enumerate() {
        if idx == configurator.selected_index() {
            lines.push(styles.active_row(&format!("> {}", mode.title()), inner));
        } else {
            lines.push(styles.text(&format!("  {}", mode.title())));
        }
    }
    lines.push(String::new());
    push_wrapped(
        &mut lines,
        configurator.selected_mode().description(),
        Role::Muted,
        styles,
        inner,
    );
    push_footer(&mut lines, &model.prefs, HintContext::Configurator, styles, inner);
    lines
}

fn waiting_lines(model: &SessionModel, styles: &StyleSet, inner: usize) -> Vec<String> {
    let target = model
        .pending_mode
        .or(model.last_mode)
        .map_or("tunnel", |mode| mode.title());
    let mut lines = vec![title_line(styles, "starting"), String::new()];
    push_wrapped(
        &mut lines,
        &format!("Starting {target} data plane..."),
        Role::Text,
        styles,
        inner,
    );
    push_wrapped(
        &mut lines,
        "Waiting for the runtime to come up.",
        Role::Muted,
        styles,
        inner,
    );
    push_footer(&mut lines, &model.prefs, HintContext::Waiting, styles, inner);
    lines
}

fn confirm_lines(
    runtime: &RuntimeModel,
    choice: ConfirmChoice,
    styles: &StyleSet,
    inner: usize,
) -> Vec<String> {
    let mut lines = vec![title_line(styles, runtime.mode.title()), String::new()];
    push_wrapped(
        &mut lines,
        "Stop the data plane and return to mode selection?",
        Role::Text,
        styles,
        inner,
    );
    lines.push(String::new());

    let button = |label: &str, this: ConfirmChoice| {
        let text = format!("[ {label} ]");
        if this == choice {
            styles.paint(Role::Active, &text)
        } else {
            styles.muted(&text)
        }
    };
    lines.push(format!(
        "{}   {}",
        button("Continue", ConfirmChoice::Continue),
        button("Stop", ConfirmChoice::Stop)
    ));
    push_footer(&mut lines, &runtime.prefs, HintContext::Confirm, styles, inner);
    lines
}

fn settings_lines(prefs: &Preferences, selected: usize, styles: &StyleSet, inner: usize) -> Vec<String> {
    SettingsRow::ALL
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let value = match row {
                SettingsRow::Theme => format!("< {} >", prefs.theme),
                SettingsRow::Units => match prefs.stats_unit {
                    StatsUnit::Decimal => "decimal (kB/s)".to_string(),
                    StatsUnit::Binary => "binary (KiB/s)".to_string(),
                },
                SettingsRow::StatsPanel => on_off(prefs.show_stats),
                SettingsRow::TrafficGraph => on_off(prefs.show_graph),
                SettingsRow::Footer => on_off(prefs.show_footer),
            };
            let marker = if idx == selected { "> " } else { "  " };
            let line = format!("{marker}{}", label_row(row.label(), SETTINGS_LABEL_WIDTH, &value));
            if idx == selected {
                styles.active_row(&line, inner)
            } else {
                styles.text(&line)
            }
        })
        .collect()
}

fn on_off(value: bool) -> String {
    if value { "on" } else { "off" }.to_string()
}

fn logs_lines(runtime: &RuntimeModel, styles: &StyleSet, inner: usize) -> Vec<String> {
    let rows = runtime.viewport_rows();
    let total = runtime.log_lines.len();
    let end = total.saturating_sub(runtime.log_scroll);
    let start = end.saturating_sub(rows);

    let mut lines: Vec<String> = runtime.log_lines[start..end]
        .iter()
        .map(|line| styles.text(&truncate(&strip_ansi(line), inner)))
        .collect();
    lines.resize(rows, String::new());

    let state = if runtime.log_follow { "following" } else { "paused" };
    let status = if total == 0 {
        format!("{state} · no log lines yet")
    } else {
        format!("{state} · lines {}-{end} of {total}", start + 1)
    };
    lines.push(styles.muted(&truncate(&status, inner)));
    lines
}

fn fatal_lines(model: &SessionModel, styles: &StyleSet, inner: usize) -> Vec<String> {
    let mut lines = vec![styles.accent("Fatal error")];
    if let Some(fatal) = model.fatal.as_ref() {
        let report = fatal.report();
        lines.push(styles.muted(&report.at.format("%Y-%m-%d %H:%M:%S UTC").to_string()));
        lines.push(String::new());
        push_wrapped(&mut lines, &report.message, Role::Text, styles, inner);
    }
    lines.push(String::new());
    lines.push(styles.muted(&truncate(&hint_line(HintContext::Fatal), inner)));
    lines
}

// ──────────────────── tests ────────────────────
