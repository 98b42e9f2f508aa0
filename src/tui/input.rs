//! Key routing: terminal key events → dashboard actions, plus footer hints.

#![allow(missing_docs)]

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Semantic key actions understood by the submodels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Up,
    Down,
    Left,
    Right,
    Select,
    Back,
    Quit,
    NextTab,
    PrevTab,
    PageUp,
    PageDown,
    Home,
    End,
    Space,
}

/// Map a key event to an action. Releases and unbound keys map to `None`.
#[must_use]
pub fn resolve_key(key: &KeyEvent) -> Option<KeyAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c' | 'C') => Some(KeyAction::Quit),
            _ => None,
        };
    }

    let action = match key.code {
        KeyCode::Up | KeyCode::Char('k') => KeyAction::Up,
        KeyCode::Down | KeyCode::Char('j') => KeyAction::Down,
        KeyCode::Left | KeyCode::Char('h') => KeyAction::Left,
        KeyCode::Right | KeyCode::Char('l') => KeyAction::Right,
        KeyCode::Enter => KeyAction::Select,
        KeyCode::Esc => KeyAction::Back,
        KeyCode::Char('q' | 'Q') => KeyAction::Quit,
        KeyCode::Tab => KeyAction::NextTab,
        KeyCode::BackTab => KeyAction::PrevTab,
        KeyCode::PageUp => KeyAction::PageUp,
        KeyCode::PageDown => KeyAction::PageDown,
        KeyCode::Home | KeyCode::Char('g') => KeyAction::Home,
        KeyCode::End | KeyCode::Char('G') => KeyAction::End,
        KeyCode::Char(' ') => KeyAction::Space,
        _ => return None,
    };
    Some(action)
}

// ──────────────────── hints ────────────────────

/// Where the operator currently is, for footer hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintContext {
    Configurator,
    Waiting,
    Dataplane,
    Settings,
    Logs,
    Confirm,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpBinding {
    pub keys: &'static str,
    pub description: &'static str,
}

const fn bind(keys: &'static str, description: &'static str) -> HelpBinding {
    HelpBinding { keys, description }
}

const CONFIGURATOR_HINTS: &[HelpBinding] = &[
    bind("↑/↓", "choose"),
    bind("enter", "start"),
    bind("esc", "quit"),
];
const WAITING_HINTS: &[HelpBinding] = &[bind("q", "quit")];
const DATAPLANE_HINTS: &[HelpBinding] = &[
    bind("tab", "screens"),
    bind("enter", "stop"),
    bind("q", "quit"),
];
const SETTINGS_HINTS: &[HelpBinding] = &[
    bind("↑/↓", "select"),
    bind("←/→", "change"),
    bind("tab", "screens"),
];
const LOGS_HINTS: &[HelpBinding] = &[
    bind("↑/↓", "scroll"),
    bind("end", "follow"),
    bind("space", "pause"),
    bind("tab", "screens"),
];
const CONFIRM_HINTS: &[HelpBinding] = &[
    bind("←/→", "choose"),
    bind("enter", "confirm"),
    bind("esc", "cancel"),
];
const FATAL_HINTS: &[HelpBinding] = &[bind("enter", "exit")];

#[must_use]
pub const fn help_bindings(context: HintContext) -> &'static [HelpBinding] {
    match context {
        HintContext::Configurator => CONFIGURATOR_HINTS,
        HintContext::Waiting => WAITING_HINTS,
        HintContext::Dataplane => DATAPLANE_HINTS,
        HintContext::Settings => SETTINGS_HINTS,
        HintContext::Logs => LOGS_HINTS,
        HintContext::Confirm => CONFIRM_HINTS,
        HintContext::Fatal => FATAL_HINTS,
    }
}

/// One-line hint text, e.g. `tab screens · enter stop · q quit`.
#[must_use]
pub fn hint_line(context: HintContext) -> String {
    help_bindings(context)
        .iter()
        .map(|b| format!("{} {}", b.keys, b.description))
        .collect::<Vec<_>>()
        .join(" · ")
}
