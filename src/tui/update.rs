//! Pure update function for the session state machine.
//!
//! `update()` takes the current model and a message, mutates the model, and
//! returns a command describing any side effects the driver should execute.
//!
//! **Design invariant:** this module performs zero I/O. All effects are
//! described as [`SessionCmd`] values.

use super::configurator::{ConfiguratorModel, ConfiguratorOutcome};
use super::dashboard::{RuntimeModel, RuntimeRequest, RuntimeUpdate};
use super::fatal::{FatalModel, FatalReport};
use super::input::{KeyAction, resolve_key};
use super::model::{Phase, RuntimeActivation, SessionCmd, SessionEvent, SessionModel, SessionMsg};
use super::preferences::Preferences;

/// Apply a message to the model and return the next command for the driver.
///
/// Once the session has terminated every message is ignored, so a close
/// racing a quit key never emits a second `Exit`.
pub fn update(model: &mut SessionModel, msg: SessionMsg) -> SessionCmd {
    if model.terminated {
        return SessionCmd::None;
    }

    match msg {
        SessionMsg::Key(key) => match resolve_key(&key) {
            Some(action) => handle_action(model, action),
            None => SessionCmd::None,
        },

        SessionMsg::Resize { cols, rows } => {
            model.terminal_size = (cols, rows);
            if let Some(runtime) = model.runtime.as_mut() {
                runtime.set_terminal_size((cols, rows));
            }
            SessionCmd::ClearScreen
        }

        SessionMsg::ActivateRuntime(activation) => activate_runtime(model, activation),

        SessionMsg::RuntimeContextDone { seq } => {
            if model.phase != Phase::Runtime || seq != model.runtime_seq {
                return SessionCmd::None;
            }
            runtime_disconnected(model)
        }

        SessionMsg::Runtime { seq, msg } => {
            if model.phase != Phase::Runtime || seq != model.runtime_seq {
                return SessionCmd::None;
            }
            match model.runtime.as_mut() {
                Some(runtime) => runtime.handle_msg(msg),
                None => SessionCmd::None,
            }
        }

        SessionMsg::ShowFatal(report) => show_fatal(model, report),

        SessionMsg::PreferencesUpdated(prefs) => apply_preferences(model, prefs),

        SessionMsg::Close => exit(model),
    }
}

// ──────────────────── key routing ────────────────────

fn handle_action(model: &mut SessionModel, action: KeyAction) -> SessionCmd {
    match model.phase {
        Phase::Configuring => {
            if action == KeyAction::Quit {
                return exit(model);
            }
            let Some(configurator) = model.configurator.as_mut() else {
                return SessionCmd::None;
            };
            match configurator.handle(action) {
                ConfiguratorOutcome::Pending => SessionCmd::None,
                ConfiguratorOutcome::Selected(mode) => {
                    model.phase = Phase::WaitingForRuntime;
                    model.pending_mode = Some(mode);
                    SessionCmd::Emit(SessionEvent::ModeSelected(mode))
                }
                ConfiguratorOutcome::Cancelled => exit(model),
            }
        }

        Phase::WaitingForRuntime => {
            if action == KeyAction::Quit {
                exit(model)
            } else {
                SessionCmd::None
            }
        }

        Phase::Runtime => {
            if action == KeyAction::Quit {
                return exit(model);
            }
            let Some(runtime) = model.runtime.as_mut() else {
                return SessionCmd::None;
            };
            let RuntimeUpdate { cmd, request } = runtime.handle_key(action);
            match request {
                None => cmd,
                Some(RuntimeRequest::PreferencesChanged(prefs)) => {
                    model.prefs = prefs;
                    cmd
                }
                Some(RuntimeRequest::Reconfigure) => {
                    SessionCmd::batch(vec![cmd, reconfigure(model)])
                }
            }
        }

        Phase::FatalError => {
            if FatalModel::dismisses(action) {
                exit(model)
            } else {
                SessionCmd::None
            }
        }
    }
}

// ──────────────────── transitions ────────────────────

fn activate_runtime(model: &mut SessionModel, activation: RuntimeActivation) -> SessionCmd {
    if model.phase != Phase::WaitingForRuntime {
        return SessionCmd::None;
    }
    model.runtime_seq += 1;
    let mode = activation.mode;
    let (runtime, cmd) = RuntimeModel::start(
        model.runtime_seq,
        activation,
        model.prefs,
        model.logs.clone(),
        &model.settings,
        model.terminal_size,
    );
    model.runtime = Some(runtime);
    model.phase = Phase::Runtime;
    model.last_mode = Some(mode);
    model.pending_mode = None;
    cmd
}

fn stop_runtime(model: &mut SessionModel) {
    if let Some(mut runtime) = model.runtime.take() {
        runtime.stop_waits();
    }
}

fn runtime_disconnected(model: &mut SessionModel) -> SessionCmd {
    stop_runtime(model);
    model.phase = Phase::WaitingForRuntime;
    model.pending_mode = model.last_mode;
    SessionCmd::Emit(SessionEvent::RuntimeDisconnected)
}

fn reconfigure(model: &mut SessionModel) -> SessionCmd {
    stop_runtime(model);
    match ConfiguratorModel::new(&model.modes, model.last_mode) {
        Ok(configurator) => {
            model.configurator = Some(configurator);
            model.phase = Phase::Configuring;
            SessionCmd::Emit(SessionEvent::Reconfigure)
        }
        Err(err) => {
            model.terminated = true;
            SessionCmd::Batch(vec![
                SessionCmd::Emit(SessionEvent::Error(err)),
                SessionCmd::Quit,
            ])
        }
    }
}

fn show_fatal(model: &mut SessionModel, report: FatalReport) -> SessionCmd {
    stop_runtime(model);
    model.configurator = None;
    model.fatal = Some(FatalModel::new(report));
    model.phase = Phase::FatalError;
    SessionCmd::None
}

fn apply_preferences(model: &mut SessionModel, prefs: Preferences) -> SessionCmd {
    let theme_changed = prefs.theme != model.prefs.theme;
    model.prefs = prefs;
    if let Some(runtime) = model.runtime.as_mut() {
        runtime.apply_preferences(prefs);
    }
    if theme_changed {
        SessionCmd::ClearScreen
    } else {
        SessionCmd::None
    }
}

fn exit(model: &mut SessionModel) -> SessionCmd {
    model.terminated = true;
    if let Some(runtime) = model.runtime.as_mut() {
        runtime.stop_waits();
    }
    SessionCmd::Batch(vec![SessionCmd::Emit(SessionEvent::Exit), SessionCmd::Quit])
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use super::*;
    use crate::core::cancel::{CancelToken, Canceller};
    use crate::core::config::Config;
    use crate::core::errors::SessionError;
    use crate::core::mode::TunnelMode;
    use crate::logger::{EmptyFeed, LogSource};
    use crate::tui::dashboard::{RuntimeMsg, Screen};
    use crate::tui::telemetry::NullTelemetry;
    use crate::tui::theme::ThemeId;

    fn model() -> SessionModel {
        SessionModel::new(
            &Config::default(),
            Preferences::default(),
            LogSource::poll(Arc::new(EmptyFeed)),
            (100, 30),
        )
    }

    fn key(code: KeyCode) -> SessionMsg {
        SessionMsg::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn activation(context: CancelToken) -> SessionMsg {
        SessionMsg::ActivateRuntime(RuntimeActivation::new(
            TunnelMode::Tun,
            context,
            Arc::new(NullTelemetry),
        ))
    }

    fn events(cmd: SessionCmd) -> Vec<SessionEvent> {
        cmd.flatten()
            .into_iter()
            .filter_map(|c| match c {
                SessionCmd::Emit(ev) => Some(ev),
                _ => None,
            })
            .collect()
    }

    fn quits(cmd: SessionCmd) -> bool {
        cmd.flatten().iter().any(|c| matches!(c, SessionCmd::Quit))
    }

    /// Drive a fresh model into the runtime phase.
    fn running() -> SessionModel {
        let mut m = model();
        update(&mut m, key(KeyCode::Enter));
        update(&mut m, activation(CancelToken::never()));
        assert_eq!(m.phase, Phase::Runtime);
        m
    }

    #[test]
    fn choosing_a_mode_waits_for_runtime() {
        let mut m = model();
        update(&mut m, key(KeyCode::Down));
        let evs = events(update(&mut m, key(KeyCode::Enter)));
        assert!(matches!(evs[..], [SessionEvent::ModeSelected(TunnelMode::Proxy)]));
        assert_eq!(m.phase, Phase::WaitingForRuntime);
        assert_eq!(m.pending_mode, Some(TunnelMode::Proxy));
    }

    #[test]
    fn escape_in_configurator_exits_once() {
        let mut m = model();
        let evs = events(update(&mut m, key(KeyCode::Esc)));
        assert!(matches!(evs[..], [SessionEvent::Exit]));
        assert!(m.terminated);
        assert!(update(&mut m, SessionMsg::Close).is_none());
    }

    #[test]
    fn activation_outside_waiting_phase_is_ignored() {
        let mut m = model();
        assert!(update(&mut m, activation(CancelToken::never())).is_none());
        assert_eq!(m.phase, Phase::Configuring);
        assert_eq!(m.runtime_seq, 0);
    }

    #[test]
    fn activation_builds_runtime_with_fresh_seq() {
        let mut m = model();
        update(&mut m, key(KeyCode::Enter));
        let cmds = update(&mut m, activation(CancelToken::never())).flatten();
        assert_eq!(m.runtime_seq, 1);
        assert_eq!(m.last_mode, Some(TunnelMode::Tun));
        assert!(m.runtime.as_ref().is_some_and(|r| r.seq == 1));
        assert!(matches!(cmds[0], SessionCmd::WaitRuntimeDone { seq: 1, .. }));
    }

    #[test]
    fn context_end_disconnects_current_runtime() {
        let mut m = running();
        let token = m.runtime.as_ref().map(RuntimeModel::stop_token);
        let evs = events(update(&mut m, SessionMsg::RuntimeContextDone { seq: 1 }));
        assert!(matches!(evs[..], [SessionEvent::RuntimeDisconnected]));
        assert_eq!(m.phase, Phase::WaitingForRuntime);
        assert!(m.runtime.is_none());
        assert!(token.is_some_and(|t| t.is_cancelled()));
        assert_eq!(m.pending_mode, Some(TunnelMode::Tun));
    }

    #[test]
    fn stale_context_end_is_ignored() {
        let mut m = running();
        update(&mut m, SessionMsg::RuntimeContextDone { seq: 1 });
        update(&mut m, activation(CancelToken::never()));
        assert_eq!(m.runtime_seq, 2);
        assert!(update(&mut m, SessionMsg::RuntimeContextDone { seq: 1 }).is_none());
        assert_eq!(m.phase, Phase::Runtime);
    }

    #[test]
    fn stale_runtime_results_are_dropped() {
        let mut m = running();
        update(&mut m, SessionMsg::RuntimeContextDone { seq: 1 });
        update(&mut m, activation(CancelToken::never()));
        let cmd = update(
            &mut m,
            SessionMsg::Runtime {
                seq: 1,
                msg: RuntimeMsg::Tick { tick_seq: 1 },
            },
        );
        assert!(cmd.is_none());
    }

    #[test]
    fn confirm_stop_returns_to_configurator() {
        let mut m = running();
        update(&mut m, key(KeyCode::Enter));
        update(&mut m, key(KeyCode::Right));
        let evs = events(update(&mut m, key(KeyCode::Enter)));
        assert!(matches!(evs[..], [SessionEvent::Reconfigure]));
        assert_eq!(m.phase, Phase::Configuring);
        assert!(m.runtime.is_none());
        assert_eq!(
            m.configurator.as_ref().map(ConfiguratorModel::selected_mode),
            Some(TunnelMode::Tun)
        );
    }

    #[test]
    fn fatal_error_stops_runtime_and_dismiss_exits() {
        let mut m = running();
        let token = m.runtime.as_ref().map(RuntimeModel::stop_token);
        assert!(update(&mut m, SessionMsg::ShowFatal(FatalReport::new("boom"))).is_none());
        assert_eq!(m.phase, Phase::FatalError);
        assert!(token.is_some_and(|t| t.is_cancelled()));

        assert!(update(&mut m, key(KeyCode::Down)).is_none());
        let flat = update(&mut m, key(KeyCode::Enter)).flatten();
        assert!(matches!(flat[..], [SessionCmd::Emit(SessionEvent::Exit), SessionCmd::Quit]));
    }

    #[test]
    fn fatal_reachable_from_configuring() {
        let mut m = model();
        update(&mut m, SessionMsg::ShowFatal(FatalReport::new("no tun device")));
        assert_eq!(m.phase, Phase::FatalError);
        assert!(m.configurator.is_none());
    }

    #[test]
    fn quit_key_exits_from_runtime() {
        let mut m = running();
        let cmd = update(&mut m, key(KeyCode::Char('q')));
        assert!(quits(cmd));
        assert!(m.terminated);
    }

    #[test]
    fn ctrl_c_exits_while_waiting() {
        let mut m = model();
        update(&mut m, key(KeyCode::Enter));
        let cmd = update(
            &mut m,
            SessionMsg::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        );
        assert!(matches!(events(cmd)[..], [SessionEvent::Exit]));
    }

    #[test]
    fn close_emits_exit_and_cancels_waits() {
        let mut m = running();
        let token = m.runtime.as_ref().map(RuntimeModel::stop_token);
        let cmd = update(&mut m, SessionMsg::Close);
        assert!(matches!(events(cmd)[..], [SessionEvent::Exit]));
        assert!(token.is_some_and(|t| t.is_cancelled()));
        assert!(update(&mut m, key(KeyCode::Char('q'))).is_none());
    }

    #[test]
    fn settings_change_is_copied_into_session() {
        let mut m = running();
        update(&mut m, key(KeyCode::Tab));
        assert_eq!(m.runtime.as_ref().map(|r| r.screen), Some(Screen::Settings));
        let cmds = update(&mut m, key(KeyCode::Right)).flatten();
        assert_eq!(m.prefs.theme, ThemeId::Daylight);
        assert!(cmds.iter().any(|c| matches!(c, SessionCmd::ClearScreen)));
    }

    #[test]
    fn external_theme_update_clears_screen() {
        let mut m = running();
        let prefs = Preferences {
            theme: ThemeId::Forest,
            ..Preferences::default()
        };
        assert!(matches!(
            update(&mut m, SessionMsg::PreferencesUpdated(prefs)),
            SessionCmd::ClearScreen
        ));
        assert_eq!(m.runtime.as_ref().map(|r| r.prefs.theme), Some(ThemeId::Forest));
        assert!(update(&mut m, SessionMsg::PreferencesUpdated(prefs)).is_none());
    }

    #[test]
    fn resize_propagates_to_runtime() {
        let mut m = running();
        update(&mut m, SessionMsg::Resize { cols: 120, rows: 40 });
        assert_eq!(m.terminal_size, (120, 40));
        assert_eq!(m.runtime.as_ref().map(|r| r.terminal_size), Some((120, 40)));
    }

    #[test]
    fn empty_modes_on_reconfigure_reports_error() {
        let mut m = running();
        m.modes.clear();
        update(&mut m, key(KeyCode::Esc));
        update(&mut m, key(KeyCode::Left));
        let cmd = update(&mut m, key(KeyCode::Enter));
        let evs = events(cmd);
        assert!(matches!(
            evs[..],
            [SessionEvent::Error(SessionError::Configurator { .. })]
        ));
        assert!(m.terminated);
    }

    #[test]
    fn activation_context_is_observed() {
        let data_plane = Canceller::new();
        let mut m = model();
        update(&mut m, key(KeyCode::Enter));
        let cmds = update(&mut m, activation(data_plane.token())).flatten();
        let SessionCmd::WaitRuntimeDone { context, .. } = &cmds[0] else {
            panic!("expected runtime wait, got {cmds:?}");
        };
        data_plane.cancel();
        assert!(context.is_cancelled());
    }
}
