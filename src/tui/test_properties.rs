//! Property-based tests for layout, widget and reducer invariants.
//!
//! Uses `proptest` to check that styled text measurement, framing and the
//! sparkline hold their width contracts for arbitrary input, and that
//! arbitrary message sequences keep the session model consistent.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use proptest::prelude::*;

use super::dashboard::RuntimeMsg;
use super::frame::{card, center, fill};
use super::layout::{clip, pad_right, strip_ansi, truncate, visible_width, wrap};
use super::model::{Phase, RuntimeActivation, SessionCmd, SessionEvent, SessionModel, SessionMsg};
use super::preferences::Preferences;
use super::styles::StyleSet;
use super::telemetry::NullTelemetry;
use super::theme::{ColorMode, ThemeId};
use super::update::update;
use super::widgets::{SAMPLE_CAPACITY, SampleRing, Sparkline};
use crate::core::cancel::CancelToken;
use crate::core::config::Config;
use crate::core::mode::TunnelMode;
use crate::logger::{EmptyFeed, LogRingBuffer, LogSource};

// ──────────────────── strategies ────────────────────

/// Printable text interleaved with SGR, erase-line and OSC sequences.
fn arb_styled() -> impl Strategy<Value = String> {
    let piece = prop_oneof![
        4 => "[a-zA-Z0-9 .,:é日]{0,8}",
        1 => (0u8..=255).prop_map(|n| format!("\x1b[38;5;{n}m")),
        1 => Just("\x1b[0m".to_string()),
        1 => Just("\x1b[2K".to_string()),
        1 => Just("\x1b]0;title\x07".to_string()),
    ];
    prop::collection::vec(piece, 0..10).prop_map(|parts| parts.concat())
}

fn arb_plain() -> impl Strategy<Value = String> {
    "[a-z ]{0,60}"
}

fn arb_key_code() -> impl Strategy<Value = KeyCode> {
    prop_oneof![
        Just(KeyCode::Up),
        Just(KeyCode::Down),
        Just(KeyCode::Left),
        Just(KeyCode::Right),
        Just(KeyCode::Enter),
        Just(KeyCode::Esc),
        Just(KeyCode::Tab),
        Just(KeyCode::BackTab),
        Just(KeyCode::PageUp),
        Just(KeyCode::PageDown),
        Just(KeyCode::Home),
        Just(KeyCode::End),
        Just(KeyCode::Char(' ')),
        Just(KeyCode::Char('j')),
        Just(KeyCode::Char('k')),
    ]
}

fn arb_msg() -> impl Strategy<Value = SessionMsg> {
    prop_oneof![
        8 => arb_key_code().prop_map(|code| SessionMsg::Key(KeyEvent::new(code, KeyModifiers::NONE))),
        2 => (1u16..200, 1u16..60).prop_map(|(cols, rows)| SessionMsg::Resize { cols, rows }),
        2 => Just(()).prop_map(|()| SessionMsg::ActivateRuntime(RuntimeActivation::new(
            TunnelMode::Tun,
            CancelToken::never(),
            Arc::new(NullTelemetry),
        ))),
        1 => (0u64..4).prop_map(|seq| SessionMsg::RuntimeContextDone { seq }),
        2 => (0u64..4, 0u64..4).prop_map(|(seq, tick_seq)| SessionMsg::Runtime {
            seq,
            msg: RuntimeMsg::Tick { tick_seq },
        }),
        2 => (0u64..4, 0u64..4, 0usize..80).prop_map(|(seq, log_seq, n)| SessionMsg::Runtime {
            seq,
            msg: RuntimeMsg::LogsFetched {
                log_seq,
                lines: (0..n).map(|i| format!("line {i}")).collect(),
            },
        }),
    ]
}

fn fresh_model() -> SessionModel {
    SessionModel::new(
        &Config::default(),
        Preferences::default(),
        LogSource::poll(Arc::new(EmptyFeed)),
        (80, 24),
    )
}

// ──────────────────── invariant checks ────────────────────

fn assert_model_invariants(model: &SessionModel) {
    if model.terminated {
        return;
    }
    assert_eq!(
        model.phase == Phase::Runtime,
        model.runtime.is_some(),
        "runtime submodel must exist exactly in the runtime phase"
    );
    if model.phase == Phase::Configuring {
        assert!(model.configurator.is_some());
    }
    if let Some(runtime) = model.runtime.as_ref() {
        assert_eq!(runtime.seq, model.runtime_seq);
        assert!(runtime.log_scroll <= runtime.max_scroll());
        assert!(runtime.rx_samples.len() <= SAMPLE_CAPACITY);
        if runtime.log_follow {
            assert_eq!(runtime.log_scroll, 0);
        }
    }
}

fn count_exits(cmd: SessionCmd) -> usize {
    cmd.flatten()
        .iter()
        .filter(|c| matches!(c, SessionCmd::Emit(SessionEvent::Exit)))
        .count()
}

// ──────────────────── property tests ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn visible_width_never_exceeds_byte_length(s in arb_styled()) {
        prop_assert!(visible_width(&s) <= s.len());
        prop_assert_eq!(visible_width(&s), strip_ansi(&s).chars().count());
    }

    #[test]
    fn truncate_fits_and_keeps_fitting_input(s in arb_styled(), width in 0usize..40) {
        let out = truncate(&s, width);
        prop_assert!(visible_width(&out) <= width);
        if visible_width(&s) <= width {
            prop_assert_eq!(out, s);
        }
    }

    #[test]
    fn clip_cuts_like_truncate_but_keeps_escapes(s in arb_styled(), width in 0usize..40) {
        let out = clip(&s, width);
        prop_assert!(visible_width(&out) <= width);
        prop_assert_eq!(strip_ansi(&out).into_owned(), truncate(&strip_ansi(&s), width));
        prop_assert_eq!(out.matches('\x1b').count(), s.matches('\x1b').count());
    }

    #[test]
    fn pad_right_reaches_width(s in arb_styled(), width in 0usize..60) {
        let out = pad_right(&s, width);
        prop_assert_eq!(visible_width(&out), visible_width(&s).max(width));
    }

    #[test]
    fn wrapped_lines_fit(s in arb_plain(), width in 1usize..30) {
        for line in wrap(&s, width) {
            prop_assert!(visible_width(&line) <= width, "{line:?}");
        }
    }

    #[test]
    fn wrap_keeps_every_character(s in arb_plain(), width in 1usize..30) {
        let original: String = s.split_whitespace().collect();
        let rewrapped: String = wrap(&s, width).concat().split_whitespace().collect();
        prop_assert_eq!(original, rewrapped);
    }

    #[test]
    fn card_lines_share_one_width(
        lines in prop::collection::vec(arb_styled(), 0..8),
        width in 0usize..50,
    ) {
        let styles = StyleSet::build(ThemeId::Midnight, ColorMode::Enabled);
        let boxed = card(&lines, width, &styles);
        prop_assert_eq!(boxed.len(), lines.len() + 2);
        let first = visible_width(&boxed[0]);
        for line in &boxed {
            prop_assert_eq!(visible_width(line), first);
        }
    }

    #[test]
    fn centered_lines_never_exceed_terminal(
        lines in prop::collection::vec(arb_styled(), 0..30),
        cols in 1usize..120,
        rows in 1usize..40,
    ) {
        let placed = center(&lines, cols, rows);
        prop_assert!(placed.len() <= rows);
        for line in &placed {
            prop_assert!(visible_width(line) <= cols);
        }
        let screen = fill(placed, cols, rows, "", "");
        prop_assert_eq!(screen.len(), rows);
        for line in &screen {
            prop_assert_eq!(visible_width(line), cols);
        }
    }

    #[test]
    fn sparkline_has_requested_width(
        samples in prop::collection::vec(0u64..10_000_000, 0..100),
        width in 0usize..80,
    ) {
        let mut ring = SampleRing::new();
        for value in samples {
            ring.push(value);
        }
        let line = Sparkline::new().render(&ring, width);
        prop_assert_eq!(line.chars().count(), width);
        let all_braille = line.chars().all(|c| ('\u{2800}'..='\u{28FF}').contains(&c));
        prop_assert!(all_braille);
    }

    #[test]
    fn ring_tail_is_the_most_recent_lines_in_order(
        capacity in 1usize..20,
        count in 0usize..60,
        n in 0usize..30,
    ) {
        let ring = LogRingBuffer::new(capacity);
        for i in 0..count {
            ring.write_bytes(format!("l{i}\n").as_bytes());
        }
        let tail = ring.tail(n);
        let expected_len = n.min(count).min(capacity);
        prop_assert_eq!(tail.len(), expected_len);
        let expected: Vec<String> = (count - expected_len..count).map(|i| format!("l{i}")).collect();
        prop_assert_eq!(tail, expected);
    }

    /// Any sequence of messages keeps the phase and submodels consistent.
    #[test]
    fn reducer_preserves_invariants(msgs in prop::collection::vec(arb_msg(), 1..60)) {
        let mut model = fresh_model();
        let mut last_seq = 0;
        for msg in msgs {
            let _ = update(&mut model, msg);
            assert_model_invariants(&model);
            prop_assert!(model.runtime_seq >= last_seq);
            last_seq = model.runtime_seq;
        }
    }

    /// Exit is emitted at most once, however many quit paths fire.
    #[test]
    fn exit_is_emitted_at_most_once(msgs in prop::collection::vec(arb_msg(), 0..30)) {
        let mut model = fresh_model();
        let mut exits = 0;
        for msg in msgs {
            exits += count_exits(update(&mut model, msg));
        }
        exits += count_exits(update(&mut model, SessionMsg::Close));
        exits += count_exits(update(&mut model, SessionMsg::Close));
        prop_assert_eq!(exits, 1);
        prop_assert!(model.terminated);
    }
}

// ──────────────────── non-proptest invariant tests ────────────────────

#[test]
fn stale_runtime_results_never_touch_a_fresh_runtime() {
    let mut model = fresh_model();
    update(&mut model, SessionMsg::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
    update(
        &mut model,
        SessionMsg::ActivateRuntime(RuntimeActivation::new(
            TunnelMode::Tun,
            CancelToken::never(),
            Arc::new(NullTelemetry),
        )),
    );
    let stale_seq = model.runtime_seq + 1;
    let cmd = update(
        &mut model,
        SessionMsg::Runtime {
            seq: stale_seq,
            msg: RuntimeMsg::LogsFetched {
                log_seq: 0,
                lines: vec!["ghost".to_string()],
            },
        },
    );
    assert!(cmd.is_none());
    let runtime = model.runtime.as_ref().expect("runtime");
    assert!(runtime.log_lines.is_empty());
}
