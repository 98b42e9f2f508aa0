//! ANSI-aware text measurement, wrapping, truncation, and padding.
//!
//! Everything here operates on visible characters: CSI sequences
//! (`ESC [ … final`) and OSC sequences (`ESC ] … BEL` or `ESC ] … ESC \`) are
//! zero-width, and any other `ESC x` pair consumes exactly one character after
//! the escape. All functions are total; degenerate widths produce minimal
//! output rather than panicking.

#![allow(missing_docs)]

use std::borrow::Cow;

pub const ESC: char = '\x1b';
const BEL: char = '\x07';
pub const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum ScanState {
    #[default]
    Normal,
    Escape,
    Csi,
    Osc,
    /// `ESC` seen inside an OSC; `\` completes the string terminator.
    OscEscape,
}

/// Five-state escape-sequence scanner.
#[derive(Debug, Clone, Copy, Default)]
struct AnsiScanner {
    state: ScanState,
}

impl AnsiScanner {
    /// Advance by one char. Returns `true` when the char is rendered.
    fn feed(&mut self, c: char) -> bool {
        match self.state {
            ScanState::Normal => {
                if c == ESC {
                    self.state = ScanState::Escape;
                    false
                } else {
                    true
                }
            }
            ScanState::Escape => {
                self.state = match c {
                    '[' => ScanState::Csi,
                    ']' => ScanState::Osc,
                    _ => ScanState::Normal,
                };
                false
            }
            ScanState::Csi => {
                if ('\x40'..='\x7e').contains(&c) {
                    self.state = ScanState::Normal;
                }
                false
            }
            ScanState::Osc => {
                match c {
                    BEL => self.state = ScanState::Normal,
                    ESC => self.state = ScanState::OscEscape,
                    _ => {}
                }
                false
            }
            ScanState::OscEscape => {
                // `ESC \` is the proper terminator; anything else ends the
                // malformed OSC as well.
                self.state = ScanState::Normal;
                false
            }
        }
    }
}

#[must_use]
pub fn contains_escape(s: &str) -> bool {
    s.contains(ESC)
}

/// Number of rendered characters in `s`.
#[must_use]
pub fn visible_width(s: &str) -> usize {
    if !contains_escape(s) {
        return if s.is_ascii() {
            s.len()
        } else {
            s.chars().count()
        };
    }
    let mut scanner = AnsiScanner::default();
    s.chars().filter(|c| scanner.feed(*c)).count()
}

/// `s` with every escape sequence removed.
#[must_use]
pub fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !contains_escape(s) {
        return Cow::Borrowed(s);
    }
    let mut scanner = AnsiScanner::default();
    Cow::Owned(s.chars().filter(|c| scanner.feed(*c)).collect())
}

/// Greedy word wrap to `width` visible columns.
///
/// Explicit line breaks are honored first. Words longer than `width` are
/// hard-split at char boundaries. A zero width or styled input disables
/// wrapping; such text is only split on explicit line breaks, so callers wrap
/// plain text before styling it.
#[must_use]
pub fn wrap(s: &str, width: usize) -> Vec<String> {
    let lines = s
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line));

    if width == 0 || contains_escape(s) {
        return lines.map(str::to_string).collect();
    }

    let mut out = Vec::new();
    for line in lines {
        let mut current = String::new();
        let mut current_width = 0;
        let mut any_word = false;

        for word in line.split_whitespace() {
            any_word = true;
            let word_width = word.chars().count();

            if word_width > width {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
                let chars: Vec<char> = word.chars().collect();
                let mut chunks = chars.chunks(width).peekable();
                while let Some(chunk) = chunks.next() {
                    let piece: String = chunk.iter().collect();
                    if chunks.peek().is_some() {
                        out.push(piece);
                    } else {
                        current_width = chunk.len();
                        current = piece;
                    }
                }
                continue;
            }

            if current.is_empty() {
                current.push_str(word);
                current_width = word_width;
            } else if current_width + 1 + word_width <= width {
                current.push(' ');
                current.push_str(word);
                current_width += 1 + word_width;
            } else {
                out.push(std::mem::replace(&mut current, word.to_string()));
                current_width = word_width;
            }
        }

        if !current.is_empty() || !any_word {
            out.push(current);
        }
    }
    out
}

/// Shorten `s` to at most `width` visible columns.
///
/// Input that already fits is returned unchanged (styling included).
/// Otherwise styling is dropped and the text is cut to `width` chars, or to
/// `width - 3` chars plus `"..."` when `width > 3`.
#[must_use]
pub fn truncate(s: &str, width: usize) -> String {
    if visible_width(s) <= width {
        return s.to_string();
    }

    let keep = if width <= 3 { width } else { width - ELLIPSIS.len() };
    let suffix = if width <= 3 { "" } else { ELLIPSIS };

    if s.is_ascii() && !contains_escape(s) {
        let mut out = String::with_capacity(keep + suffix.len());
        out.push_str(&s[..keep]);
        out.push_str(suffix);
        return out;
    }

    let plain = strip_ansi(s);
    let mut out: String = plain.chars().take(keep).collect();
    out.push_str(suffix);
    out
}

/// Shorten `s` to at most `width` visible columns without dropping styling.
///
/// Cuts at the same point as [`truncate`], but every escape sequence is
/// kept, including those after the cut, so role colors on the kept text and
/// trailing resets survive.
#[must_use]
pub fn clip(s: &str, width: usize) -> String {
    if !contains_escape(s) || visible_width(s) <= width {
        return truncate(s, width);
    }

    let keep = if width <= 3 { width } else { width - ELLIPSIS.len() };
    let suffix = if width <= 3 { "" } else { ELLIPSIS };

    let mut scanner = AnsiScanner::default();
    let mut out = String::with_capacity(s.len());
    let mut kept = 0;
    let mut cut = false;
    for c in s.chars() {
        if !scanner.feed(c) {
            out.push(c);
        } else if kept < keep {
            out.push(c);
            kept += 1;
        } else if !cut {
            out.push_str(suffix);
            cut = true;
        }
    }
    out
}

/// Pad `s` with spaces to exactly `width` visible columns. Never truncates.
#[must_use]
pub fn pad_right(s: &str, width: usize) -> String {
    let current = visible_width(s);
    if current >= width {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + (width - current));
    out.push_str(s);
    out.extend(std::iter::repeat_n(' ', width - current));
    out
}

/// Truncate then pad: exactly `width` visible columns.
#[must_use]
pub fn fit(s: &str, width: usize) -> String {
    pad_right(&truncate(s, width), width)
}

/// Two columns: `label` padded to `label_width`, then `value`.
#[must_use]
pub fn label_row(label: &str, label_width: usize, value: &str) -> String {
    let mut out = pad_right(label, label_width);
    out.push_str(value);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_width_ignores_csi() {
        assert_eq!(visible_width("\x1b[1;38;5;45mhello\x1b[0m"), 5);
        assert_eq!(visible_width("\x1b[31mred"), 3);
    }

    #[test]
    fn visible_width_ignores_osc_with_either_terminator() {
        let bel = "\x1b]8;;https://example.com\x07link\x1b]8;;\x07";
        let st = "\x1b]0;title\x1b\\text";
        assert_eq!(visible_width(bel), 4);
        assert_eq!(visible_width(st), 4);
    }

    #[test]
    fn visible_width_counts_chars_not_bytes() {
        assert_eq!(visible_width("héllo"), 5);
        assert_eq!(visible_width("⣀⣀⣀"), 3);
        assert_eq!(visible_width("\x1b[32m↑ 1.2 kB/s"), 10);
    }

    #[test]
    fn other_escape_consumes_one_char() {
        // ESC ( B selects charset: ESC and '(' are zero-width, 'B' renders.
        assert_eq!(visible_width("\x1b(Bx"), 2);
        assert_eq!(visible_width("\x1bMx"), 1);
    }

    #[test]
    fn strip_ansi_borrows_plain_text() {
        assert!(matches!(strip_ansi("plain"), Cow::Borrowed(_)));
        assert_eq!(strip_ansi("\x1b[1mbold\x1b[0m"), "bold");
    }

    #[test]
    fn wrap_packs_words_greedily() {
        assert_eq!(
            wrap("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
    }

    #[test]
    fn wrap_honors_explicit_breaks() {
        assert_eq!(wrap("a b\r\nc", 10), vec!["a b", "c"]);
        assert_eq!(wrap("a\n\nb", 10), vec!["a", "", "b"]);
    }

    #[test]
    fn wrap_hard_splits_long_words() {
        assert_eq!(
            wrap("abcdefghij xy", 4),
            vec!["abcd", "efgh", "ij", "xy"]
        );
        assert_eq!(wrap("ab abcdefgh", 4), vec!["ab", "abcd", "efgh"]);
    }

    #[test]
    fn wrap_splits_multibyte_words_at_char_boundaries() {
        assert_eq!(wrap("ééééé", 2), vec!["éé", "éé", "é"]);
    }

    #[test]
    fn wrap_disabled_for_zero_width_or_styled_text() {
        assert_eq!(wrap("one two three", 0), vec!["one two three"]);
        let styled = "\x1b[1mone two three\x1b[0m\nfour";
        assert_eq!(
            wrap(styled, 3),
            vec!["\x1b[1mone two three\x1b[0m", "four"]
        );
    }

    #[test]
    fn truncate_examples() {
        assert_eq!(truncate("abcdef", 5), "ab...");
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("abcdef", 0), "");
        assert_eq!(truncate("abcdef", 6), "abcdef");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn truncate_keeps_fitting_styled_text() {
        let styled = "\x1b[31mok\x1b[0m";
        assert_eq!(truncate(styled, 2), styled);
    }

    #[test]
    fn truncate_strips_style_when_cutting() {
        assert_eq!(truncate("\x1b[31mabcdefgh\x1b[0m", 6), "abc...");
        assert_eq!(truncate("ééééé", 4), "é...");
    }

    #[test]
    fn clip_keeps_styling_around_the_cut() {
        let line = "\x1b[31mabc\x1b[1mdefgh\x1b[0m";
        let clipped = clip(line, 6);
        assert_eq!(clipped, "\x1b[31mabc\x1b[1m...\x1b[0m");
        assert_eq!(visible_width(&clipped), 6);
        assert_eq!(strip_ansi(&clipped), truncate(line, 6));
    }

    #[test]
    fn clip_matches_truncate_on_plain_text() {
        assert_eq!(clip("abcdef", 5), "ab...");
        assert_eq!(clip("abcdef", 3), "abc");
        assert_eq!(clip("\x1b[2mab\x1b[0m", 0), "\x1b[2m\x1b[0m");
    }

    #[test]
    fn pad_right_never_truncates() {
        assert_eq!(pad_right("ab", 4), "ab  ");
        assert_eq!(pad_right("abcdef", 3), "abcdef");
        assert_eq!(visible_width(&pad_right("\x1b[1mab\x1b[0m", 5)), 5);
    }

    #[test]
    fn fit_is_exact() {
        assert_eq!(fit("abcdefgh", 6), "abc...");
        assert_eq!(fit("ab", 4), "ab  ");
    }

    #[test]
    fn label_row_aligns_values() {
        assert_eq!(label_row("Mode", 8, "tun"), "Mode    tun");
    }
}
