//! Boxed cards, centering, and full-screen frame assembly.

#![allow(missing_docs)]

use super::layout::{clip, pad_right, visible_width};
use super::styles::StyleSet;

/// True when an SGR parameter list resets the foreground or background.
///
/// Extended color arguments (`38;5;n`, `48;2;r;g;b`) are skipped so a color
/// index of `0` is not mistaken for a reset.
fn sgr_resets_base(params: &str) -> bool {
    if params.is_empty() {
        return true;
    }
    let parts: Vec<&str> = params.split(';').collect();
    let mut i = 0;
    while i < parts.len() {
        match parts[i] {
            "" | "0" | "00" | "39" | "49" => return true,
            "38" | "48" => {
                i += match parts.get(i + 1) {
                    Some(&"5") => 3,
                    Some(&"2") => 5,
                    _ => 1,
                };
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    false
}

/// Re-insert `base` after every SGR sequence that would drop it.
#[must_use]
pub fn reapply_base(line: &str, base: &str) -> String {
    if base.is_empty() || !line.contains('\x1b') {
        return line.to_string();
    }

    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len() + base.len() * 2);
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != 0x1b || bytes.get(i + 1) != Some(&b'[') {
            i += 1;
            continue;
        }
        let start = i;
        let mut j = i + 2;
        while j < bytes.len() && !(0x40..=0x7e).contains(&bytes[j]) {
            j += 1;
        }
        if j >= bytes.len() {
            break;
        }
        let end = j + 1;
        if bytes[j] == b'm'
            && &line[start..end] != base
            && !line[end..].starts_with(base)
            && sgr_resets_base(&line[start + 2..j])
        {
            out.push_str(&line[copied..end]);
            out.push_str(base);
            copied = end;
        }
        i = end;
    }
    out.push_str(&line[copied..]);
    out
}

/// Box `lines` in a `+---+` frame with a uniform inner width.
///
/// The inner width is the larger of `content_width` (floored at 1) and the
/// widest line. Every returned line has the same visible width.
#[must_use]
pub fn card(lines: &[String], content_width: usize, styles: &StyleSet) -> Vec<String> {
    let widest = lines.iter().map(|l| visible_width(l)).max().unwrap_or(0);
    let inner = content_width.max(1).max(widest);

    let border = styles.frame(&format!("+{}+", "-".repeat(inner + 2)));
    let edge = styles.frame("|");

    let mut out = Vec::with_capacity(lines.len() + 2);
    out.push(border.clone());
    for line in lines {
        let body = pad_right(&reapply_base(line, styles.base()), inner);
        out.push(format!("{edge} {body} {edge}"));
    }
    out.push(border);
    out
}

/// Pad `lines` to sit centered in a `term_width × term_height` screen.
///
/// Lines wider than the terminal are clipped with their styling intact and
/// rows past the bottom are dropped. Padding clamps at zero.
#[must_use]
pub fn center(lines: &[String], term_width: usize, term_height: usize) -> Vec<String> {
    let width = term_width.max(1);
    let height = term_height.max(1);
    let card_width = lines.iter().map(|l| visible_width(l)).max().unwrap_or(0);
    let top = height.saturating_sub(lines.len()) / 2;
    let left = width.saturating_sub(card_width) / 2;
    let indent = " ".repeat(left);

    let mut out = Vec::with_capacity(height);
    out.extend(std::iter::repeat_with(String::new).take(top));
    for line in lines.iter().take(height - top) {
        let clipped = clip(line, width - left);
        out.push(format!("{indent}{clipped}"));
    }
    out
}

/// Expand `lines` to a full screen: exactly `height` rows, each exactly
/// `width` visible columns, opened with `base` and closed with `reset`.
#[must_use]
pub fn fill(lines: Vec<String>, width: usize, height: usize, base: &str, reset: &str) -> Vec<String> {
    let width = width.max(1);
    let height = height.max(1);
    let mut rows = Vec::with_capacity(height);
    for line in lines.into_iter().take(height) {
        rows.push(format!("{base}{}{reset}", pad_right(&clip(&line, width), width)));
    }
    while rows.len() < height {
        rows.push(format!("{base}{}{reset}", " ".repeat(width)));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::styles::Role;
    use crate::tui::theme::{ColorMode, ThemeId};

    fn plain() -> StyleSet {
        StyleSet::build(ThemeId::Midnight, ColorMode::Disabled)
    }

    fn strings(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn card_draws_uniform_box() {
        let boxed = card(&strings(&["hi", "there"]), 3, &plain());
        assert_eq!(
            boxed,
            vec!["+-------+", "| hi    |", "| there |", "+-------+"]
        );
    }

    #[test]
    fn card_floors_width_at_one() {
        let boxed = card(&[], 0, &plain());
        assert_eq!(boxed, vec!["+---+", "+---+"]);
    }

    #[test]
    fn styled_card_lines_share_visible_width() {
        let styles = StyleSet::build(ThemeId::Forest, ColorMode::Enabled);
        let lines = vec![styles.brand("title"), "body text".to_string(), String::new()];
        let boxed = card(&lines, 20, &styles);
        let widths: Vec<usize> = boxed.iter().map(|l| visible_width(l)).collect();
        assert!(widths.iter().all(|w| *w == 24), "{widths:?}");
    }

    #[test]
    fn reapply_base_after_reset() {
        let out = reapply_base("a\x1b[0mb\x1b[39mc\x1b[mD", "<B>");
        assert_eq!(out, "a\x1b[0m<B>b\x1b[39m<B>c\x1b[m<B>D");
    }

    #[test]
    fn reapply_base_ignores_color_index_zero() {
        let line = "x\x1b[38;5;0my";
        assert_eq!(reapply_base(line, "<B>"), line);
        assert_eq!(reapply_base("\x1b[1;49mz", "<B>"), "\x1b[1;49m<B>z");
    }

    #[test]
    fn reapply_base_skips_existing_base() {
        let base = "\x1b[0;48;5;234;38;5;252m";
        let line = format!("{base}a\x1b[0m{base}b");
        assert_eq!(reapply_base(&line, base), line);
    }

    #[test]
    fn center_pads_top_and_left() {
        let out = center(&strings(&["ab", "cd"]), 6, 6);
        assert_eq!(out, vec!["", "", "  ab", "  cd"]);
    }

    #[test]
    fn center_clips_to_terminal() {
        let out = center(&strings(&["abcdefghij", "x", "y"]), 6, 2);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|l| visible_width(l) <= 6));
        assert_eq!(out[0], "abc...");
    }

    #[test]
    fn center_clip_keeps_role_colors() {
        let styles = StyleSet::build(ThemeId::Forest, ColorMode::Enabled);
        let row = format!("> {}", styles.active_row("Theme  forest", 20));
        let out = center(&[row], 10, 1);
        assert_eq!(visible_width(&out[0]), 10);
        assert!(out[0].contains(styles.prefix(Role::Active)));
        assert!(out[0].ends_with(styles.base()));
    }

    #[test]
    fn center_handles_zero_dimensions() {
        let out = center(&strings(&["abc"]), 0, 0);
        assert_eq!(out.len(), 1);
        assert!(visible_width(&out[0]) <= 1);
    }

    #[test]
    fn fill_produces_exact_screen() {
        let rows = fill(strings(&["hello", "toolongline"]), 8, 3, "", "");
        assert_eq!(rows, vec!["hello   ", "toolo...", "        "]);
    }
}
