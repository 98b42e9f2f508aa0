//! Style resolution: theme palette → cached ANSI style prefixes.
//!
//! A [`StyleSet`] is a pure function of a [`ThemePalette`]. [`StyleCache`]
//! memoizes one set per theme and [`TabLineCache`] memoizes the rendered tab
//! strip. Both caches belong to a single renderer, so two sessions never share
//! entries.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::layout::{fit, pad_right, visible_width};
use super::theme::{ColorMode, ThemeId, ThemePalette};

pub const RESET: &str = "\x1b[0m";

/// Text role within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Text,
    Muted,
    Brand,
    Accent,
    Active,
    Frame,
}

/// Resolved ANSI prefixes for one theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSet {
    theme: ThemeId,
    base: String,
    text: String,
    muted: String,
    brand: String,
    accent: String,
    active: String,
    frame: String,
    reset: &'static str,
}

impl StyleSet {
    #[must_use]
    pub fn build(theme: ThemeId, color: ColorMode) -> Self {
        if !color.is_enabled() {
            return Self {
                theme,
                base: String::new(),
                text: String::new(),
                muted: String::new(),
                brand: String::new(),
                accent: String::new(),
                active: String::new(),
                frame: String::new(),
                reset: "",
            };
        }

        let ThemePalette {
            background,
            text,
            muted,
            brand,
            accent,
            active_background,
            active_text,
        } = *theme.palette();

        Self {
            theme,
            base: format!("\x1b[0;48;5;{background};38;5;{text}m"),
            text: format!("\x1b[38;5;{text}m"),
            muted: format!("\x1b[38;5;{muted}m"),
            brand: format!("\x1b[1;38;5;{brand}m"),
            accent: format!("\x1b[1;38;5;{accent}m"),
            active: format!("\x1b[1;48;5;{active_background};38;5;{active_text}m"),
            frame: format!("\x1b[38;5;{muted}m"),
            reset: RESET,
        }
    }

    #[must_use]
    pub const fn theme(&self) -> ThemeId {
        self.theme
    }

    /// Prefix that establishes the frame background and default text color.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Full attribute reset, empty when color is disabled.
    #[must_use]
    pub const fn reset(&self) -> &'static str {
        self.reset
    }

    #[must_use]
    pub fn prefix(&self, role: Role) -> &str {
        match role {
            Role::Text => &self.text,
            Role::Muted => &self.muted,
            Role::Brand => &self.brand,
            Role::Accent => &self.accent,
            Role::Active => &self.active,
            Role::Frame => &self.frame,
        }
    }

    /// Wrap `s` in the role's prefix and restore the base style afterwards.
    #[must_use]
    pub fn paint(&self, role: Role, s: &str) -> String {
        let prefix = self.prefix(role);
        if prefix.is_empty() {
            return s.to_string();
        }
        let mut out = String::with_capacity(prefix.len() + s.len() + self.base.len());
        out.push_str(prefix);
        out.push_str(s);
        out.push_str(&self.base);
        out
    }

    #[must_use]
    pub fn text(&self, s: &str) -> String {
        self.paint(Role::Text, s)
    }

    #[must_use]
    pub fn muted(&self, s: &str) -> String {
        self.paint(Role::Muted, s)
    }

    #[must_use]
    pub fn brand(&self, s: &str) -> String {
        self.paint(Role::Brand, s)
    }

    #[must_use]
    pub fn accent(&self, s: &str) -> String {
        self.paint(Role::Accent, s)
    }

    #[must_use]
    pub fn frame(&self, s: &str) -> String {
        self.paint(Role::Frame, s)
    }

    /// Highlight a row padded to `width` so the active background spans it.
    #[must_use]
    pub fn active_row(&self, s: &str, width: usize) -> String {
        self.paint(Role::Active, &fit(s, width))
    }
}

/// Per-renderer memo of theme → style set.
#[derive(Debug)]
pub struct StyleCache {
    color: ColorMode,
    sets: RwLock<HashMap<ThemeId, Arc<StyleSet>>>,
}

impl StyleCache {
    #[must_use]
    pub fn new(color: ColorMode) -> Self {
        Self {
            color,
            sets: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn color(&self) -> ColorMode {
        self.color
    }

    /// Style set for `theme`, built on first use.
    #[must_use]
    pub fn get(&self, theme: ThemeId) -> Arc<StyleSet> {
        if let Some(set) = self.sets.read().get(&theme) {
            return Arc::clone(set);
        }
        let mut sets = self.sets.write();
        let set = sets
            .entry(theme)
            .or_insert_with(|| Arc::new(StyleSet::build(theme, self.color)));
        Arc::clone(set)
    }

    /// Style set for a theme name; unknown names use the default theme.
    #[must_use]
    pub fn get_named(&self, name: &str) -> Arc<StyleSet> {
        self.get(ThemeId::from_name(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-renderer memo of rendered tab strips keyed by (theme, active, width).
#[derive(Debug)]
pub struct TabLineCache {
    labels: &'static [&'static str],
    lines: RwLock<HashMap<(ThemeId, usize, usize), Arc<str>>>,
}

impl TabLineCache {
    #[must_use]
    pub fn new(labels: &'static [&'static str]) -> Self {
        Self {
            labels,
            lines: RwLock::new(HashMap::new()),
        }
    }

    /// Tab strip exactly `width` visible columns wide with `active` highlighted.
    #[must_use]
    pub fn get(&self, styles: &StyleSet, active: usize, width: usize) -> Arc<str> {
        let key = (styles.theme(), active, width);
        if let Some(line) = self.lines.read().get(&key) {
            return Arc::clone(line);
        }
        let rendered: Arc<str> = Arc::from(self.render(styles, active, width));
        let mut lines = self.lines.write();
        Arc::clone(lines.entry(key).or_insert(rendered))
    }

    fn render(&self, styles: &StyleSet, active: usize, width: usize) -> String {
        let separator = styles.frame("|");
        let mut line = String::new();
        let mut plain_width = 0;
        for (idx, label) in self.labels.iter().enumerate() {
            if idx > 0 {
                line.push_str(&separator);
                plain_width += 1;
            }
            let cell = format!(" {label} ");
            plain_width += visible_width(&cell);
            if idx == active {
                line.push_str(&styles.paint(Role::Active, &cell));
            } else {
                line.push_str(&styles.muted(&cell));
            }
        }

        if plain_width <= width {
            return pad_right(&line, width);
        }

        // Too narrow for the full strip: show only the active label.
        let label = self.labels.get(active).copied().unwrap_or_default();
        styles.active_row(&format!(" {label} "), width.min(label.len() + 2))
            + &" ".repeat(width.saturating_sub(label.len() + 2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::layout::strip_ansi;

    const LABELS: &[&str] = &["One", "Two", "Three"];

    #[test]
    fn cache_returns_same_arc_on_hit() {
        let cache = StyleCache::new(ColorMode::Enabled);
        let a = cache.get(ThemeId::Forest);
        let b = cache.get(ThemeId::Forest);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unknown_name_resolves_to_default_theme() {
        let cache = StyleCache::new(ColorMode::Enabled);
        let set = cache.get_named("does-not-exist");
        assert_eq!(set.theme(), ThemeId::default());
        assert!(Arc::ptr_eq(&set, &cache.get(ThemeId::default())));
    }

    #[test]
    fn paint_restores_base() {
        let set = StyleSet::build(ThemeId::Midnight, ColorMode::Enabled);
        let painted = set.brand("tundash");
        assert!(painted.starts_with(set.prefix(Role::Brand)));
        assert!(painted.ends_with(set.base()));
        assert_eq!(visible_width(&painted), 7);
    }

    #[test]
    fn disabled_color_emits_plain_text() {
        let set = StyleSet::build(ThemeId::Daylight, ColorMode::Disabled);
        assert_eq!(set.accent("warn"), "warn");
        assert!(set.base().is_empty());
        assert!(set.reset().is_empty());
    }

    #[test]
    fn sets_differ_between_themes() {
        let a = StyleSet::build(ThemeId::Midnight, ColorMode::Enabled);
        let b = StyleSet::build(ThemeId::Daylight, ColorMode::Enabled);
        assert_ne!(a.base(), b.base());
    }

    #[test]
    fn tab_line_has_exact_width_and_is_cached() {
        let styles = StyleCache::new(ColorMode::Enabled);
        let set = styles.get(ThemeId::Midnight);
        let tabs = TabLineCache::new(LABELS);
        let line = tabs.get(&set, 1, 40);
        assert_eq!(visible_width(&line), 40);
        assert!(strip_ansi(&line).starts_with(" One | Two | Three "));
        assert!(Arc::ptr_eq(&line, &tabs.get(&set, 1, 40)));
    }

    #[test]
    fn narrow_tab_line_shows_active_label_only() {
        let set = StyleSet::build(ThemeId::Midnight, ColorMode::Disabled);
        let tabs = TabLineCache::new(LABELS);
        let line = tabs.get(&set, 2, 10);
        assert_eq!(visible_width(&line), 10);
        assert_eq!(line.trim(), "Three");
    }
}
