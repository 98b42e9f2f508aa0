//! Theme identifiers and their static palettes.

#![allow(missing_docs)]

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Color output mode for compatibility with `NO_COLOR` and terminal policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorMode {
    #[default]
    Enabled,
    Disabled,
}

impl ColorMode {
    #[must_use]
    pub const fn from_no_color_flag(no_color: bool) -> Self {
        if no_color { Self::Disabled } else { Self::Enabled }
    }

    #[must_use]
    pub fn from_environment() -> Self {
        Self::from_no_color_flag(env::var_os("NO_COLOR").is_some())
    }

    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// Selectable dashboard theme.
///
/// Unknown names (from a preferences file or the CLI) resolve to the default
/// theme instead of failing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ThemeId {
    #[default]
    Midnight,
    Daylight,
    Solarized,
    Forest,
    Mono,
}

impl ThemeId {
    pub const ALL: [Self; 5] = [
        Self::Midnight,
        Self::Daylight,
        Self::Solarized,
        Self::Forest,
        Self::Mono,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Midnight => "midnight",
            Self::Daylight => "daylight",
            Self::Solarized => "solarized",
            Self::Forest => "forest",
            Self::Mono => "mono",
        }
    }

    /// Resolve a theme name, falling back to the default theme.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|theme| theme.name().eq_ignore_ascii_case(name))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn next(self) -> Self {
        let idx = self.index();
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    #[must_use]
    pub fn prev(self) -> Self {
        let idx = self.index();
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    #[must_use]
    pub const fn palette(self) -> &'static ThemePalette {
        match self {
            Self::Midnight => &MIDNIGHT,
            Self::Daylight => &DAYLIGHT,
            Self::Solarized => &SOLARIZED,
            Self::Forest => &FOREST,
            Self::Mono => &MONO,
        }
    }
}

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<String> for ThemeId {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl From<ThemeId> for String {
    fn from(value: ThemeId) -> Self {
        value.name().to_string()
    }
}

/// xterm-256 color indices for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePalette {
    pub background: u8,
    pub text: u8,
    pub muted: u8,
    pub brand: u8,
    pub accent: u8,
    pub active_background: u8,
    pub active_text: u8,
}

const MIDNIGHT: ThemePalette = ThemePalette {
    background: 234,
    text: 252,
    muted: 244,
    brand: 45,
    accent: 214,
    active_background: 31,
    active_text: 231,
};

const DAYLIGHT: ThemePalette = ThemePalette {
    background: 255,
    text: 235,
    muted: 245,
    brand: 25,
    accent: 166,
    active_background: 25,
    active_text: 255,
};

const SOLARIZED: ThemePalette = ThemePalette {
    background: 235,
    text: 187,
    muted: 242,
    brand: 37,
    accent: 136,
    active_background: 37,
    active_text: 230,
};

const FOREST: ThemePalette = ThemePalette {
    background: 233,
    text: 151,
    muted: 65,
    brand: 114,
    accent: 179,
    active_background: 28,
    active_text: 194,
};

const MONO: ThemePalette = ThemePalette {
    background: 16,
    text: 250,
    muted: 242,
    brand: 255,
    accent: 255,
    active_background: 250,
    active_text: 16,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_color_flag_disables_color() {
        assert!(!ColorMode::from_no_color_flag(true).is_enabled());
        assert!(ColorMode::from_no_color_flag(false).is_enabled());
    }

    #[test]
    fn unknown_theme_falls_back_to_default() {
        assert_eq!(ThemeId::from_name("neon-pink"), ThemeId::Midnight);
        assert_eq!(ThemeId::from_name(" Forest "), ThemeId::Forest);
    }

    #[test]
    fn next_and_prev_cycle_all_themes() {
        let mut theme = ThemeId::Midnight;
        for _ in 0..ThemeId::ALL.len() {
            theme = theme.next();
        }
        assert_eq!(theme, ThemeId::Midnight);
        assert_eq!(ThemeId::Midnight.prev(), ThemeId::Mono);
        assert_eq!(ThemeId::Mono.next(), ThemeId::Midnight);
    }

    #[test]
    fn palettes_have_readable_active_rows() {
        for theme in ThemeId::ALL {
            let p = theme.palette();
            assert_ne!(p.active_background, p.active_text, "{theme}");
            assert_ne!(p.background, p.text, "{theme}");
        }
    }
}
