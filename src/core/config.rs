//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, TunError};
use crate::core::mode::TunnelMode;

/// Smallest accepted tick or poll interval.
const MIN_INTERVAL_MS: u64 = 50;

/// Full dashboard configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
    pub modes: ModesConfig,
    pub paths: PathsConfig,
}

/// Refresh cadence and layout limits for the runtime dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Traffic sampling tick on the dataplane screen.
    pub tick_interval_ms: u64,
    /// Fallback refresh for log feeds that cannot push change notifications.
    pub log_poll_interval_ms: u64,
    /// Number of most-recent log lines pulled into the logs screen.
    pub log_tail_lines: usize,
    /// Upper bound for the inner width of framed cards.
    pub max_card_width: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            log_poll_interval_ms: 500,
            log_tail_lines: 200,
            max_card_width: 76,
        }
    }
}

impl DashboardConfig {
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    #[must_use]
    pub const fn log_poll_interval(&self) -> Duration {
        Duration::from_millis(self.log_poll_interval_ms)
    }
}

/// In-process log capture settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Ring buffer capacity in lines.
    pub capacity: usize,
    /// Default tracing filter directive when no env filter is set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            level: "info".to_string(),
        }
    }
}

/// Modes offered by the configurator, in menu order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModesConfig {
    pub available: Vec<TunnelMode>,
}

impl Default for ModesConfig {
    fn default() -> Self {
        Self {
            available: TunnelMode::ALL.to_vec(),
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub preferences_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let config_dir = env::var_os("HOME").map_or_else(
            || PathBuf::from(".tundash"),
            |home| PathBuf::from(home).join(".config").join("tundash"),
        );
        Self {
            config_file: config_dir.join("config.toml"),
            preferences_file: config_dir.join("preferences.toml"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| TunError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(TunError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_with(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply `TUNDASH_*` overrides using the given variable lookup.
    pub fn apply_env_overrides_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        set_env_u64(
            &lookup,
            "TUNDASH_TICK_INTERVAL_MS",
            &mut self.dashboard.tick_interval_ms,
        )?;
        set_env_u64(
            &lookup,
            "TUNDASH_LOG_POLL_INTERVAL_MS",
            &mut self.dashboard.log_poll_interval_ms,
        )?;
        set_env_usize(
            &lookup,
            "TUNDASH_LOG_TAIL_LINES",
            &mut self.dashboard.log_tail_lines,
        )?;
        set_env_usize(&lookup, "TUNDASH_LOG_CAPACITY", &mut self.logging.capacity)?;
        if let Some(level) = lookup("TUNDASH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(path) = lookup("TUNDASH_PREFERENCES_FILE") {
            self.paths.preferences_file = PathBuf::from(path);
        }
        if let Some(raw) = lookup("TUNDASH_MODES") {
            let modes = raw
                .split(',')
                .filter(|part| !part.trim().is_empty())
                .map(str::parse::<TunnelMode>)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|details| TunError::ConfigParse {
                    context: "env",
                    details: format!("TUNDASH_MODES={raw:?}: {details}"),
                })?;
            self.modes.available = modes;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for (name, val) in [
            ("dashboard.tick_interval_ms", self.dashboard.tick_interval_ms),
            (
                "dashboard.log_poll_interval_ms",
                self.dashboard.log_poll_interval_ms,
            ),
        ] {
            if val < MIN_INTERVAL_MS {
                return Err(TunError::InvalidConfig {
                    details: format!("{name} must be >= {MIN_INTERVAL_MS}, got {val}"),
                });
            }
        }

        if self.logging.capacity == 0 {
            return Err(TunError::InvalidConfig {
                details: "logging.capacity must be >= 1".to_string(),
            });
        }

        if self.dashboard.log_tail_lines == 0
            || self.dashboard.log_tail_lines > self.logging.capacity
        {
            return Err(TunError::InvalidConfig {
                details: format!(
                    "dashboard.log_tail_lines must be in [1, {}], got {}",
                    self.logging.capacity, self.dashboard.log_tail_lines
                ),
            });
        }

        if self.dashboard.max_card_width < 20 {
            return Err(TunError::InvalidConfig {
                details: format!(
                    "dashboard.max_card_width must be >= 20, got {}",
                    self.dashboard.max_card_width
                ),
            });
        }

        if self.modes.available.is_empty() {
            return Err(TunError::InvalidConfig {
                details: "modes.available must list at least one mode".to_string(),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn set_env_u64<F>(lookup: &F, name: &str, slot: &mut u64) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = raw.trim().parse::<u64>().map_err(|error| TunError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

fn set_env_usize<F>(lookup: &F, name: &str, slot: &mut usize) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = raw
            .trim()
            .parse::<usize>()
            .map_err(|error| TunError::ConfigParse {
                context: "env",
                details: format!("{name}={raw:?}: {error}"),
            })?;
    }
    Ok(())
}
