//! Persisted dashboard preferences.
//!
//! Preferences are a small TOML document. Every field carries a serde default
//! so older files load after new fields are added, and unknown theme names
//! fall back to the default theme instead of failing the whole load.
//!
//! Atomic write: serialize → temp file → fsync → rename over target. This
//! prevents partial writes from corrupting the file when the process is
//! killed mid-save. Each save uses its own temp name, and the session funnels
//! every save through one [`PreferencesWriter`] thread so writes land in
//! request order.

#![allow(missing_docs)]

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, TrySendError, bounded};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::theme::ThemeId;
use crate::core::errors::{Result, TunError};

/// Current preferences schema version.
pub const SCHEMA_VERSION: u32 = 1;

// ──────────────────── model ────────────────────

/// Unit system for traffic figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsUnit {
    /// Powers of 1000 (kB, MB).
    #[default]
    Decimal,
    /// Powers of 1024 (KiB, MiB).
    Binary,
}

impl StatsUnit {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Decimal => Self::Binary,
            Self::Binary => Self::Decimal,
        }
    }
}

impl fmt::Display for StatsUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decimal => f.write_str("decimal"),
            Self::Binary => f.write_str("binary"),
        }
    }
}

/// Operator display preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub schema_version: u32,
    pub theme: ThemeId,
    pub stats_unit: StatsUnit,
    pub show_stats: bool,
    pub show_graph: bool,
    pub show_footer: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            theme: ThemeId::default(),
            stats_unit: StatsUnit::default(),
            show_stats: true,
            show_graph: true,
            show_footer: true,
        }
    }
}

// ──────────────────── stores ────────────────────

/// Persistence collaborator for [`Preferences`].
pub trait PreferencesStore: Send + Sync + fmt::Debug {
    /// Load preferences. A store with nothing saved yet returns defaults.
    fn load(&self) -> Result<Preferences>;

    fn save(&self, prefs: &Preferences) -> Result<()>;
}

/// TOML file store with atomic replacement.
#[derive(Debug, Clone)]
pub struct FilePreferencesStore {
    path: PathBuf,
}

impl FilePreferencesStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferencesStore for FilePreferencesStore {
    fn load(&self) -> Result<Preferences> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Preferences::default()),
            Err(e) => return Err(TunError::io(&self.path, e)),
        };

        let mut prefs: Preferences = toml::from_str(&content).map_err(|e| TunError::ConfigParse {
            context: "preferences",
            details: e.to_string(),
        })?;

        if prefs.schema_version > SCHEMA_VERSION {
            tracing::warn!(
                path = %self.path.display(),
                found = prefs.schema_version,
                supported = SCHEMA_VERSION,
                "preferences written by a newer version; unknown fields ignored"
            );
        }
        prefs.schema_version = SCHEMA_VERSION;
        Ok(prefs)
    }

    fn save(&self, prefs: &Preferences) -> Result<()> {
        let path = &self.path;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| TunError::io(parent, e))?;
        }

        let body = toml::to_string_pretty(prefs)?;

        // Temp file in the same directory keeps the rename on one filesystem.
        let tmp_path = temp_path_for(path);
        {
            let mut file = fs::File::create(&tmp_path).map_err(|e| TunError::io(&tmp_path, e))?;
            file.write_all(body.as_bytes())
                .map_err(|e| TunError::io(&tmp_path, e))?;
            file.sync_all().map_err(|e| TunError::io(&tmp_path, e))?;
        }
        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(TunError::io(path, e));
        }

        tracing::debug!(path = %path.display(), theme = %prefs.theme, "preferences saved");
        Ok(())
    }
}

/// `prefs.toml` → `prefs.toml.<pid>.<n>.tmp`, unique per save.
fn temp_path_for(path: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.{n}.tmp", std::process::id()));
    path.with_file_name(name)
}

/// In-memory store for headless sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryPreferencesStore {
    prefs: Mutex<Preferences>,
    saves: Mutex<usize>,
}

impl MemoryPreferencesStore {
    #[must_use]
    pub fn new(prefs: Preferences) -> Self {
        Self {
            prefs: Mutex::new(prefs),
            saves: Mutex::new(0),
        }
    }

    /// Number of completed saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }

    #[must_use]
    pub fn current(&self) -> Preferences {
        *self.prefs.lock()
    }
}

impl PreferencesStore for MemoryPreferencesStore {
    fn load(&self) -> Result<Preferences> {
        Ok(*self.prefs.lock())
    }

    fn save(&self, prefs: &Preferences) -> Result<()> {
        *self.prefs.lock() = *prefs;
        *self.saves.lock() += 1;
        Ok(())
    }
}

/// Load through `store`, falling back to defaults on any failure.
#[must_use]
pub fn load_or_default(store: &dyn PreferencesStore) -> Preferences {
    match store.load() {
        Ok(prefs) => prefs,
        Err(e) => {
            tracing::warn!(code = e.code(), error = %e, "preferences unreadable; using defaults");
            Preferences::default()
        }
    }
}

// ──────────────────── writer ────────────────────

/// Single background writer for a [`PreferencesStore`].
///
/// Requests coalesce: only the newest unsaved preferences are kept, and one
/// thread performs every save, so the file always ends up holding the last
/// request. Dropping the writer flushes the pending request and joins the
/// thread.
#[derive(Debug)]
pub struct PreferencesWriter {
    pending: Arc<Mutex<Option<Preferences>>>,
    wake: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl PreferencesWriter {
    pub fn spawn(store: Arc<dyn PreferencesStore>) -> io::Result<Self> {
        let pending = Arc::new(Mutex::new(None::<Preferences>));
        let (wake_tx, wake_rx) = bounded::<()>(1);

        let slot = Arc::clone(&pending);
        let thread = thread::Builder::new()
            .name("tundash-prefs".to_string())
            .spawn(move || {
                let flush = || {
                    let next = slot.lock().take();
                    if let Some(prefs) = next
                        && let Err(err) = store.save(&prefs)
                    {
                        tracing::warn!(error = %err, code = err.code(), "failed to save preferences");
                    }
                };
                for () in &wake_rx {
                    flush();
                }
                flush();
            })?;

        Ok(Self {
            pending,
            wake: Some(wake_tx),
            thread: Some(thread),
        })
    }

    /// Queue `prefs` for saving, replacing any request not yet written.
    ///
    /// # Errors
    /// [`TunError::ChannelClosed`] when the writer thread has gone away.
    pub fn request_save(&self, prefs: Preferences) -> Result<()> {
        *self.pending.lock() = Some(prefs);
        let closed = || TunError::ChannelClosed {
            component: "preferences writer",
        };
        let wake = self.wake.as_ref().ok_or_else(closed)?;
        match wake.try_send(()) {
            // A full wake slot already guarantees another flush.
            Ok(()) | Err(TrySendError::Full(())) => Ok(()),
            Err(TrySendError::Disconnected(())) => Err(closed()),
        }
    }
}

impl Drop for PreferencesWriter {
    fn drop(&mut self) {
        drop(self.wake.take());
        if let Some(handle) = self.thread.take()
            && handle.join().is_err()
        {
            tracing::warn!("preferences writer panicked");
        }
    }
}

// ──────────────────── tests ────────────────────
