//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use tundash::prelude::*;
//! ```

// Core
pub use crate::core::cancel::{CancelToken, Canceller};
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, SessionError, TunError};
pub use crate::core::mode::TunnelMode;

// Logging
pub use crate::logger::{LogCapture, LogFeed, LogRingBuffer, LogSink, LogSource, init_tracing};

// Session
pub use crate::tui::{
    ColorMode, CounterTelemetry, FilePreferencesStore, MemoryPreferencesStore, Preferences,
    PreferencesStore, RuntimeActivation, Session, SessionDeps, SessionHandle, SessionOptions,
    ThemeId, TrafficSnapshot, TrafficSource,
};
