//! TUN-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, TunError>;

/// Top-level error type for infrastructure failures (config, I/O, threads).
#[derive(Debug, Error)]
pub enum TunError {
    #[error("[TUN-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[TUN-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[TUN-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[TUN-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[TUN-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[TUN-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[TUN-3101] terminal failure: {source}")]
    Terminal {
        #[source]
        source: std::io::Error,
    },

    #[error("[TUN-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl TunError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "TUN-1001",
            Self::MissingConfig { .. } => "TUN-1002",
            Self::ConfigParse { .. } => "TUN-1003",
            Self::Serialization { .. } => "TUN-2101",
            Self::Io { .. } => "TUN-3002",
            Self::ChannelClosed { .. } => "TUN-3003",
            Self::Terminal { .. } => "TUN-3101",
            Self::Runtime { .. } => "TUN-3900",
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<toml::de::Error> for TunError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for TunError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}

/// Terminations and failures reported by the interactive session.
///
/// `UserExit` is not a failure: it is how the blocking API reports that the
/// operator asked to leave, so callers can tell it apart from everything else.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("operator exited the dashboard")]
    UserExit,

    #[error("[TUN-4001] session closed before a terminal event was emitted")]
    SessionClosed,

    #[error("[TUN-4002] data plane disconnected")]
    RuntimeDisconnected,

    #[error("[TUN-4003] configurator failed: {details}")]
    Configurator { details: String },

    #[error(transparent)]
    Internal(#[from] TunError),
}

impl SessionError {
    /// Whether this termination was requested by the operator.
    #[must_use]
    pub const fn is_user_exit(&self) -> bool {
        matches!(self, Self::UserExit)
    }

    /// Whether the session is still usable for a fresh runtime activation.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RuntimeDisconnected)
    }
}
