//! Process integration for long-running dashboard sessions: signal handling.

#[cfg(feature = "daemon")]
pub mod signals;
