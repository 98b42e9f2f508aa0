//! Core types: errors, configuration, cancellation, tunnel modes.

pub mod cancel;
pub mod config;
pub mod errors;
pub mod mode;
