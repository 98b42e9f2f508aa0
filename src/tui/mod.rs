//! Operator dashboard: layout engine, widgets, session state machine and
//! the blocking session API.
//!
//! The session follows a model/update/command split: [`model`] holds state,
//! [`update`] is a pure reducer, [`runtime`] executes commands and paints
//! frames produced by [`render`], and [`session`] wraps it all behind a
//! blocking handle.

#![allow(missing_docs)]

pub mod configurator;
pub mod dashboard;
pub mod fatal;
pub mod frame;
pub mod input;
pub mod layout;
pub mod model;
pub mod preferences;
pub mod render;
pub mod runtime;
pub mod session;
pub mod styles;
pub mod telemetry;
pub mod terminal_guard;
pub mod theme;
pub mod update;
pub mod widgets;

#[cfg(test)]
mod test_properties;

pub use model::{Phase, RuntimeActivation, SessionCmd, SessionEvent, SessionModel, SessionMsg};
pub use preferences::{
    FilePreferencesStore, MemoryPreferencesStore, Preferences, PreferencesStore, PreferencesWriter,
    StatsUnit,
};
pub use session::{Session, SessionDeps, SessionHandle, SessionOptions};
pub use telemetry::{CounterTelemetry, NullTelemetry, TrafficSnapshot, TrafficSource};
pub use theme::{ColorMode, ThemeId};
