#![forbid(unsafe_code)]

//! tundash: live operator dashboard for a network-tunnel daemon.
//!
//! Three layers:
//! 1. **Layout engine**: ANSI-aware measuring, wrapping, truncation and
//!    framing of styled text ([`tui::layout`], [`tui::frame`]).
//! 2. **Widgets**: log ring buffer ([`logger`]) and braille sparklines
//!    ([`tui::widgets`]).
//! 3. **Session**: a sequence-numbered phase state machine driven by a single
//!    message loop and exposed through a blocking handle ([`tui::session`]).
//!
//! # Library usage
//!
//! ```rust,no_run
//! use tundash::prelude::*;
//!
//! let session = Session::start(
//!     SessionOptions::interactive(Config::default()),
//!     SessionDeps::default(),
//! )?;
//! let mode = session.wait_mode_selected()?;
//! # let _ = mode;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod prelude;

pub mod core;
#[cfg(feature = "daemon")]
pub mod daemon;
pub mod logger;
pub mod tui;
