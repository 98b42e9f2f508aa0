//! Fatal-error screen shown until the operator dismisses it.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};

use super::input::KeyAction;

/// A fatal failure reported by the session owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalReport {
    pub message: String,
    pub at: DateTime<Utc>,
}

impl FatalReport {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalModel {
    report: FatalReport,
}

impl FatalModel {
    #[must_use]
    pub const fn new(report: FatalReport) -> Self {
        Self { report }
    }

    #[must_use]
    pub const fn report(&self) -> &FatalReport {
        &self.report
    }

    /// Whether `action` dismisses the screen.
    #[must_use]
    pub const fn dismisses(action: KeyAction) -> bool {
        matches!(
            action,
            KeyAction::Select | KeyAction::Back | KeyAction::Quit | KeyAction::Space
        )
    }
}
