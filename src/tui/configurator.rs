//! Mode picker shown before the data plane starts.

#![allow(missing_docs)]

use super::input::KeyAction;
use crate::core::errors::SessionError;
use crate::core::mode::TunnelMode;

/// Result of feeding one key to the configurator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfiguratorOutcome {
    Pending,
    Selected(TunnelMode),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguratorModel {
    modes: Vec<TunnelMode>,
    selected: usize,
}

impl ConfiguratorModel {
    /// Build a picker over `modes` (duplicates dropped, order kept), with the
    /// cursor on `preselect` when it is offered.
    ///
    /// # Errors
    /// Returns [`SessionError::Configurator`] when no mode is available.
    pub fn new(modes: &[TunnelMode], preselect: Option<TunnelMode>) -> Result<Self, SessionError> {
        let mut unique: Vec<TunnelMode> = Vec::with_capacity(modes.len());
        for mode in modes {
            if !unique.contains(mode) {
                unique.push(*mode);
            }
        }
        if unique.is_empty() {
            return Err(SessionError::Configurator {
                details: "no tunnel modes are enabled".to_string(),
            });
        }
        let selected = preselect
            .and_then(|mode| unique.iter().position(|m| *m == mode))
            .unwrap_or(0);
        Ok(Self {
            modes: unique,
            selected,
        })
    }

    #[must_use]
    pub fn modes(&self) -> &[TunnelMode] {
        &self.modes
    }

    #[must_use]
    pub const fn selected_index(&self) -> usize {
        self.selected
    }

    #[must_use]
    pub fn selected_mode(&self) -> TunnelMode {
        self.modes[self.selected]
    }

    pub fn handle(&mut self, action: KeyAction) -> ConfiguratorOutcome {
        let count = self.modes.len();
        match action {
            KeyAction::Up | KeyAction::Left | KeyAction::PrevTab => {
                self.selected = (self.selected + count - 1) % count;
            }
            KeyAction::Down | KeyAction::Right | KeyAction::NextTab => {
                self.selected = (self.selected + 1) % count;
            }
            KeyAction::Home => self.selected = 0,
            KeyAction::End => self.selected = count - 1,
            KeyAction::Select | KeyAction::Space => {
                return ConfiguratorOutcome::Selected(self.selected_mode());
            }
            KeyAction::Back => return ConfiguratorOutcome::Cancelled,
            KeyAction::Quit | KeyAction::PageUp | KeyAction::PageDown => {}
        }
        ConfiguratorOutcome::Pending
    }
}
