//! RAII terminal lifecycle guard backed by crossterm.
//!
//! [`TerminalGuard`] enters raw mode and the alternate screen on construction,
//! and restores the terminal on [`Drop`], including during panics and early
//! error returns. A panic hook restores the terminal *before* the default
//! panic message is printed so the backtrace is readable.

use std::io::{self, Write};
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::{cursor, execute, terminal};

/// Set while raw mode is active. Checked by the panic hook to decide whether
/// restoration is needed.
static RAW_MODE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// RAII guard for raw mode, alternate screen and hidden cursor.
pub struct TerminalGuard {
    hook_installed: bool,
}

impl TerminalGuard {
    /// Enter raw mode and the alternate screen, installing a panic-safe
    /// cleanup hook.
    ///
    /// # Errors
    /// Returns I/O errors if terminal setup fails. Whatever was set up before
    /// the failure is torn down again.
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        RAW_MODE_ACTIVE.store(true, Ordering::SeqCst);

        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide) {
            restore_terminal_best_effort();
            return Err(err);
        }

        let prev = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            restore_terminal_best_effort();
            prev(info);
        }));

        Ok(Self {
            hook_installed: true,
        })
    }

    /// Terminal dimensions (columns, rows).
    ///
    /// Asks the terminal first, then `$COLUMNS`/`$LINES`, then falls back to
    /// 80x24 (no tty attached, CI).
    #[must_use]
    pub fn terminal_size() -> (u16, u16) {
        if let Ok((cols, rows)) = terminal::size()
            && cols > 0
            && rows > 0
        {
            return (cols, rows);
        }
        let cols = env_dimension("COLUMNS").unwrap_or(80);
        let rows = env_dimension("LINES").unwrap_or(24);
        (cols, rows)
    }
}

fn env_dimension(var: &str) -> Option<u16> {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .filter(|&v| v > 0)
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal_best_effort();
        if self.hook_installed {
            // The previous hook moved into our closure; fall back to default.
            let _ = panic::take_hook();
        }
    }
}

/// Best-effort terminal restoration. Safe to call multiple times.
pub fn restore_terminal_best_effort() {
    if RAW_MODE_ACTIVE.swap(false, Ordering::SeqCst) {
        let mut stdout = io::stdout();
        let _ = execute!(stdout, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
        let _ = stdout.flush();
    }
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_terminal_is_idempotent() {
        restore_terminal_best_effort();
        restore_terminal_best_effort();
        assert!(!RAW_MODE_ACTIVE.load(Ordering::SeqCst));
    }

    #[test]
    fn terminal_size_is_never_zero() {
        let (cols, rows) = TerminalGuard::terminal_size();
        assert!(cols > 0);
        assert!(rows > 0);
    }

    #[test]
    fn env_dimension_rejects_garbage() {
        assert_eq!(env_dimension("TUNDASH_TEST_UNSET_DIMENSION"), None);
    }
}
