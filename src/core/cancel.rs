//! Broadcast cancellation built on channel disconnection.
//!
//! A [`Canceller`] owns the only sender of a zero-capacity channel; nothing is
//! ever sent on it. Cancelling (or dropping) the canceller disconnects the
//! channel, which wakes every receiver blocked in a `select` at once. A
//! [`CancelToken`] is the receiving side and may merge several scopes, so a
//! single wait can observe "session shut down" and "runtime stopped" together.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Select, Sender, TryRecvError, bounded, never};
use parking_lot::Mutex;

/// Owner side of a cancellation scope.
#[derive(Debug)]
pub struct Canceller {
    tx: Mutex<Option<Sender<()>>>,
    token: CancelToken,
}

impl Canceller {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = bounded::<()>(0);
        Self {
            tx: Mutex::new(Some(tx)),
            token: CancelToken {
                signals: Arc::from(vec![rx]),
            },
        }
    }

    /// A token observing this scope.
    #[must_use]
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Cancel the scope. Idempotent.
    pub fn cancel(&self) {
        self.tx.lock().take();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.tx.lock().is_none()
    }
}

impl Default for Canceller {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a cancellable wait.
#[derive(Debug, PartialEq, Eq)]
pub enum Waited<T> {
    /// The awaited channel produced a value.
    Ready(T),
    /// One of the token's scopes was cancelled first.
    Cancelled,
    /// The timeout elapsed.
    TimedOut,
    /// The awaited channel disconnected without producing a value.
    Closed,
}

/// Receiver side of one or more cancellation scopes.
#[derive(Debug, Clone)]
pub struct CancelToken {
    signals: Arc<[Receiver<()>]>,
}

impl CancelToken {
    /// A token that is never cancelled.
    #[must_use]
    pub fn never() -> Self {
        Self {
            signals: Arc::from(Vec::new()),
        }
    }

    /// A token cancelled when either `self` or `other` is cancelled.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let signals: Vec<Receiver<()>> = self
            .signals
            .iter()
            .chain(other.signals.iter())
            .cloned()
            .collect();
        Self {
            signals: Arc::from(signals),
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.signals
            .iter()
            .any(|rx| matches!(rx.try_recv(), Err(TryRecvError::Disconnected)))
    }

    /// Block until cancelled.
    pub fn wait(&self) {
        let _ = self.select::<()>(None, None);
    }

    /// Sleep for `duration` unless cancelled first. Returns `true` when the
    /// full duration elapsed.
    pub fn sleep(&self, duration: Duration) -> bool {
        matches!(self.select::<()>(None, Some(duration)), Waited::TimedOut)
    }

    /// Receive one value from `rx` unless cancelled first.
    pub fn recv<T>(&self, rx: &Receiver<T>) -> Waited<T> {
        self.select(Some(rx), None)
    }

    /// Block until `self` or `other` is cancelled. Returns `true` when `self`
    /// fired first.
    pub fn race(&self, other: &Self) -> bool {
        let fallback = never::<()>();
        let mut sel = Select::new();
        for rx in self.signals.iter().chain(other.signals.iter()) {
            sel.recv(rx);
        }
        if self.signals.is_empty() && other.signals.is_empty() {
            sel.recv(&fallback);
        }
        let oper = sel.select();
        let idx = oper.index();
        let all: Vec<&Receiver<()>> = self.signals.iter().chain(other.signals.iter()).collect();
        match all.get(idx) {
            Some(rx) => {
                let _ = oper.recv(rx);
            }
            None => {
                let _ = oper.recv(&fallback);
            }
        }
        idx < self.signals.len()
    }

    fn select<T>(&self, rx: Option<&Receiver<T>>, timeout: Option<Duration>) -> Waited<T> {
        if self.signals.is_empty() && rx.is_none() {
            return match timeout {
                Some(duration) => {
                    thread::sleep(duration);
                    Waited::TimedOut
                }
                None => {
                    // Never cancelled and nothing to wait for: park forever.
                    let fallback = never::<()>();
                    let _ = fallback.recv();
                    Waited::Cancelled
                }
            };
        }

        let mut sel = Select::new();
        for signal in self.signals.iter() {
            sel.recv(signal);
        }
        let data_idx = rx.map(|r| sel.recv(r));

        let oper = match timeout {
            Some(duration) => match sel.select_timeout(duration) {
                Ok(oper) => oper,
                Err(_) => return Waited::TimedOut,
            },
            None => sel.select(),
        };

        let idx = oper.index();
        if let Some(r) = rx
            && Some(idx) == data_idx
        {
            return match oper.recv(r) {
                Ok(value) => Waited::Ready(value),
                Err(_) => Waited::Closed,
            };
        }
        if let Some(signal) = self.signals.get(idx) {
            let _ = oper.recv(signal);
        }
        Waited::Cancelled
    }
}
