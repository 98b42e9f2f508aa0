//! Traffic statistics collaborator.
//!
//! The data plane owns a [`TrafficSource`]; the dashboard only asks it for a
//! [`TrafficSnapshot`] on each tick. [`CounterTelemetry`] is the reference
//! source: the data plane bumps atomic byte counters and rates are derived from
//! the delta between successive snapshots.

#![allow(missing_docs)]

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

/// Point-in-time traffic figures in bytes and bytes per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficSnapshot {
    pub rx_rate: u64,
    pub tx_rate: u64,
    pub rx_total: u64,
    pub tx_total: u64,
}

/// Source of traffic snapshots.
pub trait TrafficSource: Send + Sync + fmt::Debug {
    fn snapshot(&self) -> TrafficSnapshot;
}

/// Source that never reports traffic.
#[derive(Debug, Default)]
pub struct NullTelemetry;

impl TrafficSource for NullTelemetry {
    fn snapshot(&self) -> TrafficSnapshot {
        TrafficSnapshot::default()
    }
}

#[derive(Debug, Clone, Copy)]
struct LastSample {
    at: Instant,
    rx_total: u64,
    tx_total: u64,
}

/// Atomic byte counters with rates derived between snapshots.
#[derive(Debug)]
pub struct CounterTelemetry {
    rx: AtomicU64,
    tx: AtomicU64,
    last: Mutex<Option<LastSample>>,
}

impl Default for CounterTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterTelemetry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rx: AtomicU64::new(0),
            tx: AtomicU64::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn record_rx(&self, bytes: u64) {
        self.rx.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_tx(&self, bytes: u64) {
        self.tx.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Snapshot as of `now`; split out so rate math is testable.
    #[must_use]
    pub fn snapshot_at(&self, now: Instant) -> TrafficSnapshot {
        let rx_total = self.rx.load(Ordering::Relaxed);
        let tx_total = self.tx.load(Ordering::Relaxed);

        let mut last = self.last.lock();
        let (rx_rate, tx_rate) = match *last {
            Some(prev) => {
                let elapsed_ms = now.saturating_duration_since(prev.at).as_millis();
                if elapsed_ms == 0 {
                    (0, 0)
                } else {
                    (
                        per_second(rx_total.saturating_sub(prev.rx_total), elapsed_ms),
                        per_second(tx_total.saturating_sub(prev.tx_total), elapsed_ms),
                    )
                }
            }
            None => (0, 0),
        };
        *last = Some(LastSample {
            at: now,
            rx_total,
            tx_total,
        });

        TrafficSnapshot {
            rx_rate,
            tx_rate,
            rx_total,
            tx_total,
        }
    }
}

impl TrafficSource for CounterTelemetry {
    fn snapshot(&self) -> TrafficSnapshot {
        self.snapshot_at(Instant::now())
    }
}

fn per_second(delta: u64, elapsed_ms: u128) -> u64 {
    let rate = u128::from(delta) * 1000 / elapsed_ms;
    u64::try_from(rate).unwrap_or(u64::MAX)
}
