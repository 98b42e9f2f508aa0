//! Log feed capability consumed by the logs screen.

use std::fmt;
use std::sync::Arc;

use crossbeam_channel::Receiver;

use super::ring::LogRingBuffer;

/// Read side of a log store.
pub trait LogFeed: Send + Sync + fmt::Debug {
    /// The `limit` most recent lines, oldest first.
    fn tail(&self, limit: usize) -> Vec<String>;

    /// Copy up to `limit` most recent lines into `dst`; returns the count.
    fn tail_into(&self, dst: &mut [String], limit: usize) -> usize;
}

/// A log feed together with how the dashboard learns about new lines.
///
/// Chosen once when the session subscribes; the logs screen never probes a
/// feed for extra capabilities afterwards.
#[derive(Debug, Clone)]
pub enum LogSource {
    /// Feed without notifications; the logs screen refreshes on a timer.
    Pollable(Arc<dyn LogFeed>),
    /// Feed that pushes a signal on every append.
    Observable {
        feed: Arc<dyn LogFeed>,
        changes: Receiver<()>,
    },
}

impl LogSource {
    /// Subscribe to a ring buffer with push notifications.
    #[must_use]
    pub fn observe(buffer: &Arc<LogRingBuffer>) -> Self {
        let feed: Arc<dyn LogFeed> = Arc::clone(buffer) as Arc<dyn LogFeed>;
        Self::Observable {
            feed,
            changes: buffer.changes(),
        }
    }

    /// Subscribe to any feed by polling.
    #[must_use]
    pub fn poll(feed: Arc<dyn LogFeed>) -> Self {
        Self::Pollable(feed)
    }

    #[must_use]
    pub fn feed(&self) -> &Arc<dyn LogFeed> {
        match self {
            Self::Pollable(feed) | Self::Observable { feed, .. } => feed,
        }
    }

    #[must_use]
    pub fn changes(&self) -> Option<&Receiver<()>> {
        match self {
            Self::Pollable(_) => None,
            Self::Observable { changes, .. } => Some(changes),
        }
    }

    #[must_use]
    pub const fn is_observable(&self) -> bool {
        matches!(self, Self::Observable { .. })
    }
}

/// Feed with no lines, used when the session runs without log capture.
#[derive(Debug, Default)]
pub struct EmptyFeed;

impl LogFeed for EmptyFeed {
    fn tail(&self, _limit: usize) -> Vec<String> {
        Vec::new()
    }

    fn tail_into(&self, _dst: &mut [String], _limit: usize) -> usize {
        0
    }
}
