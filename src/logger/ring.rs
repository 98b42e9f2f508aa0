//! Fixed-capacity circular line store fed by arbitrary writers.
//!
//! Bytes arrive through [`std::io::Write`]; each `\n` completes a line that is
//! appended to the ring, overwriting the oldest line once the ring is full.
//! Bytes after the last terminator stay in a partial-line buffer and are never
//! visible through [`LogRingBuffer::tail`] until their terminator arrives.
//!
//! Every completed append performs a non-blocking send on a capacity-1 change
//! channel, so an absent or slow reader never stalls a writer and repeated
//! appends collapse into a single pending signal.

use std::io;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;

use super::feed::LogFeed;

#[derive(Debug)]
struct RingState {
    lines: Vec<String>,
    /// Slot the next completed line is written to.
    head: usize,
    /// Number of valid lines, `<= lines.len()`.
    count: usize,
    partial: Vec<u8>,
}

impl RingState {
    fn push_line(&mut self, raw: &[u8]) {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let capacity = self.lines.len();
        self.lines[self.head] = String::from_utf8_lossy(raw).into_owned();
        self.head = (self.head + 1) % capacity;
        if self.count < capacity {
            self.count += 1;
        }
    }

    /// Index of the oldest of the `n` most recent lines.
    fn start_of_last(&self, n: usize) -> usize {
        let capacity = self.lines.len();
        (self.head + capacity - n) % capacity
    }
}

/// Circular buffer of completed log lines.
#[derive(Debug)]
pub struct LogRingBuffer {
    state: Mutex<RingState>,
    changes_tx: Sender<()>,
    changes_rx: Receiver<()>,
}

impl LogRingBuffer {
    /// Create a buffer holding at most `capacity` lines (floored at 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (changes_tx, changes_rx) = bounded(1);
        Self {
            state: Mutex::new(RingState {
                lines: vec![String::new(); capacity],
                head: 0,
                count: 0,
                partial: Vec::new(),
            }),
            changes_tx,
            changes_rx,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.lock().lines.len()
    }

    /// Number of completed lines currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append raw bytes, completing a line at every `\n`.
    pub fn write_bytes(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        let mut appended = false;
        {
            let mut state = self.state.lock();
            let mut rest = bytes;
            while let Some(pos) = memchr::memchr(b'\n', rest) {
                let (segment, tail) = rest.split_at(pos);
                if state.partial.is_empty() {
                    state.push_line(segment);
                } else {
                    let mut line = std::mem::take(&mut state.partial);
                    line.extend_from_slice(segment);
                    state.push_line(&line);
                }
                appended = true;
                rest = &tail[1..];
            }
            state.partial.extend_from_slice(rest);
        }

        if appended {
            self.notify();
        }
    }

    /// The `min(n, len)` most recent completed lines, oldest first.
    #[must_use]
    pub fn tail(&self, n: usize) -> Vec<String> {
        let state = self.state.lock();
        let n = n.min(state.count);
        if n == 0 {
            return Vec::new();
        }
        let capacity = state.lines.len();
        let start = state.start_of_last(n);
        let mut out = Vec::with_capacity(n);
        if start + n <= capacity {
            out.extend_from_slice(&state.lines[start..start + n]);
        } else {
            let first = capacity - start;
            out.extend_from_slice(&state.lines[start..]);
            out.extend_from_slice(&state.lines[..n - first]);
        }
        out
    }

    /// Copy up to `min(n, len, dst.len())` most recent lines into `dst`,
    /// oldest first, reusing `dst`'s allocations. Returns the number copied.
    pub fn tail_into(&self, dst: &mut [String], n: usize) -> usize {
        let state = self.state.lock();
        let n = n.min(state.count).min(dst.len());
        if n == 0 {
            return 0;
        }
        let capacity = state.lines.len();
        let start = state.start_of_last(n);
        for (i, slot) in dst.iter_mut().take(n).enumerate() {
            slot.clone_from(&state.lines[(start + i) % capacity]);
        }
        n
    }

    /// Change-notification receiver. A signal is pending whenever at least
    /// one line was appended since the last receive.
    #[must_use]
    pub fn changes(&self) -> Receiver<()> {
        self.changes_rx.clone()
    }

    fn notify(&self) {
        match self.changes_tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                // Unreachable while `self` holds the receiver.
            }
        }
    }
}

impl LogFeed for LogRingBuffer {
    fn tail(&self, limit: usize) -> Vec<String> {
        Self::tail(self, limit)
    }

    fn tail_into(&self, dst: &mut [String], limit: usize) -> usize {
        Self::tail_into(self, dst, limit)
    }
}

impl io::Write for &LogRingBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
