//! Process logging sink with scoped in-memory capture.
//!
//! The `tracing` subscriber writes through a [`LogSink`] whose target can be
//! swapped at runtime. While the dashboard owns the terminal, a [`LogCapture`]
//! points the sink at a [`LogRingBuffer`] so log output lands on the logs
//! screen instead of corrupting the alternate screen; disabling the capture
//! restores whatever target was active before.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

use super::ring::LogRingBuffer;
use crate::core::errors::{Result, TunError};

#[derive(Debug, Clone)]
enum SinkTarget {
    Stderr,
    Buffer(Arc<LogRingBuffer>),
    Discard,
}

/// Swappable destination for formatted log lines.
#[derive(Debug, Clone)]
pub struct LogSink {
    target: Arc<RwLock<SinkTarget>>,
}

impl LogSink {
    /// Sink writing to stderr until a capture is enabled.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_target(SinkTarget::Stderr)
    }

    /// Sink that drops everything until a capture is enabled.
    #[must_use]
    pub fn discard() -> Self {
        Self::with_target(SinkTarget::Discard)
    }

    fn with_target(target: SinkTarget) -> Self {
        Self {
            target: Arc::new(RwLock::new(target)),
        }
    }

    fn replace(&self, target: SinkTarget) -> SinkTarget {
        std::mem::replace(&mut *self.target.write(), target)
    }

    /// Whether lines currently go to a ring buffer.
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        matches!(*self.target.read(), SinkTarget::Buffer(_))
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::stderr()
    }
}

/// Writer handed to the fmt layer for a single event.
#[derive(Debug)]
pub struct SinkWriter {
    target: SinkTarget,
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &self.target {
            SinkTarget::Stderr => io::stderr().write(buf),
            SinkTarget::Buffer(ring) => {
                ring.write_bytes(buf);
                Ok(buf.len())
            }
            SinkTarget::Discard => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &self.target {
            SinkTarget::Stderr => io::stderr().flush(),
            SinkTarget::Buffer(_) | SinkTarget::Discard => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter {
            target: self.target.read().clone(),
        }
    }
}

/// Scoped redirection of a [`LogSink`] into a ring buffer.
#[derive(Debug)]
pub struct LogCapture {
    sink: LogSink,
    buffer: Arc<LogRingBuffer>,
    previous: Option<SinkTarget>,
}

impl LogCapture {
    #[must_use]
    pub fn new(sink: LogSink, buffer: Arc<LogRingBuffer>) -> Self {
        Self {
            sink,
            buffer,
            previous: None,
        }
    }

    /// Route the sink into the buffer. No-op when already enabled.
    pub fn enable(&mut self) {
        if self.previous.is_some() {
            return;
        }
        let prev = self
            .sink
            .replace(SinkTarget::Buffer(Arc::clone(&self.buffer)));
        self.previous = Some(prev);
    }

    /// Restore the target that was active before [`enable`](Self::enable).
    /// No-op when not enabled.
    pub fn disable(&mut self) {
        if let Some(prev) = self.previous.take() {
            self.sink.replace(prev);
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.previous.is_some()
    }

    #[must_use]
    pub fn buffer(&self) -> &Arc<LogRingBuffer> {
        &self.buffer
    }
}

impl Drop for LogCapture {
    fn drop(&mut self) {
        self.disable();
    }
}

/// Install the global `tracing` subscriber writing through `sink`.
///
/// `TUNDASH_LOG` (then `RUST_LOG`) overrides `default_level`.
pub fn init_tracing(sink: &LogSink, default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_env("TUNDASH_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(sink.clone())
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| TunError::Runtime {
            details: format!("tracing subscriber already installed: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(sink: &LogSink, line: &str) {
        let mut writer = sink.make_writer();
        writer.write_all(line.as_bytes()).unwrap();
    }

    #[test]
    fn capture_routes_lines_into_buffer() {
        let sink = LogSink::discard();
        let ring = Arc::new(LogRingBuffer::new(8));
        let mut capture = LogCapture::new(sink.clone(), Arc::clone(&ring));

        emit(&sink, "before\n");
        capture.enable();
        assert!(sink.is_capturing());
        emit(&sink, "during\n");
        capture.disable();
        emit(&sink, "after\n");

        assert_eq!(ring.tail(10), vec!["during"]);
        assert!(!sink.is_capturing());
    }

    #[test]
    fn enable_and_disable_are_idempotent() {
        let sink = LogSink::discard();
        let ring = Arc::new(LogRingBuffer::new(8));
        let mut capture = LogCapture::new(sink.clone(), Arc::clone(&ring));

        capture.enable();
        capture.enable();
        assert!(capture.is_enabled());
        capture.disable();
        capture.disable();
        assert!(!capture.is_enabled());
        assert!(!sink.is_capturing());
    }

    #[test]
    fn disable_restores_prior_capture() {
        let sink = LogSink::discard();
        let outer_ring = Arc::new(LogRingBuffer::new(8));
        let inner_ring = Arc::new(LogRingBuffer::new(8));
        let mut outer = LogCapture::new(sink.clone(), Arc::clone(&outer_ring));
        let mut inner = LogCapture::new(sink.clone(), Arc::clone(&inner_ring));

        outer.enable();
        inner.enable();
        emit(&sink, "inner\n");
        inner.disable();
        emit(&sink, "outer\n");

        assert_eq!(inner_ring.tail(10), vec!["inner"]);
        assert_eq!(outer_ring.tail(10), vec!["outer"]);
    }

    #[test]
    fn drop_restores_sink() {
        let sink = LogSink::discard();
        let ring = Arc::new(LogRingBuffer::new(8));
        {
            let mut capture = LogCapture::new(sink.clone(), ring);
            capture.enable();
            assert!(sink.is_capturing());
        }
        assert!(!sink.is_capturing());
    }
}
