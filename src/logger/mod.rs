//! In-process log capture: ring buffer, swappable tracing sink, feed capability.

pub mod feed;
pub mod ring;
pub mod sink;

pub use feed::{EmptyFeed, LogFeed, LogSource};
pub use ring::LogRingBuffer;
pub use sink::{LogCapture, LogSink, init_tracing};
