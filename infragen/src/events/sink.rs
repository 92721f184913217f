//! Destinations for formatted progress lines.

use parking_lot::RwLock;
use std::io::Write;
use tracing::info;

/// A destination for progress lines.
///
/// Sinks are driven by a single consumer task and must not block for long.
pub trait ProgressSink: Send + Sync {
    /// Writes one line.
    fn write_line(&self, line: &str);
}

/// Writes progress lines to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl ProgressSink for StdoutSink {
    fn write_line(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        // A closed stdout loses progress lines but must not fail the run.
        let _ = writeln!(out, "{line}");
    }
}

/// Writes progress lines to standard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl ProgressSink for StderrSink {
    fn write_line(&self, line: &str) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{line}");
    }
}

/// Forwards progress lines to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn write_line(&self, line: &str) {
        info!(target: "infragen::progress", "{line}");
    }
}

/// Collects progress lines in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: RwLock<Vec<String>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.read().clone()
    }

    /// Returns the number of collected lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.read().len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.read().is_empty()
    }

    /// Returns true if any line equals `line`.
    #[must_use]
    pub fn contains(&self, line: &str) -> bool {
        self.lines.read().iter().any(|l| l == line)
    }
}

impl ProgressSink for MemorySink {
    fn write_line(&self, line: &str) {
        self.lines.write().push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.write_line("Starting A");
        sink.write_line("Completed A (100%)");

        assert_eq!(sink.len(), 2);
        assert!(sink.contains("Starting A"));
        assert_eq!(sink.lines()[1], "Completed A (100%)");
    }

    #[test]
    fn test_stream_sinks_do_not_panic() {
        StdoutSink.write_line("stdout line");
        StderrSink.write_line("stderr line");
        TracingSink.write_line("tracing line");
    }
}
