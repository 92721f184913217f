//! Progress reporting for pipeline runs.
//!
//! The executor drives a [`ProgressReporter`] at each stage transition.
//! [`ConsoleProgressReporter`] renders those transitions as lines and hands
//! them to a [`ProgressSink`] from a background task.

mod console;
mod phrases;
mod reporter;
mod sink;

pub use console::{ConsoleProgressReporter, DEFAULT_QUEUE_CAPACITY};
pub use phrases::{complete_phrase, start_phrase};
pub use reporter::{LoggingProgressReporter, NoOpProgressReporter, ProgressReporter};
pub use sink::{MemorySink, ProgressSink, StderrSink, StdoutSink, TracingSink};
