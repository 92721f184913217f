//! Queue-backed progress reporter that renders human-readable lines.

use super::phrases::{complete_phrase, start_phrase};
use super::{ProgressReporter, ProgressSink};
use parking_lot::Mutex;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default bound of the line queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Tracking state guarded by one lock.
///
/// `tx` is `None` once the reporter has been closed.
#[derive(Debug)]
struct TrackingState {
    current: Option<String>,
    completed_steps: usize,
    tx: Option<mpsc::Sender<String>>,
}

/// A progress reporter that writes stage transitions to a [`ProgressSink`].
///
/// Lines are pushed onto a bounded queue without blocking and a spawned
/// consumer task forwards them to the sink, so a slow sink never stalls the
/// pipeline. Lines that do not fit are dropped and counted.
///
/// Must be created inside a tokio runtime. Call [`shutdown`](Self::shutdown)
/// after the pipeline returns to flush the queue.
pub struct ConsoleProgressReporter {
    total_steps: usize,
    state: Mutex<TrackingState>,
    dropped: AtomicU64,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl ConsoleProgressReporter {
    /// Creates a reporter for `total_steps` stages with the default capacity.
    #[must_use]
    pub fn new(sink: Arc<dyn ProgressSink>, total_steps: usize) -> Self {
        Self::with_capacity(sink, total_steps, DEFAULT_QUEUE_CAPACITY)
    }

    /// Creates a reporter with an explicit queue capacity.
    #[must_use]
    pub fn with_capacity(sink: Arc<dyn ProgressSink>, total_steps: usize, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<String>(capacity.max(1));

        let consumer = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                sink.write_line(&line);
            }
        });

        Self {
            total_steps,
            state: Mutex::new(TrackingState {
                current: None,
                completed_steps: 0,
                tx: Some(tx),
            }),
            dropped: AtomicU64::new(0),
            consumer: Mutex::new(Some(consumer)),
        }
    }

    /// Returns the number of stages completed so far.
    #[must_use]
    pub fn completed_steps(&self) -> usize {
        self.state.lock().completed_steps
    }

    /// Returns the number of stages this reporter expects.
    #[must_use]
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Returns the current completion percentage.
    #[must_use]
    pub fn percent(&self) -> u8 {
        percent_of(self.state.lock().completed_steps, self.total_steps)
    }

    /// Returns the number of lines dropped because the queue was full or closed.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Returns the stage currently being tracked.
    #[must_use]
    pub fn current_stage(&self) -> Option<String> {
        self.state.lock().current.clone()
    }

    /// Closes the queue. Later lines are dropped.
    pub fn close(&self) {
        self.state.lock().tx = None;
    }

    /// Closes the queue and waits for the consumer to drain it.
    pub async fn shutdown(&self) {
        self.close();
        let handle = self.consumer.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Progress consumer task failed");
            }
        }
        debug!(dropped = self.dropped(), "Progress reporter shut down");
    }

    fn push(&self, state: &TrackingState, line: String) {
        let Some(tx) = &state.tx else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(line = %line, "Progress line dropped: reporter closed");
            return;
        };

        match tx.try_send(line) {
            Ok(()) => {}
            Err(TrySendError::Full(line)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(line = %line, "Progress line dropped: queue full");
            }
            Err(TrySendError::Closed(line)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(line = %line, "Progress line dropped: consumer gone");
            }
        }
    }
}

impl std::fmt::Debug for ConsoleProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ConsoleProgressReporter")
            .field("total_steps", &self.total_steps)
            .field("completed_steps", &state.completed_steps)
            .field("current", &state.current)
            .field("closed", &state.tx.is_none())
            .field("dropped", &self.dropped())
            .finish()
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn start_stage(&self, name: &str) {
        let mut state = self.state.lock();
        if state.current.as_deref() == Some(name) {
            return;
        }
        state.current = Some(name.to_string());
        self.push(&state, start_phrase(name));
    }

    fn complete_stage(&self, name: &str) {
        let mut state = self.state.lock();
        if state.current.as_deref() != Some(name) {
            return;
        }
        state.current = None;
        state.completed_steps += 1;
        let percent = percent_of(state.completed_steps, self.total_steps);
        self.push(&state, format!("{} ({percent}%)", complete_phrase(name)));
    }

    fn fail_stage(&self, name: &str, error: &dyn Error) {
        let mut state = self.state.lock();
        if state.current.as_deref() != Some(name) {
            return;
        }
        state.current = None;
        self.push(&state, format!("Failed {name}: {error}"));
    }

    fn update_progress(&self, message: &str, percent: Option<u8>) {
        let state = self.state.lock();
        let line = match percent {
            Some(p) => format!("{message} ({p}%)"),
            None => message.to_string(),
        };
        self.push(&state, line);
    }
}

/// Integer percentage of `completed` out of `total`, capped at 100.
fn percent_of(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (completed.min(total) * 100) / total;
    u8::try_from(percent).unwrap_or(100)
}
