//! Cancellation token for cooperative cancellation.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Notify;
use tracing::warn;

/// A callback type for cancellation notifications. Receives the reason.
pub type CancelCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Identifies a registered callback so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

/// A token for cooperative cancellation.
///
/// Cancellation is idempotent - only the first cancellation reason is kept.
/// Tasks can poll [`is_cancelled`](Self::is_cancelled) or await
/// [`cancelled`](Self::cancelled).
#[derive(Default)]
pub struct CancellationToken {
    /// Whether cancellation has been requested.
    cancelled: AtomicBool,
    /// The reason for cancellation (first one wins).
    reason: RwLock<Option<String>>,
    /// Callbacks to invoke on cancellation, in registration order.
    callbacks: RwLock<Vec<(CallbackId, CancelCallback)>>,
    /// Source of callback ids.
    next_callback_id: AtomicU64,
    /// The parent this token is linked to, and the id of the forwarding callback.
    parent: Option<(Weak<CancellationToken>, CallbackId)>,
    /// Wakes tasks awaiting cancellation.
    notify: Notify,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that is cancelled whenever `parent` is.
    ///
    /// Cancelling the child leaves the parent untouched. Dropping the child
    /// removes its forwarding callback from the parent.
    #[must_use]
    pub fn child_of(parent: &Arc<Self>) -> Arc<Self> {
        let id = parent.allocate_id();
        let child = Arc::new(Self {
            cancelled: AtomicBool::new(false),
            reason: RwLock::new(None),
            callbacks: RwLock::new(Vec::new()),
            next_callback_id: AtomicU64::new(0),
            parent: Some((Arc::downgrade(parent), id)),
            notify: Notify::new(),
        });

        let weak: Weak<Self> = Arc::downgrade(&child);
        parent.register(
            id,
            Box::new(move |reason| {
                if let Some(child) = weak.upgrade() {
                    child.cancel(reason);
                }
            }),
        );
        child
    }

    /// Requests cancellation with a reason.
    ///
    /// This is idempotent - only the first reason is kept.
    /// Callbacks are invoked immediately, then released. Panics in callbacks
    /// are logged and suppressed.
    pub fn cancel(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let callbacks = {
            // Held across the flag flip so registration sees flag and reason together.
            let mut callbacks = self.callbacks.write();
            if self
                .cancelled
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return;
            }
            *self.reason.write() = Some(reason.clone());
            std::mem::take(&mut *callbacks)
        };
        self.notify.notify_waiters();

        for (_, callback) in &callbacks {
            invoke(callback.as_ref(), &reason);
        }
    }

    /// Registers a callback to be invoked on cancellation.
    ///
    /// If already cancelled, the callback is invoked immediately.
    pub fn on_cancel<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let id = self.allocate_id();
        self.register(id, Box::new(callback));
        id
    }

    /// Removes a callback registered with [`on_cancel`](Self::on_cancel).
    ///
    /// Returns false if it already ran or was never registered here.
    pub fn remove_callback(&self, id: CallbackId) -> bool {
        let mut callbacks = self.callbacks.write();
        match callbacks.iter().position(|(existing, _)| *existing == id) {
            Some(index) => {
                callbacks.remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns the number of callbacks waiting for cancellation.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.callbacks.read().len()
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Waits until cancellation is requested.
    pub async fn cancelled(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    fn allocate_id(&self) -> CallbackId {
        CallbackId(self.next_callback_id.fetch_add(1, Ordering::Relaxed))
    }

    fn register(&self, id: CallbackId, callback: CancelCallback) {
        let mut callbacks = self.callbacks.write();
        if self.is_cancelled() {
            drop(callbacks);
            let reason = self.reason().unwrap_or_default();
            invoke(callback.as_ref(), &reason);
        } else {
            callbacks.push((id, callback));
        }
    }
}

fn invoke(callback: &(dyn Fn(&str) + Send + Sync), reason: &str) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(reason))) {
        warn!("Cancellation callback panicked: {:?}", e);
    }
}

impl Drop for CancellationToken {
    fn drop(&mut self) {
        if let Some((parent, id)) = self.parent.take() {
            if let Some(parent) = parent.upgrade() {
                parent.remove_callback(id);
            }
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}
