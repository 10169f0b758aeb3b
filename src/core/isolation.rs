//! Failure isolation boundary and error channel
//!
//! Every sink construction, write and flush runs through [`isolate`], which
//! turns both returned errors and panics into a [`LoggerError`]. Failures are
//! published on an [`ErrorChannel`] instead of reaching the caller.

use super::error::{LoggerError, Result, TransportErrorEvent};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::any::Any;
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Callback invoked for every published error event
pub type ErrorListener = Arc<dyn Fn(&TransportErrorEvent) + Send + Sync>;

thread_local! {
    static BOUNDARY_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Run `f` for transport `name`, containing panics.
pub fn isolate<T>(name: &str, operation: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    BOUNDARY_DEPTH.with(|depth| depth.set(depth.get() + 1));
    let outcome = catch_unwind(AssertUnwindSafe(f));
    BOUNDARY_DEPTH.with(|depth| depth.set(depth.get() - 1));

    match outcome {
        Ok(result) => result,
        Err(payload) => Err(LoggerError::panicked(name, operation, panic_message(&*payload))),
    }
}

/// True while the current thread runs inside [`isolate`]
///
/// Panics raised there are already contained and reported on the error
/// channel, so the exception hook skips them.
pub fn within_boundary() -> bool {
    BOUNDARY_DEPTH.with(|depth| depth.get() > 0)
}

/// Extract the text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Fan-out channel for transport failures
///
/// Listeners are called synchronously in registration order; receivers
/// created with [`ErrorChannel::subscribe`] get a copy of every event.
///
/// # Example
///
/// ```
/// use transport_logger::core::{ErrorChannel, LoggerError};
///
/// let channel = ErrorChannel::silent();
/// let events = channel.subscribe();
///
/// channel.report("bogus", &LoggerError::unknown_transport("bogus", "not found"));
/// assert_eq!(events.try_recv().unwrap().name, "bogus");
/// ```
pub struct ErrorChannel {
    listeners: RwLock<Vec<ErrorListener>>,
    subscribers: RwLock<Vec<Sender<TransportErrorEvent>>>,
    emitted: AtomicU64,
}

impl ErrorChannel {
    /// Channel with the default stderr listener attached
    pub fn new() -> Self {
        let channel = Self::silent();
        channel.on_error(Arc::new(stderr_listener));
        channel
    }

    /// Channel without any listener
    pub fn silent() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            subscribers: RwLock::new(Vec::new()),
            emitted: AtomicU64::new(0),
        }
    }

    pub fn on_error(&self, listener: ErrorListener) {
        self.listeners.write().push(listener);
    }

    /// Receive every subsequent event on a crossbeam channel
    pub fn subscribe(&self) -> Receiver<TransportErrorEvent> {
        let (sender, receiver) = unbounded();
        self.subscribers.write().push(sender);
        receiver
    }

    /// Publish a failure of transport `name`
    pub fn report(&self, name: &str, error: &LoggerError) {
        self.emit(TransportErrorEvent::new(name, error));
    }

    pub fn emit(&self, event: TransportErrorEvent) {
        self.emitted.fetch_add(1, Ordering::Relaxed);

        // Snapshot so a listener may register further listeners without deadlocking
        let listeners: Vec<ErrorListener> = self.listeners.read().clone();
        for listener in listeners {
            let notified = isolate(&event.name, "notify", || {
                listener(&event);
                Ok(())
            });
            if let Err(e) = notified {
                eprintln!("[LOGGER CRITICAL] Error listener panicked: {}", e);
            }
        }

        self.subscribers
            .write()
            .retain(|sender| sender.send(event.clone()).is_ok());
    }

    /// Number of events published so far
    pub fn emitted_count(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl Default for ErrorChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ErrorChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorChannel")
            .field("listeners", &self.listeners.read().len())
            .field("subscribers", &self.subscribers.read().len())
            .field("emitted", &self.emitted_count())
            .finish()
    }
}

fn stderr_listener(event: &TransportErrorEvent) {
    eprintln!(
        "[LOGGER ERROR] problem writing to log {}: {}",
        event.name, event.message
    );
}
