//! Change notifications.
//!
//! The session emits a [`Signal`] after every mutation. Delivery is
//! synchronous and best-effort: an observer that fails or panics is logged and
//! skipped, and the remaining observers still run.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use super::Mode;

/// Signals emitted after a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    EventAdded { index: u64 },
    EventEdited { index: u64 },
    EventDeleted { index: u64 },
    EventUndone { index: u64 },
    EventRedone { index: u64 },
    StatsUpdated,
    GameLoaded { game_id: String },
    ModeChanged { mode: Mode },
    /// Persistence failed; the in-memory game is still current
    StorageWarning { message: String },
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EventAdded { .. } => "event_added",
            Self::EventEdited { .. } => "event_edited",
            Self::EventDeleted { .. } => "event_deleted",
            Self::EventUndone { .. } => "event_undone",
            Self::EventRedone { .. } => "event_redone",
            Self::StatsUpdated => "stats_updated",
            Self::GameLoaded { .. } => "game_loaded",
            Self::ModeChanged { .. } => "mode_changed",
            Self::StorageWarning { .. } => "storage_warning",
        }
    }
}

/// Error returned by an observer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ObserverError(pub String);

/// Receives signals.
pub trait Observer {
    fn on_signal(&mut self, signal: &Signal) -> Result<(), ObserverError>;
}

impl<F> Observer for F
where
    F: FnMut(&Signal) -> Result<(), ObserverError>,
{
    fn on_signal(&mut self, signal: &Signal) -> Result<(), ObserverError> {
        self(signal)
    }
}

/// Handle for removing an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Fan-out of signals to registered observers.
#[derive(Default)]
pub struct Notifier {
    observers: Vec<(ObserverId, Box<dyn Observer>)>,
    next_id: u64,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer.
    pub fn subscribe(&mut self, observer: impl Observer + 'static) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Deliver a signal to every observer. Returns how many succeeded.
    pub fn emit(&mut self, signal: &Signal) -> usize {
        let mut delivered = 0;

        for (id, observer) in &mut self.observers {
            match panic::catch_unwind(AssertUnwindSafe(|| observer.on_signal(signal))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    tracing::warn!(observer = id.0, signal = signal.as_str(), error = %e, "Observer failed");
                }
                Err(_) => {
                    tracing::warn!(observer = id.0, signal = signal.as_str(), "Observer panicked");
                }
            }
        }

        delivered
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("observers", &self.observers.len())
            .finish()
    }
}
