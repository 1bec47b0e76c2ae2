//! # Event Listener Registry
//!
//! Provides the publish/subscribe mechanism used by the playback engine:
//! an explicit registry of listeners keyed by event tag.
//!
//! ## Overview
//!
//! Components own an [`EventRegistry`] for their event type. Callers
//! subscribe with a callback, optionally filtered to a single event tag,
//! and receive a [`ListenerId`] for later removal.
//!
//! Emission iterates over a *snapshot* of the listener set: the set is
//! copied before any callback runs, so a listener may unsubscribe itself
//! (or others) during emission without invalidating the iteration. A
//! panicking listener is caught and reported through the registry's
//! [`LogHandle`]; it never prevents the remaining listeners from running
//! and never unwinds into the emitting component.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{Event, EventRegistry};
//!
//! #[derive(Debug, Clone)]
//! enum Signal { Tick, Done }
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum SignalKind { Tick, Done }
//!
//! impl Event for Signal {
//!     type Tag = SignalKind;
//!     fn tag(&self) -> SignalKind {
//!         match self {
//!             Signal::Tick => SignalKind::Tick,
//!             Signal::Done => SignalKind::Done,
//!         }
//!     }
//! }
//!
//! let registry: EventRegistry<Signal> = EventRegistry::default();
//! let id = registry.on(SignalKind::Tick, |_event| { /* react */ });
//! registry.emit(&Signal::Tick);
//! registry.off(id);
//! ```

use crate::logging::LogHandle;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An event type distributable through an [`EventRegistry`].
///
/// `Tag` is the discriminant used for listener filtering.
pub trait Event {
    type Tag: Copy + PartialEq + std::fmt::Debug;

    /// Tag of this event instance.
    fn tag(&self) -> Self::Tag;
}

/// Identifier of a registered listener, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Entry<E: Event> {
    id: ListenerId,
    filter: Option<E::Tag>,
    callback: Callback<E>,
}

impl<E: Event> Clone for Entry<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            filter: self.filter,
            callback: Arc::clone(&self.callback),
        }
    }
}

/// Listener registry keyed by event tag.
pub struct EventRegistry<E: Event> {
    entries: Mutex<Vec<Entry<E>>>,
    next_id: AtomicU64,
    log: LogHandle,
}

impl<E: Event> EventRegistry<E> {
    pub fn new(log: LogHandle) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            log,
        }
    }

    /// Register a listener for events with the given tag.
    pub fn on<F>(&self, tag: E::Tag, callback: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(Some(tag), Arc::new(callback))
    }

    /// Register a listener receiving every event.
    pub fn on_any<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(callback))
    }

    fn register(&self, filter: Option<E::Tag>, callback: Callback<E>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().push(Entry {
            id,
            filter,
            callback,
        });
        id
    }

    /// Remove a listener. Returns `false` when the id is unknown (e.g.
    /// already removed).
    pub fn off(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    /// Emit an event to every matching listener.
    ///
    /// Listeners run synchronously, over a snapshot taken before the first
    /// callback. A panicking listener is isolated and logged.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Entry<E>> = {
            let entries = self.entries.lock();
            entries
                .iter()
                .filter(|entry| entry.filter.is_none() || entry.filter == Some(event.tag()))
                .cloned()
                .collect()
        };

        for entry in snapshot {
            let callback = entry.callback;
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                self.log.warn(
                    "events",
                    format!(
                        "listener {:?} panicked while handling {:?} event; removed from flow",
                        entry.id,
                        event.tag()
                    ),
                );
            }
        }
    }

    /// Drop every listener.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.entries.lock().len()
    }
}

impl<E: Event> Default for EventRegistry<E> {
    fn default() -> Self {
        Self::new(LogHandle::default())
    }
}

impl<E: Event> std::fmt::Debug for EventRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}
