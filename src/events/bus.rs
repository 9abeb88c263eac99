//! # Per-controller event bus.
//!
//! [`EventBus`] is a small handler registry with ordered synchronous
//! dispatch. Each controller owns one; buses are never shared between
//! controllers, so a slow or broken handler on one controller cannot stall
//! the other.
//!
//! ## Architecture
//! ```text
//! Controller ── emit(&event) ──► EventBus
//!                                   │ snapshot handlers for event.kind()
//!                                   ▼
//!                         handler 1 → handler 2 → handler 3   (registration order)
//!                                   │
//!                            panic? caught + logged, next handler still runs
//! ```
//!
//! ## Rules
//! - `on` appends; registering the same handler twice runs it twice.
//! - `off` removes the **first** registration of the given handler
//!   (`Arc` pointer equality), not all of them.
//! - Dispatch walks a snapshot taken at `emit` time: a handler registered
//!   during dispatch does not receive the in-flight event, and handlers may
//!   call `on`/`off` freely from inside a callback.
//! - Emitting a kind nobody subscribed to is a no-op.

use std::collections::HashMap;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};

/// Event types dispatchable through an [`EventBus`].
///
/// `Kind` is the subscription key: a small closed enum naming the event,
/// carrying no payload.
pub trait BusEvent: Clone + Send + 'static {
    /// Subscription key for this event family.
    type Kind: Copy + Eq + Hash + std::fmt::Debug + Send;

    /// The key the event dispatches under.
    fn kind(&self) -> Self::Kind;
}

/// A registered callback. Hosts keep the `Arc` around if they intend to
/// unsubscribe later; removal matches by pointer identity.
pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Ordered synchronous pub/sub for one controller.
pub struct EventBus<E: BusEvent> {
    handlers: Mutex<HashMap<E::Kind, Vec<Handler<E>>>>,
}

impl<E: BusEvent> EventBus<E> {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Appends `handler` to the subscriber list for `kind`.
    ///
    /// Duplicates are allowed and are invoked once per registration.
    pub fn on(&self, kind: E::Kind, handler: Handler<E>) {
        self.lock().entry(kind).or_default().push(handler);
    }

    /// Wraps `f` in a [`Handler`], registers it, and returns it so the
    /// caller can [`off`](Self::off) it later.
    pub fn on_fn<F>(&self, kind: E::Kind, f: F) -> Handler<E>
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let handler: Handler<E> = Arc::new(f);
        self.on(kind, handler.clone());
        handler
    }

    /// Removes the first registration of `handler` under `kind`.
    ///
    /// Returns `true` if a registration was removed. Unknown handlers and
    /// kinds are ignored.
    pub fn off(&self, kind: E::Kind, handler: &Handler<E>) -> bool {
        let mut map = self.lock();
        if let Some(list) = map.get_mut(&kind) {
            if let Some(pos) = list.iter().position(|h| Arc::ptr_eq(h, handler)) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Dispatches `event` to every handler subscribed to its kind, in
    /// registration order.
    ///
    /// Dispatch is synchronous: `emit` returns after the last handler. A
    /// panicking handler is caught and logged; the remaining handlers still
    /// run and the panic never reaches the emitting controller.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Handler<E>> = {
            let map = self.lock();
            match map.get(&event.kind()) {
                Some(list) if !list.is_empty() => list.clone(),
                _ => return,
            }
        };

        for handler in snapshot {
            if std::panic::catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                tracing::error!(kind = ?event.kind(), "event handler panicked; continuing dispatch");
            }
        }
    }

    /// Number of handlers currently subscribed to `kind`.
    pub fn subscriber_count(&self, kind: E::Kind) -> usize {
        self.lock().get(&kind).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<E::Kind, Vec<Handler<E>>>> {
        // Handlers run outside the lock, so a poisoned mutex can only mean a
        // panic between plain map operations; the map is still consistent.
        self.handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let map = self.lock();
        let total: usize = map.values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("kinds", &map.len())
            .field("handlers", &total)
            .finish()
    }
}
