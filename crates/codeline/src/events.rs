//! Change notifications: an event hub for line-level events and observable fields.
//!
//! Subscribing returns a [`Subscription`] token; dropping the token unsubscribes. Callbacks run
//! synchronously on the thread that raised the change, after internal locks are released.

use crate::guarded::GuardedCell;
use std::sync::{Arc, Weak};

/// Line-level notifications raised by the editor and the highlight refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// Content was replaced by a load.
    ContentLoaded {
        /// New line count.
        line_count: usize,
    },
    /// The text of a line changed.
    LineChanged {
        /// 1-based line number.
        line: usize,
    },
    /// Lines were inserted after `after`.
    LinesInserted {
        /// Line the new lines follow.
        after: usize,
        /// Number of lines inserted.
        count: usize,
    },
    /// Lines following `after` were removed.
    LinesRemoved {
        /// Line the removed lines followed.
        after: usize,
        /// Number of lines removed.
        count: usize,
    },
    /// A line received new style pieces and should be repainted.
    LineFormatRequested {
        /// 1-based line number.
        line: usize,
    },
    /// A highlight refresh ran to completion.
    RefreshCompleted {
        /// Version the refresh captured.
        version: u64,
    },
}

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    subscribers: Vec<(u64, Callback<T>)>,
}

/// Subscriber list for values of type `T`.
pub struct Subscribers<T> {
    registry: Arc<GuardedCell<Registry<T>>>,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            registry: Arc::new(GuardedCell::new(Registry {
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }
}

impl<T: 'static> Subscribers<T> {
    /// Create an empty subscriber list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback`; it stays registered until the returned token is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.registry.with(|registry| {
            let id = registry.next_id;
            registry.next_id += 1;
            registry.subscribers.push((id, Arc::new(callback)));
            id
        });

        let registry: Weak<GuardedCell<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.lock().subscribers.retain(|(sid, _)| *sid != id);
                }
            })),
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.registry.lock().subscribers.len()
    }

    /// Returns `true` if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `value` to every subscriber.
    pub fn notify(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = self
            .registry
            .lock()
            .subscribers
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(value);
        }
    }
}

/// Token owning one subscription; dropping it unsubscribes.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Unsubscribe now (same as dropping the token).
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

/// A value whose changes are pushed to subscribers.
pub struct Observable<T> {
    value: GuardedCell<T>,
    subscribers: Subscribers<T>,
}

impl<T: Clone + PartialEq + Send + 'static> Observable<T> {
    /// Wrap an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: GuardedCell::new(value),
            subscribers: Subscribers::new(),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Store `value`; subscribers hear about it only if it differs from the previous value.
    pub fn set(&self, value: T) -> bool {
        let changed = self.value.with(|current| {
            if *current == value {
                false
            } else {
                *current = value.clone();
                true
            }
        });
        if changed {
            self.subscribers.notify(&value);
        }
        changed
    }

    /// Be told about every change.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback)
    }
}

impl<T: Clone + std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.value.get())
            .finish()
    }
}

/// Event hub type used by the editor.
pub type EventHub = Subscribers<EditorEvent>;
