//! A mutex-guarded cell used for every piece of state shared with the refresh context.

use parking_lot::{Mutex, MutexGuard};

/// A value behind a mutex, accessed through short-lived guards.
#[derive(Debug, Default)]
pub struct GuardedCell<T> {
    inner: Mutex<T>,
}

impl<T> GuardedCell<T> {
    /// Wrap a value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Acquire the guard. Keep it short: never hold it across a call back into the engine.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock()
    }

    /// Run `f` with exclusive access and release the lock before returning.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Consume the cell.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Clone> GuardedCell<T> {
    /// Clone the current value out.
    pub fn get(&self) -> T {
        self.inner.lock().clone()
    }
}
