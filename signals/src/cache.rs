use std::sync::RwLock;

use crate::signal::SignalValue;

/// Last known value of one signal.
///
/// Reads clone the value under a short read lock, so they never wait on a provider call.
/// Compare-and-replace happens under the write lock, so a reader sees either the old or the new value.
pub struct SignalCache<T>(RwLock<T>);

impl<T: SignalValue> SignalCache<T> {
    pub fn new(initial: T) -> Self { Self(RwLock::new(initial)) }

    pub fn get(&self) -> T { self.0.read().unwrap().clone() }

    /// Calls a closure with a borrow of the cached value
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.0.read().unwrap();
        f(&*guard)
    }

    /// Overwrites the cached value without reporting a change
    pub fn seed(&self, value: T) { *self.0.write().unwrap() = value; }

    /// Replaces the cached value if `value` differs from it. Returns whether it changed.
    pub fn set_if_changed(&self, value: T) -> bool {
        let mut current = self.0.write().unwrap();
        if *current == value {
            return false;
        }
        *current = value;
        true
    }
}

impl<T: SignalValue> std::fmt::Debug for SignalCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { self.with(|value| f.debug_tuple("SignalCache").field(value).finish()) }
}

/// Strict-inequality gate in front of a [`SignalCache`].
///
/// `admit` updates the cache and reports whether a notification is owed in one step.
/// Callers serialize `admit` per provider binding; the gate itself only guarantees per-value atomicity.
pub struct ChangeGate<T>(SignalCache<T>);

impl<T: SignalValue> ChangeGate<T> {
    pub fn new(initial: T) -> Self { Self(SignalCache::new(initial)) }

    pub fn admit(&self, value: T) -> bool { self.0.set_if_changed(value) }

    pub fn get(&self) -> T { self.0.get() }
}
