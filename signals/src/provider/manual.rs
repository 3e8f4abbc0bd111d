use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;

use super::{Lease, Provider, ProviderCallback, RegistrationHandle};
use crate::error::ProviderError;

/// An in-process provider whose value is set by hand.
///
/// Records every call, hands out leases whose release is counted, and can be told to fail its next
/// query, register or unregister. `push` invokes the registered callback on the calling thread.
pub struct ManualProvider<R> {
    state: Mutex<ManualState<R>>,
    queries: AtomicUsize,
    registers: AtomicUsize,
    unregisters: AtomicUsize,
    released: Arc<AtomicUsize>,
    next_handle: AtomicU64,
}

struct ManualState<R> {
    current: R,
    callback: Option<(u64, ProviderCallback<R>)>,
    fail_query: Option<String>,
    fail_register: Option<String>,
    fail_unregister: Option<String>,
    unregistered_on: Option<ThreadId>,
}

impl<R: Clone + Send + Sync + 'static> ManualProvider<R> {
    pub fn new(initial: R) -> Self {
        Self {
            state: Mutex::new(ManualState { current: initial, callback: None, fail_query: None, fail_register: None, fail_unregister: None, unregistered_on: None }),
            queries: AtomicUsize::new(0),
            registers: AtomicUsize::new(0),
            unregisters: AtomicUsize::new(0),
            released: Arc::new(AtomicUsize::new(0)),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Changes the value future queries report, without notifying
    pub fn set(&self, value: R) { self.state.lock().unwrap().current = value; }

    /// Changes the value and delivers it to the registered callback, if any
    pub fn push(&self, value: R) {
        let callback = {
            let mut state = self.state.lock().unwrap();
            state.current = value.clone();
            state.callback.as_ref().map(|(_, callback)| callback.clone())
        };
        // called without the lock, as a real provider thread would
        if let Some(callback) = callback {
            callback(self.lease(value));
        }
    }

    /// Delivers a payload to the registered callback without touching the queried value
    pub fn push_raw(&self, value: R) {
        let callback = self.state.lock().unwrap().callback.as_ref().map(|(_, callback)| callback.clone());
        if let Some(callback) = callback {
            callback(self.lease(value));
        }
    }

    pub fn fail_next_query(&self, message: &str) { self.state.lock().unwrap().fail_query = Some(message.to_string()); }

    pub fn fail_next_register(&self, message: &str) { self.state.lock().unwrap().fail_register = Some(message.to_string()); }

    pub fn fail_next_unregister(&self, message: &str) { self.state.lock().unwrap().fail_unregister = Some(message.to_string()); }

    pub fn query_count(&self) -> usize { self.queries.load(Ordering::SeqCst) }

    pub fn register_count(&self) -> usize { self.registers.load(Ordering::SeqCst) }

    pub fn unregister_count(&self) -> usize { self.unregisters.load(Ordering::SeqCst) }

    /// Number of leases handed out and since returned
    pub fn released_count(&self) -> usize { self.released.load(Ordering::SeqCst) }

    pub fn is_registered(&self) -> bool { self.state.lock().unwrap().callback.is_some() }

    /// Thread that made the most recent unregister call
    pub fn last_unregister_thread(&self) -> Option<ThreadId> { self.state.lock().unwrap().unregistered_on }

    fn lease(&self, value: R) -> Lease<R> {
        let released = self.released.clone();
        Lease::with_release(value, move |_| {
            released.fetch_add(1, Ordering::SeqCst);
        })
    }
}

impl<R: Clone + Send + Sync + 'static> Provider for ManualProvider<R> {
    type Raw = R;

    fn query(&self) -> Result<Lease<R>, ProviderError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let value = {
            let mut state = self.state.lock().unwrap();
            if let Some(message) = state.fail_query.take() {
                return Err(ProviderError::msg(message));
            }
            state.current.clone()
        };
        Ok(self.lease(value))
    }

    fn register(&self, callback: ProviderCallback<R>) -> Result<RegistrationHandle, ProviderError> {
        self.registers.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state.fail_register.take() {
            return Err(ProviderError::msg(message));
        }
        if state.callback.is_some() {
            return Err(ProviderError::msg("a callback is already registered"));
        }
        let id = self.next_handle.fetch_add(1, Ordering::SeqCst);
        state.callback = Some((id, callback));
        Ok(RegistrationHandle::new(id))
    }

    fn unregister(&self, handle: RegistrationHandle) -> Result<(), ProviderError> {
        self.unregisters.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state.unregistered_on = Some(std::thread::current().id());
        // a failed unregister leaves the callback in place
        if let Some(message) = state.fail_unregister.take() {
            return Err(ProviderError::msg(message));
        }
        match &state.callback {
            Some((id, _)) if *id == handle.raw() => {
                state.callback = None;
                Ok(())
            }
            _ => Err(ProviderError::msg(format!("unknown registration handle {}", handle.raw()))),
        }
    }
}
