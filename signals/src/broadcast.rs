use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};

use tracing::error;

use crate::signal::SignalId;
use crate::subscription::SubscriptionToken;

/// A handler that is called when a signal's value changes.
/// Supports both payload handlers (receive the new value) and notify-only handlers.
pub enum Handler<T> {
    /// Receives the value that produced the notification
    Payload(Arc<dyn Fn(T) + Send + Sync + 'static>),
    /// Only learns that the value changed; read the signal for the value
    NotifyOnly(Arc<dyn Fn() + Send + Sync + 'static>),
}

impl<T> Clone for Handler<T> {
    fn clone(&self) -> Self {
        match self {
            Handler::Payload(f) => Handler::Payload(f.clone()),
            Handler::NotifyOnly(f) => Handler::NotifyOnly(f.clone()),
        }
    }
}

impl<T> Handler<T> {
    fn call(&self, value: T) {
        match self {
            Handler::Payload(f) => f(value),
            Handler::NotifyOnly(f) => f(),
        }
    }
}

/// Trait for types that can be converted into change handlers.
pub trait IntoHandler<T> {
    fn into_handler(self) -> Handler<T>;
}

/// The handlers currently subscribed to one signal, keyed by token
pub struct Listeners<T>(Arc<RwLock<BTreeMap<SubscriptionToken, Handler<T>>>>);

impl<T> Clone for Listeners<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> Default for Listeners<T> {
    fn default() -> Self { Self(Arc::new(RwLock::new(BTreeMap::new()))) }
}

impl<T> std::fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("Listeners").field("count", &self.len()).finish() }
}

impl<T> Listeners<T> {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&self, token: SubscriptionToken, handler: Handler<T>) { self.0.write().unwrap().insert(token, handler); }

    /// Returns false when the token is not (or no longer) subscribed here
    pub fn remove(&self, token: SubscriptionToken) -> bool { self.0.write().unwrap().remove(&token).is_some() }

    /// Removes every handler, returning how many there were
    pub fn clear(&self) -> usize { std::mem::take(&mut *self.0.write().unwrap()).len() }

    pub fn len(&self) -> usize { self.0.read().unwrap().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl<T: Clone> Listeners<T> {
    /// Calls every handler subscribed at the moment of the call
    pub fn send(&self, value: T) { self.each(value, |_, handler, value| handler.call(value)); }

    /// Like [`send`](Self::send), but a panicking handler is logged and the rest still run.
    /// Returns how many handlers panicked.
    pub fn send_isolated(&self, signal: SignalId, value: T) -> usize {
        let mut panicked = 0;
        self.each(value, |token, handler, value| {
            if std::panic::catch_unwind(AssertUnwindSafe(|| handler.call(value))).is_err() {
                error!("Change handler {} for signal {} panicked", token, signal);
                panicked += 1;
            }
        });
        panicked
    }

    fn each(&self, value: T, mut call: impl FnMut(SubscriptionToken, &Handler<T>, T)) {
        // Clone the handlers so none are called with the lock held
        let handlers = {
            let listeners = self.0.read().unwrap();
            listeners.iter().map(|(token, handler)| (*token, handler.clone())).collect::<Vec<_>>()
        };

        // clone the value for each handler except the last one
        if let Some(((last_token, last), rest)) = handlers.split_last() {
            for (token, handler) in rest {
                call(*token, handler, value.clone());
            }
            call(*last_token, last, value);
        }
    }
}

impl<F, T> IntoHandler<T> for F
where F: Fn(T) + Send + Sync + 'static
{
    fn into_handler(self) -> Handler<T> { Handler::Payload(Arc::new(self)) }
}

impl<T> IntoHandler<T> for Handler<T> {
    fn into_handler(self) -> Handler<T> { self }
}

impl<T> IntoHandler<T> for Arc<dyn Fn(T) + Send + Sync + 'static> {
    fn into_handler(self) -> Handler<T> { Handler::Payload(self) }
}

// Unit handlers work with any value type
impl<T> IntoHandler<T> for Arc<dyn Fn() + Send + Sync + 'static> {
    fn into_handler(self) -> Handler<T> { Handler::NotifyOnly(self) }
}

impl<T> IntoHandler<T> for tokio::sync::mpsc::UnboundedSender<T>
where T: Send + Sync + 'static
{
    fn into_handler(self) -> Handler<T> {
        Handler::Payload(Arc::new(move |value| {
            let _ = self.send(value); // receiver may be gone
        }))
    }
}

impl<T> IntoHandler<T> for std::sync::mpsc::Sender<T>
where T: Send + Sync + 'static
{
    fn into_handler(self) -> Handler<T> {
        Handler::Payload(Arc::new(move |value| {
            let _ = self.send(value); // receiver may be gone
        }))
    }
}
