use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::binding::{typed_slot, BindingBuilder, ErasedBinding, SignalSlot};
use crate::broadcast::IntoHandler;
use crate::config::HubConfig;
use crate::dispatcher::Dispatcher;
use crate::error::HubError;
use crate::provider::Provider;
use crate::signal::{ProviderKind, SignalId, SignalKey, SignalValue};
use crate::subscription::{SubscriptionGuard, SubscriptionToken};

/// The process-wide hub: cached reads, subscriptions, and lazy provider registration for every signal.
///
/// Cheap to clone; all clones share one instance. When the last clone is dropped every active
/// binding is deactivated.
#[derive(Clone)]
pub struct NotificationHub(Arc<HubInner>);

pub(crate) struct HubInner {
    bindings: Vec<Arc<dyn ErasedBinding>>,
    routes: HashMap<SignalId, Route>,
    dispatcher: Dispatcher,
    next_token: AtomicU64,
}

struct Route {
    binding: Arc<dyn ErasedBinding>,
    slot: Arc<dyn SignalSlot>,
}

/// Assembles a [`NotificationHub`] from provider bindings
pub struct HubBuilder {
    config: HubConfig,
    bindings: Vec<Box<dyn PendingBinding>>,
}

trait PendingBinding {
    fn build(self: Box<Self>, dispatcher: &Dispatcher) -> Arc<dyn ErasedBinding>;
}

impl<P: Provider + ?Sized> PendingBinding for BindingBuilder<P> {
    fn build(self: Box<Self>, dispatcher: &Dispatcher) -> Arc<dyn ErasedBinding> { Arc::new(BindingBuilder::build(*self, dispatcher.clone())) }
}

impl HubBuilder {
    pub fn new(config: HubConfig) -> Self { Self { config, bindings: Vec::new() } }

    pub fn binding<P: Provider + ?Sized>(mut self, binding: BindingBuilder<P>) -> Self {
        self.bindings.push(Box::new(binding));
        self
    }

    /// Starts the dispatcher and wires every declared signal to its binding.
    /// Nothing is registered with any provider until the first subscription.
    pub fn build(self) -> Result<NotificationHub, HubError> {
        let dispatcher = Dispatcher::new(&self.config)?;
        let mut routes = HashMap::new();
        let mut bindings = Vec::with_capacity(self.bindings.len());

        for pending in self.bindings {
            let binding = pending.build(&dispatcher);
            for slot in binding.slots() {
                let route = Route { binding: binding.clone(), slot: slot.clone() };
                if routes.insert(slot.id(), route).is_some() {
                    return Err(HubError::DuplicateSignal(slot.id()));
                }
            }
            bindings.push(binding);
        }

        debug!("NotificationHub built with {} provider kinds, {} signals, {} dispatcher workers", bindings.len(), routes.len(), dispatcher.workers());
        Ok(NotificationHub(Arc::new(HubInner { bindings, routes, dispatcher, next_token: AtomicU64::new(1) })))
    }
}

impl NotificationHub {
    pub fn builder(config: HubConfig) -> HubBuilder { HubBuilder::new(config) }

    /// Current value of a signal.
    ///
    /// While nothing listens to the signal's provider kind this pulls from the provider first, so the
    /// value is never older than the read. Otherwise the push-maintained cache is returned as is.
    pub fn read<T: SignalValue>(&self, key: SignalKey<T>) -> Result<T, HubError> {
        let route = self.0.route(key.id())?;
        let slot = typed_slot::<T>(route.slot.as_ref())?;
        route.binding.refresh_if_inactive()?;
        Ok(slot.get())
    }

    /// Registers a change handler. The first listener of a provider kind activates its binding;
    /// if activation fails the error is returned and no subscription exists.
    pub fn subscribe<T, H>(&self, key: SignalKey<T>, handler: H) -> Result<SubscriptionToken, HubError>
    where
        T: SignalValue,
        H: IntoHandler<T>,
    {
        let route = self.0.route(key.id())?;
        let slot = typed_slot::<T>(route.slot.as_ref())?;
        let token = SubscriptionToken::from_raw(self.0.next_token.fetch_add(1, Ordering::Relaxed));

        let mut handler = Some(handler.into_handler());
        route.binding.retain(&mut || {
            if let Some(handler) = handler.take() {
                slot.listeners().insert(token, handler);
            }
        })?;
        debug!("Subscribed {} to {}", token, key);
        Ok(token)
    }

    /// Removes a handler. The last listener of a provider kind deactivates its binding.
    /// Unknown or already removed tokens are ignored.
    pub fn unsubscribe<T: SignalValue>(&self, key: SignalKey<T>, token: SubscriptionToken) { self.0.unsubscribe(key.id(), token) }

    /// Like [`subscribe`](Self::subscribe), but the subscription ends when the guard is dropped
    pub fn subscribe_guarded<T, H>(&self, key: SignalKey<T>, handler: H) -> Result<SubscriptionGuard, HubError>
    where
        T: SignalValue,
        H: IntoHandler<T>,
    {
        let token = self.subscribe(key, handler)?;
        Ok(SubscriptionGuard::new(Arc::downgrade(&self.0), key.id(), token))
    }

    pub fn listener_count<T>(&self, key: SignalKey<T>) -> usize { self.0.routes.get(&key.id()).map_or(0, |route| route.slot.listener_count()) }

    /// Whether the provider kind feeding this signal is currently registered
    pub fn is_active<T>(&self, key: SignalKey<T>) -> bool { self.0.routes.get(&key.id()).is_some_and(|route| route.binding.is_active()) }

    /// Every declared signal with its name and provider kind
    pub fn signals(&self) -> Vec<(SignalId, &'static str, ProviderKind)> {
        let mut signals: Vec<_> = self.0.routes.iter().map(|(id, route)| (*id, route.slot.name(), route.binding.kind())).collect();
        signals.sort_by_key(|(id, _, _)| *id);
        signals
    }

    /// Resolves once every notification detected before the call has been delivered
    pub async fn flush(&self) { self.0.dispatcher.flush().await }

    /// Drops every handler and deactivates every binding. Tokens issued before are stale from here
    /// on; later subscriptions start over and activate lazily again.
    pub fn shutdown(&self) { self.0.shutdown() }
}

impl HubInner {
    fn route(&self, signal: SignalId) -> Result<&Route, HubError> { self.routes.get(&signal).ok_or(HubError::UnknownSignal(signal)) }

    pub(crate) fn unsubscribe(&self, signal: SignalId, token: SubscriptionToken) {
        let Some(route) = self.routes.get(&signal) else {
            debug!("Unsubscribe {} from unknown signal {}", token, signal);
            return;
        };
        if route.binding.release(&mut || route.slot.remove_listener(token)) {
            debug!("Unsubscribed {} from {}", token, signal);
        } else {
            debug!("Unsubscribe with unknown token {} for {}, ignoring", token, signal);
        }
    }

    fn shutdown(&self) {
        for binding in &self.bindings {
            binding.shutdown();
        }
    }
}

impl Drop for HubInner {
    fn drop(&mut self) {
        debug!("NotificationHub torn down");
        self.shutdown();
    }
}

impl std::fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationHub").field("bindings", &self.0.bindings.len()).field("signals", &self.0.routes.len()).field("dispatcher", &self.0.dispatcher).finish()
    }
}
