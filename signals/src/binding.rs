use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::broadcast::Listeners;
use crate::cache::ChangeGate;
use crate::decode::{Decode, Emitted, Fanout};
use crate::dispatcher::Dispatcher;
use crate::error::{DecodeError, HubError};
use crate::provider::{Lease, Provider, ProviderCallback, RegistrationHandle};
use crate::signal::{ProviderKind, SignalId, SignalKey, SignalValue};
use crate::subscription::SubscriptionToken;

/// One signal fed by a binding: its change gate and its listeners
pub(crate) struct Slot<T> {
    key: SignalKey<T>,
    gate: ChangeGate<T>,
    listeners: Listeners<T>,
}

impl<T: SignalValue> Slot<T> {
    fn new(key: SignalKey<T>, initial: T) -> Self { Self { key, gate: ChangeGate::new(initial), listeners: Listeners::new() } }

    pub(crate) fn get(&self) -> T { self.gate.get() }

    pub(crate) fn listeners(&self) -> &Listeners<T> { &self.listeners }
}

/// Type-erased view of a [`Slot`], so one binding can feed signals of different value types
pub(crate) trait SignalSlot: Send + Sync + 'static {
    fn id(&self) -> SignalId;
    fn name(&self) -> &'static str;
    fn type_name(&self) -> &'static str;
    fn accepts(&self, value: &(dyn Any + Send)) -> bool;
    /// Passes a decoded value through the change gate. With a dispatcher, a genuine change is
    /// posted to the current listeners; without one (seed, pull) it only updates the cache.
    fn apply(&self, value: Box<dyn Any + Send>, dispatcher: Option<&Dispatcher>) -> bool;
    fn listener_count(&self) -> usize;
    fn remove_listener(&self, token: SubscriptionToken) -> bool;
    /// Drops every handler, returning how many there were
    fn clear_listeners(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
}

impl<T: SignalValue> SignalSlot for Slot<T> {
    fn id(&self) -> SignalId { self.key.id() }

    fn name(&self) -> &'static str { self.key.name() }

    fn type_name(&self) -> &'static str { std::any::type_name::<T>() }

    fn accepts(&self, value: &(dyn Any + Send)) -> bool { value.is::<T>() }

    fn apply(&self, value: Box<dyn Any + Send>, dispatcher: Option<&Dispatcher>) -> bool {
        let Ok(value) = value.downcast::<T>() else {
            return false;
        };
        if !self.gate.admit((*value).clone()) {
            return false;
        }
        if let Some(dispatcher) = dispatcher {
            if !self.listeners.is_empty() {
                let listeners = self.listeners.clone();
                let signal = self.key.id();
                if dispatcher.catches_panics() {
                    dispatcher.post(signal, Box::new(move || {
                        listeners.send_isolated(signal, *value);
                    }));
                } else {
                    dispatcher.post(signal, Box::new(move || listeners.send(*value)));
                }
            }
        }
        true
    }

    fn listener_count(&self) -> usize { self.listeners.len() }

    fn remove_listener(&self, token: SubscriptionToken) -> bool { self.listeners.remove(token) }

    fn clear_listeners(&self) -> usize { self.listeners.clear() }

    fn as_any(&self) -> &dyn Any { self }
}

/// Describes a binding before the hub hands it a dispatcher
pub struct BindingBuilder<P: Provider + ?Sized> {
    kind: ProviderKind,
    provider: Arc<P>,
    decoder: Box<dyn Decode<P::Raw>>,
    slots: Vec<Arc<dyn SignalSlot>>,
}

impl<P: Provider + ?Sized> BindingBuilder<P> {
    pub fn new(kind: ProviderKind, provider: Arc<P>, decoder: impl Decode<P::Raw>) -> Self { Self { kind, provider, decoder: Box::new(decoder), slots: Vec::new() } }

    /// Declares a signal this provider kind feeds, with the value its cache starts from
    pub fn signal<T: SignalValue>(mut self, key: SignalKey<T>, initial: T) -> Self {
        self.slots.push(Arc::new(Slot::new(key, initial)));
        self
    }

    pub fn kind(&self) -> ProviderKind { self.kind }

    pub fn build(self, dispatcher: Dispatcher) -> ProviderBinding<P> {
        ProviderBinding(Arc::new(BindingInner {
            kind: self.kind,
            provider: self.provider,
            decoder: self.decoder,
            slots: self.slots,
            state: Mutex::new(BindingState { registration: None, listeners: 0 }),
            update: Mutex::new(()),
            epoch: AtomicU64::new(0),
            dispatcher,
        }))
    }
}

/// Owns the provider-side registration for one provider kind and the caches of every signal it feeds.
///
/// `Inactive --activate()--> Active --deactivate()--> Inactive`, both transitions idempotent.
/// The state lock covers the registration handle and the listener count; the update lock serializes
/// cache writers and is the only lock taken on the provider callback path.
///
/// Every transition bumps an epoch that the registered callback captured, so a push arriving from a
/// registration that is no longer current is dropped instead of applied.
pub struct ProviderBinding<P: Provider + ?Sized>(Arc<BindingInner<P>>);

impl<P: Provider + ?Sized> Clone for ProviderBinding<P> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

struct BindingInner<P: Provider + ?Sized> {
    kind: ProviderKind,
    provider: Arc<P>,
    decoder: Box<dyn Decode<P::Raw>>,
    slots: Vec<Arc<dyn SignalSlot>>,
    state: Mutex<BindingState>,
    update: Mutex<()>,
    epoch: AtomicU64,
    dispatcher: Dispatcher,
}

struct BindingState {
    registration: Option<RegistrationHandle>,
    listeners: usize,
}

impl<P: Provider + ?Sized> ProviderBinding<P> {
    pub fn kind(&self) -> ProviderKind { self.0.kind }

    pub fn is_active(&self) -> bool { self.0.state.lock().unwrap().registration.is_some() }

    /// Seeds the caches from a provider query, then registers the callback. No-op when already active.
    /// On failure the binding stays inactive.
    pub fn activate(&self) -> Result<(), HubError> {
        let mut state = self.0.state.lock().unwrap();
        self.0.activate_locked(&mut state)
    }

    /// Unregisters the callback. No-op when inactive; an unregister failure is logged and the handle dropped.
    pub fn deactivate(&self) {
        let mut state = self.0.state.lock().unwrap();
        self.0.deactivate_locked(&mut state);
    }

    /// Pulls the current payload into the caches without notifying. No-op while active, since
    /// pushes keep the caches current and a silent write would hide a change from listeners.
    pub fn refresh(&self) -> Result<(), HubError> {
        let state = self.0.state.lock().unwrap();
        if state.registration.is_some() {
            return Ok(());
        }
        self.0.pull()
    }

    /// Current cached value of a signal this binding feeds
    pub fn cached<T: SignalValue>(&self, key: SignalKey<T>) -> Result<T, HubError> {
        let slot = self.0.slot(key.id()).ok_or(HubError::UnknownSignal(key.id()))?;
        Ok(typed_slot::<T>(slot.as_ref())?.get())
    }
}

impl<P: Provider + ?Sized> BindingInner<P> {
    fn slot(&self, signal: SignalId) -> Option<&Arc<dyn SignalSlot>> { self.slots.iter().find(|slot| slot.id() == signal) }

    fn activate_locked(self: &Arc<Self>, state: &mut BindingState) -> Result<(), HubError> {
        if state.registration.is_some() {
            return Ok(());
        }

        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        // baseline first, so the first pushed change is measured against a real value
        self.pull()?;

        let weak = Arc::downgrade(self);
        let callback: ProviderCallback<P::Raw> = Arc::new(move |lease: Lease<P::Raw>| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.on_push(lease, epoch);
            // the last owner went away mid-push: never unregister from inside the provider's callback
            if let Some(inner) = Arc::into_inner(inner) {
                inner.retire();
            }
        });
        let handle = self.provider.register(callback).map_err(|source| HubError::ProviderRegisterFailed { kind: self.kind, source })?;
        debug!("ProviderBinding({}) activated with registration {}", self.kind, handle.raw());
        state.registration = Some(handle);
        Ok(())
    }

    fn deactivate_locked(&self, state: &mut BindingState) {
        if state.registration.is_some() {
            self.epoch.fetch_add(1, Ordering::AcqRel);
        }
        self.unregister(state.registration.take())
    }

    fn unregister(&self, registration: Option<RegistrationHandle>) {
        let Some(handle) = registration else {
            return;
        };
        let raw = handle.raw();
        match self.provider.unregister(handle) {
            Ok(()) => debug!("ProviderBinding({}) deactivated registration {}", self.kind, raw),
            Err(err) => warn!("ProviderBinding({}) failed to unregister {}, dropping it anyway: {}", self.kind, raw, err),
        }
    }

    fn pull(&self) -> Result<(), HubError> {
        let lease = self.provider.query().map_err(|source| HubError::ProviderQueryFailed { kind: self.kind, source })?;
        let values = self.decode(&lease).map_err(|source| HubError::DecodeFailed { kind: self.kind, source })?;
        drop(lease);
        let _writer = self.update.lock().unwrap();
        self.apply_locked(values, None);
        Ok(())
    }

    fn on_push(&self, lease: Lease<P::Raw>, epoch: u64) {
        let values = match self.decode(&lease) {
            Ok(values) => values,
            Err(err) => {
                warn!("ProviderBinding({}) dropping undecodable payload: {}", self.kind, err);
                return;
            }
        };
        drop(lease);

        let _writer = self.update.lock().unwrap();
        if self.epoch.load(Ordering::Acquire) != epoch {
            debug!("ProviderBinding({}) dropping push from a stale registration", self.kind);
            return;
        }
        self.apply_locked(values, Some(&self.dispatcher));
    }

    /// Drops this last reference on the blocking pool when a registration still needs unregistering
    fn retire(self) {
        if self.state.lock().unwrap().registration.is_none() {
            return;
        }
        let dispatcher = self.dispatcher.clone();
        dispatcher.spawn_blocking(move || drop(self));
    }

    /// Decodes and checks every emitted value against this binding's signals before anything is applied
    fn decode(&self, raw: &P::Raw) -> Result<Vec<Emitted>, DecodeError> {
        let mut out = Fanout::new();
        self.decoder.decode(raw, &mut out)?;
        let values = out.into_values();
        for emitted in &values {
            let slot = self.slot(emitted.signal).ok_or(DecodeError::ForeignSignal(emitted.signal))?;
            if !slot.accepts(&*emitted.value) {
                return Err(DecodeError::WrongType { signal: emitted.signal, expected: slot.type_name() });
            }
        }
        Ok(values)
    }

    /// Caller holds the update lock: single writer per binding, so the derived signals of one
    /// payload change together
    fn apply_locked(&self, values: Vec<Emitted>, dispatcher: Option<&Dispatcher>) {
        for Emitted { signal, value } in values {
            if let Some(slot) = self.slot(signal) {
                slot.apply(value, dispatcher);
            }
        }
    }
}

impl<P: Provider + ?Sized> Drop for BindingInner<P> {
    fn drop(&mut self) {
        let registration = self.state.get_mut().ok().and_then(|state| state.registration.take());
        self.unregister(registration);
    }
}

pub(crate) fn typed_slot<T: SignalValue>(slot: &dyn SignalSlot) -> Result<&Slot<T>, HubError> {
    slot.as_any().downcast_ref::<Slot<T>>().ok_or(HubError::SignalTypeMismatch { signal: slot.id(), expected: std::any::type_name::<T>() })
}

/// What the hub needs from a binding, independent of its provider type
pub(crate) trait ErasedBinding: Send + Sync {
    fn kind(&self) -> ProviderKind;
    fn slots(&self) -> &[Arc<dyn SignalSlot>];
    fn is_active(&self) -> bool;
    /// Pulls from the provider when no listener keeps the caches current by push
    fn refresh_if_inactive(&self) -> Result<(), HubError>;
    /// Runs `attach` and counts one more listener, activating first if needed.
    /// `attach` is not run when activation fails.
    fn retain(&self, attach: &mut dyn FnMut()) -> Result<(), HubError>;
    /// Runs `detach` and, if it removed a listener, deactivates after the last one.
    /// Returns what `detach` returned.
    fn release(&self, detach: &mut dyn FnMut() -> bool) -> bool;
    /// Drops every handler and deactivates, leaving the binding as if never subscribed
    fn shutdown(&self);
}

impl<P: Provider + ?Sized> ErasedBinding for ProviderBinding<P> {
    fn kind(&self) -> ProviderKind { self.0.kind }

    fn slots(&self) -> &[Arc<dyn SignalSlot>] { &self.0.slots }

    fn is_active(&self) -> bool { ProviderBinding::is_active(self) }

    fn refresh_if_inactive(&self) -> Result<(), HubError> { self.refresh() }

    fn retain(&self, attach: &mut dyn FnMut()) -> Result<(), HubError> {
        let mut state = self.0.state.lock().unwrap();
        self.0.activate_locked(&mut state)?;
        attach();
        state.listeners += 1;
        Ok(())
    }

    fn release(&self, detach: &mut dyn FnMut() -> bool) -> bool {
        let mut state = self.0.state.lock().unwrap();
        if !detach() {
            return false;
        }
        state.listeners = state.listeners.saturating_sub(1);
        if state.listeners == 0 {
            self.0.deactivate_locked(&mut state);
        }
        true
    }

    fn shutdown(&self) {
        let mut state = self.0.state.lock().unwrap();
        let dropped: usize = self.0.slots.iter().map(|slot| slot.clear_listeners()).sum();
        if dropped > 0 {
            debug!("ProviderBinding({}) shutting down with {} handlers", self.0.kind, dropped);
        }
        state.listeners = 0;
        self.0.deactivate_locked(&mut state);
    }
}
