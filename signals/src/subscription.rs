use std::sync::Weak;

use crate::hub::HubInner;
use crate::signal::SignalId;

/// Identifies one subscription among all subscriptions of a hub. Never reused while the hub lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionToken(u64);

impl SubscriptionToken {
    pub(crate) fn from_raw(raw: u64) -> Self { Self(raw) }

    pub fn raw(&self) -> u64 { self.0 }
}

impl std::fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "sub:{}", self.0) }
}

/// A subscription that unsubscribes itself when dropped.
/// Does not keep the hub alive.
pub struct SubscriptionGuard {
    hub: Weak<HubInner>,
    signal: SignalId,
    token: SubscriptionToken,
}

impl SubscriptionGuard {
    pub(crate) fn new(hub: Weak<HubInner>, signal: SignalId, token: SubscriptionToken) -> Self { Self { hub, signal, token } }

    pub fn token(&self) -> SubscriptionToken { self.token }

    pub fn signal(&self) -> SignalId { self.signal }

    /// Keeps the subscription alive past the guard, handing back its token for a later `unsubscribe`
    pub fn into_token(mut self) -> SubscriptionToken {
        self.hub = Weak::new();
        self.token
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.signal, self.token);
        }
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "SubscriptionGuard({}, {})", self.signal, self.token) }
}
