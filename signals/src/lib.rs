/*!
A lazy notification hub for provider-backed signals

# Design requirements:
- Every signal has a cached current value that is always readable, whether or not anyone listens.
- A provider kind is registered with its provider only while at least one of its signals has a listener.
  The first listener activates it, the last one leaving deactivates it.
- One provider payload may feed several signals (a composite). Each derived signal is compared against
  its own cached value and only genuine changes are delivered.
- Handlers are never called on the thread that detected the change. Delivery runs on dispatcher workers,
  in order per signal.

# Nomenclature:
- provider kind - one underlying notification source, see [`ProviderKind`]
- binding - the hub's registration with one provider kind plus the caches it feeds, see [`ProviderBinding`]
- lease - a provider payload that must be handed back after decoding, see [`Lease`]

# Basic usage

`ManualProvider` needs the `test-helpers` feature.

```rust,ignore
use std::sync::Arc;
use powerhub_signals::*;

const LEVEL: SignalKey<u32> = SignalKey::new(1, "level");
const LEVEL_KIND: ProviderKind = ProviderKind::new("level");

let provider = Arc::new(ManualProvider::new(10u32));
let hub = NotificationHub::builder(HubConfig::default())
    .binding(BindingBuilder::new(LEVEL_KIND, provider.clone(), single(LEVEL, |raw: &u32| Ok(*raw))).signal(LEVEL, 0))
    .build()?;

// no listener: reads query the provider
assert_eq!(hub.read(LEVEL)?, 10);

let token = hub.subscribe(LEVEL, |level: u32| println!("level is now {level}"))?;
provider.push(11); // prints "level is now 11" from a dispatcher worker
provider.push(11); // no change, nothing delivered
hub.flush().await;

hub.unsubscribe(LEVEL, token); // last listener, the provider registration is dropped
```
*/

mod binding;
mod broadcast;
mod cache;
mod config;
mod decode;
mod dispatcher;
mod error;
mod hub;
mod provider;
mod signal;
mod subscription;

pub use binding::{BindingBuilder, ProviderBinding};
pub use broadcast::{Handler, IntoHandler, Listeners};
pub use cache::{ChangeGate, SignalCache};
pub use config::HubConfig;
pub use decode::{single, Decode, Fanout};
pub use dispatcher::{Dispatcher, Job};
pub use error::{DecodeError, HubError, ProviderError};
pub use hub::{HubBuilder, NotificationHub};
pub use provider::*;
pub use signal::{ProviderKind, SignalId, SignalKey, SignalValue};
pub use subscription::{SubscriptionGuard, SubscriptionToken};
