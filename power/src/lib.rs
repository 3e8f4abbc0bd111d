/*!
Power management signals served through a lazy notification hub

Battery charge and state, power supply adequacy, power source, display state, user presence,
away mode, energy saver, system idle and power scheme are each exposed as a cached signal
with a typed getter and change subscriptions on [`PowerManager`]. A provider kind is only
registered with its provider while at least one of its signals has a subscriber.

```rust,ignore
use std::sync::Arc;
use powerhub::*;

let manager = PowerManager::new(PowerProviders::new().with_composite_battery(battery), HubConfig::default())?;
let token = manager.remaining_charge_percent_changed(|percent: Option<u8>| println!("{}", legacy_charge_percent(percent)))?;
// ...
manager.remove_remaining_charge_percent_changed(token);
```
*/

mod battery;
mod manager;
pub mod signals;
mod types;

pub use battery::*;
pub use manager::*;
pub use types::*;

pub use powerhub_signals::{HubConfig, HubError, IntoHandler, NotificationHub, Provider, ProviderError, SubscriptionToken};

/// Charge percent reported to consumers that cannot represent an unknown charge
pub const UNKNOWN_BATTERY_PERCENT: u32 = 99999;

/// Maps an unknown charge to [`UNKNOWN_BATTERY_PERCENT`]
pub fn legacy_charge_percent(percent: Option<u8>) -> u32 { percent.map_or(UNKNOWN_BATTERY_PERCENT, u32::from) }
