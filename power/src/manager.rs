use std::sync::Arc;
use std::time::Duration;

use powerhub_signals::{single, BindingBuilder, DecodeError, HubConfig, HubError, IntoHandler, NotificationHub, Provider, ProviderKind, SignalKey, SignalValue, SubscriptionToken};
use tracing::{debug, info};
use uuid::Uuid;

use crate::battery::{decode_composite, CompositeBatteryStatus};
use crate::signals::*;
use crate::types::*;

/// A provider shared with the hub, erased to its payload type
pub type SharedProvider<R> = Arc<dyn Provider<Raw = R>>;

/// The providers backing a [`PowerManager`], one per provider kind.
/// A kind left out has no binding, and its signals report [`HubError::UnknownSignal`].
#[derive(Default, Clone)]
pub struct PowerProviders {
    pub energy_saver: Option<SharedProvider<u32>>,
    pub composite_battery: Option<SharedProvider<CompositeBatteryStatus>>,
    /// Remaining discharge time in seconds
    pub discharge_time: Option<SharedProvider<u64>>,
    pub power_source: Option<SharedProvider<u32>>,
    pub display: Option<SharedProvider<u32>>,
    pub system_idle: Option<SharedProvider<u64>>,
    pub power_scheme: Option<SharedProvider<Uuid>>,
    pub user_presence: Option<SharedProvider<u32>>,
    pub system_away_mode: Option<SharedProvider<u32>>,
}

impl PowerProviders {
    pub fn new() -> Self { Self::default() }

    pub fn with_energy_saver<P: Provider<Raw = u32>>(mut self, provider: Arc<P>) -> Self {
        self.energy_saver = Some(provider);
        self
    }

    pub fn with_composite_battery<P: Provider<Raw = CompositeBatteryStatus>>(mut self, provider: Arc<P>) -> Self {
        self.composite_battery = Some(provider);
        self
    }

    pub fn with_discharge_time<P: Provider<Raw = u64>>(mut self, provider: Arc<P>) -> Self {
        self.discharge_time = Some(provider);
        self
    }

    pub fn with_power_source<P: Provider<Raw = u32>>(mut self, provider: Arc<P>) -> Self {
        self.power_source = Some(provider);
        self
    }

    pub fn with_display<P: Provider<Raw = u32>>(mut self, provider: Arc<P>) -> Self {
        self.display = Some(provider);
        self
    }

    pub fn with_system_idle<P: Provider<Raw = u64>>(mut self, provider: Arc<P>) -> Self {
        self.system_idle = Some(provider);
        self
    }

    pub fn with_power_scheme<P: Provider<Raw = Uuid>>(mut self, provider: Arc<P>) -> Self {
        self.power_scheme = Some(provider);
        self
    }

    pub fn with_user_presence<P: Provider<Raw = u32>>(mut self, provider: Arc<P>) -> Self {
        self.user_presence = Some(provider);
        self
    }

    pub fn with_system_away_mode<P: Provider<Raw = u32>>(mut self, provider: Arc<P>) -> Self {
        self.system_away_mode = Some(provider);
        self
    }
}

impl std::fmt::Debug for PowerProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerProviders")
            .field("energy_saver", &self.energy_saver.is_some())
            .field("composite_battery", &self.composite_battery.is_some())
            .field("discharge_time", &self.discharge_time.is_some())
            .field("power_source", &self.power_source.is_some())
            .field("display", &self.display.is_some())
            .field("system_idle", &self.system_idle.is_some())
            .field("power_scheme", &self.power_scheme.is_some())
            .field("user_presence", &self.user_presence.is_some())
            .field("system_away_mode", &self.system_away_mode.is_some())
            .finish()
    }
}

/// Binding for a 1:1 provider kind whose payload is a `u32` code
fn coded<T>(kind: ProviderKind, key: SignalKey<T>, provider: SharedProvider<u32>, initial: T) -> BindingBuilder<dyn Provider<Raw = u32>>
where T: SignalValue + TryFrom<u32, Error = DecodeError> {
    BindingBuilder::new(kind, provider, single(key, |raw: &u32| T::try_from(*raw))).signal(key, initial)
}

macro_rules! power_signal {
    ($(#[$doc:meta])* $key:ident: $ty:ty => $get:ident, $changed:ident, $remove:ident) => {
        $(#[$doc])*
        pub fn $get(&self) -> Result<$ty, HubError> { self.hub.read($key) }

        pub fn $changed<H: IntoHandler<$ty>>(&self, handler: H) -> Result<SubscriptionToken, HubError> { self.hub.subscribe($key, handler) }

        pub fn $remove(&self, token: SubscriptionToken) { self.hub.unsubscribe($key, token) }
    };
}

/// Power management signals for one process.
///
/// Every signal offers a getter, a `*_changed` subscription and a `remove_*_changed` to end it.
/// Providers are only registered while one of their signals has a subscriber.
#[derive(Clone, Debug)]
pub struct PowerManager {
    hub: NotificationHub,
}

impl PowerManager {
    pub fn new(providers: PowerProviders, config: HubConfig) -> Result<Self, HubError> {
        let mut builder = NotificationHub::builder(config);
        let mut kinds = 0;

        macro_rules! bind {
            ($provider:expr, $kind:expr, |$p:ident| $binding:expr) => {
                match $provider {
                    Some($p) => {
                        builder = builder.binding($binding);
                        kinds += 1;
                    }
                    None => debug!("PowerManager: no provider for {}", $kind),
                }
            };
        }

        bind!(providers.energy_saver, ENERGY_SAVER, |p| coded(ENERGY_SAVER, ENERGY_SAVER_STATUS, p, EnergySaverStatus::Disabled));
        bind!(providers.composite_battery, COMPOSITE_BATTERY, |p| BindingBuilder::new(COMPOSITE_BATTERY, p, decode_composite)
            .signal(REMAINING_CHARGE_PERCENT, None)
            .signal(BATTERY_STATUS, BatteryStatus::NotPresent)
            .signal(POWER_SUPPLY_STATUS, PowerSupplyStatus::NotPresent));
        bind!(providers.discharge_time, DISCHARGE_TIME, |p| BindingBuilder::new(DISCHARGE_TIME, p, single(REMAINING_DISCHARGE_TIME, |secs: &u64| Ok(Duration::from_secs(*secs))))
            .signal(REMAINING_DISCHARGE_TIME, Duration::ZERO));
        bind!(providers.power_source, POWER_SOURCE, |p| coded(POWER_SOURCE, POWER_SOURCE_STATUS, p, PowerSourceStatus::Ac));
        bind!(providers.display, DISPLAY, |p| coded(DISPLAY, DISPLAY_STATUS, p, DisplayStatus::On));
        bind!(providers.system_idle, SYSTEM_IDLE_KIND, |p| BindingBuilder::new(SYSTEM_IDLE_KIND, p, single(SYSTEM_IDLE, |tick: &u64| Ok(*tick))).signal(SYSTEM_IDLE, 0));
        bind!(providers.power_scheme, POWER_SCHEME, |p| BindingBuilder::new(POWER_SCHEME, p, single(POWER_SCHEME_PERSONALITY, |scheme: &Uuid| PowerSchemePersonality::try_from(*scheme)))
            .signal(POWER_SCHEME_PERSONALITY, PowerSchemePersonality::Balanced));
        bind!(providers.user_presence, USER_PRESENCE, |p| coded(USER_PRESENCE, USER_PRESENCE_STATUS, p, UserPresenceStatus::Present));
        bind!(providers.system_away_mode, SYSTEM_AWAY_MODE, |p| coded(SYSTEM_AWAY_MODE, SYSTEM_AWAY_MODE_STATUS, p, SystemAwayModeStatus::Exiting));

        let hub = builder.build()?;
        info!("PowerManager started with {} of 9 provider kinds", kinds);
        Ok(Self { hub })
    }

    /// The hub serving this manager's signals, for callers that work with signal keys directly
    pub fn hub(&self) -> &NotificationHub { &self.hub }

    power_signal!(ENERGY_SAVER_STATUS: EnergySaverStatus => energy_saver_status, energy_saver_status_changed, remove_energy_saver_status_changed);
    power_signal!(
        /// `None` when the battery cannot report a charge, see [`legacy_charge_percent`](crate::legacy_charge_percent)
        REMAINING_CHARGE_PERCENT: Option<u8> => remaining_charge_percent, remaining_charge_percent_changed, remove_remaining_charge_percent_changed
    );
    power_signal!(BATTERY_STATUS: BatteryStatus => battery_status, battery_status_changed, remove_battery_status_changed);
    power_signal!(POWER_SUPPLY_STATUS: PowerSupplyStatus => power_supply_status, power_supply_status_changed, remove_power_supply_status_changed);
    power_signal!(REMAINING_DISCHARGE_TIME: Duration => remaining_discharge_time, remaining_discharge_time_changed, remove_remaining_discharge_time_changed);
    power_signal!(POWER_SOURCE_STATUS: PowerSourceStatus => power_source_status, power_source_status_changed, remove_power_source_status_changed);
    power_signal!(DISPLAY_STATUS: DisplayStatus => display_status, display_status_changed, remove_display_status_changed);
    power_signal!(
        /// Sequence number of the last idle notification
        SYSTEM_IDLE: u64 => system_idle, system_idle_changed, remove_system_idle_changed
    );
    power_signal!(POWER_SCHEME_PERSONALITY: PowerSchemePersonality => power_scheme_personality, power_scheme_personality_changed, remove_power_scheme_personality_changed);
    power_signal!(USER_PRESENCE_STATUS: UserPresenceStatus => user_presence_status, user_presence_status_changed, remove_user_presence_status_changed);
    power_signal!(SYSTEM_AWAY_MODE_STATUS: SystemAwayModeStatus => system_away_mode_status, system_away_mode_status_changed, remove_system_away_mode_status_changed);

    /// Resolves once every change detected before the call has reached its handlers
    pub async fn flush(&self) { self.hub.flush().await }

    /// Removes every handler and unregisters from every provider
    pub fn shutdown(&self) { self.hub.shutdown() }
}
