//! The power signal catalog: one key per logical signal and one kind per provider notification source.

use std::time::Duration;

use powerhub_signals::{ProviderKind, SignalKey};

use crate::types::*;

pub const ENERGY_SAVER_STATUS: SignalKey<EnergySaverStatus> = SignalKey::new(1, "energy_saver_status");
/// `None` when the battery cannot report a charge
pub const REMAINING_CHARGE_PERCENT: SignalKey<Option<u8>> = SignalKey::new(2, "remaining_charge_percent");
pub const BATTERY_STATUS: SignalKey<BatteryStatus> = SignalKey::new(3, "battery_status");
pub const POWER_SUPPLY_STATUS: SignalKey<PowerSupplyStatus> = SignalKey::new(4, "power_supply_status");
pub const REMAINING_DISCHARGE_TIME: SignalKey<Duration> = SignalKey::new(5, "remaining_discharge_time");
pub const POWER_SOURCE_STATUS: SignalKey<PowerSourceStatus> = SignalKey::new(6, "power_source_status");
pub const DISPLAY_STATUS: SignalKey<DisplayStatus> = SignalKey::new(7, "display_status");
/// Sequence number of the last idle notification. Every provider tick is a change.
pub const SYSTEM_IDLE: SignalKey<u64> = SignalKey::new(8, "system_idle");
pub const POWER_SCHEME_PERSONALITY: SignalKey<PowerSchemePersonality> = SignalKey::new(9, "power_scheme_personality");
pub const USER_PRESENCE_STATUS: SignalKey<UserPresenceStatus> = SignalKey::new(10, "user_presence_status");
pub const SYSTEM_AWAY_MODE_STATUS: SignalKey<SystemAwayModeStatus> = SignalKey::new(11, "system_away_mode_status");

pub const ENERGY_SAVER: ProviderKind = ProviderKind::new("energy_saver");
/// Feeds [`REMAINING_CHARGE_PERCENT`], [`BATTERY_STATUS`] and [`POWER_SUPPLY_STATUS`]
pub const COMPOSITE_BATTERY: ProviderKind = ProviderKind::new("composite_battery");
pub const DISCHARGE_TIME: ProviderKind = ProviderKind::new("discharge_time");
pub const POWER_SOURCE: ProviderKind = ProviderKind::new("power_source");
pub const DISPLAY: ProviderKind = ProviderKind::new("display_status");
pub const SYSTEM_IDLE_KIND: ProviderKind = ProviderKind::new("system_idle");
pub const POWER_SCHEME: ProviderKind = ProviderKind::new("power_scheme_personality");
pub const USER_PRESENCE: ProviderKind = ProviderKind::new("user_presence");
pub const SYSTEM_AWAY_MODE: ProviderKind = ProviderKind::new("system_away_mode");
