use bitflags::bitflags;
use powerhub_signals::{DecodeError, Fanout};

use crate::signals::{BATTERY_STATUS, POWER_SUPPLY_STATUS, REMAINING_CHARGE_PERCENT};
use crate::types::{BatteryStatus, PowerSupplyStatus};

/// Capacity reported by a battery that cannot measure it
pub const BATTERY_UNKNOWN_CAPACITY: u32 = u32::MAX;

bitflags! {
    /// Power state flags of the composite battery record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct PowerState: u32 {
        /// External power is connected
        const POWER_ON_LINE = 0x0000_0001;
        const DISCHARGING   = 0x0000_0002;
        const CHARGING      = 0x0000_0004;
        const CRITICAL      = 0x0000_0008;
    }
}

/// One record aggregating every battery in the system.
/// A single provider callback delivers it, and three signals are derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompositeBatteryStatus {
    pub active_battery_count: u32,
    pub power_state: PowerState,
    pub full_charged_capacity: u32,
    pub remaining_capacity: u32,
}

impl CompositeBatteryStatus {
    /// Remaining charge as a whole percent, rounded half up.
    ///
    /// `None` when either capacity is unknown or the full capacity is zero. A remaining capacity above
    /// the full one is a reporting anomaly and clamps to 100.
    pub fn charge_percent(&self) -> Option<u8> {
        let full = self.full_charged_capacity;
        let remaining = self.remaining_capacity;
        if full == BATTERY_UNKNOWN_CAPACITY || full == 0 || remaining == BATTERY_UNKNOWN_CAPACITY {
            return None;
        }
        if remaining > full {
            return Some(100);
        }
        let percent = (u64::from(remaining) * 200 / u64::from(full) + 1) / 2;
        u8::try_from(percent).ok()
    }

    pub fn battery_status(&self) -> BatteryStatus {
        if self.active_battery_count == 0 {
            BatteryStatus::NotPresent
        } else if self.power_state.contains(PowerState::DISCHARGING) {
            BatteryStatus::Discharging
        } else if self.power_state.contains(PowerState::CHARGING) {
            BatteryStatus::Charging
        } else {
            BatteryStatus::Idle
        }
    }

    pub fn power_supply_status(&self) -> PowerSupplyStatus {
        if !self.power_state.contains(PowerState::POWER_ON_LINE) {
            PowerSupplyStatus::NotPresent
        } else if self.power_state.contains(PowerState::DISCHARGING) {
            PowerSupplyStatus::Inadequate
        } else {
            PowerSupplyStatus::Adequate
        }
    }
}

/// Decoder for the composite battery provider kind
pub fn decode_composite(raw: &CompositeBatteryStatus, out: &mut Fanout) -> Result<(), DecodeError> {
    out.emit(REMAINING_CHARGE_PERCENT, raw.charge_percent());
    out.emit(BATTERY_STATUS, raw.battery_status());
    out.emit(POWER_SUPPLY_STATUS, raw.power_supply_status());
    Ok(())
}
