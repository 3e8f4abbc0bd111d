mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{battery, watcher};
use powerhub::*;
use powerhub_signals::ManualProvider;

fn battery_manager(initial: CompositeBatteryStatus) -> Result<(PowerManager, Arc<ManualProvider<CompositeBatteryStatus>>)> {
    let provider = Arc::new(ManualProvider::new(initial));
    let manager = PowerManager::new(PowerProviders::new().with_composite_battery(provider.clone()), HubConfig::default())?;
    Ok((manager, provider))
}

#[tokio::test]
async fn discharging_battery_sequence() -> Result<()> {
    let (manager, provider) = battery_manager(battery(100, 40, PowerState::DISCHARGING))?;

    let (percent_watcher, percents) = watcher::<Option<u8>>();
    let (status_watcher, statuses) = watcher::<BatteryStatus>();
    let (supply_watcher, supplies) = watcher::<PowerSupplyStatus>();
    manager.remaining_charge_percent_changed(percent_watcher)?;
    manager.battery_status_changed(status_watcher)?;
    manager.power_supply_status_changed(supply_watcher)?;

    // the seed is a baseline, not a change
    manager.flush().await;
    assert!(percents().is_empty());
    assert_eq!(manager.battery_status()?, BatteryStatus::Discharging);

    provider.push(battery(100, 50, PowerState::DISCHARGING));
    manager.flush().await;
    assert_eq!(percents(), vec![Some(50)]);
    assert_eq!(manager.remaining_charge_percent()?, Some(50));
    assert_eq!(manager.power_supply_status()?, PowerSupplyStatus::NotPresent);

    // unchanged record, nothing fires
    provider.push(battery(100, 50, PowerState::DISCHARGING));
    manager.flush().await;
    assert!(percents().is_empty());

    provider.push(battery(100, 80, PowerState::DISCHARGING));
    manager.flush().await;
    assert_eq!(percents(), vec![Some(80)]);
    assert!(statuses().is_empty());
    assert!(supplies().is_empty());
    Ok(())
}

#[tokio::test]
async fn discharging_on_external_power_is_inadequate() -> Result<()> {
    let (manager, provider) = battery_manager(battery(100, 50, PowerState::DISCHARGING))?;
    let (supply_watcher, supplies) = watcher::<PowerSupplyStatus>();
    manager.power_supply_status_changed(supply_watcher)?;

    provider.push(battery(100, 50, PowerState::DISCHARGING | PowerState::POWER_ON_LINE));
    provider.push(battery(100, 50, PowerState::CHARGING | PowerState::POWER_ON_LINE));
    manager.flush().await;

    assert_eq!(supplies(), vec![PowerSupplyStatus::Inadequate, PowerSupplyStatus::Adequate]);
    Ok(())
}

#[tokio::test]
async fn single_field_change_fires_only_that_field() -> Result<()> {
    let (manager, provider) = battery_manager(battery(100, 60, PowerState::POWER_ON_LINE | PowerState::CHARGING))?;
    let (percent_watcher, percents) = watcher::<Option<u8>>();
    let (status_watcher, statuses) = watcher::<BatteryStatus>();
    let (supply_watcher, supplies) = watcher::<PowerSupplyStatus>();
    manager.remaining_charge_percent_changed(percent_watcher)?;
    manager.battery_status_changed(status_watcher)?;
    manager.power_supply_status_changed(supply_watcher)?;

    // charging finished: only the coarse state moves
    provider.push(battery(100, 60, PowerState::POWER_ON_LINE));
    manager.flush().await;
    assert!(percents().is_empty());
    assert_eq!(statuses(), vec![BatteryStatus::Idle]);
    assert!(supplies().is_empty());

    // unplugged: state and supply move together, the charge does not
    provider.push(battery(100, 60, PowerState::DISCHARGING));
    manager.flush().await;
    assert!(percents().is_empty());
    assert_eq!(statuses(), vec![BatteryStatus::Discharging]);
    assert_eq!(supplies(), vec![PowerSupplyStatus::NotPresent]);
    Ok(())
}

#[tokio::test]
async fn unknown_capacity_reads_as_unknown() -> Result<()> {
    let (manager, provider) = battery_manager(battery(BATTERY_UNKNOWN_CAPACITY, 10, PowerState::DISCHARGING))?;

    assert_eq!(manager.remaining_charge_percent()?, None);
    assert_eq!(legacy_charge_percent(manager.remaining_charge_percent()?), UNKNOWN_BATTERY_PERCENT);

    provider.set(battery(0, 0, PowerState::empty()));
    assert_eq!(manager.remaining_charge_percent()?, None);

    provider.set(battery(100, 150, PowerState::empty()));
    assert_eq!(manager.remaining_charge_percent()?, Some(100));
    Ok(())
}

#[tokio::test]
async fn sibling_subscriber_keeps_battery_registered() -> Result<()> {
    let (manager, provider) = battery_manager(battery(100, 50, PowerState::DISCHARGING))?;
    let (percent_watcher, _) = watcher::<Option<u8>>();
    let (status_watcher, statuses) = watcher::<BatteryStatus>();

    let percent = manager.remaining_charge_percent_changed(percent_watcher)?;
    let _status = manager.battery_status_changed(status_watcher)?;
    manager.remove_remaining_charge_percent_changed(percent);

    assert!(provider.is_registered());
    assert_eq!(provider.unregister_count(), 0);

    // still push-fed: reads of the unsubscribed sibling are cache-only
    let queries = provider.query_count();
    provider.push(battery(100, 20, PowerState::CHARGING));
    assert_eq!(manager.remaining_charge_percent()?, Some(20));
    assert_eq!(provider.query_count(), queries);

    manager.flush().await;
    assert_eq!(statuses(), vec![BatteryStatus::Charging]);
    Ok(())
}

#[tokio::test]
async fn no_battery() -> Result<()> {
    let (manager, _provider) = battery_manager(CompositeBatteryStatus {
        active_battery_count: 0,
        power_state: PowerState::POWER_ON_LINE,
        full_charged_capacity: BATTERY_UNKNOWN_CAPACITY,
        remaining_capacity: BATTERY_UNKNOWN_CAPACITY,
    })?;

    assert_eq!(manager.battery_status()?, BatteryStatus::NotPresent);
    assert_eq!(manager.power_supply_status()?, PowerSupplyStatus::Adequate);
    assert_eq!(manager.remaining_charge_percent()?, None);
    Ok(())
}
