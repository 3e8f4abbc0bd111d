use tracing::Level;

use powerhub::{CompositeBatteryStatus, PowerState};
use std::sync::{Arc, Mutex};

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() { tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init(); }

/// A handler that records every value it receives, and a check that drains what was recorded
#[allow(unused)]
pub fn watcher<T: Send + 'static>() -> (Box<dyn Fn(T) + Send + Sync>, Box<dyn Fn() -> Vec<T> + Send + Sync>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let watcher = {
        let seen = seen.clone();
        Box::new(move |value: T| {
            seen.lock().unwrap().push(value);
        })
    };

    let check = Box::new(move || seen.lock().unwrap().drain(..).collect::<Vec<T>>());

    (watcher, check)
}

#[allow(unused)]
pub fn battery(full: u32, remaining: u32, power_state: PowerState) -> CompositeBatteryStatus {
    CompositeBatteryStatus { active_battery_count: 1, power_state, full_charged_capacity: full, remaining_capacity: remaining }
}
