mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common::watcher;
use powerhub::*;
use powerhub_signals::ManualProvider;

fn display_manager(initial: u32, config: HubConfig) -> Result<(PowerManager, Arc<ManualProvider<u32>>)> {
    let provider = Arc::new(ManualProvider::new(initial));
    let manager = PowerManager::new(PowerProviders::new().with_display(provider.clone()), config)?;
    Ok((manager, provider))
}

#[tokio::test]
async fn reads_are_lazy() -> Result<()> {
    let (manager, provider) = display_manager(1, HubConfig::default())?;

    for _ in 0..3 {
        assert_eq!(manager.display_status()?, DisplayStatus::On);
    }
    assert_eq!(provider.query_count(), 3);
    assert_eq!(provider.register_count(), 0);

    let (display_watcher, _) = watcher::<DisplayStatus>();
    let token = manager.display_status_changed(display_watcher)?;
    let queries = provider.query_count();
    provider.push(0);
    for _ in 0..3 {
        assert_eq!(manager.display_status()?, DisplayStatus::Off);
    }
    assert_eq!(provider.query_count(), queries);

    // back to pulling once the last subscriber leaves
    manager.remove_display_status_changed(token);
    provider.set(2);
    assert_eq!(manager.display_status()?, DisplayStatus::Dimmed);
    Ok(())
}

#[tokio::test]
async fn repeated_pushes_notify_once() -> Result<()> {
    let (manager, provider) = display_manager(1, HubConfig::default())?;
    let (display_watcher, changes) = watcher::<DisplayStatus>();
    manager.display_status_changed(display_watcher)?;

    for _ in 0..5 {
        provider.push(2);
    }
    provider.push(1);
    manager.flush().await;

    assert_eq!(changes(), vec![DisplayStatus::Dimmed, DisplayStatus::On]);
    Ok(())
}

#[tokio::test]
async fn many_subscribers_one_registration() -> Result<()> {
    let (manager, provider) = display_manager(1, HubConfig::default())?;

    let tokens = (0..10).map(|_| manager.display_status_changed(|_: DisplayStatus| {})).collect::<Result<Vec<_>, _>>()?;
    assert_eq!(provider.register_count(), 1);
    assert_eq!(manager.hub().listener_count(signals::DISPLAY_STATUS), 10);

    for token in &tokens {
        manager.remove_display_status_changed(*token);
    }
    // stale tokens are ignored
    for token in &tokens {
        manager.remove_display_status_changed(*token);
    }
    assert_eq!(provider.unregister_count(), 1);
    assert!(!provider.is_registered());
    Ok(())
}

#[tokio::test]
async fn failed_registration_is_reported_and_retried() -> Result<()> {
    let (manager, provider) = display_manager(1, HubConfig::default())?;

    provider.fail_next_register("registration slots exhausted");
    let err = manager.display_status_changed(|_: DisplayStatus| {}).unwrap_err();
    assert!(matches!(err, HubError::ProviderRegisterFailed { .. }));
    assert_eq!(manager.hub().listener_count(signals::DISPLAY_STATUS), 0);

    manager.display_status_changed(|_: DisplayStatus| {})?;
    assert!(provider.is_registered());
    Ok(())
}

#[tokio::test]
async fn failed_unregister_still_deactivates() -> Result<()> {
    let (manager, provider) = display_manager(1, HubConfig::default())?;
    let token = manager.display_status_changed(|_: DisplayStatus| {})?;

    provider.fail_next_unregister("not honored");
    manager.remove_display_status_changed(token);
    assert!(!manager.hub().is_active(signals::DISPLAY_STATUS));
    assert_eq!(provider.unregister_count(), 1);

    // reads pull again, since nothing is known to keep the cache current
    let queries = provider.query_count();
    provider.set(2);
    assert_eq!(manager.display_status()?, DisplayStatus::Dimmed);
    assert_eq!(provider.query_count(), queries + 1);
    Ok(())
}

#[tokio::test]
async fn panicking_handler_does_not_stop_delivery() -> Result<()> {
    let (manager, provider) = display_manager(1, HubConfig::default())?;
    // subscribed first, so it runs ahead of the watcher
    manager.display_status_changed(|status: DisplayStatus| {
        if status == DisplayStatus::Off {
            panic!("handler failure");
        }
    })?;
    let (display_watcher, changes) = watcher::<DisplayStatus>();
    manager.display_status_changed(display_watcher)?;

    provider.push(0);
    provider.push(1);
    manager.flush().await;

    assert_eq!(changes(), vec![DisplayStatus::Off, DisplayStatus::On]);
    Ok(())
}

#[tokio::test]
async fn dropping_the_manager_unregisters() -> Result<()> {
    let (manager, provider) = display_manager(1, HubConfig::default())?;
    manager.display_status_changed(|_: DisplayStatus| {})?;
    assert!(provider.is_registered());

    drop(manager);
    assert!(!provider.is_registered());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_subscribe_unsubscribe() -> Result<()> {
    let (manager, provider) = display_manager(1, HubConfig::new().with_workers(2))?;

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            std::thread::spawn(move || -> Result<(), HubError> {
                for _ in 0..200 {
                    let token = manager.display_status_changed(|_: DisplayStatus| {})?;
                    manager.remove_display_status_changed(token);
                }
                Ok(())
            })
        })
        .collect();
    for thread in threads {
        thread.join().expect("subscriber thread panicked")?;
    }

    // every activation was paired with exactly one deactivation
    assert!(!provider.is_registered());
    assert!(!manager.hub().is_active(signals::DISPLAY_STATUS));
    assert_eq!(provider.register_count(), provider.unregister_count());
    assert_eq!(manager.hub().listener_count(signals::DISPLAY_STATUS), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pushes_from_a_provider_thread_arrive_in_order() -> Result<()> {
    let idle = Arc::new(ManualProvider::new(0u64));
    let manager = PowerManager::new(PowerProviders::new().with_system_idle(idle.clone()), HubConfig::new().with_workers(3))?;
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    manager.system_idle_changed(tx)?;

    let pusher = {
        let idle = idle.clone();
        std::thread::spawn(move || {
            for tick in 1..=500u64 {
                idle.push(tick);
            }
        })
    };
    // readers on other threads never see the value go backwards
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let manager = manager.clone();
            std::thread::spawn(move || -> Result<(), HubError> {
                let mut last = 0;
                for _ in 0..500 {
                    let tick = manager.system_idle()?;
                    assert!(tick >= last);
                    last = tick;
                }
                Ok(())
            })
        })
        .collect();

    pusher.join().expect("provider thread panicked");
    for reader in readers {
        reader.join().expect("reader thread panicked")?;
    }
    manager.flush().await;

    let mut ticks = Vec::new();
    while let Ok(tick) = rx.try_recv() {
        ticks.push(tick);
    }
    assert_eq!(ticks, (1..=500).collect::<Vec<u64>>());
    assert_eq!(manager.system_idle()?, 500);
    Ok(())
}

#[tokio::test]
async fn handlers_run_off_the_pushing_thread() -> Result<()> {
    let (manager, provider) = display_manager(1, HubConfig::default())?;
    let (thread_watcher, delivered_on) = watcher::<std::thread::ThreadId>();
    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = calls.clone();
        manager.display_status_changed(move |_: DisplayStatus| {
            calls.fetch_add(1, Ordering::SeqCst);
            thread_watcher(std::thread::current().id());
        })?;
    }

    // pushed from a provider thread, delivered by a dispatcher worker
    let provider_thread = {
        let provider = provider.clone();
        std::thread::spawn(move || provider.push(0))
    };
    let provider_thread_id = provider_thread.thread().id();
    provider_thread.join().expect("provider thread panicked");
    tokio::time::timeout(Duration::from_secs(5), manager.flush()).await?;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!delivered_on().contains(&provider_thread_id));
    Ok(())
}

#[tokio::test]
async fn guarded_subscriptions() -> Result<()> {
    let presence = Arc::new(ManualProvider::new(0u32));
    let manager = PowerManager::new(PowerProviders::new().with_user_presence(presence.clone()), HubConfig::default())?;

    {
        let _guard = manager.hub().subscribe_guarded(signals::USER_PRESENCE_STATUS, |_: UserPresenceStatus| {})?;
        assert!(presence.is_registered());
    }
    assert!(!presence.is_registered());

    // a guard outliving its hub is harmless
    let guard = manager.hub().subscribe_guarded(signals::USER_PRESENCE_STATUS, |_: UserPresenceStatus| {})?;
    drop(manager);
    assert!(!presence.is_registered());
    drop(guard);
    assert_eq!(presence.unregister_count(), 2);
    Ok(())
}
