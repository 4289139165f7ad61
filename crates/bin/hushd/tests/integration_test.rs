//! End-to-end tests for the full hushd stack.
//!
//! Each test wires the complete engine (in-memory `SQLite`, virtual device,
//! real dispatcher loop) and drives it through the simulated device.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use hush_adapter_storage_sqlite_sqlx::{Config, SqliteRuleStore};
use hush_adapter_virtual::{DeviceSettings, VirtualDevice, VirtualPlatform};
use hush_app::dispatcher::{self, DispatcherHandle, EventDispatcher};
use hush_app::engine::Engine;
use hush_app::ports::{Notice, RuleStore};
use hush_domain::id::CreatorId;
use hush_domain::rule::{EventRule, GeoPoint, Location, LocationRule, Rule};
use hush_domain::time;
use tokio::task::JoinHandle;

const OFFICE: GeoPoint = GeoPoint {
    latitude: 48.8566,
    longitude: 2.3522,
};
const STREET: GeoPoint = GeoPoint {
    latitude: 48.8600,
    longitude: 2.3600,
};

struct Stack {
    handle: DispatcherHandle,
    device: VirtualDevice,
    engine: Arc<Engine<VirtualPlatform<SqliteRuleStore>>>,
    store: Arc<SqliteRuleStore>,
    worker: JoinHandle<()>,
}

impl Stack {
    async fn start(settings: DeviceSettings) -> Self {
        let db = Config::new("sqlite::memory:")
            .build()
            .await
        .expect("in-memory database should initialise");
        let store = Arc::new(SqliteRuleStore::new(db.pool().clone()));

        let (handle, inbox) = dispatcher::channel();
        let device = VirtualDevice::new(handle.clone(), settings);
        let engine = Arc::new(Engine::new(device.ports(Arc::clone(&store))));
        let worker = tokio::spawn(EventDispatcher::new(Arc::clone(&engine)).run(inbox));

        Self {
            handle,
            device,
            engine,
            store,
            worker,
        }
    }

    async fn stop(self) {
        self.handle.shutdown();
        self.worker.await.unwrap();
    }
}

async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("timed out waiting for {what}");
}

fn office_rule() -> Rule {
    LocationRule::new(
        CreatorId::new(),
        Location {
            location_ref: "loc-office".to_string(),
            center: OFFICE,
            radius_m: 100.0,
        },
    )
    .into()
}

fn hour_long_event(start: time::Timestamp) -> Rule {
    EventRule::new(CreatorId::new(), "evt-1", start, start + TimeDelta::hours(1)).into()
}

#[tokio::test]
async fn should_mute_then_unmute_over_event_window() {
    let stack = Stack::start(DeviceSettings::default()).await;
    let start = time::now() + TimeDelta::milliseconds(200);
    let rule = EventRule::new(
        CreatorId::new(),
        "evt-standup",
        start,
        start + TimeDelta::milliseconds(300),
    );

    stack.engine.rules().create_rule(rule.into()).await.unwrap();

    let mute = Arc::clone(&stack.device.mute);
    eventually("mute", || mute.silenced()).await;
    eventually("unmute", || !mute.silenced()).await;
    assert_eq!(mute.changes(), 2);
    stack.stop().await;
}

#[tokio::test]
async fn should_follow_device_in_and_out_of_region() {
    let stack = Stack::start(DeviceSettings::default()).await;
    stack.device.monitor.move_to(STREET);
    let rule = stack
        .engine
        .rules()
        .create_rule(office_rule())
        .await
        .unwrap();
    assert_eq!(stack.device.monitor.watched().len(), 1);

    stack.device.monitor.move_to(OFFICE);
    let mute = Arc::clone(&stack.device.mute);
    eventually("mute on enter", || mute.silenced()).await;

    stack.device.monitor.move_to(STREET);
    eventually("unmute on exit", || !mute.silenced()).await;

    stack.engine.rules().delete_rule(rule.id()).await.unwrap();
    assert!(stack.device.monitor.watched().is_empty());
    stack.device.monitor.move_to(OFFICE);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!mute.silenced());
    stack.stop().await;
}

#[tokio::test]
async fn should_restore_registrations_after_reboot() {
    let stack = Stack::start(DeviceSettings::default()).await;
    let start = time::now() + TimeDelta::hours(1);
    stack
        .engine
        .rules()
        .create_rule(hour_long_event(start))
        .await
        .unwrap();
    stack.engine.rules().create_rule(office_rule()).await.unwrap();
    assert_eq!(stack.device.timer.pending().len(), 2);

    stack.device.reboot();
    assert!(stack.device.timer.pending().is_empty());
    assert!(stack.device.monitor.watched().is_empty());
    stack.handle.on_boot();

    let timer = Arc::clone(&stack.device.timer);
    let monitor = Arc::clone(&stack.device.monitor);
    eventually("timers re-armed", || timer.pending().len() == 2).await;
    eventually("regions re-armed", || monitor.watched().len() == 1).await;
    assert_eq!(stack.store.list_alarms().await.unwrap().len(), 2);
    stack.stop().await;
}

#[tokio::test]
async fn should_fall_back_to_inexact_timers_when_exact_refused() {
    let stack = Stack::start(DeviceSettings {
        exact_timers: false,
        ..DeviceSettings::default()
    })
    .await;
    let start = time::now() + TimeDelta::hours(1);

    stack
        .engine
        .rules()
        .create_rule(hour_long_event(start))
        .await
        .unwrap();

    let pending = stack.device.timer.pending();
    assert_eq!(pending.len(), 2);
    assert!(
        pending
            .iter()
            .all(|(_, precision)| *precision == hush_app::ports::Precision::Inexact)
    );
    stack.stop().await;
}

#[tokio::test]
async fn should_prompt_once_when_policy_access_missing() {
    let stack = Stack::start(DeviceSettings::default()).await;
    stack.device.mute.set_policy_access(false);
    stack.engine.rules().create_rule(office_rule()).await.unwrap();

    for position in [OFFICE, STREET, OFFICE] {
        stack.device.monitor.move_to(position);
    }

    let notifier = Arc::clone(&stack.device.notifier);
    eventually("policy prompt", || {
        notifier.history().contains(&Notice::PolicyAccessRequired)
    })
    .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let prompts = notifier
        .history()
        .iter()
        .filter(|notice| **notice == Notice::PolicyAccessRequired)
        .count();
    assert_eq!(prompts, 1);
    assert!(!stack.device.mute.silenced());
    stack.stop().await;
}

#[tokio::test]
async fn should_recover_regions_on_sweep_after_monitor_error() {
    let stack = Stack::start(DeviceSettings::default()).await;
    stack.engine.rules().create_rule(office_rule()).await.unwrap();

    stack.device.monitor.report_error(1000);
    let engine = Arc::clone(&stack.engine);
    let mut degraded = Vec::new();
    for _ in 0..200 {
        degraded = engine.regions().degraded().await;
        if !degraded.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert_eq!(degraded.len(), 1);

    stack.handle.sweep();
    let sync = Arc::clone(&stack.device.sync);
    eventually("sweep ran", || sync.requests() == 1).await;
    for _ in 0..200 {
        if engine.regions().degraded().await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(engine.regions().degraded().await.is_empty());
    stack.stop().await;
}
