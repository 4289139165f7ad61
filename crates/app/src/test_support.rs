//! In-memory fakes for every port, shared by the unit tests of this crate.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use hush_domain::action::Action;
use hush_domain::error::{HushError, NotFoundError, RegistrationError};
use hush_domain::id::RuleId;
use hush_domain::region::RegionRegistration;
use hush_domain::rule::Rule;
use hush_domain::time::Timestamp;
use hush_domain::trigger::{AlarmRecord, Trigger, TriggerKey};

use crate::engine::Engine;
use crate::platform::{Platform, Ports, RegionsOf, SchedulerOf};
use crate::ports::{
    ManualClock, MuteActuatorPort, Notice, Precision, RegionMonitorPort, RemoteSync, RuleStore,
    TimerHandle, TimerPort, UserNotifier,
};
use crate::regions::RegionTriggerManager;
use crate::scheduler::TriggerScheduler;

#[derive(Default)]
pub struct InMemoryRuleStore {
    rules: Mutex<BTreeMap<RuleId, Rule>>,
    alarms: Mutex<BTreeMap<(RuleId, Action), AlarmRecord>>,
    reads: AtomicUsize,
    fail_updates: AtomicBool,
    fail_purge: AtomicBool,
}

fn broken_store() -> HushError {
    HushError::Storage("store unavailable".into())
}

impl InMemoryRuleStore {
    pub fn seed(&self, rule: Rule) {
        self.rules.lock().unwrap().insert(rule.id(), rule);
    }

    pub fn rules(&self) -> Vec<Rule> {
        self.rules.lock().unwrap().values().cloned().collect()
    }

    pub fn alarms(&self) -> Vec<AlarmRecord> {
        self.alarms.lock().unwrap().values().copied().collect()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_purge(&self, fail: bool) {
        self.fail_purge.store(fail, Ordering::SeqCst);
    }
}

impl RuleStore for InMemoryRuleStore {
    fn list_rules(&self) -> impl Future<Output = Result<Vec<Rule>, HushError>> + Send {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let result = self.rules();
        async { Ok(result) }
    }

    fn find_rule(
        &self,
        id: RuleId,
    ) -> impl Future<Output = Result<Option<Rule>, HushError>> + Send {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let result = self.rules.lock().unwrap().get(&id).cloned();
        async { Ok(result) }
    }

    fn insert_rule(&self, rule: Rule) -> impl Future<Output = Result<Rule, HushError>> + Send {
        self.seed(rule.clone());
        async { Ok(rule) }
    }

    fn update_rule(&self, rule: Rule) -> impl Future<Output = Result<Rule, HushError>> + Send {
        let mut rules = self.rules.lock().unwrap();
        let result = if self.fail_updates.load(Ordering::SeqCst) {
            Err(broken_store())
        } else if rules.contains_key(&rule.id()) {
            rules.insert(rule.id(), rule.clone());
            Ok(rule)
        } else {
            Err(NotFoundError {
                entity: "Rule",
                id: rule.id().to_string(),
            }
            .into())
        };
        async { result }
    }

    fn delete_rule(&self, id: RuleId) -> impl Future<Output = Result<(), HushError>> + Send {
        self.rules.lock().unwrap().remove(&id);
        self.alarms
            .lock()
            .unwrap()
            .retain(|(rule_id, _), _| *rule_id != id);
        async { Ok(()) }
    }

    fn record_alarm(
        &self,
        alarm: AlarmRecord,
    ) -> impl Future<Output = Result<(), HushError>> + Send {
        self.alarms
            .lock()
            .unwrap()
            .insert((alarm.rule_id, alarm.action), alarm);
        async { Ok(()) }
    }

    fn delete_alarm(
        &self,
        rule_id: RuleId,
        action: Action,
    ) -> impl Future<Output = Result<(), HushError>> + Send {
        self.alarms.lock().unwrap().remove(&(rule_id, action));
        async { Ok(()) }
    }

    fn delete_alarms_older_than(
        &self,
        cutoff: Timestamp,
    ) -> impl Future<Output = Result<u64, HushError>> + Send {
        let result = if self.fail_purge.load(Ordering::SeqCst) {
            Err(broken_store())
        } else {
            let mut alarms = self.alarms.lock().unwrap();
            let before = alarms.len();
            alarms.retain(|_, alarm| alarm.fires_at >= cutoff);
            Ok((before - alarms.len()) as u64)
        };
        async move { result }
    }

    fn list_alarms(&self) -> impl Future<Output = Result<Vec<AlarmRecord>, HushError>> + Send {
        let mut result = self.alarms();
        result.sort_by_key(|alarm| alarm.fires_at);
        async { Ok(result) }
    }
}

/// Timer fake that keeps every registration it is given, so a missing
/// cancel shows up as two registrations under one key.
#[derive(Default)]
pub struct FakeTimer {
    registrations: Mutex<Vec<(Trigger, Precision)>>,
    reject_exact: AtomicBool,
    reject_action: Mutex<Option<Action>>,
    cancel_calls: AtomicUsize,
    max_per_key: AtomicUsize,
}

impl FakeTimer {
    pub fn reject_exact(&self, reject: bool) {
        self.reject_exact.store(reject, Ordering::SeqCst);
    }

    /// Refuse every registration for `action`, exact or not.
    pub fn reject_action(&self, action: Option<Action>) {
        *self.reject_action.lock().unwrap() = action;
    }

    /// Live registrations, ordered by key.
    pub fn pending(&self) -> Vec<Trigger> {
        let mut pending: Vec<Trigger> = self
            .registrations
            .lock()
            .unwrap()
            .iter()
            .map(|(trigger, _)| *trigger)
            .collect();
        pending.sort_by_key(|trigger| trigger.key);
        pending
    }

    pub fn precision_of(&self, key: TriggerKey) -> Option<Precision> {
        self.registrations
            .lock()
            .unwrap()
            .iter()
            .find(|(trigger, _)| trigger.key == key)
            .map(|(_, precision)| *precision)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous registrations ever seen for one key.
    pub fn max_concurrent_per_key(&self) -> usize {
        self.max_per_key.load(Ordering::SeqCst)
    }

    /// Lose every registration, as a device reboot does.
    pub fn reboot(&self) {
        self.registrations.lock().unwrap().clear();
    }
}

impl TimerPort for FakeTimer {
    fn set(
        &self,
        trigger: Trigger,
        precision: Precision,
    ) -> impl Future<Output = Result<TimerHandle, HushError>> + Send {
        let refused = *self.reject_action.lock().unwrap() == Some(trigger.action)
            || (precision == Precision::Exact && self.reject_exact.load(Ordering::SeqCst));
        let result = if refused {
            Err(HushError::TimerRejected {
                fires_at: trigger.fires_at,
            })
        } else {
            let mut registrations = self.registrations.lock().unwrap();
            registrations.push((trigger, precision));
            let same_key = registrations
                .iter()
                .filter(|(other, _)| other.key == trigger.key)
                .count();
            self.max_per_key.fetch_max(same_key, Ordering::SeqCst);
            Ok(TimerHandle::from(trigger.key))
        };
        async { result }
    }

    fn cancel(&self, handle: TimerHandle) -> impl Future<Output = ()> + Send {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.registrations
            .lock()
            .unwrap()
            .retain(|(trigger, _)| trigger.key != handle.key());
        async {}
    }
}

pub struct FakeRegionMonitor {
    watched: Mutex<Vec<RegionRegistration>>,
    failure: Mutex<Option<RegistrationError>>,
    permission: AtomicBool,
    submissions: AtomicUsize,
}

impl Default for FakeRegionMonitor {
    fn default() -> Self {
        Self {
            watched: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            permission: AtomicBool::new(true),
            submissions: AtomicUsize::new(0),
        }
    }
}

impl FakeRegionMonitor {
    pub fn watched(&self) -> Vec<RegionRegistration> {
        self.watched.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, failure: Option<RegistrationError>) {
        *self.failure.lock().unwrap() = failure;
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
    }
}

impl RegionMonitorPort for FakeRegionMonitor {
    fn set_watched_regions(
        &self,
        regions: Vec<RegionRegistration>,
    ) -> impl Future<Output = Result<(), HushError>> + Send {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        let failure = self.failure.lock().unwrap().clone();
        let result = match failure {
            Some(err) => Err(err.into()),
            None if !self.permission.load(Ordering::SeqCst) => {
                Err(RegistrationError::PermissionMissing.into())
            }
            None => {
                *self.watched.lock().unwrap() = regions;
                Ok(())
            }
        };
        async { result }
    }

    fn permission_granted(&self) -> impl Future<Output = bool> + Send {
        let granted = self.permission.load(Ordering::SeqCst);
        async move { granted }
    }
}

pub struct FakeMuteSwitch {
    silenced: AtomicBool,
    permission: AtomicBool,
    stuck: AtomicBool,
    reports_state: bool,
    set_calls: AtomicUsize,
}

impl Default for FakeMuteSwitch {
    fn default() -> Self {
        Self {
            silenced: AtomicBool::new(false),
            permission: AtomicBool::new(true),
            stuck: AtomicBool::new(false),
            reports_state: true,
            set_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeMuteSwitch {
    /// A switch that never reports its current state.
    pub fn opaque() -> Self {
        Self {
            reports_state: false,
            ..Self::default()
        }
    }

    pub fn silenced(&self) -> Option<bool> {
        Some(self.silenced.load(Ordering::SeqCst))
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
    }

    /// Accept every change without actually applying it.
    pub fn set_stuck(&self, stuck: bool) {
        self.stuck.store(stuck, Ordering::SeqCst);
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }
}

impl MuteActuatorPort for FakeMuteSwitch {
    fn set_silenced(&self, silenced: bool) -> impl Future<Output = bool> + Send {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        let granted = self.permission.load(Ordering::SeqCst);
        if granted && !self.stuck.load(Ordering::SeqCst) {
            self.silenced.store(silenced, Ordering::SeqCst);
        }
        async move { granted }
    }

    fn is_silenced(&self) -> impl Future<Output = Option<bool>> + Send {
        let state = self
            .reports_state
            .then(|| self.silenced.load(Ordering::SeqCst));
        async move { state }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl UserNotifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

#[derive(Default)]
pub struct CountingSync {
    requests: AtomicUsize,
}

impl CountingSync {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl RemoteSync for CountingSync {
    fn request_location_resync(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct TestPlatform;

impl Platform for TestPlatform {
    type Store = InMemoryRuleStore;
    type Timer = FakeTimer;
    type Monitor = FakeRegionMonitor;
    type Mute = FakeMuteSwitch;
    type Notifier = RecordingNotifier;
    type Sync = CountingSync;
    type Clock = ManualClock;
}

/// Fakes plus a standalone scheduler and region manager over them.
pub struct Harness {
    pub ports: Ports<TestPlatform>,
    pub clock: ManualClock,
    pub scheduler: Arc<SchedulerOf<TestPlatform>>,
    pub regions: Arc<RegionsOf<TestPlatform>>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        let clock = ManualClock::default();
        let ports = Ports {
            store: Arc::new(InMemoryRuleStore::default()),
            timer: Arc::new(FakeTimer::default()),
            monitor: Arc::new(FakeRegionMonitor::default()),
            mute: Arc::new(FakeMuteSwitch::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            sync: Arc::new(CountingSync::default()),
            clock: Arc::new(clock.clone()),
        };
        let scheduler = Arc::new(TriggerScheduler::new(
            Arc::clone(&ports.timer),
            Arc::clone(&ports.store),
            Arc::clone(&ports.clock),
        ));
        let regions = Arc::new(RegionTriggerManager::new(Arc::clone(&ports.monitor)));
        Self {
            ports,
            clock,
            scheduler,
            regions,
        }
    }

    /// A fresh engine over the same ports, as after a process restart.
    pub fn engine(&self) -> Arc<Engine<TestPlatform>> {
        Arc::new(Engine::new(self.ports.clone()))
    }

    pub fn seed(&self, rule: impl Into<Rule>) {
        self.ports.store.seed(rule.into());
    }
}
