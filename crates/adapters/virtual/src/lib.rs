//! # hush-adapter-virtual
//!
//! Simulated device that implements every platform port, so the engine can
//! run end to end without a phone underneath it.
//!
//! ## Provided ports
//!
//! | Port | Type | Behaviour |
//! |------|------|-----------|
//! | `TimerPort` | [`VirtualTimer`] | tokio sleep per registration, fires back through the dispatcher |
//! | `RegionMonitorPort` | [`VirtualRegionMonitor`] | computes enter/exit from simulated positions |
//! | `MuteActuatorPort` | [`VirtualMuteSwitch`] | in-memory silenced flag behind a permission toggle |
//! | `UserNotifier` | [`LogNotifier`] | logs notices and keeps a history |
//! | `RemoteSync` | [`NoopRemoteSync`] | counts resync requests |
//!
//! ## Dependency rule
//!
//! Depends on `hush-app` (port traits) and `hush-domain` only. The rule
//! store is supplied by the caller, see [`VirtualDevice::ports`].

mod monitor;
mod mute;
mod notifier;
mod sync;
mod timer;

use std::marker::PhantomData;
use std::sync::Arc;

use hush_app::dispatcher::DispatcherHandle;
use hush_app::platform::{Platform, Ports};
use hush_app::ports::{RuleStore, SystemClock};

pub use monitor::VirtualRegionMonitor;
pub use mute::VirtualMuteSwitch;
pub use notifier::LogNotifier;
pub use sync::NoopRemoteSync;
pub use timer::VirtualTimer;

/// Knobs of the simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSettings {
    /// Maximum number of regions the monitor accepts at once.
    pub region_capacity: usize,
    /// Whether exact timers are allowed; when not, the scheduler falls back
    /// to inexact ones.
    pub exact_timers: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            region_capacity: 100,
            exact_timers: true,
        }
    }
}

/// [`Platform`] made of the virtual ports over the rule store `S`.
pub struct VirtualPlatform<S>(PhantomData<fn() -> S>);

impl<S: RuleStore + 'static> Platform for VirtualPlatform<S> {
    type Store = S;
    type Timer = VirtualTimer;
    type Monitor = VirtualRegionMonitor;
    type Mute = VirtualMuteSwitch;
    type Notifier = LogNotifier;
    type Sync = NoopRemoteSync;
    type Clock = SystemClock;
}

/// The simulated device. Keeps handles on every port so callers can drive
/// the simulation (move around, toggle permissions, reboot).
pub struct VirtualDevice {
    pub timer: Arc<VirtualTimer>,
    pub monitor: Arc<VirtualRegionMonitor>,
    pub mute: Arc<VirtualMuteSwitch>,
    pub notifier: Arc<LogNotifier>,
    pub sync: Arc<NoopRemoteSync>,
}

impl VirtualDevice {
    #[must_use]
    pub fn new(dispatcher: DispatcherHandle, settings: DeviceSettings) -> Self {
        Self {
            timer: Arc::new(VirtualTimer::new(dispatcher.clone(), settings.exact_timers)),
            monitor: Arc::new(VirtualRegionMonitor::new(
                dispatcher,
                settings.region_capacity,
            )),
            mute: Arc::new(VirtualMuteSwitch::default()),
            notifier: Arc::new(LogNotifier::default()),
            sync: Arc::new(NoopRemoteSync::default()),
        }
    }

    /// Bundle this device's ports with `store`.
    #[must_use]
    pub fn ports<S: RuleStore + 'static>(&self, store: Arc<S>) -> Ports<VirtualPlatform<S>> {
        Ports {
            store,
            timer: Arc::clone(&self.timer),
            monitor: Arc::clone(&self.monitor),
            mute: Arc::clone(&self.mute),
            notifier: Arc::clone(&self.notifier),
            sync: Arc::clone(&self.sync),
            clock: Arc::new(SystemClock),
        }
    }

    /// Simulate a reboot: every timer registration and geofence is lost.
    pub fn reboot(&self) {
        tracing::info!("virtual device rebooting");
        self.timer.clear();
        self.monitor.clear();
    }
}
