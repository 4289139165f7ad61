//! Platform: the set of port implementations one deployment plugs in.
//!
//! Components are generic over the few ports they touch. The dispatcher and
//! the engine need all of them, so they are bundled behind one trait with an
//! associated type per port.

use std::sync::Arc;

use crate::actuator::MuteActuator;
use crate::ports::{
    Clock, MuteActuatorPort, RegionMonitorPort, RemoteSync, RuleStore, TimerPort, UserNotifier,
};
use crate::regions::RegionTriggerManager;
use crate::scheduler::TriggerScheduler;

/// Type-level bundle of port implementations.
pub trait Platform: Send + Sync + 'static {
    type Store: RuleStore + 'static;
    type Timer: TimerPort + 'static;
    type Monitor: RegionMonitorPort + 'static;
    type Mute: MuteActuatorPort + 'static;
    type Notifier: UserNotifier + 'static;
    type Sync: RemoteSync + 'static;
    type Clock: Clock + 'static;
}

pub type SchedulerOf<P> =
    TriggerScheduler<<P as Platform>::Timer, <P as Platform>::Store, <P as Platform>::Clock>;
pub type RegionsOf<P> = RegionTriggerManager<<P as Platform>::Monitor>;
pub type ActuatorOf<P> = MuteActuator<<P as Platform>::Mute>;

/// Port instances for a [`Platform`].
pub struct Ports<P: Platform> {
    pub store: Arc<P::Store>,
    pub timer: Arc<P::Timer>,
    pub monitor: Arc<P::Monitor>,
    pub mute: Arc<P::Mute>,
    pub notifier: Arc<P::Notifier>,
    pub sync: Arc<P::Sync>,
    pub clock: Arc<P::Clock>,
}

impl<P: Platform> Clone for Ports<P> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            timer: Arc::clone(&self.timer),
            monitor: Arc::clone(&self.monitor),
            mute: Arc::clone(&self.mute),
            notifier: Arc::clone(&self.notifier),
            sync: Arc::clone(&self.sync),
            clock: Arc::clone(&self.clock),
        }
    }
}
