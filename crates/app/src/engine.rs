//! Engine: wires the core components over one [`Platform`].
//!
//! The scheduler and the region manager are shared by the rule service and
//! the reconcilers. The rule service and the boot reconciler also share one
//! write lock, so a rule edit never interleaves with a rebuild.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::actuator::MuteActuator;
use crate::notices::Notices;
use crate::platform::{ActuatorOf, Platform, Ports, RegionsOf, SchedulerOf};
use crate::reconcile::{BootReconciler, StaleTriggerSweep};
use crate::regions::RegionTriggerManager;
use crate::scheduler::TriggerScheduler;
use crate::services::rule_service::RuleService;

pub struct Engine<P: Platform> {
    ports: Ports<P>,
    scheduler: Arc<SchedulerOf<P>>,
    regions: Arc<RegionsOf<P>>,
    actuator: ActuatorOf<P>,
    notices: Notices<P::Notifier>,
    boot: BootReconciler<P>,
    sweep: StaleTriggerSweep<P>,
    rules: RuleService<P>,
}

impl<P: Platform> Engine<P> {
    #[must_use]
    pub fn new(ports: Ports<P>) -> Self {
        let scheduler = Arc::new(TriggerScheduler::new(
            Arc::clone(&ports.timer),
            Arc::clone(&ports.store),
            Arc::clone(&ports.clock),
        ));
        let regions = Arc::new(RegionTriggerManager::new(Arc::clone(&ports.monitor)));
        let write_lock = Arc::new(Mutex::new(()));

        Self {
            actuator: MuteActuator::new(Arc::clone(&ports.mute)),
            notices: Notices::new(Arc::clone(&ports.notifier)),
            boot: BootReconciler::new(
                Arc::clone(&ports.store),
                Arc::clone(&scheduler),
                Arc::clone(&regions),
                Arc::clone(&ports.clock),
                Arc::clone(&write_lock),
            ),
            sweep: StaleTriggerSweep::new(
                Arc::clone(&ports.store),
                Arc::clone(&regions),
                Arc::clone(&ports.sync),
                Arc::clone(&ports.clock),
            ),
            rules: RuleService::new(
                Arc::clone(&ports.store),
                Arc::clone(&scheduler),
                Arc::clone(&regions),
                write_lock,
            ),
            scheduler,
            regions,
            ports,
        }
    }

    #[must_use]
    pub fn rules(&self) -> &RuleService<P> {
        &self.rules
    }

    #[must_use]
    pub fn scheduler(&self) -> &SchedulerOf<P> {
        &self.scheduler
    }

    #[must_use]
    pub fn regions(&self) -> &RegionsOf<P> {
        &self.regions
    }

    #[must_use]
    pub fn actuator(&self) -> &ActuatorOf<P> {
        &self.actuator
    }

    #[must_use]
    pub fn notices(&self) -> &Notices<P::Notifier> {
        &self.notices
    }

    #[must_use]
    pub fn boot_reconciler(&self) -> &BootReconciler<P> {
        &self.boot
    }

    #[must_use]
    pub fn sweep(&self) -> &StaleTriggerSweep<P> {
        &self.sweep
    }

    #[must_use]
    pub fn ports(&self) -> &Ports<P> {
        &self.ports
    }
}
