//! Virtual timer: one tokio task per registration.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::task::JoinHandle;

use hush_app::dispatcher::DispatcherHandle;
use hush_app::ports::{Precision, TimerHandle, TimerPort};
use hush_domain::error::HushError;
use hush_domain::time;
use hush_domain::trigger::{Trigger, TriggerKey};

struct Registration {
    trigger: Trigger,
    precision: Precision,
    task: JoinHandle<()>,
}

/// Simulated alarm service. Past-due registrations fire right away.
pub struct VirtualTimer {
    dispatcher: DispatcherHandle,
    exact_allowed: AtomicBool,
    registrations: Mutex<HashMap<TriggerKey, Registration>>,
}

impl VirtualTimer {
    #[must_use]
    pub fn new(dispatcher: DispatcherHandle, exact_allowed: bool) -> Self {
        Self {
            dispatcher,
            exact_allowed: AtomicBool::new(exact_allowed),
            registrations: Mutex::new(HashMap::new()),
        }
    }

    /// Allow or refuse exact wake-ups from now on.
    pub fn set_exact_allowed(&self, allowed: bool) {
        self.exact_allowed.store(allowed, Ordering::SeqCst);
    }

    /// Registrations that have not fired yet, earliest first.
    #[must_use]
    pub fn pending(&self) -> Vec<(Trigger, Precision)> {
        let mut pending: Vec<(Trigger, Precision)> = self
            .lock()
            .values()
            .filter(|reg| !reg.task.is_finished())
            .map(|reg| (reg.trigger, reg.precision))
            .collect();
        pending.sort_by_key(|(trigger, _)| (trigger.fires_at, trigger.key));
        pending
    }

    /// Drop every registration without firing it.
    pub fn clear(&self) {
        for (_, reg) in self.lock().drain() {
            reg.task.abort();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TriggerKey, Registration>> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl TimerPort for VirtualTimer {
    fn set(
        &self,
        trigger: Trigger,
        precision: Precision,
    ) -> impl Future<Output = Result<TimerHandle, HushError>> + Send {
        let result = if precision == Precision::Exact && !self.exact_allowed.load(Ordering::SeqCst)
        {
            Err(HushError::TimerRejected {
                fires_at: trigger.fires_at,
            })
        } else {
            let handle = TimerHandle::from(trigger.key);
            let delay = (trigger.fires_at - time::now())
                .to_std()
                .unwrap_or_default();
            let dispatcher = self.dispatcher.clone();
            let task = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                tracing::debug!(key = %trigger.key, action = %trigger.action, "virtual timer fired");
                dispatcher.on_timer_fired(trigger.rule_id, trigger.action, trigger.fires_at);
            });
            let previous = self.lock().insert(
                handle.key(),
                Registration {
                    trigger,
                    precision,
                    task,
                },
            );
            if let Some(previous) = previous {
                previous.task.abort();
            }
            Ok(handle)
        };
        async { result }
    }

    fn cancel(&self, handle: TimerHandle) -> impl Future<Output = ()> + Send {
        if let Some(reg) = self.lock().remove(&handle.key()) {
            reg.task.abort();
        }
        async {}
    }
}
