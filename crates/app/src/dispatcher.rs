//! Event dispatcher: single entry point for device-originated events.
//!
//! Platform callbacks (boot, timer fired, geofence transitions, provider
//! toggles) post [`DeviceEvent`]s through a cloneable [`DispatcherHandle`].
//! Posting never blocks. The dispatcher loop hands every event to its own
//! task, so a slow reconciliation never delays a timer or a transition.
//! The dispatcher keeps no state between events; every failure is logged
//! here and turned into a notice or left to the next reconciliation.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use hush_domain::action::Action;
use hush_domain::error::HushError;
use hush_domain::id::RuleId;
use hush_domain::region::{RegionKey, Transition};
use hush_domain::time::Timestamp;

use crate::engine::Engine;
use crate::platform::Platform;
use crate::ports::{Notice, RegionMonitorPort};

/// Something the device reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// The device finished booting; every timer and region was lost.
    Boot,
    /// A timer registration fired. `fires_at` is the time it was set for.
    TimerFired {
        rule_id: RuleId,
        action: Action,
        fires_at: Timestamp,
    },
    /// The device crossed a watched region's boundary.
    RegionTransition {
        key: RegionKey,
        transition: Transition,
    },
    /// The region monitor reported an error instead of a transition.
    RegionMonitorError { code: i32 },
    /// The location provider was switched on or off.
    RegionProviderAvailabilityChanged { available: bool },
    /// Periodic maintenance tick.
    Sweep,
}

enum Message {
    Event(DeviceEvent),
    Shutdown,
}

/// Cloneable, non-blocking sender side of the dispatcher.
#[derive(Clone)]
pub struct DispatcherHandle {
    sender: mpsc::UnboundedSender<Message>,
}

/// Receiving side, consumed by [`EventDispatcher::run`].
pub struct Inbox {
    receiver: mpsc::UnboundedReceiver<Message>,
}

/// Create a connected handle/inbox pair.
#[must_use]
pub fn channel() -> (DispatcherHandle, Inbox) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (DispatcherHandle { sender }, Inbox { receiver })
}

impl Inbox {
    /// Receive the next posted event without dispatching it.
    ///
    /// Returns `None` on shutdown or once every handle is dropped.
    pub async fn next_event(&mut self) -> Option<DeviceEvent> {
        match self.receiver.recv().await? {
            Message::Event(event) => Some(event),
            Message::Shutdown => None,
        }
    }
}

impl DispatcherHandle {
    /// Post an event. Returns `false` when the dispatcher has stopped.
    pub fn post(&self, event: DeviceEvent) -> bool {
        let delivered = self.sender.send(Message::Event(event)).is_ok();
        if !delivered {
            tracing::debug!("dispatcher stopped, dropping event");
        }
        delivered
    }

    pub fn on_boot(&self) -> bool {
        self.post(DeviceEvent::Boot)
    }

    pub fn on_timer_fired(&self, rule_id: RuleId, action: Action, fires_at: Timestamp) -> bool {
        self.post(DeviceEvent::TimerFired {
            rule_id,
            action,
            fires_at,
        })
    }

    pub fn on_region_transition(&self, key: RegionKey, transition: Transition) -> bool {
        self.post(DeviceEvent::RegionTransition { key, transition })
    }

    pub fn on_region_monitor_error(&self, code: i32) -> bool {
        self.post(DeviceEvent::RegionMonitorError { code })
    }

    pub fn on_region_provider_availability_changed(&self, available: bool) -> bool {
        self.post(DeviceEvent::RegionProviderAvailabilityChanged { available })
    }

    pub fn sweep(&self) -> bool {
        self.post(DeviceEvent::Sweep)
    }

    /// Ask the dispatcher loop to stop after draining in-flight work.
    pub fn shutdown(&self) {
        let _ = self.sender.send(Message::Shutdown);
    }
}

pub struct EventDispatcher<P: Platform> {
    engine: Arc<Engine<P>>,
}

impl<P: Platform> Clone for EventDispatcher<P> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<P: Platform> EventDispatcher<P> {
    #[must_use]
    pub fn new(engine: Arc<Engine<P>>) -> Self {
        Self { engine }
    }

    /// Receive events until shutdown (or every handle is dropped), running
    /// each on its own task. In-flight tasks are awaited before returning.
    pub async fn run(self, mut inbox: Inbox) {
        let mut tasks = JoinSet::new();
        tracing::info!("event dispatcher started");

        while let Some(message) = inbox.receiver.recv().await {
            let event = match message {
                Message::Event(event) => event,
                Message::Shutdown => break,
            };
            let dispatcher = self.clone();
            tasks.spawn(async move { dispatcher.dispatch(event).await });

            while let Some(result) = tasks.try_join_next() {
                log_join(result);
            }
        }

        while let Some(result) = tasks.join_next().await {
            log_join(result);
        }
        tracing::info!("event dispatcher stopped");
    }

    /// Route one event to the component that handles it.
    #[tracing::instrument(skip(self))]
    pub async fn dispatch(&self, event: DeviceEvent) {
        match event {
            DeviceEvent::Boot => self.on_boot().await,
            DeviceEvent::TimerFired {
                rule_id,
                action,
                fires_at,
            } => {
                self.on_timer_fired(rule_id, action, fires_at).await;
            }
            DeviceEvent::RegionTransition { key, transition } => {
                self.on_region_transition(&key, transition).await;
            }
            DeviceEvent::RegionMonitorError { code } => self.on_region_monitor_error(code).await,
            DeviceEvent::RegionProviderAvailabilityChanged { available } => {
                self.on_provider_availability_changed(available).await;
            }
            DeviceEvent::Sweep => self.on_sweep().await,
        }
    }

    async fn on_boot(&self) {
        match self.engine.boot_reconciler().run().await {
            Ok(report) if report.regions_degraded => {
                tracing::warn!("regions not accepted at boot, next sweep retries");
            }
            Ok(_) => {}
            Err(err) => tracing::error!(error = %err, "boot reconciliation failed"),
        }
        if !self.engine.ports().monitor.permission_granted().await {
            tracing::warn!("location permission missing, location rules run degraded");
            self.engine
                .notices()
                .notify_once(Notice::LocationPermissionRequired);
        }
    }

    async fn on_timer_fired(&self, rule_id: RuleId, action: Action, fires_at: Timestamp) {
        self.engine
            .scheduler()
            .forget_fired(rule_id, action, fires_at)
            .await;
        self.apply(action).await;
    }

    async fn on_region_transition(&self, key: &RegionKey, transition: Transition) {
        if let Some(action) = self
            .engine
            .regions()
            .resolve_transition(key, transition)
            .await
        {
            self.apply(action).await;
        }
    }

    async fn on_region_monitor_error(&self, code: i32) {
        tracing::warn!(code, "region monitor reported an error");
        self.engine.regions().mark_degraded().await;
    }

    async fn on_provider_availability_changed(&self, available: bool) {
        if !available {
            tracing::warn!("location provider disabled");
            self.engine
                .notices()
                .notify(Notice::LocationProviderDisabled);
            return;
        }
        self.engine
            .notices()
            .notify(Notice::LocationProviderRestored);
        match self.engine.boot_reconciler().run_locations().await {
            Ok(count) => tracing::info!(count, "regions re-armed after provider came back"),
            Err(err) => tracing::warn!(error = %err, "failed to re-arm regions"),
        }
    }

    async fn on_sweep(&self) {
        let report = self.engine.sweep().run().await;
        if report.purge_failed {
            tracing::warn!("alarm ledger not purged, next sweep retries");
        }
    }

    async fn apply(&self, action: Action) {
        match self.engine.actuator().apply(action).await {
            Ok(_) => {}
            Err(HushError::PermissionDenied(permission)) => {
                tracing::warn!(%action, %permission, "cannot apply action without permission");
                self.engine
                    .notices()
                    .notify_once(Notice::PolicyAccessRequired);
            }
            Err(err) => {
                tracing::error!(%action, error = %err, "failed to apply action");
                self.engine
                    .notices()
                    .notify(Notice::ActuationFailed { action });
            }
        }
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(err) = result {
        tracing::error!(error = %err, "event task did not complete");
    }
}
