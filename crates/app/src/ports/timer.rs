//! Timer port: one-shot wake-ups at absolute times.
//!
//! Registrations survive process death but not a device reboot. Delivery is
//! at-least-once and may be arbitrarily late; firing goes back through the
//! dispatcher as [`DeviceEvent::TimerFired`](crate::dispatcher::DeviceEvent).

use std::fmt;
use std::future::Future;

use hush_domain::error::HushError;
use hush_domain::trigger::{Trigger, TriggerKey};

/// How precisely the platform should honour the fire time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// Wake exactly at the requested time, even in power-saving states.
    Exact,
    /// Best effort; the platform may batch or defer.
    Inexact,
}

/// Handle of a timer registration.
///
/// Derived from the [`TriggerKey`], so the same rule/action pair always maps
/// to the same handle, across process restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(TriggerKey);

impl TimerHandle {
    #[must_use]
    pub fn key(self) -> TriggerKey {
        self.0
    }
}

impl From<TriggerKey> for TimerHandle {
    fn from(key: TriggerKey) -> Self {
        Self(key)
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Platform alarm service.
pub trait TimerPort: Send + Sync {
    /// Register a wake-up delivering `trigger.rule_id` and `trigger.action`
    /// at `trigger.fires_at`. An existing registration with the same handle
    /// is replaced.
    ///
    /// Fails with [`HushError::TimerRejected`] when an exact wake-up is refused.
    fn set(
        &self,
        trigger: Trigger,
        precision: Precision,
    ) -> impl Future<Output = Result<TimerHandle, HushError>> + Send;

    /// Cancel a registration. Unknown handles are ignored.
    fn cancel(&self, handle: TimerHandle) -> impl Future<Output = ()> + Send;
}
