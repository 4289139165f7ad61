//! Mute actuator: applies [`Action`]s to the device's interruption policy.
//!
//! Idempotent: applying the same action twice leaves the device in the same
//! state and both calls succeed. Skipping the platform call when the device
//! already reports the target state is only an optimization; the platform
//! call itself is idempotent.

use std::sync::Arc;

use hush_domain::action::Action;
use hush_domain::error::{HushError, Permission};

use crate::ports::MuteActuatorPort;

/// Result of a successful [`MuteActuator::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The platform was asked to change state.
    Changed,
    /// The device already was in the target state.
    Unchanged,
}

pub struct MuteActuator<M> {
    port: Arc<M>,
}

impl<M: MuteActuatorPort> MuteActuator<M> {
    pub fn new(port: Arc<M>) -> Self {
        Self { port }
    }

    /// Drive the device to the state `action` targets.
    ///
    /// # Errors
    ///
    /// Returns [`HushError::PermissionDenied`] when policy access is not
    /// granted. Surfacing the remediation prompt is left to the caller.
    /// Returns [`HushError::ActuationFailed`] when the platform accepted
    /// the change but reports a different state afterwards.
    #[tracing::instrument(skip(self))]
    pub async fn apply(&self, action: Action) -> Result<Applied, HushError> {
        let target = action.silenced();
        if self.port.is_silenced().await == Some(target) {
            tracing::debug!("device already in target state");
            return Ok(Applied::Unchanged);
        }
        if !self.port.set_silenced(target).await {
            return Err(HushError::PermissionDenied(Permission::NotificationPolicy));
        }
        // Platforms that cannot report their state are trusted.
        if let Some(actual) = self.port.is_silenced().await.filter(|actual| *actual != target) {
            tracing::warn!(silenced = actual, "device ignored interruption policy change");
            return Err(HushError::ActuationFailed { action });
        }
        tracing::info!(silenced = target, "interruption policy updated");
        Ok(Applied::Changed)
    }
}
