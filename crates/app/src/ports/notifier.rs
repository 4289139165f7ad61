//! User notifier port: non-blocking user-facing warnings.

use hush_domain::action::Action;

/// A warning or prompt surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notice {
    /// Notification-policy access is missing; the device cannot be muted.
    PolicyAccessRequired,
    /// Location access is missing; location rules run degraded.
    LocationPermissionRequired,
    /// The location provider was switched off; automatic silencing is paused.
    LocationProviderDisabled,
    /// The location provider is back.
    LocationProviderRestored,
    /// Applying an action failed for a reason other than permissions.
    ActuationFailed { action: Action },
}

/// Delivers [`Notice`]s to the user. Must not block.
pub trait UserNotifier: Send + Sync {
    fn notify(&self, notice: Notice);
}
