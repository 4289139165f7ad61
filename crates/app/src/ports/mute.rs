//! Mute port: the platform's interruption-policy switch.

use std::future::Future;

/// Platform notification-policy API.
pub trait MuteActuatorPort: Send + Sync {
    /// Set the device's silenced flag. Idempotent.
    ///
    /// Returns `false` when policy access is not granted (nothing changed).
    fn set_silenced(&self, silenced: bool) -> impl Future<Output = bool> + Send;

    /// Current silenced flag, or `None` when the platform cannot tell.
    fn is_silenced(&self) -> impl Future<Output = Option<bool>> + Send;
}
