//! Notifier that writes notices to the log.

use std::sync::{Mutex, PoisonError};

use hush_app::ports::{Notice, UserNotifier};

/// Logs every [`Notice`] and keeps them in order for inspection.
#[derive(Default)]
pub struct LogNotifier {
    history: Mutex<Vec<Notice>>,
}

impl LogNotifier {
    #[must_use]
    pub fn history(&self) -> Vec<Notice> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl UserNotifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::PolicyAccessRequired => {
                tracing::warn!("grant notification policy access to let hush silence the device");
            }
            Notice::LocationPermissionRequired => {
                tracing::warn!("grant location access to enable location rules");
            }
            Notice::LocationProviderDisabled => {
                tracing::warn!("location is off, automatic silencing by place is paused");
            }
            Notice::LocationProviderRestored => {
                tracing::info!("location is back, automatic silencing by place resumed");
            }
            Notice::ActuationFailed { action } => {
                tracing::warn!(%action, "could not change the ringer");
            }
        }
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}
