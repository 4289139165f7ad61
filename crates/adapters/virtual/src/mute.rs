//! Virtual mute switch.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use hush_app::ports::MuteActuatorPort;

/// In-memory silenced flag guarded by a policy-access toggle.
pub struct VirtualMuteSwitch {
    silenced: AtomicBool,
    policy_access: AtomicBool,
    changes: AtomicUsize,
}

impl Default for VirtualMuteSwitch {
    fn default() -> Self {
        Self {
            silenced: AtomicBool::new(false),
            policy_access: AtomicBool::new(true),
            changes: AtomicUsize::new(0),
        }
    }
}

impl VirtualMuteSwitch {
    #[must_use]
    pub fn silenced(&self) -> bool {
        self.silenced.load(Ordering::SeqCst)
    }

    /// Grant or revoke notification-policy access.
    pub fn set_policy_access(&self, granted: bool) {
        self.policy_access.store(granted, Ordering::SeqCst);
    }

    /// How many times the flag actually flipped.
    #[must_use]
    pub fn changes(&self) -> usize {
        self.changes.load(Ordering::SeqCst)
    }
}

impl MuteActuatorPort for VirtualMuteSwitch {
    fn set_silenced(&self, silenced: bool) -> impl Future<Output = bool> + Send {
        let allowed = self.policy_access.load(Ordering::SeqCst);
        if allowed && self.silenced.swap(silenced, Ordering::SeqCst) != silenced {
            self.changes.fetch_add(1, Ordering::SeqCst);
            tracing::info!(silenced, "virtual device ringer changed");
        }
        async move { allowed }
    }

    fn is_silenced(&self) -> impl Future<Output = Option<bool>> + Send {
        let silenced = self.silenced();
        async move { Some(silenced) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_flip_flag_once_when_set_twice() {
        let switch = VirtualMuteSwitch::default();

        assert!(switch.set_silenced(true).await);
        assert!(switch.set_silenced(true).await);

        assert_eq!(switch.is_silenced().await, Some(true));
        assert_eq!(switch.changes(), 1);
    }

    #[tokio::test]
    async fn should_refuse_without_policy_access() {
        let switch = VirtualMuteSwitch::default();
        switch.set_policy_access(false);

        assert!(!switch.set_silenced(true).await);
        assert!(!switch.silenced());
    }
}
