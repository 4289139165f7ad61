//! Notice debouncing on top of the [`UserNotifier`] port.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::ports::{Notice, UserNotifier};

/// Forwards notices to the user, remembering which one-per-session prompts
/// were already shown.
pub struct Notices<N> {
    notifier: Arc<N>,
    shown: Mutex<HashSet<Notice>>,
}

impl<N: UserNotifier> Notices<N> {
    pub fn new(notifier: Arc<N>) -> Self {
        Self {
            notifier,
            shown: Mutex::new(HashSet::new()),
        }
    }

    /// Surface `notice` every time.
    pub fn notify(&self, notice: Notice) {
        tracing::info!(?notice, "surfacing notice");
        self.notifier.notify(notice);
    }

    /// Surface `notice` only the first time in this session.
    /// Returns whether it was shown now.
    pub fn notify_once(&self, notice: Notice) -> bool {
        let first = self
            .shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(notice);
        if first {
            self.notify(notice);
        } else {
            tracing::debug!(?notice, "notice already shown this session");
        }
        first
    }
}
