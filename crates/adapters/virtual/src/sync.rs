//! Remote sync stand-in.

use std::sync::atomic::{AtomicUsize, Ordering};

use hush_app::ports::RemoteSync;

/// Accepts resync requests and only counts them.
#[derive(Default)]
pub struct NoopRemoteSync {
    requests: AtomicUsize,
}

impl NoopRemoteSync {
    #[must_use]
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl RemoteSync for NoopRemoteSync {
    fn request_location_resync(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("location resync requested");
    }
}
