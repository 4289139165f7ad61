//! Region monitor port: platform geofencing.
//!
//! The platform takes a full replacement set of regions rather than
//! incremental changes. Transitions and error codes are delivered back
//! asynchronously through the dispatcher.

use std::future::Future;

use hush_domain::error::HushError;
use hush_domain::region::RegionRegistration;

/// Platform geofence monitor.
pub trait RegionMonitorPort: Send + Sync {
    /// Replace the watched set with `regions`.
    ///
    /// Fails with [`HushError::RegistrationFailed`] when the platform
    /// rejects the set (permission missing, capacity exceeded, …).
    fn set_watched_regions(
        &self,
        regions: Vec<RegionRegistration>,
    ) -> impl Future<Output = Result<(), HushError>> + Send;

    /// Whether location access is currently granted.
    fn permission_granted(&self) -> impl Future<Output = bool> + Send;
}
