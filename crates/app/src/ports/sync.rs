//! Remote sync port: hand-off to the external synchronization service.

/// Fire-and-forget requests to the remote synchronization collaborator.
pub trait RemoteSync: Send + Sync {
    /// Ask for location-rule data to be refreshed from the remote source.
    /// Must return immediately; the outcome is not reported back.
    fn request_location_resync(&self);
}
