//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`HushError`]
//! via `#[from]`. Adapters box their own error types into
//! [`HushError::Storage`].

use std::fmt;

use crate::action::Action;
use crate::time::Timestamp;

/// Top-level error for every fallible operation in the engine.
#[derive(Debug, thiserror::Error)]
pub enum HushError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A referenced record does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A platform permission required for the operation is missing.
    #[error("permission denied: {0}")]
    PermissionDenied(Permission),

    /// The region monitor rejected the submitted region set.
    #[error("region registration failed")]
    RegistrationFailed(#[from] RegistrationError),

    /// The platform refused an exact wake-up at the requested time.
    #[error("timer rejected for {fires_at}")]
    TimerRejected { fires_at: Timestamp },

    /// The platform accepted a state change but the device did not reach it.
    #[error("device did not reach the {action} state")]
    ActuationFailed { action: Action },

    /// The rule store failed.
    #[error("storage error")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// `start` and `end` of an event rule are equal.
    #[error("event window is empty")]
    EmptyWindow,

    /// `end` of an event rule comes before `start`.
    #[error("event window ends before it starts")]
    InvertedWindow,

    /// The region radius is zero, negative or not a finite number.
    #[error("region radius must be a positive number of meters, got {0}")]
    InvalidRadius(f64),

    /// A latitude or longitude is outside its valid range.
    #[error("coordinates out of range: ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    /// An edit tried to change the kind of a rule.
    #[error("a rule cannot change between event and location kinds")]
    KindChanged,
}

/// A lookup by id returned nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Why the region monitor refused a registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// Location permission is not granted.
    #[error("location permission not granted")]
    PermissionMissing,

    /// More regions were submitted than the monitor can watch.
    #[error("monitor capacity of {capacity} regions exceeded")]
    CapacityExceeded { capacity: usize },

    /// The platform reported an error code.
    #[error("monitor error code {0}")]
    Platform(i32),
}

/// Platform permissions the engine depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Fine location, needed for region monitoring.
    Location,
    /// Activity recognition, re-armed alongside region monitoring.
    Activity,
    /// Access to the interruption policy, needed to mute the device.
    NotificationPolicy,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Location => f.write_str("location"),
            Self::Activity => f.write_str("activity"),
            Self::NotificationPolicy => f.write_str("notification_policy"),
        }
    }
}
