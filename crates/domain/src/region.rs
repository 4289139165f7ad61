//! Region registrations and geofence transitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::id::RuleId;
use crate::rule::{GeoPoint, LocationRule};

/// Key under which a region is registered with the monitor.
///
/// Regions are keyed by the owning rule id, rendered as a string because
/// the monitor hands keys back verbatim and may hold keys of deleted rules.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionKey(String);

impl RegionKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn for_rule(rule_id: RuleId) -> Self {
        Self(rule_id.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A circular region mirrored 1:1 from an active location rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRegistration {
    pub key: RegionKey,
    pub center: GeoPoint,
    pub radius_m: f64,
    pub rule_id: RuleId,
}

impl From<&LocationRule> for RegionRegistration {
    fn from(rule: &LocationRule) -> Self {
        Self {
            key: RegionKey::for_rule(rule.id),
            center: rule.location.center,
            radius_m: rule.location.radius_m,
            rule_id: rule.id,
        }
    }
}

impl RegionRegistration {
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        self.center.distance_to(point) <= self.radius_m
    }
}

/// Direction of a geofence crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Enter,
    Exit,
}

impl Transition {
    /// `Enter` silences, `Exit` restores.
    #[must_use]
    pub fn action(self) -> Action {
        match self {
            Self::Enter => Action::Mute,
            Self::Exit => Action::Unmute,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enter => f.write_str("enter"),
            Self::Exit => f.write_str("exit"),
        }
    }
}
