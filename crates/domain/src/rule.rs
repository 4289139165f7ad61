//! Rule: user intent to silence the device during a time window or inside
//! a region.
//!
//! Rules are the single source of truth. Triggers and region registrations
//! are derived from them and may be rebuilt at any time.

use serde::{Deserialize, Serialize};

use crate::error::{HushError, ValidationError};
use crate::id::{CreatorId, RuleId};
use crate::time::Timestamp;

/// A quiet rule, anchored either to a calendar event or to a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rule {
    Event(EventRule),
    Location(LocationRule),
}

impl Rule {
    #[must_use]
    pub fn id(&self) -> RuleId {
        match self {
            Self::Event(rule) => rule.id,
            Self::Location(rule) => rule.id,
        }
    }

    /// Short kind label used in logs and storage.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Event(_) => "event",
            Self::Location(_) => "location",
        }
    }

    /// Check domain invariants of the underlying variant.
    ///
    /// # Errors
    ///
    /// Returns [`HushError::Validation`] when the variant's invariants fail.
    pub fn validate(&self) -> Result<(), HushError> {
        match self {
            Self::Event(rule) => rule.validate(),
            Self::Location(rule) => rule.validate(),
        }
    }

    #[must_use]
    pub fn as_event(&self) -> Option<&EventRule> {
        match self {
            Self::Event(rule) => Some(rule),
            Self::Location(_) => None,
        }
    }
}

impl From<EventRule> for Rule {
    fn from(rule: EventRule) -> Self {
        Self::Event(rule)
    }
}

impl From<LocationRule> for Rule {
    fn from(rule: LocationRule) -> Self {
        Self::Location(rule)
    }
}

/// Silence the device for the time span of a calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRule {
    pub id: RuleId,
    pub creator: CreatorId,
    /// External calendar event id.
    pub event_ref: String,
    pub start: Timestamp,
    pub end: Timestamp,
}

impl EventRule {
    #[must_use]
    pub fn new(
        creator: CreatorId,
        event_ref: impl Into<String>,
        start: Timestamp,
        end: Timestamp,
    ) -> Self {
        Self {
            id: RuleId::new(),
            creator,
            event_ref: event_ref.into(),
            start,
            end,
        }
    }

    /// # Errors
    ///
    /// Returns [`HushError::Validation`] when:
    /// - `start == end` ([`ValidationError::EmptyWindow`])
    /// - `end < start` ([`ValidationError::InvertedWindow`])
    pub fn validate(&self) -> Result<(), HushError> {
        if self.start == self.end {
            return Err(ValidationError::EmptyWindow.into());
        }
        if self.end < self.start {
            return Err(ValidationError::InvertedWindow.into());
        }
        Ok(())
    }
}

/// A point on the earth's surface, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;

    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in meters (haversine).
    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * Self::EARTH_RADIUS_M * a.sqrt().asin()
    }

    fn is_valid(self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A stored place: center plus radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// External location record id.
    pub location_ref: String,
    pub center: GeoPoint,
    pub radius_m: f64,
}

/// Silence the device whenever it is inside a circular region.
///
/// Open-ended: active until the rule is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRule {
    pub id: RuleId,
    pub creator: CreatorId,
    pub location: Location,
}

impl LocationRule {
    #[must_use]
    pub fn new(creator: CreatorId, location: Location) -> Self {
        Self {
            id: RuleId::new(),
            creator,
            location,
        }
    }

    /// # Errors
    ///
    /// Returns [`HushError::Validation`] when:
    /// - the radius is not a finite positive number ([`ValidationError::InvalidRadius`])
    /// - the center lies outside valid coordinates ([`ValidationError::InvalidCoordinates`])
    pub fn validate(&self) -> Result<(), HushError> {
        let radius = self.location.radius_m;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ValidationError::InvalidRadius(radius).into());
        }
        let center = self.location.center;
        if !center.is_valid() {
            return Err(ValidationError::InvalidCoordinates {
                latitude: center.latitude,
                longitude: center.longitude,
            }
            .into());
        }
        Ok(())
    }

    /// Whether `point` is inside the region (boundary included).
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        self.location.center.distance_to(point) <= self.location.radius_m
    }
}
