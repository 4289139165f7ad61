//! Time and timestamp helpers.

use chrono::{DateTime, TimeDelta, Utc};

/// UTC timestamp used for trigger fire times, rule windows, ledger entries.
pub type Timestamp = DateTime<Utc>;

/// Tolerance for reinstating recently-elapsed triggers.
///
/// A trigger whose fire time is older than `now - GRACE_WINDOW` is stale.
pub const GRACE_WINDOW: TimeDelta = TimeDelta::minutes(10);

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// The oldest fire time still inside the grace window at `now`.
#[must_use]
pub fn grace_cutoff(now: Timestamp) -> Timestamp {
    now - GRACE_WINDOW
}

/// Whether `fires_at` fell out of the grace window at `now`.
///
/// The boundary itself (`fires_at == now - GRACE_WINDOW`) is still fresh.
#[must_use]
pub fn is_stale(fires_at: Timestamp, now: Timestamp) -> bool {
    fires_at < grace_cutoff(now)
}

/// Build a timestamp from epoch milliseconds, if representable.
#[must_use]
pub fn from_millis(millis: i64) -> Option<Timestamp> {
    DateTime::from_timestamp_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_keep_fire_time_nine_minutes_old() {
        let now = now();
        assert!(!is_stale(now - TimeDelta::minutes(9), now));
    }

    #[test]
    fn should_mark_fire_time_eleven_minutes_old_as_stale() {
        let now = now();
        assert!(is_stale(now - TimeDelta::minutes(11), now));
    }

    #[test]
    fn should_keep_fire_time_exactly_on_the_boundary() {
        let now = now();
        assert!(!is_stale(now - GRACE_WINDOW, now));
    }

    #[test]
    fn should_build_timestamp_from_millis() {
        let ts = from_millis(1_700_000_000_000).unwrap();
        assert_eq!(ts.timestamp_millis(), 1_700_000_000_000);
    }
}
