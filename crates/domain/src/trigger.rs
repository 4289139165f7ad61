//! Trigger: a concrete one-shot timer derived from an event rule.
//!
//! Triggers are ephemeral: they are compiled from [`EventRule`]s and can be
//! thrown away and rebuilt at any time. Each `(rule, action)` pair maps to a
//! stable [`TriggerKey`], so at most one registration per pair exists and a
//! restarted process can still address a registration it did not create.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::id::RuleId;
use crate::rule::EventRule;
use crate::time::{self, Timestamp};

/// Stable key of a trigger, `uuid v5(rule_id, action)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TriggerKey(uuid::Uuid);

impl TriggerKey {
    #[must_use]
    pub fn new(rule_id: RuleId, action: Action) -> Self {
        Self(uuid::Uuid::new_v5(
            &rule_id.as_uuid(),
            action.as_str().as_bytes(),
        ))
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A scheduled instruction: apply `action` at `fires_at` on behalf of `rule_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub key: TriggerKey,
    pub rule_id: RuleId,
    pub action: Action,
    pub fires_at: Timestamp,
}

impl Trigger {
    #[must_use]
    pub fn new(rule_id: RuleId, action: Action, fires_at: Timestamp) -> Self {
        Self {
            key: TriggerKey::new(rule_id, action),
            rule_id,
            action,
            fires_at,
        }
    }

    /// Compile an event rule into its `mute` at start / `unmute` at end pair.
    #[must_use]
    pub fn compile(rule: &EventRule) -> [Self; 2] {
        [
            Self::new(rule.id, Action::Mute, rule.start),
            Self::new(rule.id, Action::Unmute, rule.end),
        ]
    }

    /// Triggers of `rule` still worth arming at `now`.
    ///
    /// A rule whose end fell out of the grace window yields nothing. Otherwise
    /// every trigger not yet stale is kept, and past-due ones are pulled
    /// forward to fire at `now`.
    #[must_use]
    pub fn reinstate(rule: &EventRule, now: Timestamp) -> Vec<Self> {
        if time::is_stale(rule.end, now) {
            return Vec::new();
        }
        Self::compile(rule)
            .into_iter()
            .filter(|trigger| !time::is_stale(trigger.fires_at, now))
            .map(|trigger| Self {
                fires_at: trigger.fires_at.max(now),
                ..trigger
            })
            .collect()
    }
}

/// A row of the rule store's auxiliary alarm ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRecord {
    pub rule_id: RuleId,
    pub action: Action,
    pub fires_at: Timestamp,
}

impl From<&Trigger> for AlarmRecord {
    fn from(trigger: &Trigger) -> Self {
        Self {
            rule_id: trigger.rule_id,
            action: trigger.action,
            fires_at: trigger.fires_at,
        }
    }
}
