//! Rule store port: the authoritative table of rules plus the alarm ledger.

use std::future::Future;

use hush_domain::action::Action;
use hush_domain::error::HushError;
use hush_domain::id::RuleId;
use hush_domain::rule::Rule;
use hush_domain::time::Timestamp;
use hush_domain::trigger::AlarmRecord;

/// Durable storage for [`Rule`]s and the auxiliary ledger of scheduled alarms.
pub trait RuleStore: Send + Sync {
    /// Get all rules.
    fn list_rules(&self) -> impl Future<Output = Result<Vec<Rule>, HushError>> + Send;

    /// Get a rule by its unique identifier.
    fn find_rule(&self, id: RuleId)
    -> impl Future<Output = Result<Option<Rule>, HushError>> + Send;

    /// Persist a new rule.
    fn insert_rule(&self, rule: Rule) -> impl Future<Output = Result<Rule, HushError>> + Send;

    /// Replace an existing rule.
    ///
    /// Returns [`HushError::NotFound`] when no rule with the same id exists.
    fn update_rule(&self, rule: Rule) -> impl Future<Output = Result<Rule, HushError>> + Send;

    /// Delete a rule and its ledger entries. Deleting a missing rule is not an error.
    fn delete_rule(&self, id: RuleId) -> impl Future<Output = Result<(), HushError>> + Send;

    /// Record (or replace) the ledger entry for `(alarm.rule_id, alarm.action)`.
    fn record_alarm(&self, alarm: AlarmRecord)
    -> impl Future<Output = Result<(), HushError>> + Send;

    /// Remove the ledger entry for a rule/action pair, if any.
    fn delete_alarm(
        &self,
        rule_id: RuleId,
        action: Action,
    ) -> impl Future<Output = Result<(), HushError>> + Send;

    /// Remove every ledger entry firing strictly before `cutoff`.
    /// Returns how many entries were removed.
    fn delete_alarms_older_than(
        &self,
        cutoff: Timestamp,
    ) -> impl Future<Output = Result<u64, HushError>> + Send;

    /// Get all ledger entries, earliest first.
    fn list_alarms(&self) -> impl Future<Output = Result<Vec<AlarmRecord>, HushError>> + Send;
}
