//! Trigger scheduler: compiles event rules into timer registrations.
//!
//! Owns the in-memory registry of outstanding triggers. Every `(rule, action)`
//! pair maps to one [`TriggerKey`] and therefore to at most one timer
//! registration: scheduling the same pair again cancels before it sets.
//! The registry, the timer port and the alarm ledger are only mutated while
//! the registry lock is held.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use hush_domain::action::Action;
use hush_domain::error::HushError;
use hush_domain::id::RuleId;
use hush_domain::rule::EventRule;
use hush_domain::time::{self, Timestamp};
use hush_domain::trigger::{AlarmRecord, Trigger, TriggerKey};

use crate::ports::{Clock, Precision, RuleStore, TimerHandle, TimerPort};

/// Outcome of [`TriggerScheduler::reschedule_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RescheduleReport {
    /// Triggers now registered with the timer port.
    pub armed: usize,
    /// Rules skipped because their window ended before the grace cutoff.
    pub expired: usize,
    /// Rules skipped because they failed validation.
    pub invalid: usize,
    /// Triggers dropped because their rule is no longer in the set.
    pub cancelled: usize,
    /// Triggers the timer port refused.
    pub failed: usize,
}

pub struct TriggerScheduler<T, S, C> {
    timer: Arc<T>,
    store: Arc<S>,
    clock: Arc<C>,
    outstanding: Mutex<BTreeMap<TriggerKey, Trigger>>,
}

impl<T, S, C> TriggerScheduler<T, S, C>
where
    T: TimerPort,
    S: RuleStore,
    C: Clock,
{
    pub fn new(timer: Arc<T>, store: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            timer,
            store,
            clock,
            outstanding: Mutex::new(BTreeMap::new()),
        }
    }

    /// Register a one-shot wake-up, replacing any registration for the same
    /// `(rule_id, action)`.
    ///
    /// # Errors
    ///
    /// Returns an error when the timer port refuses even an inexact wake-up.
    #[tracing::instrument(skip(self))]
    pub async fn schedule(
        &self,
        rule_id: RuleId,
        fires_at: Timestamp,
        action: Action,
    ) -> Result<TimerHandle, HushError> {
        let mut outstanding = self.outstanding.lock().await;
        self.install(&mut outstanding, Trigger::new(rule_id, action, fires_at))
            .await
    }

    /// Cancel the registration for `(rule_id, action)`. Missing registrations
    /// are not an error.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, rule_id: RuleId, action: Action) {
        let mut outstanding = self.outstanding.lock().await;
        self.uninstall(&mut outstanding, rule_id, action).await;
    }

    /// Cancel both registrations of a rule.
    pub async fn cancel_rule(&self, rule_id: RuleId) {
        let mut outstanding = self.outstanding.lock().await;
        for action in Action::ALL {
            self.uninstall(&mut outstanding, rule_id, action).await;
        }
    }

    /// Compile one event rule and register its triggers.
    ///
    /// Triggers already past the grace window are not registered; past-due
    /// ones inside it fire immediately.
    ///
    /// # Errors
    ///
    /// Returns [`HushError::Validation`] for an empty or inverted window,
    /// before anything is registered, or the first timer port failure.
    /// On failure no trigger of the rule is left registered, so a rule is
    /// never muted without its unmute.
    #[tracing::instrument(skip(self, rule), fields(rule_id = %rule.id))]
    pub async fn arm(&self, rule: &EventRule) -> Result<Vec<TimerHandle>, HushError> {
        rule.validate()?;
        let now = self.clock.now();
        let mut outstanding = self.outstanding.lock().await;
        let mut handles = Vec::new();
        for trigger in Trigger::reinstate(rule, now) {
            match self.install(&mut outstanding, trigger).await {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    tracing::warn!(key = %trigger.key, error = %err, "failed to arm trigger, rolling back rule");
                    for action in Action::ALL {
                        self.uninstall(&mut outstanding, rule.id, action).await;
                    }
                    return Err(err);
                }
            }
        }
        if handles.is_empty() {
            tracing::debug!("rule window already elapsed, nothing to arm");
        }
        Ok(handles)
    }

    /// Rebuild the registration set from `rules`.
    ///
    /// The result depends only on `rules` and the current time: triggers of
    /// rules absent from `rules` are cancelled, every reinstated trigger is
    /// cancelled and set again.
    #[tracing::instrument(skip_all, fields(rules = rules.len()))]
    pub async fn reschedule_all(&self, rules: &[EventRule]) -> RescheduleReport {
        let now = self.clock.now();
        let mut report = RescheduleReport::default();
        let mut desired = BTreeMap::new();

        for rule in rules {
            if let Err(err) = rule.validate() {
                tracing::warn!(rule_id = %rule.id, error = %err, "skipping invalid event rule");
                report.invalid += 1;
                continue;
            }
            if time::is_stale(rule.end, now) {
                tracing::debug!(rule_id = %rule.id, "skipping expired event rule");
                report.expired += 1;
                continue;
            }
            for trigger in Trigger::reinstate(rule, now) {
                desired.insert(trigger.key, trigger);
            }
        }

        let mut outstanding = self.outstanding.lock().await;
        let obsolete: Vec<Trigger> = outstanding
            .values()
            .filter(|trigger| !desired.contains_key(&trigger.key))
            .copied()
            .collect();
        for trigger in obsolete {
            self.uninstall(&mut outstanding, trigger.rule_id, trigger.action)
                .await;
            report.cancelled += 1;
        }

        for trigger in desired.into_values() {
            match self.install(&mut outstanding, trigger).await {
                Ok(_) => report.armed += 1,
                Err(err) => {
                    tracing::warn!(key = %trigger.key, error = %err, "failed to arm trigger");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(?report, "event triggers rescheduled");
        report
    }

    /// Drop a delivered trigger from the registry.
    ///
    /// Only the registration that was set for `fires_at` is dropped: a late
    /// delivery from a timer replaced since then leaves the newer one alone.
    /// Touches neither the timer port nor the store.
    pub async fn forget_fired(&self, rule_id: RuleId, action: Action, fires_at: Timestamp) {
        let key = TriggerKey::new(rule_id, action);
        let mut outstanding = self.outstanding.lock().await;
        match outstanding.get(&key) {
            Some(trigger) if trigger.fires_at == fires_at => {
                outstanding.remove(&key);
            }
            Some(trigger) => {
                tracing::debug!(%key, registered = %trigger.fires_at, delivered = %fires_at, "delivery from a replaced timer");
            }
            None => tracing::debug!(%key, "fired trigger was not in the registry"),
        }
    }

    /// Snapshot of the outstanding triggers, ordered by key.
    pub async fn outstanding(&self) -> Vec<Trigger> {
        self.outstanding.lock().await.values().copied().collect()
    }

    async fn install(
        &self,
        outstanding: &mut BTreeMap<TriggerKey, Trigger>,
        trigger: Trigger,
    ) -> Result<TimerHandle, HushError> {
        // The platform may still hold a registration from before a restart.
        outstanding.remove(&trigger.key);
        self.timer.cancel(TimerHandle::from(trigger.key)).await;

        let handle = match self.timer.set(trigger, Precision::Exact).await {
            Ok(handle) => handle,
            Err(HushError::TimerRejected { fires_at }) => {
                tracing::warn!(key = %trigger.key, %fires_at, "exact timer rejected, falling back to inexact");
                self.timer.set(trigger, Precision::Inexact).await?
            }
            Err(err) => return Err(err),
        };

        if let Err(err) = self.store.record_alarm(AlarmRecord::from(&trigger)).await {
            tracing::warn!(key = %trigger.key, error = %err, "failed to record alarm in ledger");
        }
        outstanding.insert(trigger.key, trigger);
        tracing::debug!(key = %trigger.key, action = %trigger.action, fires_at = %trigger.fires_at, "trigger armed");
        Ok(handle)
    }

    async fn uninstall(
        &self,
        outstanding: &mut BTreeMap<TriggerKey, Trigger>,
        rule_id: RuleId,
        action: Action,
    ) {
        let key = TriggerKey::new(rule_id, action);
        outstanding.remove(&key);
        self.timer.cancel(TimerHandle::from(key)).await;
        if let Err(err) = self.store.delete_alarm(rule_id, action).await {
            tracing::warn!(%key, error = %err, "failed to remove alarm from ledger");
        }
    }
}
