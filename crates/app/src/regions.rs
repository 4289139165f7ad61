//! Region trigger manager: mirrors active location rules into the region
//! monitor and turns transitions into actions.
//!
//! The monitor only accepts a full replacement set, so this manager keeps
//! the authoritative mirror of what the monitor currently watches. The mirror
//! is a cache: it can be rebuilt from the rule store at any time. Every
//! mirror update is submitted to the monitor under the same lock, so a
//! transition never observes a half-applied update.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use hush_domain::action::Action;
use hush_domain::error::HushError;
use hush_domain::id::RuleId;
use hush_domain::region::{RegionKey, RegionRegistration, Transition};
use hush_domain::rule::LocationRule;

use crate::ports::RegionMonitorPort;

#[derive(Default)]
struct Mirror {
    regions: BTreeMap<RegionKey, RegionRegistration>,
    /// Rules whose regions the monitor has not accepted yet.
    degraded: BTreeSet<RuleId>,
}

pub struct RegionTriggerManager<M> {
    monitor: Arc<M>,
    mirror: Mutex<Mirror>,
}

impl<M: RegionMonitorPort> RegionTriggerManager<M> {
    pub fn new(monitor: Arc<M>) -> Self {
        Self {
            monitor,
            mirror: Mutex::new(Mirror::default()),
        }
    }

    /// Add or replace the region of `rule` and resubmit the whole set.
    ///
    /// # Errors
    ///
    /// Returns [`HushError::RegistrationFailed`] when the monitor rejects the
    /// set. The region stays in the mirror, flagged degraded, and is retried
    /// by the next sweep.
    #[tracing::instrument(skip(self, rule), fields(rule_id = %rule.id))]
    pub async fn activate(&self, rule: &LocationRule) -> Result<(), HushError> {
        let mut mirror = self.mirror.lock().await;
        let registration = RegionRegistration::from(rule);
        mirror.regions.insert(registration.key.clone(), registration);
        self.submit(&mut mirror).await
    }

    /// Remove the region of `rule_id` and resubmit the whole set.
    ///
    /// # Errors
    ///
    /// Returns [`HushError::RegistrationFailed`] when the monitor rejects
    /// the remaining set.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate(&self, rule_id: RuleId) -> Result<(), HushError> {
        let mut mirror = self.mirror.lock().await;
        mirror.regions.remove(&RegionKey::for_rule(rule_id));
        mirror.degraded.remove(&rule_id);
        self.submit(&mut mirror).await
    }

    /// Replace the mirror with exactly the regions of `rules` and resubmit.
    ///
    /// # Errors
    ///
    /// Returns [`HushError::RegistrationFailed`] when the monitor rejects the set.
    #[tracing::instrument(skip_all, fields(rules = rules.len()))]
    pub async fn replace_all(&self, rules: &[LocationRule]) -> Result<(), HushError> {
        let mut mirror = self.mirror.lock().await;
        mirror.regions = rules
            .iter()
            .map(|rule| {
                let registration = RegionRegistration::from(rule);
                (registration.key.clone(), registration)
            })
            .collect();
        let live: BTreeSet<RuleId> = rules.iter().map(|rule| rule.id).collect();
        mirror.degraded.retain(|id| live.contains(id));
        self.submit(&mut mirror).await
    }

    /// Resolve a delivered transition to the action it calls for.
    ///
    /// Returns `None` for keys no longer in the mirror: the rule was deleted
    /// after the platform queued the transition.
    pub async fn resolve_transition(
        &self,
        key: &RegionKey,
        transition: Transition,
    ) -> Option<Action> {
        let mirror = self.mirror.lock().await;
        if mirror.regions.contains_key(key) {
            Some(transition.action())
        } else {
            tracing::debug!(%key, %transition, "dropping transition for unknown region");
            None
        }
    }

    /// Flag every mirrored region as needing resubmission.
    pub async fn mark_degraded(&self) {
        let mut mirror = self.mirror.lock().await;
        mirror.degraded = mirror.regions.values().map(|reg| reg.rule_id).collect();
    }

    /// Resubmit the mirror if any region is flagged degraded.
    /// Returns whether a resubmission was attempted.
    ///
    /// # Errors
    ///
    /// Returns [`HushError::RegistrationFailed`] when the monitor still rejects the set.
    pub async fn retry_degraded(&self) -> Result<bool, HushError> {
        let mut mirror = self.mirror.lock().await;
        if mirror.degraded.is_empty() {
            return Ok(false);
        }
        tracing::info!(degraded = mirror.degraded.len(), "retrying degraded region monitoring");
        self.submit(&mut mirror).await.map(|()| true)
    }

    /// Snapshot of the mirrored registrations, ordered by key.
    pub async fn watched(&self) -> Vec<RegionRegistration> {
        self.mirror.lock().await.regions.values().cloned().collect()
    }

    /// Rules whose monitoring is degraded.
    pub async fn degraded(&self) -> Vec<RuleId> {
        self.mirror.lock().await.degraded.iter().copied().collect()
    }

    async fn submit(&self, mirror: &mut Mirror) -> Result<(), HushError> {
        let regions: Vec<RegionRegistration> = mirror.regions.values().cloned().collect();
        let count = regions.len();
        match self.monitor.set_watched_regions(regions).await {
            Ok(()) => {
                mirror.degraded.clear();
                tracing::debug!(count, "region set submitted");
                Ok(())
            }
            Err(err) => {
                mirror.degraded = mirror.regions.values().map(|reg| reg.rule_id).collect();
                tracing::warn!(count, error = %err, "region monitor rejected region set");
                Err(err)
            }
        }
    }
}
