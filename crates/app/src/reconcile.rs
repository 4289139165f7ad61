//! Reconciliation workers: rebuild derived scheduling state from the rule store.
//!
//! - [`BootReconciler`] runs on device boot (and when the location provider
//!   comes back) and is the only path that rebuilds state after the platform
//!   lost every timer and region registration.
//! - [`StaleTriggerSweep`] runs periodically: it purges ledger entries older
//!   than the grace window, asks the remote side for a location resync, and
//!   retries degraded region monitoring.
//!
//! Running either worker twice with no rule change in between yields the
//! same timer and region state as running it once.

use std::sync::Arc;

use tokio::sync::Mutex;

use hush_domain::error::HushError;
use hush_domain::rule::{EventRule, LocationRule, Rule};
use hush_domain::time;

use crate::platform::{Platform, RegionsOf, SchedulerOf};
use crate::ports::{Clock, RemoteSync, RuleStore};
use crate::scheduler::RescheduleReport;

/// Outcome of a [`BootReconciler::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub triggers: RescheduleReport,
    /// Ledger entries that came due beyond the grace window while nothing
    /// was running. Their actions are not replayed.
    pub missed: usize,
    /// Regions now mirrored.
    pub regions: usize,
    /// Whether the region monitor rejected the rebuilt set.
    pub regions_degraded: bool,
}

/// Outcome of a [`StaleTriggerSweep::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Ledger entries purged.
    pub purged: u64,
    /// Whether the ledger purge failed. The rest of the sweep still runs.
    pub purge_failed: bool,
    /// Whether degraded region monitoring was resubmitted.
    pub regions_retried: bool,
    /// Whether regions are still degraded after the sweep.
    pub regions_degraded: bool,
}

fn split(rules: Vec<Rule>) -> (Vec<EventRule>, Vec<LocationRule>) {
    let mut events = Vec::new();
    let mut locations = Vec::new();
    for rule in rules {
        match rule {
            Rule::Event(rule) => events.push(rule),
            Rule::Location(rule) => locations.push(rule),
        }
    }
    (events, locations)
}

pub struct BootReconciler<P: Platform> {
    store: Arc<P::Store>,
    scheduler: Arc<SchedulerOf<P>>,
    regions: Arc<RegionsOf<P>>,
    clock: Arc<P::Clock>,
    write_lock: Arc<Mutex<()>>,
}

impl<P: Platform> BootReconciler<P> {
    pub fn new(
        store: Arc<P::Store>,
        scheduler: Arc<SchedulerOf<P>>,
        regions: Arc<RegionsOf<P>>,
        clock: Arc<P::Clock>,
        write_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            store,
            scheduler,
            regions,
            clock,
            write_lock,
        }
    }

    /// Rebuild every trigger and region from the rule store.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the rules cannot be listed. Region
    /// rejections are reported, not returned.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> Result<ReconcileReport, HushError> {
        let _guard = self.write_lock.lock().await;
        let (events, locations) = split(self.store.list_rules().await?);
        let missed = self.count_missed().await;

        let triggers = self.scheduler.reschedule_all(&events).await;
        let regions_degraded = self.regions.replace_all(&locations).await.is_err();

        let report = ReconcileReport {
            triggers,
            missed,
            regions: locations.len(),
            regions_degraded,
        };
        tracing::info!(?report, "boot reconciliation finished");
        Ok(report)
    }

    async fn count_missed(&self) -> usize {
        let now = self.clock.now();
        match self.store.list_alarms().await {
            Ok(alarms) => alarms
                .iter()
                .filter(|alarm| time::is_stale(alarm.fires_at, now))
                .inspect(|alarm| {
                    tracing::info!(
                        rule_id = %alarm.rule_id,
                        action = %alarm.action,
                        fires_at = %alarm.fires_at,
                        "trigger missed while powered off"
                    );
                })
                .count(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read alarm ledger");
                0
            }
        }
    }

    /// Rebuild only the location-rule half.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the rules cannot be listed, or
    /// [`HushError::RegistrationFailed`] when the monitor rejects the set.
    #[tracing::instrument(skip(self))]
    pub async fn run_locations(&self) -> Result<usize, HushError> {
        let _guard = self.write_lock.lock().await;
        let (_, locations) = split(self.store.list_rules().await?);
        self.regions.replace_all(&locations).await?;
        Ok(locations.len())
    }
}

pub struct StaleTriggerSweep<P: Platform> {
    store: Arc<P::Store>,
    regions: Arc<RegionsOf<P>>,
    sync: Arc<P::Sync>,
    clock: Arc<P::Clock>,
}

impl<P: Platform> StaleTriggerSweep<P> {
    pub fn new(
        store: Arc<P::Store>,
        regions: Arc<RegionsOf<P>>,
        sync: Arc<P::Sync>,
        clock: Arc<P::Clock>,
    ) -> Self {
        Self {
            store,
            regions,
            sync,
            clock,
        }
    }

    /// Purge, resync and retry. Each step runs even when an earlier one
    /// failed; failures show up in the report.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> SweepReport {
        let cutoff = time::grace_cutoff(self.clock.now());
        let (purged, purge_failed) = match self.store.delete_alarms_older_than(cutoff).await {
            Ok(purged) => (purged, false),
            Err(err) => {
                tracing::warn!(error = %err, "failed to purge alarm ledger");
                (0, true)
            }
        };

        self.sync.request_location_resync();

        let (regions_retried, regions_degraded) = match self.regions.retry_degraded().await {
            Ok(retried) => (retried, false),
            Err(err) => {
                tracing::warn!(error = %err, "region monitoring still degraded");
                (true, true)
            }
        };

        let report = SweepReport {
            purged,
            purge_failed,
            regions_retried,
            regions_degraded,
        };
        tracing::info!(?report, "stale trigger sweep finished");
        report
    }
}
