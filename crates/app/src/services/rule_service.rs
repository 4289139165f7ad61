//! Rule service: create, edit and delete rules.
//!
//! Each call updates the derived trigger and region state before returning,
//! so a caller's next read of the active rules matches the active triggers.
//! Old registrations are always cancelled before replacements are created.
//! Calls serialize with the boot reconciler through a shared write lock.

use std::sync::Arc;

use tokio::sync::Mutex;

use hush_domain::error::{HushError, NotFoundError, ValidationError};
use hush_domain::id::RuleId;
use hush_domain::rule::Rule;

use crate::platform::{Platform, RegionsOf, SchedulerOf};
use crate::ports::RuleStore;

pub struct RuleService<P: Platform> {
    store: Arc<P::Store>,
    scheduler: Arc<SchedulerOf<P>>,
    regions: Arc<RegionsOf<P>>,
    write_lock: Arc<Mutex<()>>,
}

impl<P: Platform> RuleService<P> {
    pub fn new(
        store: Arc<P::Store>,
        scheduler: Arc<SchedulerOf<P>>,
        regions: Arc<RegionsOf<P>>,
        write_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            store,
            scheduler,
            regions,
            write_lock,
        }
    }

    /// Persist a new rule and install its triggers or region.
    ///
    /// # Errors
    ///
    /// Returns [`HushError::Validation`] if invariants fail (nothing is
    /// stored), a storage error from the store, or a timer port failure.
    /// After a timer port failure the rule is removed again.
    /// A rejected region registration is not an error: the rule is kept
    /// and flagged degraded.
    #[tracing::instrument(skip(self, rule), fields(rule_id = %rule.id(), kind = rule.kind()))]
    pub async fn create_rule(&self, rule: Rule) -> Result<Rule, HushError> {
        rule.validate()?;
        let _guard = self.write_lock.lock().await;
        let rule = self.store.insert_rule(rule).await?;
        if let Err(err) = self.install(&rule).await {
            if let Err(cleanup) = self.store.delete_rule(rule.id()).await {
                tracing::error!(error = %cleanup, "failed to remove rule that could not be armed");
            }
            return Err(err);
        }
        Ok(rule)
    }

    /// Replace an existing rule.
    ///
    /// The store is written first; old registrations are then cancelled
    /// before the new ones are created. When the new version cannot be
    /// armed, the previous version is stored and armed again.
    ///
    /// # Errors
    ///
    /// Returns [`HushError::NotFound`] when the rule does not exist,
    /// [`HushError::Validation`] if invariants fail or the kind changes,
    /// or an error from the store or the timer port.
    #[tracing::instrument(skip(self, rule), fields(rule_id = %rule.id(), kind = rule.kind()))]
    pub async fn edit_rule(&self, rule: Rule) -> Result<Rule, HushError> {
        rule.validate()?;
        let _guard = self.write_lock.lock().await;
        let existing = self.find(rule.id()).await?;
        if existing.kind() != rule.kind() {
            return Err(ValidationError::KindChanged.into());
        }

        let rule = self.store.update_rule(rule).await?;
        if let Rule::Event(old) = &existing {
            self.scheduler.cancel_rule(old.id).await;
        }
        if let Err(err) = self.install(&rule).await {
            tracing::warn!(error = %err, "edited rule could not be armed, restoring previous version");
            self.restore(&existing).await;
            return Err(err);
        }
        Ok(rule)
    }

    /// Delete a rule after cancelling its triggers or region.
    ///
    /// # Errors
    ///
    /// Returns [`HushError::NotFound`] when the rule does not exist, or a
    /// storage error from the store.
    #[tracing::instrument(skip(self))]
    pub async fn delete_rule(&self, id: RuleId) -> Result<(), HushError> {
        let _guard = self.write_lock.lock().await;
        match self.find(id).await? {
            Rule::Event(rule) => self.scheduler.cancel_rule(rule.id).await,
            Rule::Location(rule) => {
                if let Err(err) = self.regions.deactivate(rule.id).await {
                    tracing::warn!(error = %err, "region removal not accepted, left to the next sweep");
                }
            }
        }
        self.store.delete_rule(id).await
    }

    /// Look up a rule by id.
    ///
    /// # Errors
    ///
    /// Returns [`HushError::NotFound`] when no rule with `id` exists.
    pub async fn get_rule(&self, id: RuleId) -> Result<Rule, HushError> {
        self.find(id).await
    }

    /// List all rules.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the store.
    pub async fn list_rules(&self) -> Result<Vec<Rule>, HushError> {
        self.store.list_rules().await
    }

    async fn find(&self, id: RuleId) -> Result<Rule, HushError> {
        self.store.find_rule(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Rule",
                id: id.to_string(),
            }
            .into()
        })
    }

    async fn restore(&self, previous: &Rule) {
        if let Err(err) = self.store.update_rule(previous.clone()).await {
            tracing::error!(error = %err, "failed to restore previous rule version");
            return;
        }
        if let Err(err) = self.install(previous).await {
            tracing::error!(error = %err, "failed to re-arm previous rule version");
        }
    }

    async fn install(&self, rule: &Rule) -> Result<(), HushError> {
        match rule {
            Rule::Event(rule) => {
                self.scheduler.arm(rule).await?;
            }
            Rule::Location(rule) => {
                if let Err(err) = self.regions.activate(rule).await {
                    tracing::warn!(error = %err, "region registration degraded, will retry");
                }
            }
        }
        Ok(())
    }
}
