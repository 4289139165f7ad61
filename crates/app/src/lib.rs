//! # hush-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `RuleStore`: rules plus the alarm ledger
//!   - `TimerPort`: one-shot wake-ups at absolute times
//!   - `RegionMonitorPort`: geofence registration
//!   - `MuteActuatorPort`: the interruption-policy switch
//!   - `UserNotifier`, `RemoteSync`, `Clock`
//! - Provide the core components:
//!   - `TriggerScheduler`: compiles event rules into timer registrations
//!   - `RegionTriggerManager`: mirrors location rules into the region monitor
//!   - `BootReconciler` / `StaleTriggerSweep`: rebuild and purge derived state
//!   - `EventDispatcher`: routes device events to the components above
//!   - `MuteActuator`: idempotent mute/unmute
//! - Define **driving/inbound ports** as use-case structs:
//!   - `RuleService`: create, edit, delete rules
//!
//! ## Dependency rule
//! Depends on `hush-domain` only (plus `tokio` for locks, channels and tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod actuator;
pub mod dispatcher;
pub mod engine;
pub mod notices;
pub mod platform;
pub mod ports;
pub mod reconcile;
pub mod regions;
pub mod scheduler;
pub mod services;

#[cfg(test)]
mod test_support;
