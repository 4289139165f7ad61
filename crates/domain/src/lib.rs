//! # hush-domain
//!
//! Pure domain model for the hush quiet-rule engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Rules** (event-anchored time windows, location-anchored geofences)
//! - Define **Actions** (`mute` / `unmute` intents)
//! - Define **Triggers** (one-shot timers derived from event rules)
//! - Define **Region registrations** (geofences derived from location rules)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod action;
pub mod region;
pub mod rule;
pub mod trigger;
