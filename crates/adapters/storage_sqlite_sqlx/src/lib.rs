//! # hush-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement [`RuleStore`](hush_app::ports::RuleStore) for rules and the alarm ledger
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `hush-app` (for port traits) and `hush-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod error;
mod pool;
mod rule_store;

pub use error::StorageError;
pub use pool::{Config, Database};
pub use rule_store::SqliteRuleStore;
