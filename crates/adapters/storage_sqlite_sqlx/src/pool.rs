//! Opens the rule database: pool sizing, file layout and schema migrations.
//!
//! Two shapes are supported:
//!
//! - **File databases** live next to the daemon. The parent directory is
//!   created on first start, the journal runs in WAL mode so timer
//!   deliveries can read while an edit writes, and writers wait up to
//!   [`Config::busy_timeout`] for the lock instead of failing.
//! - **In-memory databases** (tests, throwaway runs) are pinned to a single
//!   connection that never idles out. Losing the last connection would drop
//!   every stored rule.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::error::StorageError;

/// Default time a writer waits for the database lock.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const FILE_POOL_SIZE: u32 = 4;

/// Configuration for the `SQLite` storage adapter.
#[derive(Debug, Clone)]
pub struct Config {
    /// `SQLite` connection URL (e.g. `sqlite:hush.db` or `sqlite::memory:`).
    pub database_url: String,
    /// How long a connection waits on a locked database.
    pub busy_timeout: Duration,
}

impl Config {
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Open the database and bring its schema up to date.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the URL is invalid, the parent directory
    /// cannot be created, or the connection or migrations fail.
    pub async fn build(self) -> Result<Database, StorageError> {
        Database::initialize(&self).await
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Holds the `SQLite` connection pool and provides access to it.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn initialize(config: &Config) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .busy_timeout(config.busy_timeout);

        let pool = if is_in_memory(&config.database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            if let Some(dir) = options
                .get_filename()
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
            {
                ensure_dir(dir)?;
            }
            SqlitePoolOptions::new()
                .max_connections(FILE_POOL_SIZE)
                .connect_with(options.journal_mode(SqliteJournalMode::Wal))
                .await?
        };

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!(url = %config.database_url, "rule database ready");

        Ok(Self { pool })
    }

    /// Borrow the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn ensure_dir(dir: &Path) -> Result<(), StorageError> {
    if !dir.exists() {
        tracing::info!(dir = %dir.display(), "creating database directory");
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("hush-{name}-{}-{nanos}", std::process::id()))
    }

    #[tokio::test]
    async fn should_create_pool_and_run_migrations_when_using_memory_db() {
        let db = Config::new("sqlite::memory:").build().await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|row| row.0.as_str()).collect();
        assert_eq!(names, vec!["alarms", "rules"]);
        assert_eq!(db.pool().options().get_max_connections(), 1);
    }

    #[tokio::test]
    async fn should_create_missing_directory_and_use_wal_for_file_db() {
        let root = scratch_dir("pool");
        let file = root.join("nested").join("rules.db");
        let config = Config::new(format!("sqlite:{}", file.display()));

        let db = config.build().await.unwrap();
        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(db.pool())
            .await
            .unwrap();
        db.pool().close().await;

        assert!(file.exists());
        assert_eq!(mode, "wal");
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn should_keep_rules_across_reopen_of_file_db() {
        let root = scratch_dir("reopen");
        let url = format!("sqlite:{}", root.join("rules.db").display());

        let first = Config::new(url.clone()).build().await.unwrap();
        sqlx::query("INSERT INTO rules (id, kind, data) VALUES ('a', 'event', '{}')")
            .execute(first.pool())
            .await
            .unwrap();
        first.pool().close().await;

        let second = Config::new(url).build().await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rules")
            .fetch_one(second.pool())
            .await
            .unwrap();
        second.pool().close().await;

        assert_eq!(count, 1);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn should_fail_when_url_is_not_sqlite() {
        let config = Config::new("postgres://localhost/hush");

        assert!(config.build().await.is_err());
    }

    #[test]
    fn should_detect_in_memory_urls() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite:file:rules?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite:hush.db?mode=rwc"));
    }
}
