//! `SQLite` implementation of [`RuleStore`].
//!
//! Rules are stored as one JSON document per row, next to their kind so the
//! table stays readable from a shell. The alarm ledger keeps one row per
//! rule/action pair with the fire time in epoch milliseconds.

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use hush_app::ports::RuleStore;
use hush_domain::action::Action;
use hush_domain::error::{HushError, NotFoundError};
use hush_domain::id::RuleId;
use hush_domain::rule::Rule;
use hush_domain::time::{self, Timestamp};
use hush_domain::trigger::AlarmRecord;

use crate::error::StorageError;

fn decode_error<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

struct RuleRow(Rule);

impl<'r> FromRow<'r, SqliteRow> for RuleRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let data: String = row.try_get("data")?;
        serde_json::from_str(&data).map(Self).map_err(decode_error)
    }
}

struct AlarmRow(AlarmRecord);

impl<'r> FromRow<'r, SqliteRow> for AlarmRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let rule_id: String = row.try_get("rule_id")?;
        let action: String = row.try_get("action")?;
        let fires_at_ms: i64 = row.try_get("fires_at_ms")?;

        let rule_id = RuleId::from_str(&rule_id).map_err(decode_error)?;
        let action = Action::from_str(&action).map_err(decode_error)?;
        let fires_at = time::from_millis(fires_at_ms).ok_or_else(|| {
            sqlx::Error::Decode(format!("fire time out of range: {fires_at_ms}").into())
        })?;

        Ok(Self(AlarmRecord {
            rule_id,
            action,
            fires_at,
        }))
    }
}

/// `SQLite`-backed rule store and alarm ledger.
pub struct SqliteRuleStore {
    pool: SqlitePool,
}

impl SqliteRuleStore {
    /// Create a new store backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl RuleStore for SqliteRuleStore {
    async fn list_rules(&self) -> Result<Vec<Rule>, HushError> {
        let rows: Vec<RuleRow> = sqlx::query_as("SELECT data FROM rules ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|row| row.0).collect())
    }

    async fn find_rule(&self, id: RuleId) -> Result<Option<Rule>, HushError> {
        let row: Option<RuleRow> = sqlx::query_as("SELECT data FROM rules WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|row| row.0))
    }

    async fn insert_rule(&self, rule: Rule) -> Result<Rule, HushError> {
        let data = serde_json::to_string(&rule).map_err(StorageError::from)?;

        sqlx::query("INSERT INTO rules (id, kind, data) VALUES (?, ?, ?)")
            .bind(rule.id().to_string())
            .bind(rule.kind())
            .bind(&data)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rule)
    }

    async fn update_rule(&self, rule: Rule) -> Result<Rule, HushError> {
        let data = serde_json::to_string(&rule).map_err(StorageError::from)?;

        let result = sqlx::query("UPDATE rules SET kind = ?, data = ? WHERE id = ?")
            .bind(rule.kind())
            .bind(&data)
            .bind(rule.id().to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(NotFoundError {
                entity: "Rule",
                id: rule.id().to_string(),
            }
            .into());
        }
        Ok(rule)
    }

    async fn delete_rule(&self, id: RuleId) -> Result<(), HushError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        sqlx::query("DELETE FROM alarms WHERE rule_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        sqlx::query("DELETE FROM rules WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }

    async fn record_alarm(&self, alarm: AlarmRecord) -> Result<(), HushError> {
        sqlx::query(
            "INSERT INTO alarms (rule_id, action, fires_at_ms) VALUES (?, ?, ?) \
             ON CONFLICT (rule_id, action) DO UPDATE SET fires_at_ms = excluded.fires_at_ms",
        )
        .bind(alarm.rule_id.to_string())
        .bind(alarm.action.as_str())
        .bind(alarm.fires_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(())
    }

    async fn delete_alarm(&self, rule_id: RuleId, action: Action) -> Result<(), HushError> {
        sqlx::query("DELETE FROM alarms WHERE rule_id = ? AND action = ?")
            .bind(rule_id.to_string())
            .bind(action.as_str())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn delete_alarms_older_than(&self, cutoff: Timestamp) -> Result<u64, HushError> {
        let result = sqlx::query("DELETE FROM alarms WHERE fires_at_ms < ?")
            .bind(cutoff.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(result.rows_affected())
    }

    async fn list_alarms(&self) -> Result<Vec<AlarmRecord>, HushError> {
        let rows: Vec<AlarmRow> =
            sqlx::query_as("SELECT * FROM alarms ORDER BY fires_at_ms, rule_id, action")
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|row| row.0).collect())
    }
}
