use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::params;

use super::models::{CheckRecord, SiteStatus, from_unix, to_unix};
use crate::monitoring::types::CheckResult;
use crate::pool::{LibsqlManager, LibsqlPool};

/// Store contract for site status and the check log.
///
/// Every operation is durable before it returns.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Get the stored status for a site, if it has ever been recorded.
    async fn get_status(&self, site_name: &str) -> Result<Option<SiteStatus>>;

    /// Insert or replace the status row for a site.
    async fn upsert_status(&self, status: &SiteStatus) -> Result<()>;

    /// Append one probe result to the check log.
    async fn append_check(&self, result: &CheckResult) -> Result<i64>;

    /// Most recent check log rows for a site, newest first.
    async fn recent_checks(&self, site_name: &str, limit: usize) -> Result<Vec<CheckRecord>>;

    /// Delete check log rows strictly older than `cutoff`, returning the
    /// number of rows deleted.
    async fn prune_checks(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// LibSQL store implementation.
pub struct LibsqlStore {
    pool: LibsqlPool,
}

impl LibsqlStore {
    /// Create a new store from a connection pool.
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl StatusStore for LibsqlStore {
    async fn get_status(&self, site_name: &str) -> Result<Option<SiteStatus>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(
                "SELECT site_name, url, is_up, last_status_code, last_check_time, last_change_time, error_message FROM site_status WHERE site_name = ?",
            )
            .await?;

        let mut rows = stmt.query(params![site_name]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(SiteStatus {
                site_name: row.get(0)?,
                url: row.get(1)?,
                is_up: row.get::<i64>(2)? != 0,
                last_status_code: row.get::<Option<i64>>(3)?.map(|v| v as u16),
                last_check_time: from_unix(row.get(4)?),
                last_change_time: from_unix(row.get(5)?),
                error_message: row.get(6)?,
            }))
        } else {
            Ok(None)
        }
    }

    async fn upsert_status(&self, status: &SiteStatus) -> Result<()> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO site_status (site_name, url, is_up, last_status_code, last_check_time, last_change_time, error_message)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(site_name) DO UPDATE SET
                 url = excluded.url,
                 is_up = excluded.is_up,
                 last_status_code = excluded.last_status_code,
                 last_check_time = excluded.last_check_time,
                 last_change_time = excluded.last_change_time,
                 error_message = excluded.error_message",
            params![
                status.site_name.clone(),
                status.url.clone(),
                if status.is_up { 1 } else { 0 },
                status.last_status_code.map(i64::from),
                to_unix(status.last_check_time),
                to_unix(status.last_change_time),
                status.error_message.clone(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn append_check(&self, result: &CheckResult) -> Result<i64> {
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO check_log (site_name, timestamp, status_code, response_time_ms, is_up, error_message)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                result.site_name.clone(),
                to_unix(result.timestamp),
                result.status_code.map(i64::from),
                result.response_time_ms,
                if result.is_up { 1 } else { 0 },
                result.error_message.clone(),
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn recent_checks(&self, site_name: &str, limit: usize) -> Result<Vec<CheckRecord>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(
                "SELECT id, site_name, timestamp, status_code, response_time_ms, is_up, error_message FROM check_log WHERE site_name = ? ORDER BY timestamp DESC, id DESC LIMIT ?",
            )
            .await?;

        let mut rows = stmt.query(params![site_name, limit as i64]).await?;
        let mut records = Vec::new();

        while let Some(row) = rows.next().await? {
            records.push(CheckRecord {
                id: Some(row.get(0)?),
                site_name: row.get(1)?,
                timestamp: from_unix(row.get(2)?),
                status_code: row.get::<Option<i64>>(3)?.map(|v| v as u16),
                response_time_ms: row.get(4)?,
                is_up: row.get::<i64>(5)? != 0,
                error_message: row.get(6)?,
            });
        }

        Ok(records)
    }

    async fn prune_checks(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let conn = self.get_conn().await?;
        let deleted = conn
            .execute("DELETE FROM check_log WHERE timestamp < ?", params![to_unix(cutoff)])
            .await?;
        Ok(deleted)
    }
}
