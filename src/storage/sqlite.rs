//! SQLite telemetry store
//!
//! Embedded storage for collected telemetry, suitable for a single
//! collector process with concurrent dashboard readers.
//!
//! - **WAL mode**: readers are not blocked while a collection cycle is
//!   appending
//! - **Connection pooling**: one pool shared by writer and readers
//! - **Migrations**: automatic schema versioning with sqlx

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument};

use crate::{HealthSnapshot, OperationalRecord};

use super::error::{StorageError, StorageResult};
use super::store::{ResponseTimePoint, StatusCounts, TelemetryStore};

/// SQLite-backed [`TelemetryStore`]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `db_path` and run
    /// migrations.
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite store at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }

    fn operational_from_row(row: &sqlx::sqlite::SqliteRow) -> StorageResult<OperationalRecord> {
        let request_size: i64 = row.get("request_size");
        let response_size: i64 = row.get("response_size");

        Ok(OperationalRecord {
            service_id: row.get("service_id"),
            client_id: row.get("client_id"),
            producer_id: row
                .get::<Option<String>, _>("producer_id")
                .unwrap_or_else(|| "Unknown".to_string()),
            request_timestamp: row
                .get::<Option<i64>, _>("request_timestamp")
                .map(Self::millis_to_timestamp),
            response_timestamp: row
                .get::<Option<i64>, _>("response_timestamp")
                .map(Self::millis_to_timestamp),
            request_size: request_size.max(0) as u64,
            response_size: response_size.max(0) as u64,
            succeeded: row.get::<i64, _>("success") != 0,
            error_message: row.get("error_message"),
            duration_ms: row.get("request_duration"),
        })
    }

    fn health_from_row(row: &sqlx::sqlite::SqliteRow) -> StorageResult<HealthSnapshot> {
        let successful_count: i64 = row.get("successful_count");
        let unsuccessful_count: i64 = row.get("unsuccessful_count");

        Ok(HealthSnapshot {
            service_code: row.get("service_code"),
            last_successful_request: row
                .get::<Option<i64>, _>("last_successful_request")
                .map(Self::millis_to_timestamp),
            last_unsuccessful_request: row
                .get::<Option<i64>, _>("last_unsuccessful_request")
                .map(Self::millis_to_timestamp),
            successful_count: successful_count.max(0) as u64,
            unsuccessful_count: unsuccessful_count.max(0) as u64,
            avg_duration_ms: row.get("avg_duration"),
            collected_at: Self::millis_to_timestamp(row.get("timestamp")),
        })
    }
}

#[async_trait]
impl TelemetryStore for SqliteStore {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn append_operational(&self, records: Vec<OperationalRecord>) -> StorageResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        debug!("appending {} operational records", records.len());

        let created_at = Utc::now().timestamp_millis();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let mut inserted = 0usize;
        for record in records {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO operational_data (
                    service_id, client_id, producer_id,
                    request_timestamp, response_timestamp,
                    request_size, response_size, success,
                    error_message, request_duration, created_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.service_id)
            .bind(&record.client_id)
            .bind(&record.producer_id)
            .bind(record.request_timestamp.as_ref().map(Self::timestamp_to_millis))
            .bind(record.response_timestamp.as_ref().map(Self::timestamp_to_millis))
            .bind(record.request_size as i64)
            .bind(record.response_size as i64)
            .bind(record.succeeded as i64)
            .bind(&record.error_message)
            .bind(record.duration_ms)
            .bind(created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

            inserted += result.rows_affected() as usize;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        debug!("inserted {} new operational records", inserted);
        Ok(inserted)
    }

    #[instrument(skip(self, snapshots), fields(count = snapshots.len()))]
    async fn append_health(&self, snapshots: Vec<HealthSnapshot>) -> StorageResult<()> {
        if snapshots.is_empty() {
            return Ok(());
        }

        debug!("appending {} health snapshots", snapshots.len());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        for snapshot in snapshots {
            sqlx::query(
                r#"
                INSERT INTO health_data (
                    service_code, last_successful_request, last_unsuccessful_request,
                    successful_count, unsuccessful_count, avg_duration, timestamp
                )
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&snapshot.service_code)
            .bind(
                snapshot
                    .last_successful_request
                    .as_ref()
                    .map(Self::timestamp_to_millis),
            )
            .bind(
                snapshot
                    .last_unsuccessful_request
                    .as_ref()
                    .map(Self::timestamp_to_millis),
            )
            .bind(snapshot.successful_count as i64)
            .bind(snapshot.unsuccessful_count as i64)
            .bind(snapshot.avg_duration_ms)
            .bind(Self::timestamp_to_millis(&snapshot.collected_at))
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self), fields(since = %since))]
    async fn query_operational(
        &self,
        service_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<OperationalRecord>> {
        let since_millis = Self::timestamp_to_millis(&since);

        let rows = match service_id {
            Some(service_id) => {
                sqlx::query(
                    r#"
                    SELECT service_id, client_id, producer_id,
                           request_timestamp, response_timestamp,
                           request_size, response_size, success,
                           error_message, request_duration
                    FROM operational_data
                    WHERE service_id = ? AND request_timestamp >= ?
                    ORDER BY request_timestamp ASC
                    "#,
                )
                .bind(service_id)
                .bind(since_millis)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT service_id, client_id, producer_id,
                           request_timestamp, response_timestamp,
                           request_size, response_size, success,
                           error_message, request_duration
                    FROM operational_data
                    WHERE request_timestamp >= ?
                    ORDER BY request_timestamp ASC
                    "#,
                )
                .bind(since_millis)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let records: StorageResult<Vec<OperationalRecord>> =
            rows.iter().map(Self::operational_from_row).collect();

        let records = records?;
        debug!("query returned {} operational records", records.len());
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn latest_health_per_service(&self) -> StorageResult<Vec<HealthSnapshot>> {
        let rows = sqlx::query(
            r#"
            SELECT h.service_code, h.last_successful_request, h.last_unsuccessful_request,
                   h.successful_count, h.unsuccessful_count, h.avg_duration, h.timestamp
            FROM health_data h
            INNER JOIN (
                SELECT service_code, MAX(timestamp) AS max_timestamp
                FROM health_data
                GROUP BY service_code
            ) latest
                ON h.service_code = latest.service_code
               AND h.timestamp = latest.max_timestamp
            GROUP BY h.service_code
            ORDER BY h.service_code ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        rows.iter().map(Self::health_from_row).collect()
    }

    #[instrument(skip(self), fields(since = %since))]
    async fn status_counts(&self, since: DateTime<Utc>) -> StorageResult<StatusCounts> {
        let since_millis = Self::timestamp_to_millis(&since);

        let rows = sqlx::query(
            r#"
            SELECT success, COUNT(*) AS count
            FROM operational_data
            WHERE request_timestamp >= ?
            GROUP BY success
            "#,
        )
        .bind(since_millis)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let mut counts = StatusCounts::default();
        for row in rows {
            let success: i64 = row.get("success");
            let count: i64 = row.get("count");
            if success != 0 {
                counts.succeeded = count.max(0) as u64;
            } else {
                counts.failed = count.max(0) as u64;
            }
        }

        Ok(counts)
    }

    #[instrument(skip(self), fields(since = %since))]
    async fn response_time_series(
        &self,
        service_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<ResponseTimePoint>> {
        let since_millis = Self::timestamp_to_millis(&since);

        let rows = match service_id {
            Some(service_id) => {
                sqlx::query(
                    r#"
                    SELECT service_id, request_timestamp, request_duration
                    FROM operational_data
                    WHERE service_id = ?
                      AND request_timestamp >= ?
                      AND request_duration IS NOT NULL
                    ORDER BY request_timestamp ASC
                    "#,
                )
                .bind(service_id)
                .bind(since_millis)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT service_id, request_timestamp, request_duration
                    FROM operational_data
                    WHERE request_timestamp >= ?
                      AND request_duration IS NOT NULL
                    ORDER BY request_timestamp ASC
                    "#,
                )
                .bind(since_millis)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| ResponseTimePoint {
                service_id: row.get("service_id"),
                timestamp: Self::millis_to_timestamp(row.get("request_timestamp")),
                duration_ms: row.get("request_duration"),
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn get_stats(&self) -> StorageResult<String> {
        let operational: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM operational_data")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let health: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM health_data")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let file_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);
        let file_size_mb = file_size as f64 / 1_000_000.0;

        Ok(format!(
            "SQLite: {} operational records, {} health snapshots, {:.2} MB on disk",
            operational.0, health.0, file_size_mb
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite store");
        self.pool.close().await;
        Ok(())
    }
}
