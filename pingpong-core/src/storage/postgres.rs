//! PostgresBackend - Production Storage
//!
//! TigerStyle: Real database storage, one row, one column.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     PostgresBackend                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Pool: sqlx::PgPool (connection pooling)                     │
//! │  Table: ping_counter (id, counter_value)                     │
//! │  Row: id = 1                                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS ping_counter (
//!     id INTEGER PRIMARY KEY,
//!     counter_value BIGINT NOT NULL DEFAULT 0
//! );
//! ```
//!
//! Older deployments created `counter_value` as `INTEGER`; every read casts
//! to `BIGINT` so both layouts decode the same way.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};

use super::backend::{CounterBackend, SeedOutcome};
use super::error::{StorageError, StorageResult};
use crate::constants::{COUNTER_ROW_ID, COUNTER_TABLE_NAME, POSTGRES_POOL_CONNECTIONS_MAX};
use crate::establish::Connector;

// =============================================================================
// PostgresConnector
// =============================================================================

/// Connection parameters for [`PostgresBackend`].
#[derive(Debug, Clone)]
pub struct PostgresConnector {
    options: PgConnectOptions,
    acquire_timeout: Duration,
    target: String,
}

impl PostgresConnector {
    /// Build from discrete parameters.
    ///
    /// # Errors
    /// Returns error if `host` or `database` is empty, or `ssl_mode` is not a
    /// libpq SSL mode.
    pub fn new(
        host: &str,
        port: u16,
        user: &str,
        password: &str,
        database: &str,
        ssl_mode: &str,
        acquire_timeout: Duration,
    ) -> StorageResult<Self> {
        if host.is_empty() {
            return Err(StorageError::internal("postgres host cannot be empty"));
        }
        if database.is_empty() {
            return Err(StorageError::internal("postgres database cannot be empty"));
        }

        let ssl_mode = PgSslMode::from_str(ssl_mode)
            .map_err(|e| StorageError::internal(format!("invalid ssl mode {ssl_mode:?}: {e}")))?;

        let options = PgConnectOptions::new()
            .host(host)
            .port(port)
            .username(user)
            .password(password)
            .database(database)
            .ssl_mode(ssl_mode);

        Ok(Self {
            options,
            acquire_timeout,
            target: format!("postgres {host}:{port}/{database}"),
        })
    }

    /// Build from a `postgres://` URL.
    ///
    /// # Errors
    /// Returns error if the URL cannot be parsed.
    pub fn from_url(url: &str, acquire_timeout: Duration) -> StorageResult<Self> {
        assert!(
            url.starts_with("postgres://") || url.starts_with("postgresql://"),
            "connection string must be postgres URL"
        );

        let options = PgConnectOptions::from_str(url)
            .map_err(|e| StorageError::internal(format!("invalid postgres url: {e}")))?;
        // Credentials stay out of logs
        let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
        let rest = rest.rsplit_once('@').map_or(rest, |(_, rest)| rest);
        let target = format!("postgres {rest}");

        Ok(Self {
            options,
            acquire_timeout,
            target,
        })
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    type Backend = PostgresBackend;

    fn target(&self) -> String {
        self.target.clone()
    }

    async fn connect(&self, _attempt: u32) -> StorageResult<PostgresBackend> {
        let pool = PgPoolOptions::new()
            .max_connections(POSTGRES_POOL_CONNECTIONS_MAX)
            .acquire_timeout(self.acquire_timeout)
            .connect_with(self.options.clone())
            .await
            .map_err(|e| StorageError::connection(format!("failed to connect: {e}")))?;

        Ok(PostgresBackend { pool })
    }
}

// =============================================================================
// PostgresBackend
// =============================================================================

/// PostgreSQL storage backend for production use.
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Get the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn to_counter(value: i64) -> StorageResult<u64> {
    u64::try_from(value)
        .map_err(|_| StorageError::internal(format!("negative counter value: {value}")))
}

#[async_trait]
impl CounterBackend for PostgresBackend {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::connection(format!("failed to ping: {e}")))?;
        Ok(())
    }

    async fn ensure_schema(&self) -> StorageResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {COUNTER_TABLE_NAME} (
                id INTEGER PRIMARY KEY,
                counter_value BIGINT NOT NULL DEFAULT 0
            )"
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::schema(format!("failed to create table: {e}")))?;
        Ok(())
    }

    async fn ensure_initialized(&self) -> StorageResult<SeedOutcome> {
        let sql = format!(
            "INSERT INTO {COUNTER_TABLE_NAME} (id, counter_value) VALUES ($1, 0)
             ON CONFLICT (id) DO NOTHING"
        );
        let inserted = sqlx::query(&sql)
            .bind(COUNTER_ROW_ID)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::schema(format!("failed to initialize counter: {e}")))?
            .rows_affected();

        if inserted == 1 {
            return Ok(SeedOutcome::Created);
        }
        let value = self
            .read()
            .await
            .map_err(|e| StorageError::schema(format!("failed to query counter: {e}")))?;
        Ok(SeedOutcome::Existing(value))
    }

    async fn read(&self) -> StorageResult<u64> {
        let sql = format!("SELECT counter_value::BIGINT FROM {COUNTER_TABLE_NAME} WHERE id = $1");
        let value: Option<i64> = sqlx::query_scalar(&sql)
            .bind(COUNTER_ROW_ID)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::read(format!("failed to get counter: {e}")))?;

        to_counter(value.ok_or_else(|| StorageError::read("counter row missing"))?)
    }

    async fn increment_and_return(&self) -> StorageResult<u64> {
        let sql = format!(
            "UPDATE {COUNTER_TABLE_NAME} SET counter_value = counter_value + 1
             WHERE id = $1 RETURNING counter_value::BIGINT"
        );
        let value: Option<i64> = sqlx::query_scalar(&sql)
            .bind(COUNTER_ROW_ID)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::write(format!("failed to increment counter: {e}")))?;

        to_counter(value.ok_or_else(|| StorageError::write("counter row missing"))?)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// =============================================================================
// Tests (require running Postgres)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Get test database URL from environment.
    fn test_db_url() -> Option<String> {
        env::var("TEST_POSTGRES_URL").ok()
    }

    /// Skip test if no database available.
    macro_rules! require_db {
        () => {
            match test_db_url() {
                Some(url) => url,
                None => {
                    eprintln!("Skipping test: TEST_POSTGRES_URL not set");
                    return;
                }
            }
        };
    }

    async fn fresh_backend(url: &str) -> PostgresBackend {
        let connector = PostgresConnector::from_url(url, Duration::from_secs(5)).unwrap();
        let backend = connector.connect(1).await.unwrap();
        sqlx::query(&format!("DROP TABLE IF EXISTS {COUNTER_TABLE_NAME}"))
            .execute(backend.pool())
            .await
            .unwrap();
        backend
    }

    #[test]
    fn test_invalid_ssl_mode_rejected() {
        let result = PostgresConnector::new(
            "localhost",
            5432,
            "user",
            "pass",
            "db",
            "sometimes",
            Duration::from_secs(1),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_host_or_database_rejected() {
        for (host, database) in [("", "db"), ("localhost", "")] {
            let result = PostgresConnector::new(
                host,
                5432,
                "user",
                "pass",
                database,
                "disable",
                Duration::from_secs(1),
            );
            assert!(matches!(result, Err(StorageError::Internal { .. })));
        }
    }

    #[test]
    fn test_target_names_host_and_database() {
        let connector = PostgresConnector::new(
            "db.internal",
            5433,
            "user",
            "pass",
            "pingpongdb",
            "disable",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(connector.target(), "postgres db.internal:5433/pingpongdb");
    }

    #[test]
    fn test_url_target_hides_credentials() {
        let connector = PostgresConnector::from_url(
            "postgres://pingponguser:secret@db:5432/pingpongdb",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(connector.target(), "postgres db:5432/pingpongdb");
    }

    #[test]
    fn test_negative_value_is_internal_error() {
        assert!(matches!(to_counter(-1), Err(StorageError::Internal { .. })));
        assert_eq!(to_counter(3).unwrap(), 3);
    }

    #[tokio::test]
    async fn test_postgres_backend_connection() {
        let url = require_db!();
        let backend = fresh_backend(&url).await;

        backend.ping().await.unwrap();
        backend.close().await;
    }

    #[tokio::test]
    async fn test_postgres_seed_and_increment() {
        let url = require_db!();
        let backend = fresh_backend(&url).await;

        backend.ensure_schema().await.unwrap();
        assert_eq!(backend.ensure_initialized().await.unwrap(), SeedOutcome::Created);
        assert_eq!(backend.read().await.unwrap(), 0);

        assert_eq!(backend.increment_and_return().await.unwrap(), 1);
        assert_eq!(backend.increment_and_return().await.unwrap(), 2);

        // Seeding again must not reset
        backend.ensure_schema().await.unwrap();
        assert_eq!(
            backend.ensure_initialized().await.unwrap(),
            SeedOutcome::Existing(2)
        );

        backend.close().await;
    }

    #[tokio::test]
    async fn test_postgres_legacy_integer_column() {
        let url = require_db!();
        let backend = fresh_backend(&url).await;

        sqlx::query(&format!(
            "CREATE TABLE {COUNTER_TABLE_NAME} (id SERIAL PRIMARY KEY, counter_value INTEGER NOT NULL DEFAULT 0)"
        ))
        .execute(backend.pool())
        .await
        .unwrap();
        sqlx::query(&format!(
            "INSERT INTO {COUNTER_TABLE_NAME} (id, counter_value) VALUES (1, 41)"
        ))
        .execute(backend.pool())
        .await
        .unwrap();

        backend.ensure_schema().await.unwrap();
        assert_eq!(
            backend.ensure_initialized().await.unwrap(),
            SeedOutcome::Existing(41)
        );
        assert_eq!(backend.increment_and_return().await.unwrap(), 42);

        backend.close().await;
    }
}
