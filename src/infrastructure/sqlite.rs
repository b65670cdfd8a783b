use super::retry::{RetryPolicy, retry_with_backoff};
use crate::domain::ports::TerminalRegistry;
use crate::domain::terminal::{SigningKey, TerminalBinding};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use sqlx::FromRow;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("migrations/sqlite");

#[derive(Debug, FromRow)]
struct BindingRow {
    origin_domain: String,
    pos_register_id: String,
    gateway_device_id: String,
    gateway_merchant_id: String,
    signing_key: String,
}

impl From<BindingRow> for TerminalBinding {
    fn from(row: BindingRow) -> Self {
        TerminalBinding::new(
            row.origin_domain,
            row.pos_register_id,
            row.gateway_device_id,
            row.gateway_merchant_id,
            SigningKey::new(row.signing_key),
        )
    }
}

/// Terminal registry persisted in SQLite.
///
/// The `terminal_bindings` table carries a `UNIQUE (origin_domain,
/// pos_register_id)` constraint; a losing concurrent insert surfaces as
/// `DuplicateBinding`.
#[derive(Clone)]
pub struct SqliteTerminalRegistry {
    pool: SqlitePool,
}

impl SqliteTerminalRegistry {
    /// Wraps an existing pool. Call [`Self::initialize`] before use.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if missing) the database at `url` and applies the schema.
    ///
    /// # Arguments
    ///
    /// * `url` - A `sqlite:` URL, e.g. `sqlite://data/vendproxy.db`.
    /// * `max_connections` - Upper bound on pooled connections.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(unavailable)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(unavailable)?;

        let registry = Self::new(pool);
        registry.initialize().await?;
        Ok(registry)
    }

    /// Like [`Self::connect`], retrying transient failures per `policy`.
    pub async fn connect_with_retry(
        url: &str,
        max_connections: u32,
        policy: &RetryPolicy,
    ) -> Result<Self> {
        retry_with_backoff(
            policy,
            "registry connect",
            || Self::connect(url, max_connections),
            |err| matches!(err, GatewayError::RegistryUnavailable(_)),
        )
        .await
    }

    /// Applies pending migrations.
    pub async fn initialize(&self) -> Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| GatewayError::RegistryUnavailable(e.to_string()))
    }

    pub async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM terminal_bindings")
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)
    }
}

#[async_trait]
impl TerminalRegistry for SqliteTerminalRegistry {
    async fn save(&self, created_by: &str, binding: &TerminalBinding) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO terminal_bindings (
                origin_domain, pos_register_id, gateway_device_id,
                gateway_merchant_id, signing_key, created_by
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&binding.origin_domain)
        .bind(&binding.pos_register_id)
        .bind(&binding.gateway_device_id)
        .bind(&binding.gateway_merchant_id)
        .bind(binding.signing_key().expose())
        .bind(created_by)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() == 1),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(GatewayError::DuplicateBinding {
                    origin: binding.origin_domain.clone(),
                    register_id: binding.pos_register_id.clone(),
                })
            }
            Err(e) => Err(unavailable(e)),
        }
    }

    async fn lookup(&self, origin_domain: &str, pos_register_id: &str) -> Result<TerminalBinding> {
        let row: Option<BindingRow> = sqlx::query_as(
            r#"
            SELECT origin_domain, pos_register_id, gateway_device_id,
                   gateway_merchant_id, signing_key
            FROM terminal_bindings
            WHERE origin_domain = ? AND pos_register_id = ?
            "#,
        )
        .bind(origin_domain)
        .bind(pos_register_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.map(TerminalBinding::from)
            .ok_or_else(|| GatewayError::BindingNotFound {
                origin: origin_domain.to_string(),
                register_id: pos_register_id.to_string(),
            })
    }
}

fn unavailable(err: sqlx::Error) -> GatewayError {
    GatewayError::RegistryUnavailable(err.to_string())
}
