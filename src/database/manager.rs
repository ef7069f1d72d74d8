use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use super::store::Collection;

/// Errors from the document store
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Map Postgres unique violations to `Conflict`, everything else passes through
    pub fn from_write(err: sqlx::Error, what: &str) -> Self {
        let unique = err
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code == "23505")
            .unwrap_or(false);
        if unique {
            DatabaseError::Conflict(format!("{} already exists", what))
        } else {
            DatabaseError::Sqlx(err)
        }
    }
}

/// Builds the Postgres pool and owns the collection schema
pub struct DatabaseManager;

impl DatabaseManager {
    /// Open a bounded pool against `DATABASE_URL`
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let raw = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let url = url::Url::parse(raw).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url.as_str())
            .await?;

        info!(
            "Created database pool for {}{} (max {} connections)",
            url.host_str().unwrap_or("localhost"),
            url.path(),
            config.max_connections
        );
        Ok(pool)
    }

    /// Create the collection tables and indexes if they are missing
    pub async fn ensure_schema(pool: &PgPool) -> Result<(), DatabaseError> {
        for collection in Collection::ALL {
            sqlx::query(&Self::create_table_sql(collection)).execute(pool).await?;
        }

        // At most one user record per email
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users ((doc->>'email')) \
             WHERE doc ? 'email'",
        )
        .execute(pool)
        .await?;

        for (index, table, field) in [
            ("menu_category_idx", "menu", "category"),
            ("reviews_email_idx", "reviews", "email"),
            ("review_items_item_idx", "review_items", "itemId"),
            ("carts_email_idx", "carts", "email"),
            ("payments_email_idx", "payments", "email"),
        ] {
            let sql = format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ((doc->>'{}'))",
                index, table, field
            );
            sqlx::query(&sql).execute(pool).await?;
        }

        info!("Collection schema ready");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    fn create_table_sql(collection: Collection) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\
                id UUID PRIMARY KEY, \
                doc JSONB NOT NULL DEFAULT '{{}}'::jsonb, \
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()\
            )",
            collection.table()
        )
    }
}
