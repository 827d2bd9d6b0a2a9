//! PostgreSQL persistence for version records.
//!
//! - [`create_pool`] / [`health_check`] / [`run_migrations`] bootstrap a pool.
//! - [`repositories::VersionRepo`] is the query layer over the `versions` table.
//! - [`store::PgVersionStore`] plugs that layer into the versioning engine.

pub mod models;
pub mod repositories;
pub mod store;

use sqlx::postgres::PgPoolOptions;

pub use store::PgVersionStore;

pub type DbPool = sqlx::PgPool;

/// Default pool size when `DATABASE_MAX_CONNECTIONS` is unset.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

#[derive(Debug, thiserror::Error)]
pub enum DbConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be a valid {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl DbConfig {
    /// Load settings from the environment, reading `.env` first if present.
    ///
    /// | Env Var                    | Default    |
    /// |----------------------------|------------|
    /// | `DATABASE_URL`             | (required) |
    /// | `DATABASE_MAX_CONNECTIONS` | `20`       |
    pub fn from_env() -> Result<Self, DbConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DbConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(DbConfigError::Missing("DATABASE_URL"))?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(DbConfigError::Invalid {
                    name: "DATABASE_MAX_CONNECTIONS",
                    expected: "positive u32",
                    value: raw,
                })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Create a connection pool from loaded settings.
pub async fn connect(config: &DbConfig) -> Result<DbPool, sqlx::Error> {
    let pool = create_pool(&config.database_url, config.max_connections).await?;
    tracing::info!(
        max_connections = config.max_connections,
        "Database connection pool created"
    );
    Ok(pool)
}

/// Round-trip a trivial query to verify the pool can reach the database.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
}

/// Apply the embedded migrations under `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn url_is_required() {
        assert_matches!(
            DbConfig::from_lookup(lookup(&[])),
            Err(DbConfigError::Missing("DATABASE_URL"))
        );
        assert_matches!(
            DbConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])),
            Err(DbConfigError::Missing("DATABASE_URL"))
        );
    }

    #[test]
    fn max_connections_defaults_to_twenty() {
        let config = DbConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/v")]))
            .unwrap();
        assert_eq!(config.database_url, "postgres://localhost/v");
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn max_connections_is_parsed() {
        let config = DbConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/v"),
            ("DATABASE_MAX_CONNECTIONS", " 5 "),
        ]))
        .unwrap();
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn invalid_max_connections_is_an_error() {
        for raw in ["zero", "0", "-3"] {
            let err = DbConfig::from_lookup(lookup(&[
                ("DATABASE_URL", "postgres://localhost/v"),
                ("DATABASE_MAX_CONNECTIONS", raw),
            ]))
            .unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("DATABASE_MAX_CONNECTIONS must be a valid positive u32, got '{raw}'")
            );
        }
    }
}
