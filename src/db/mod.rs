mod error;
#[cfg(feature = "database-mysql")]
pub mod mysql;
#[cfg(feature = "database-postgres")]
pub mod postgres;
pub mod repos;
#[cfg(feature = "database-sqlite")]
pub mod sqlite;

#[cfg(all(
    test,
    any(
        feature = "database-sqlite",
        feature = "database-postgres",
        feature = "database-mysql"
    )
))]
pub mod tests;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use repos::*;

use crate::config::DatabaseConfig;

enum PoolStorage {
    #[cfg(feature = "database-sqlite")]
    Sqlite(sqlx::SqlitePool),
    #[cfg(feature = "database-postgres")]
    Postgres(sqlx::PgPool),
    #[cfg(feature = "database-mysql")]
    Mysql(sqlx::MySqlPool),
    #[cfg(not(any(
        feature = "database-sqlite",
        feature = "database-postgres",
        feature = "database-mysql"
    )))]
    _None(std::convert::Infallible),
}

/// Database pool supporting SQLite, PostgreSQL and MySQL.
///
/// Holds a single connection: all writes happen one statement at a time.
/// The repository is created once at construction.
pub struct DbPool {
    inner: PoolStorage,
    user_activity: Arc<dyn UserActivityRepo>,
}

impl DbPool {
    /// Create a DbPool from an existing SQLite pool.
    /// Primarily useful for testing.
    #[cfg(feature = "database-sqlite")]
    pub fn from_sqlite(pool: sqlx::SqlitePool) -> Self {
        DbPool {
            user_activity: Arc::new(sqlite::SqliteUserActivityRepo::new(pool.clone())),
            inner: PoolStorage::Sqlite(pool),
        }
    }

    /// Create a DbPool from an existing PostgreSQL pool.
    /// Primarily useful for testing.
    #[cfg(feature = "database-postgres")]
    pub fn from_postgres(pool: sqlx::PgPool) -> Self {
        DbPool {
            user_activity: Arc::new(postgres::PostgresUserActivityRepo::new(pool.clone())),
            inner: PoolStorage::Postgres(pool),
        }
    }

    /// Create a DbPool from an existing MySQL pool.
    /// Primarily useful for testing.
    #[cfg(feature = "database-mysql")]
    pub fn from_mysql(pool: sqlx::MySqlPool) -> Self {
        DbPool {
            user_activity: Arc::new(mysql::MysqlUserActivityRepo::new(pool.clone())),
            inner: PoolStorage::Mysql(pool),
        }
    }

    /// Create a database pool from configuration
    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            DatabaseConfig::None => Err(DbError::NotConfigured),
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(cfg) => {
                use sqlx::sqlite::SqliteConnectOptions;

                let options = if cfg.path == ":memory:" {
                    "sqlite::memory:".parse::<SqliteConnectOptions>()?
                } else {
                    SqliteConnectOptions::new()
                        .filename(&cfg.path)
                        .create_if_missing(cfg.create_if_missing)
                };

                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect_with(
                        options.busy_timeout(std::time::Duration::from_millis(cfg.busy_timeout_ms)),
                    )
                    .await?;

                Ok(Self::from_sqlite(pool))
            }
            #[cfg(feature = "database-postgres")]
            DatabaseConfig::Postgres(cfg) => {
                use sqlx::postgres::PgConnectOptions;

                let mut options = match &cfg.url {
                    Some(url) => url.parse::<PgConnectOptions>()?,
                    None => {
                        let mut options = PgConnectOptions::new()
                            .host(cfg.host.as_deref().unwrap_or("localhost"))
                            .port(cfg.port);
                        if let Some(user) = &cfg.user {
                            options = options.username(user);
                        }
                        if let Some(password) = &cfg.password {
                            options = options.password(password);
                        }
                        if let Some(name) = &cfg.name {
                            options = options.database(name);
                        }
                        options
                    }
                };
                if let Some(schema) = &cfg.schema {
                    options = options.options([("search_path", schema.as_str())]);
                }

                let pool = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(1)
                    .acquire_timeout(std::time::Duration::from_secs(cfg.connect_timeout_secs))
                    .connect_with(options)
                    .await?;

                Ok(Self::from_postgres(pool))
            }
            #[cfg(feature = "database-mysql")]
            DatabaseConfig::Mysql(cfg) => {
                use sqlx::mysql::MySqlConnectOptions;

                let options = match &cfg.url {
                    Some(url) => url.parse::<MySqlConnectOptions>()?,
                    None => {
                        let mut options = MySqlConnectOptions::new()
                            .host(cfg.host.as_deref().unwrap_or("localhost"))
                            .port(cfg.port);
                        if let Some(user) = &cfg.user {
                            options = options.username(user);
                        }
                        if let Some(password) = &cfg.password {
                            options = options.password(password);
                        }
                        if let Some(name) = &cfg.name {
                            options = options.database(name);
                        }
                        options
                    }
                };

                let pool = sqlx::mysql::MySqlPoolOptions::new()
                    .max_connections(1)
                    .acquire_timeout(std::time::Duration::from_secs(cfg.connect_timeout_secs))
                    .connect_with(options)
                    .await?;

                Ok(Self::from_mysql(pool))
            }
        }
    }

    /// Create the `user_activity` table if it does not exist.
    pub async fn run_migrations(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                tracing::info!("Applying SQLite schema");
                sqlx::migrate!("./migrations_sqlx/sqlite").run(pool).await?;
                Ok(())
            }
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pool) => {
                tracing::info!("Applying PostgreSQL schema");
                sqlx::migrate!("./migrations_sqlx/postgres")
                    .run(pool)
                    .await?;
                Ok(())
            }
            #[cfg(feature = "database-mysql")]
            PoolStorage::Mysql(pool) => {
                tracing::info!("Applying MySQL schema");
                sqlx::migrate!("./migrations_sqlx/mysql").run(pool).await?;
                Ok(())
            }
            #[cfg(not(any(
                feature = "database-sqlite",
                feature = "database-postgres",
                feature = "database-mysql"
            )))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }

    /// Get user activity repository
    pub fn user_activity(&self) -> Arc<dyn UserActivityRepo> {
        Arc::clone(&self.user_activity)
    }

    /// Health check for database connectivity
    pub async fn health_check(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            #[cfg(feature = "database-mysql")]
            PoolStorage::Mysql(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            #[cfg(not(any(
                feature = "database-sqlite",
                feature = "database-postgres",
                feature = "database-mysql"
            )))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }

    /// Close the underlying pool, waiting for the connection to be released.
    pub async fn close(&self) {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => pool.close().await,
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pool) => pool.close().await,
            #[cfg(feature = "database-mysql")]
            PoolStorage::Mysql(pool) => pool.close().await,
            #[cfg(not(any(
                feature = "database-sqlite",
                feature = "database-postgres",
                feature = "database-mysql"
            )))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }
}
