//! Test harness for database repository testing
//!
//! Provides utilities for setting up test databases:
//! - SQLite: Fast in-memory databases with the bootstrap schema applied
//! - PostgreSQL and MySQL: Testcontainers-based instances with the bootstrap schema applied

#[cfg(feature = "database-sqlite")]
use sqlx::SqlitePool;

#[cfg(feature = "database-sqlite")]
use crate::db::DbPool;

/// Create an in-memory SQLite pool for testing
#[cfg(feature = "database-sqlite")]
pub async fn create_sqlite_pool() -> SqlitePool {
    sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

/// Apply the SQLite schema to the pool
///
/// Uses the same schema file as `DbPool::run_migrations`
#[cfg(feature = "database-sqlite")]
pub async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations_sqlx/sqlite")
        .run(pool)
        .await
        .expect("Failed to apply SQLite schema");
}

/// In-memory `DbPool` with the schema applied, for service tests
#[cfg(feature = "database-sqlite")]
pub async fn create_sqlite_db_pool() -> DbPool {
    let pool = create_sqlite_pool().await;
    run_sqlite_migrations(&pool).await;
    DbPool::from_sqlite(pool)
}

/// PostgreSQL test harness using testcontainers
#[cfg(all(test, feature = "database-postgres"))]
pub mod postgres {
    use std::sync::OnceLock;

    use sqlx::PgPool;
    use testcontainers_modules::{
        postgres::Postgres,
        testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner},
    };
    use tokio::sync::OnceCell;

    /// Shared container state - initialized once per test run
    struct SharedContainer {
        #[allow(dead_code)] // Test infrastructure: keeps container alive
        container: ContainerAsync<Postgres>,
        connection_string: String,
    }

    /// Global shared container - lazily initialized on first use
    static SHARED_CONTAINER: OnceLock<OnceCell<SharedContainer>> = OnceLock::new();

    /// Get or initialize the shared PostgreSQL container
    async fn get_shared_container() -> &'static SharedContainer {
        let cell = SHARED_CONTAINER.get_or_init(OnceCell::new);
        cell.get_or_init(|| async {
            let container = Postgres::default()
                .with_tag("18-alpine")
                .start()
                .await
                .expect("Failed to start PostgreSQL container");

            let host = container.get_host().await.expect("Failed to get host");
            let port = container
                .get_host_port_ipv4(5432)
                .await
                .expect("Failed to get port");

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            SharedContainer {
                container,
                connection_string,
            }
        })
        .await
    }

    /// Create an isolated database schema for a single test
    ///
    /// This starts a shared PostgreSQL container (if not already running) and creates
    /// a unique schema for test isolation. Each test gets its own schema, avoiding
    /// container startup overhead while maintaining isolation.
    pub async fn create_isolated_postgres_pool() -> PgPool {
        let shared = get_shared_container().await;

        // Create admin pool for schema creation
        let admin_pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect(&shared.connection_string)
            .await
            .expect("Failed to connect to PostgreSQL");

        // Generate unique schema name for this test
        let schema_name = format!("test_{}", uuid::Uuid::new_v4().simple());

        // Create the schema
        sqlx::query(&format!("CREATE SCHEMA \"{}\"", schema_name))
            .execute(&admin_pool)
            .await
            .expect("Failed to create test schema");

        // Create a new pool with search_path set to our isolated schema
        let isolated_url = format!(
            "{}?options=-c search_path={}",
            shared.connection_string, schema_name
        );

        sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect(&isolated_url)
            .await
            .expect("Failed to connect to isolated schema")
    }

    /// Apply the PostgreSQL schema to the pool
    pub async fn run_postgres_migrations(pool: &PgPool) {
        sqlx::migrate!("./migrations_sqlx/postgres")
            .run(pool)
            .await
            .expect("Failed to apply PostgreSQL schema");
    }
}

/// MySQL test harness using testcontainers
#[cfg(all(test, feature = "database-mysql"))]
pub mod mysql {
    use std::sync::OnceLock;

    use sqlx::MySqlPool;
    use testcontainers_modules::{
        mysql::Mysql,
        testcontainers::{ContainerAsync, runners::AsyncRunner},
    };
    use tokio::sync::OnceCell;

    struct SharedContainer {
        #[allow(dead_code)] // Test infrastructure: keeps container alive
        container: ContainerAsync<Mysql>,
        server_url: String,
    }

    static SHARED_CONTAINER: OnceLock<OnceCell<SharedContainer>> = OnceLock::new();

    async fn get_shared_container() -> &'static SharedContainer {
        let cell = SHARED_CONTAINER.get_or_init(OnceCell::new);
        cell.get_or_init(|| async {
            let container = Mysql::default()
                .start()
                .await
                .expect("Failed to start MySQL container");

            let host = container.get_host().await.expect("Failed to get host");
            let port = container
                .get_host_port_ipv4(3306)
                .await
                .expect("Failed to get port");

            SharedContainer {
                container,
                server_url: format!("mysql://root@{}:{}", host, port),
            }
        })
        .await
    }

    /// Create an isolated database for a single test
    ///
    /// MySQL has no schemas below the database level, so each test gets its
    /// own database in the shared container.
    pub async fn create_isolated_mysql_pool() -> MySqlPool {
        let shared = get_shared_container().await;

        let admin_pool = sqlx::mysql::MySqlPoolOptions::new()
            .max_connections(1)
            .connect(&format!("{}/mysql", shared.server_url))
            .await
            .expect("Failed to connect to MySQL");

        let database = format!("test_{}", uuid::Uuid::new_v4().simple());
        sqlx::query(&format!("CREATE DATABASE `{}`", database))
            .execute(&admin_pool)
            .await
            .expect("Failed to create test database");

        sqlx::mysql::MySqlPoolOptions::new()
            .max_connections(1)
            .connect(&format!("{}/{}", shared.server_url, database))
            .await
            .expect("Failed to connect to isolated database")
    }

    /// Apply the MySQL schema to the pool
    pub async fn run_mysql_migrations(pool: &MySqlPool) {
        sqlx::migrate!("./migrations_sqlx/mysql")
            .run(pool)
            .await
            .expect("Failed to apply MySQL schema");
    }
}
