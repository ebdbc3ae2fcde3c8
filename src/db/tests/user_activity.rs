//! Shared tests for UserActivityRepo implementations

use chrono::{TimeZone, Utc};

use crate::{
    db::{error::DbError, repos::UserActivityRepo},
    models::StoredUserRow,
};

fn row(fullname: &str, lastlogin: Option<(i32, u32, u32)>, siterole: &str) -> StoredUserRow {
    StoredUserRow {
        fullname: fullname.to_string(),
        lastlogin: lastlogin.map(|(y, m, d)| Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()),
        siterole: siterole.to_string(),
    }
}

/// Test context containing the repo under test
pub struct UserActivityTestContext<'a> {
    pub repo: &'a dyn UserActivityRepo,
}

pub async fn test_get_missing(ctx: &UserActivityTestContext<'_>) {
    let found = ctx.repo.get("nobody").await.expect("get should succeed");
    assert!(found.is_none());
}

pub async fn test_insert_and_get(ctx: &UserActivityTestContext<'_>) {
    let alice = row("alice", Some((2024, 3, 1)), "Viewer");
    ctx.repo.insert(&alice).await.expect("insert should succeed");

    let found = ctx.repo.get("alice").await.unwrap().expect("row exists");
    assert_eq!(found, alice);
}

pub async fn test_insert_null_lastlogin(ctx: &UserActivityTestContext<'_>) {
    let bob = row("bob", None, "Creator");
    ctx.repo.insert(&bob).await.expect("insert should succeed");

    let found = ctx.repo.get("bob").await.unwrap().expect("row exists");
    assert_eq!(found.lastlogin, None);
    assert_eq!(found.siterole, "Creator");
}

pub async fn test_insert_duplicate_conflicts(ctx: &UserActivityTestContext<'_>) {
    ctx.repo
        .insert(&row("alice", Some((2024, 3, 1)), "Viewer"))
        .await
        .unwrap();

    let err = ctx
        .repo
        .insert(&row("alice", None, "Explorer"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Conflict(_)));

    // Existing row untouched
    let found = ctx.repo.get("alice").await.unwrap().unwrap();
    assert_eq!(found.siterole, "Viewer");
}

pub async fn test_update_login(ctx: &UserActivityTestContext<'_>) {
    ctx.repo.insert(&row("alice", None, "Viewer")).await.unwrap();

    let newer = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    ctx.repo
        .update_login("alice", newer, "Creator")
        .await
        .expect("update should succeed");

    let found = ctx.repo.get("alice").await.unwrap().unwrap();
    assert_eq!(found.lastlogin, Some(newer));
    assert_eq!(found.siterole, "Creator");
}

pub async fn test_update_missing_not_found(ctx: &UserActivityTestContext<'_>) {
    let err = ctx
        .repo
        .update_login("ghost", Utc::now(), "Viewer")
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

pub async fn test_list_ordered_by_fullname(ctx: &UserActivityTestContext<'_>) {
    for name in ["carol", "alice", "bob"] {
        ctx.repo.insert(&row(name, None, "Viewer")).await.unwrap();
    }

    let names: Vec<String> = ctx
        .repo
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.fullname)
        .collect();
    assert_eq!(names, vec!["alice", "bob", "carol"]);
}

// ============================================================================
// SQLite Tests - Fast, in-memory
// ============================================================================

#[cfg(all(test, feature = "database-sqlite"))]
mod sqlite_tests {
    use super::*;
    use crate::db::{
        sqlite::SqliteUserActivityRepo,
        tests::harness::{create_sqlite_pool, run_sqlite_migrations},
    };

    async fn create_repo() -> SqliteUserActivityRepo {
        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        SqliteUserActivityRepo::new(pool)
    }

    macro_rules! sqlite_test {
        ($name:ident) => {
            #[tokio::test]
            async fn $name() {
                let repo = create_repo().await;
                let ctx = UserActivityTestContext { repo: &repo };
                super::$name(&ctx).await;
            }
        };
    }

    sqlite_test!(test_get_missing);
    sqlite_test!(test_insert_and_get);
    sqlite_test!(test_insert_null_lastlogin);
    sqlite_test!(test_insert_duplicate_conflicts);
    sqlite_test!(test_update_login);
    sqlite_test!(test_update_missing_not_found);
    sqlite_test!(test_list_ordered_by_fullname);

    // SQLite stores lastlogin as TEXT, so a pre-existing table can hold values
    // that do not decode as timestamps.
    #[tokio::test]
    async fn test_undecodable_lastlogin_is_an_error() {
        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        sqlx::query(
            "INSERT INTO user_activity (fullname, lastlogin, siterole) VALUES ('bob', '01.02.2024', 'Viewer')",
        )
        .execute(&pool)
        .await
        .unwrap();
        let repo = SqliteUserActivityRepo::new(pool);

        let err = repo.get("bob").await.unwrap_err();
        assert!(matches!(err, DbError::Sqlx(_)));
        assert!(repo.list().await.is_err());

        // Other rows stay readable
        repo.insert(&row("carol", None, "Viewer")).await.unwrap();
        assert!(repo.get("carol").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_space_separated_lastlogin_decodes() {
        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        sqlx::query(
            "INSERT INTO user_activity (fullname, lastlogin, siterole) VALUES ('alice', '2024-01-01 00:00:00', 'Viewer')",
        )
        .execute(&pool)
        .await
        .unwrap();
        let repo = SqliteUserActivityRepo::new(pool);

        let found = repo.get("alice").await.unwrap().unwrap();
        assert_eq!(
            found.lastlogin,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }
}

// ============================================================================
// PostgreSQL Tests - Require Docker, run with `cargo test -- --ignored`
// ============================================================================

#[cfg(all(test, feature = "database-postgres"))]
mod postgres_tests {
    use super::*;
    use crate::db::{
        postgres::PostgresUserActivityRepo,
        tests::harness::postgres::{create_isolated_postgres_pool, run_postgres_migrations},
    };

    macro_rules! postgres_test {
        ($name:ident) => {
            #[tokio::test]
            #[ignore = "Requires Docker - run with `cargo test -- --ignored`"]
            async fn $name() {
                let pool = create_isolated_postgres_pool().await;
                run_postgres_migrations(&pool).await;
                let repo = PostgresUserActivityRepo::new(pool);
                let ctx = UserActivityTestContext { repo: &repo };
                super::$name(&ctx).await;
            }
        };
    }

    postgres_test!(test_get_missing);
    postgres_test!(test_insert_and_get);
    postgres_test!(test_insert_null_lastlogin);
    postgres_test!(test_insert_duplicate_conflicts);
    postgres_test!(test_update_login);
    postgres_test!(test_update_missing_not_found);
    postgres_test!(test_list_ordered_by_fullname);
}

// ============================================================================
// MySQL Tests - Require Docker, run with `cargo test -- --ignored`
// ============================================================================

#[cfg(all(test, feature = "database-mysql"))]
mod mysql_tests {
    use super::*;
    use crate::db::{
        mysql::MysqlUserActivityRepo,
        tests::harness::mysql::{create_isolated_mysql_pool, run_mysql_migrations},
    };

    macro_rules! mysql_test {
        ($name:ident) => {
            #[tokio::test]
            #[ignore = "Requires Docker - run with `cargo test -- --ignored`"]
            async fn $name() {
                let pool = create_isolated_mysql_pool().await;
                run_mysql_migrations(&pool).await;
                let repo = MysqlUserActivityRepo::new(pool);
                let ctx = UserActivityTestContext { repo: &repo };
                super::$name(&ctx).await;
            }
        };
    }

    mysql_test!(test_get_missing);
    mysql_test!(test_insert_and_get);
    mysql_test!(test_insert_null_lastlogin);
    mysql_test!(test_insert_duplicate_conflicts);
    mysql_test!(test_update_login);
    mysql_test!(test_update_missing_not_found);
    mysql_test!(test_list_ordered_by_fullname);
}
