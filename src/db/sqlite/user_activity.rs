use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::UserActivityRepo,
    },
    models::StoredUserRow,
};

pub struct SqliteUserActivityRepo {
    pool: SqlitePool,
}

impl SqliteUserActivityRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: &SqliteRow) -> DbResult<StoredUserRow> {
        Ok(StoredUserRow {
            fullname: row.try_get("fullname")?,
            lastlogin: row.try_get("lastlogin")?,
            siterole: row.try_get("siterole")?,
        })
    }
}

#[async_trait]
impl UserActivityRepo for SqliteUserActivityRepo {
    async fn get(&self, fullname: &str) -> DbResult<Option<StoredUserRow>> {
        let row = sqlx::query(
            r#"
            SELECT fullname, lastlogin, siterole
            FROM user_activity
            WHERE fullname = ?
            "#,
        )
        .bind(fullname)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn insert(&self, row: &StoredUserRow) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_activity (fullname, lastlogin, siterole)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&row.fullname)
        .bind(row.lastlogin)
        .bind(&row.siterole)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::Conflict(format!("User '{}' already exists", row.fullname))
            }
            _ => DbError::from(e),
        })?;

        Ok(())
    }

    async fn update_login(
        &self,
        fullname: &str,
        lastlogin: DateTime<Utc>,
        siterole: &str,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE user_activity
            SET lastlogin = ?, siterole = ?
            WHERE fullname = ?
            "#,
        )
        .bind(lastlogin)
        .bind(siterole)
        .bind(fullname)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn list(&self) -> DbResult<Vec<StoredUserRow>> {
        let rows = sqlx::query(
            r#"
            SELECT fullname, lastlogin, siterole
            FROM user_activity
            ORDER BY fullname
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_user).collect()
    }
}
