use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, mysql::MySqlRow};

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::UserActivityRepo,
    },
    models::StoredUserRow,
};

/// `lastlogin` is a `DATETIME` column holding UTC wall-clock time.
pub struct MysqlUserActivityRepo {
    pool: MySqlPool,
}

impl MysqlUserActivityRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: &MySqlRow) -> DbResult<StoredUserRow> {
        Ok(StoredUserRow {
            fullname: row.try_get("fullname")?,
            lastlogin: row.try_get("lastlogin")?,
            siterole: row.try_get("siterole")?,
        })
    }
}

#[async_trait]
impl UserActivityRepo for MysqlUserActivityRepo {
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
        .bind(row.lastlogin.map(|at| at.naive_utc()))
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
        // Existence is checked separately: MySQL reports changed rows, not matched rows
        let exists = sqlx::query("SELECT 1 FROM user_activity WHERE fullname = ?")
            .bind(fullname)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(DbError::NotFound);
        }

        sqlx::query(
            r#"
            UPDATE user_activity
            SET lastlogin = ?, siterole = ?
            WHERE fullname = ?
            "#,
        )
        .bind(lastlogin.naive_utc())
        .bind(siterole)
        .bind(fullname)
        .execute(&self.pool)
        .await?;

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
