use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{db::error::DbResult, models::StoredUserRow};

/// Storage for the `user_activity` table, keyed by `fullname`.
///
/// Methods are plain reads and writes. Whether a row should be written at all
/// is decided by the caller, see `services::persistence`.
#[async_trait]
pub trait UserActivityRepo: Send + Sync {
    async fn get(&self, fullname: &str) -> DbResult<Option<StoredUserRow>>;

    /// Insert a new row. Fails with `DbError::Conflict` if `fullname` exists.
    async fn insert(&self, row: &StoredUserRow) -> DbResult<()>;

    /// Overwrite `lastlogin` and `siterole` of an existing row.
    /// Fails with `DbError::NotFound` if there is no such row.
    async fn update_login(
        &self,
        fullname: &str,
        lastlogin: DateTime<Utc>,
        siterole: &str,
    ) -> DbResult<()>;

    /// All rows, ordered by `fullname`. Read back after a pass to report the table size.
    async fn list(&self) -> DbResult<Vec<StoredUserRow>>;
}
