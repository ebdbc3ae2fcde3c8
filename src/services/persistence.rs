//! Writes merged identities to the `user_activity` table.
//!
//! Each identity is looked up first and then inserted, updated, or left
//! alone. A stored login is never replaced by an older one, so running the
//! same batch twice performs no writes the second time.

use crate::{
    db::{DbError, UserActivityRepo},
    models::{MergedIdentity, StoredUserRow},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    Insert,
    Update,
    Skip,
}

/// What to do with `incoming` given the currently stored row.
///
/// An existing row is updated only when the incoming login is present and
/// strictly later than the stored one (or the stored one is null).
pub fn decide(stored: Option<&StoredUserRow>, incoming: &MergedIdentity) -> UpsertAction {
    let Some(stored) = stored else {
        return UpsertAction::Insert;
    };

    match (incoming.last_login, stored.lastlogin) {
        (Some(_), None) => UpsertAction::Update,
        (Some(new), Some(old)) if new > old => UpsertAction::Update,
        _ => UpsertAction::Skip,
    }
}

/// A row that could not be read or written.
#[derive(Debug)]
pub struct PersistFailure {
    pub fullname: String,
    pub error: DbError,
}

#[derive(Debug, Default)]
pub struct PersistSummary {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failures: Vec<PersistFailure>,
}

impl PersistSummary {
    pub fn writes(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Upsert each identity in order. Failures are collected and the batch continues.
pub async fn persist_identities(
    repo: &dyn UserActivityRepo,
    identities: &[MergedIdentity],
) -> PersistSummary {
    let mut summary = PersistSummary::default();

    for identity in identities {
        match persist_one(repo, identity).await {
            Ok(UpsertAction::Insert) => summary.inserted += 1,
            Ok(UpsertAction::Update) => summary.updated += 1,
            Ok(UpsertAction::Skip) => summary.unchanged += 1,
            Err(error) => summary.failures.push(PersistFailure {
                fullname: identity.name.clone(),
                error,
            }),
        }
    }

    summary
}

async fn persist_one(
    repo: &dyn UserActivityRepo,
    identity: &MergedIdentity,
) -> Result<UpsertAction, DbError> {
    let stored = repo.get(&identity.name).await?;
    let action = decide(stored.as_ref(), identity);

    match action {
        UpsertAction::Insert => repo.insert(&StoredUserRow::from(identity)).await?,
        UpsertAction::Update => {
            if let Some(last_login) = identity.last_login {
                repo.update_login(&identity.name, last_login, &identity.site_role)
                    .await?;
            }
        }
        UpsertAction::Skip => {}
    }

    Ok(action)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn identity(name: &str, last_login: Option<DateTime<Utc>>, role: &str) -> MergedIdentity {
        MergedIdentity {
            name: name.to_string(),
            last_login,
            sites: vec!["A".to_string()],
            site_role: role.to_string(),
        }
    }

    fn stored(last_login: Option<DateTime<Utc>>) -> StoredUserRow {
        StoredUserRow {
            fullname: "alice".to_string(),
            lastlogin: last_login,
            siterole: "Viewer".to_string(),
        }
    }

    #[test]
    fn test_decide_insert_when_absent() {
        let incoming = identity("alice", None, "Viewer");
        assert_eq!(decide(None, &incoming), UpsertAction::Insert);
    }

    #[test]
    fn test_decide_never_regresses() {
        let row = stored(Some(at(2024, 1, 1)));
        assert_eq!(
            decide(Some(&row), &identity("alice", Some(at(2023, 6, 1)), "Creator")),
            UpsertAction::Skip
        );
        assert_eq!(
            decide(Some(&row), &identity("alice", Some(at(2024, 6, 1)), "Creator")),
            UpsertAction::Update
        );
        assert_eq!(
            decide(Some(&row), &identity("alice", Some(at(2024, 1, 1)), "Creator")),
            UpsertAction::Skip
        );
    }

    #[test]
    fn test_decide_null_handling() {
        let null_row = stored(None);
        assert_eq!(
            decide(Some(&null_row), &identity("alice", Some(at(2020, 1, 1)), "Viewer")),
            UpsertAction::Update
        );
        assert_eq!(
            decide(Some(&null_row), &identity("alice", None, "Viewer")),
            UpsertAction::Skip
        );

        let row = stored(Some(at(2024, 1, 1)));
        assert_eq!(
            decide(Some(&row), &identity("alice", None, "Viewer")),
            UpsertAction::Skip
        );
    }

    #[cfg(feature = "database-sqlite")]
    mod sqlite {
        use async_trait::async_trait;

        use super::*;
        use crate::db::{
            DbPool, DbResult,
            tests::harness::{create_sqlite_db_pool, create_sqlite_pool, run_sqlite_migrations},
        };

        /// Repo whose every call fails for one name.
        struct FlakyRepo {
            inner: std::sync::Arc<dyn UserActivityRepo>,
            failing: &'static str,
        }

        #[async_trait]
        impl UserActivityRepo for FlakyRepo {
            async fn get(&self, fullname: &str) -> DbResult<Option<StoredUserRow>> {
                if fullname == self.failing {
                    return Err(DbError::Internal("connection reset".into()));
                }
                self.inner.get(fullname).await
            }

            async fn insert(&self, row: &StoredUserRow) -> DbResult<()> {
                self.inner.insert(row).await
            }

            async fn update_login(
                &self,
                fullname: &str,
                lastlogin: DateTime<Utc>,
                siterole: &str,
            ) -> DbResult<()> {
                self.inner.update_login(fullname, lastlogin, siterole).await
            }

            async fn list(&self) -> DbResult<Vec<StoredUserRow>> {
                self.inner.list().await
            }
        }

        #[tokio::test]
        async fn test_second_pass_writes_nothing() {
            let db = create_sqlite_db_pool().await;
            let repo = db.user_activity();
            let identities = vec![
                identity("alice", Some(at(2024, 3, 1)), "Viewer"),
                identity("bob", None, "Creator"),
            ];

            let first = persist_identities(repo.as_ref(), &identities).await;
            assert_eq!(first.inserted, 2);
            assert_eq!(first.updated, 0);
            assert!(first.failures.is_empty());

            let second = persist_identities(repo.as_ref(), &identities).await;
            assert_eq!(second.writes(), 0);
            assert_eq!(second.unchanged, 2);
        }

        #[tokio::test]
        async fn test_stored_login_is_monotonic() {
            let db = create_sqlite_db_pool().await;
            let repo = db.user_activity();
            repo.insert(&StoredUserRow {
                fullname: "alice".into(),
                lastlogin: Some(at(2024, 1, 1)),
                siterole: "Viewer".into(),
            })
            .await
            .unwrap();

            let older = persist_identities(
                repo.as_ref(),
                &[identity("alice", Some(at(2023, 6, 1)), "Creator")],
            )
            .await;
            assert_eq!(older.unchanged, 1);
            let row = repo.get("alice").await.unwrap().unwrap();
            assert_eq!(row.lastlogin, Some(at(2024, 1, 1)));
            assert_eq!(row.siterole, "Viewer");

            let newer = persist_identities(
                repo.as_ref(),
                &[identity("alice", Some(at(2024, 6, 1)), "Creator")],
            )
            .await;
            assert_eq!(newer.updated, 1);
            let row = repo.get("alice").await.unwrap().unwrap();
            assert_eq!(row.lastlogin, Some(at(2024, 6, 1)));
            assert_eq!(row.siterole, "Creator");
        }

        #[tokio::test]
        async fn test_row_failure_does_not_stop_batch() {
            let db = create_sqlite_db_pool().await;
            let repo = FlakyRepo {
                inner: db.user_activity(),
                failing: "bob",
            };
            let identities = vec![
                identity("alice", None, "Viewer"),
                identity("bob", None, "Viewer"),
                identity("carol", None, "Viewer"),
            ];

            let summary = persist_identities(&repo, &identities).await;
            assert_eq!(summary.inserted, 2);
            assert_eq!(summary.failures.len(), 1);
            assert_eq!(summary.failures[0].fullname, "bob");

            let names: Vec<String> = db
                .user_activity()
                .list()
                .await
                .unwrap()
                .into_iter()
                .map(|r| r.fullname)
                .collect();
            assert_eq!(names, vec!["alice", "carol"]);
        }

        #[tokio::test]
        async fn test_undecodable_stored_row_does_not_stop_batch() {
            let pool = create_sqlite_pool().await;
            run_sqlite_migrations(&pool).await;
            sqlx::query(
                "INSERT INTO user_activity (fullname, lastlogin, siterole) VALUES ('bob', '01.02.2024', 'Viewer')",
            )
            .execute(&pool)
            .await
            .unwrap();
            let db = DbPool::from_sqlite(pool);
            let repo = db.user_activity();

            let summary = persist_identities(
                repo.as_ref(),
                &[
                    identity("bob", Some(at(2024, 6, 1)), "Creator"),
                    identity("carol", None, "Viewer"),
                ],
            )
            .await;

            assert_eq!(summary.failures.len(), 1);
            assert_eq!(summary.failures[0].fullname, "bob");
            assert!(matches!(summary.failures[0].error, DbError::Sqlx(_)));
            assert_eq!(summary.inserted, 1);
            assert!(repo.get("carol").await.unwrap().is_some());
        }
    }
}
