//! The inactivity report pass, and the worker that repeats it.
//!
//! A pass signs in at server level, lists the sites, then signs in to each
//! site in turn to list its users. Stale users are merged across sites and
//! written to the `user_activity` table.
//!
//! Failures are contained where they happen:
//! - A failing site is logged and skipped
//! - A failing row is logged and the batch continues
//! - Only server-level sign-in, site enumeration, or an unreachable database
//!   end the pass early

use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::{
    config::{AppConfig, ReportConfig},
    db::{DbError, DbPool},
    models::MergedIdentity,
    rest::{RestError, TableauClient},
    services::{
        IdentityMap, InactivityPolicy, PersistSummary, RejectedRecord, SiteFailure,
        collect_users, merge_site_users, persist_identities,
    },
};

/// Options for a single pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Collect and report without writing to the database.
    pub dry_run: bool,
}

/// Results from a single pass.
#[derive(Debug)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub inactivity_days: u32,
    /// Sites returned by the server.
    pub sites_total: usize,
    /// User records received across all successful sites.
    pub records_seen: usize,
    /// Stale users, never-logged-in first, then newest login to oldest.
    pub identities: Vec<MergedIdentity>,
    pub site_failures: Vec<SiteFailure>,
    pub rejected: Vec<RejectedRecord>,
    /// `None` when persistence was skipped.
    pub persist: Option<PersistSummary>,
    /// Rows in `user_activity` after writing. `None` when skipped or unreadable.
    pub stored_rows: Option<usize>,
    pub duration_ms: u64,
}

/// Errors that end a pass early.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Failed to create REST client: {0}")]
    Client(#[source] RestError),

    #[error("Server sign-in failed: {0}")]
    SignIn(#[source] RestError),

    #[error("Failed to list sites: {0}")]
    SiteEnumeration(#[source] RestError),

    /// The report was collected but could not be written.
    #[error("Database unavailable: {source}")]
    Database {
        #[source]
        source: DbError,
        report: Box<SyncReport>,
    },
}

impl SyncError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::Client(_) => 2,
            SyncError::SignIn(_) => 3,
            SyncError::SiteEnumeration(_) => 4,
            SyncError::Database { .. } => 5,
        }
    }

    /// The collected report, if the pass got that far.
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            SyncError::Database { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// Run one full pass: collect, merge, and persist unless `dry_run` is set.
pub async fn run_sync(config: &AppConfig, options: SyncOptions) -> Result<SyncReport, SyncError> {
    let client = TableauClient::from_config(&config.tableau).map_err(SyncError::Client)?;
    let mut report = collect_report(&client, &config.report, Utc::now()).await?;

    if options.dry_run {
        tracing::info!("Dry run, skipping persistence");
        return Ok(report);
    }

    let start = Instant::now();
    let db = match open_database(config).await {
        Ok(db) => db,
        Err(source) => {
            tracing::error!(error = %source, "Database unavailable");
            return Err(SyncError::Database {
                source,
                report: Box::new(report),
            });
        }
    };

    let repo = db.user_activity();
    let summary = persist_identities(repo.as_ref(), &report.identities).await;
    let stored_rows = match repo.list().await {
        Ok(rows) => Some(rows.len()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read back user_activity");
            None
        }
    };
    db.close().await;

    for failure in &summary.failures {
        tracing::warn!(
            user = %failure.fullname,
            error = %failure.error,
            "Failed to persist user"
        );
    }
    tracing::info!(
        inserted = summary.inserted,
        updated = summary.updated,
        unchanged = summary.unchanged,
        failed = summary.failures.len(),
        stored = ?stored_rows,
        "Persisted inactive users"
    );

    report.persist = Some(summary);
    report.stored_rows = stored_rows;
    report.duration_ms += start.elapsed().as_millis() as u64;
    Ok(report)
}

/// Collect every site's users and merge the stale ones as of `now`.
pub async fn collect_report(
    client: &TableauClient,
    config: &ReportConfig,
    now: DateTime<Utc>,
) -> Result<SyncReport, SyncError> {
    let start = Instant::now();
    let policy = InactivityPolicy::from_config(config, now);

    let session = client.sign_in("").await.map_err(SyncError::SignIn)?;
    let sites = client
        .list_sites(&session)
        .await
        .map_err(SyncError::SiteEnumeration)?;
    tracing::info!(sites = sites.len(), "Listed sites");

    let collection = collect_users(client, &sites).await;
    let records_seen = collection.user_count();

    let mut map = IdentityMap::new();
    for site in collection.sites {
        map = merge_site_users(map, site.users, &policy);
    }
    let (identities, rejected) = map.into_sorted();

    for rejected in &rejected {
        tracing::warn!(
            user = %rejected.record.name,
            site = %rejected.record.site_name,
            error = %rejected.error,
            "Skipping user with unparseable last login"
        );
    }
    tracing::info!(
        sites = sites.len(),
        failed_sites = collection.failures.len(),
        records = records_seen,
        inactive = identities.len(),
        "Collected inactive users"
    );

    Ok(SyncReport {
        started_at: now,
        inactivity_days: config.inactivity_days,
        sites_total: sites.len(),
        records_seen,
        identities,
        site_failures: collection.failures,
        rejected,
        persist: None,
        stored_rows: None,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

async fn open_database(config: &AppConfig) -> Result<DbPool, DbError> {
    let db = DbPool::from_config(&config.database).await?;
    if config.database.run_migrations() {
        db.run_migrations().await?;
    }
    db.health_check().await?;
    Ok(db)
}

/// Runs a pass immediately, then again after every interval.
///
/// A failed pass is logged and the worker keeps going. Runs until the task
/// is cancelled or the process exits.
pub async fn start_sync_worker(config: AppConfig, options: SyncOptions) {
    let interval = config.schedule.interval();

    tracing::info!(
        interval_secs = config.schedule.interval_secs,
        dry_run = options.dry_run,
        "Starting inactivity sync worker"
    );

    loop {
        match run_sync(&config, options).await {
            Ok(report) => {
                tracing::info!(
                    inactive = report.identities.len(),
                    failed_sites = report.site_failures.len(),
                    duration_ms = report.duration_ms,
                    "Inactivity sync complete"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Inactivity sync failed, retrying next interval"
                );
            }
        }

        tokio::time::sleep(interval).await;
    }
}
