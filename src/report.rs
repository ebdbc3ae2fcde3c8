//! Human-readable summary printed after a pass.

use chrono::SecondsFormat;

use crate::jobs::SyncReport;

/// Render the report: one line per inactive user, then the totals.
pub fn render(report: &SyncReport, print_sites: bool) -> String {
    let mut lines: Vec<String> = report
        .identities
        .iter()
        .map(|identity| {
            let last_login = identity
                .last_login
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_else(|| "never".to_string());
            let mut line = format!(
                "{}  last login: {}  role: {}",
                identity.name, last_login, identity.site_role
            );
            if print_sites {
                line.push_str(&format!("  sites: {}", identity.sites.join(", ")));
            }
            line
        })
        .collect();

    lines.push(String::new());
    lines.push(format!(
        "Report as of {}",
        report.started_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    lines.push(format!(
        "Total unique users inactive for more than {} days: {}",
        report.inactivity_days,
        report.identities.len()
    ));
    lines.push(format!(
        "Sites: {} listed, {} failed",
        report.sites_total,
        report.site_failures.len()
    ));
    lines.extend(
        report
            .site_failures
            .iter()
            .map(|failure| format!("  {}: {}", failure.site_name, failure.error)),
    );
    if !report.rejected.is_empty() {
        lines.push(format!(
            "Skipped {} record(s) with unparseable last login",
            report.rejected.len()
        ));
    }
    lines.push(match &report.persist {
        Some(summary) => format!(
            "Database: {} inserted, {} updated, {} unchanged, {} failed",
            summary.inserted,
            summary.updated,
            summary.unchanged,
            summary.failures.len()
        ),
        None => "Database: not written".to_string(),
    });
    if let Some(rows) = report.stored_rows {
        lines.push(format!("Rows in user_activity: {rows}"));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
