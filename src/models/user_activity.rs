use chrono::{DateTime, Utc};
use serde::Serialize;

/// A timestamp string from the server that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid last login timestamp {value:?}: {reason}")]
pub struct ParseError {
    pub value: String,
    pub reason: String,
}

/// Parse a last-login timestamp as reported by the server.
///
/// The server reports ISO 8601 timestamps with a trailing `Z`
/// (`2024-01-01T00:00:00Z`). Explicit offsets are accepted and normalized to UTC.
pub fn parse_last_login(value: &str) -> Result<DateTime<Utc>, ParseError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ParseError {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// One user as listed on one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUserRecord {
    pub name: String,
    /// Last login exactly as the server sent it. `None` means never logged in.
    pub last_login: Option<String>,
    pub site_role: String,
    pub site_name: String,
}

impl RawUserRecord {
    /// Parsed last login, treating an absent value as `Ok(None)`.
    pub fn parsed_last_login(&self) -> Result<Option<DateTime<Utc>>, ParseError> {
        self.last_login.as_deref().map(parse_last_login).transpose()
    }
}

/// A user folded across every site where they were found stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedIdentity {
    /// Username, unique across the whole report.
    pub name: String,
    /// Most recent login seen on any site, `None` if the user never logged in.
    pub last_login: Option<DateTime<Utc>>,
    /// Distinct site names in first-seen order. Never empty.
    pub sites: Vec<String>,
    /// Role on the site that reported the most recent login.
    pub site_role: String,
}

/// Persisted row in the `user_activity` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUserRow {
    pub fullname: String,
    pub lastlogin: Option<DateTime<Utc>>,
    pub siterole: String,
}

impl From<&MergedIdentity> for StoredUserRow {
    fn from(identity: &MergedIdentity) -> Self {
        Self {
            fullname: identity.name.clone(),
            lastlogin: identity.last_login,
            siterole: identity.site_role.clone(),
        }
    }
}
