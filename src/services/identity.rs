//! Cross-site identity merging.
//!
//! Users are keyed by name across every site. A user is kept only while they
//! are stale on the site being folded in; the merged record carries the most
//! recent login seen anywhere and the role from the site that reported it.

use std::{cmp::Ordering, collections::HashMap};

use chrono::{DateTime, Duration, Utc};

use crate::{
    config::ReportConfig,
    models::{MergedIdentity, ParseError, RawUserRecord},
};

/// Decides whether a last login is old enough to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InactivityPolicy {
    now: DateTime<Utc>,
    threshold: Duration,
}

impl InactivityPolicy {
    pub fn new(now: DateTime<Utc>, threshold: Duration) -> Self {
        Self { now, threshold }
    }

    pub fn from_config(config: &ReportConfig, now: DateTime<Utc>) -> Self {
        Self::new(now, config.threshold())
    }

    /// A user who never logged in is always stale.
    pub fn is_stale(&self, last_login: Option<DateTime<Utc>>) -> bool {
        match last_login {
            None => true,
            Some(at) => self.now - at > self.threshold,
        }
    }
}

/// A record left out of the merge because its timestamp could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub record: RawUserRecord,
    pub error: ParseError,
}

/// Merged identities in first-seen order, plus the records that were rejected.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    identities: Vec<MergedIdentity>,
    index: HashMap<String, usize>,
    rejected: Vec<RejectedRecord>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&MergedIdentity> {
        self.index.get(name).map(|&i| &self.identities[i])
    }

    pub fn rejected(&self) -> &[RejectedRecord] {
        &self.rejected
    }

    /// Identities sorted for reporting, and the rejected records.
    pub fn into_sorted(self) -> (Vec<MergedIdentity>, Vec<RejectedRecord>) {
        let mut identities = self.identities;
        sort_identities(&mut identities);
        (identities, self.rejected)
    }

    fn absorb(&mut self, record: RawUserRecord, policy: &InactivityPolicy) {
        let last_login = match record.parsed_last_login() {
            Ok(last_login) => last_login,
            Err(error) => {
                self.rejected.push(RejectedRecord { record, error });
                return;
            }
        };

        if !policy.is_stale(last_login) {
            return;
        }

        let Some(&i) = self.index.get(&record.name) else {
            self.index.insert(record.name.clone(), self.identities.len());
            self.identities.push(MergedIdentity {
                name: record.name,
                last_login,
                sites: vec![record.site_name],
                site_role: record.site_role,
            });
            return;
        };

        let existing = &mut self.identities[i];
        if !existing.sites.contains(&record.site_name) {
            existing.sites.push(record.site_name);
        }
        // Later records win ties so the role follows the last site processed
        if let Some(incoming) = last_login
            && existing.last_login.is_none_or(|current| incoming >= current)
        {
            existing.last_login = Some(incoming);
            existing.site_role = record.site_role;
        }
    }
}

/// Fold one site's users into `map`, in the order they were listed.
pub fn merge_site_users(
    mut map: IdentityMap,
    records: impl IntoIterator<Item = RawUserRecord>,
    policy: &InactivityPolicy,
) -> IdentityMap {
    for record in records {
        map.absorb(record, policy);
    }
    map
}

/// Fold every record into a fresh map.
pub fn merge_all(
    records: impl IntoIterator<Item = RawUserRecord>,
    policy: &InactivityPolicy,
) -> IdentityMap {
    merge_site_users(IdentityMap::new(), records, policy)
}

/// Users who never logged in first, then newest login to oldest.
///
/// The sort is stable, so ties keep first-seen order.
pub fn sort_identities(identities: &mut [MergedIdentity]) {
    identities.sort_by(|a, b| match (a.last_login, b.last_login) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => y.cmp(&x),
    });
}
