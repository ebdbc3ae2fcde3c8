pub mod collector;
pub mod identity;
pub mod persistence;

pub use collector::{Collection, SiteFailure, SiteUsers, collect_site, collect_users};
pub use identity::{
    IdentityMap, InactivityPolicy, RejectedRecord, merge_all, merge_site_users, sort_identities,
};
pub use persistence::{PersistFailure, PersistSummary, UpsertAction, decide, persist_identities};
