use std::fmt;

use serde::Deserialize;

/// A tenant hosted by the server, as returned by the sites listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    pub name: String,
    /// URL fragment used to sign in to this site. Empty for the default site.
    #[serde(default)]
    pub content_url: String,
}

/// Short-lived credentials returned by a sign-in, valid for a single site.
///
/// Sessions are never cached: each site's traversal signs in again.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub site_id: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("site_id", &self.site_id)
            .finish()
    }
}
