use crate::{
    models::{RawUserRecord, Site},
    rest::{RestError, TableauClient},
};

/// A site whose users could not be collected.
#[derive(Debug)]
pub struct SiteFailure {
    pub site_name: String,
    pub error: RestError,
}

/// Users listed on one site.
#[derive(Debug, Clone)]
pub struct SiteUsers {
    pub site_name: String,
    pub users: Vec<RawUserRecord>,
}

/// Result of visiting every site.
#[derive(Debug, Default)]
pub struct Collection {
    /// Successful sites, in visit order.
    pub sites: Vec<SiteUsers>,
    pub failures: Vec<SiteFailure>,
}

impl Collection {
    pub fn user_count(&self) -> usize {
        self.sites.iter().map(|s| s.users.len()).sum()
    }
}

/// Sign in to `site` and list its users.
pub async fn collect_site(
    client: &TableauClient,
    site: &Site,
) -> Result<Vec<RawUserRecord>, RestError> {
    let session = client.sign_in(&site.content_url).await?;
    client.list_users(&session, &site.name).await
}

/// Visit each site in order, one at a time.
///
/// A failing site is logged and recorded; the remaining sites are still visited.
pub async fn collect_users(client: &TableauClient, sites: &[Site]) -> Collection {
    let mut collection = Collection::default();

    for site in sites {
        match collect_site(client, site).await {
            Ok(users) => {
                tracing::debug!(site = %site.name, users = users.len(), "Listed site users");
                collection.sites.push(SiteUsers {
                    site_name: site.name.clone(),
                    users,
                });
            }
            Err(error) => {
                tracing::warn!(
                    site = %site.name,
                    status = ?error.status(),
                    error = %error,
                    "Failed to collect site users, skipping site"
                );
                collection.failures.push(SiteFailure {
                    site_name: site.name.clone(),
                    error,
                });
            }
        }
    }

    collection
}
