//! Wire format of the REST API's JSON representation.
//!
//! Collections are wrapped twice (`{"sites": {"site": [...]}}`). The server
//! sends an empty object for an empty collection, so every level defaults.

use serde::{Deserialize, Serialize};

use crate::models::Site;

#[derive(Debug, Serialize)]
pub(crate) struct SignInRequest<'a> {
    pub credentials: SignInCredentials<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignInCredentials<'a> {
    pub personal_access_token_name: &'a str,
    pub personal_access_token_secret: &'a str,
    pub site: SiteRef<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SiteRef<'a> {
    pub content_url: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignInResponse {
    pub credentials: IssuedCredentials,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssuedCredentials {
    pub token: String,
    pub site: IssuedSite,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssuedSite {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SitesResponse {
    #[serde(default)]
    pub sites: SiteList,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SiteList {
    #[serde(default)]
    pub site: Vec<Site>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UsersResponse {
    #[serde(default)]
    pub users: UserList,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UserList {
    #[serde(default)]
    pub user: Vec<ApiUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiUser {
    pub name: String,
    /// Missing for users who never logged in.
    #[serde(default)]
    pub last_login: Option<String>,
    #[serde(default)]
    pub site_role: String,
}
