use std::time::Duration;

use reqwest::{Client, Response, header};
use url::Url;

use super::{
    error::{RestError, RestResult},
    types::{
        SignInCredentials, SignInRequest, SignInResponse, SiteRef, SitesResponse, UsersResponse,
    },
};
use crate::{
    config::TableauConfig,
    models::{RawUserRecord, Session, Site},
};

const AUTH_HEADER: &str = "X-Tableau-Auth";

/// Client for the Tableau Server REST API.
///
/// Every call is a single request: no retries, no pagination, no session caching.
///
/// # Example
/// ```ignore
/// let client = TableauClient::from_config(&config.tableau)?;
///
/// let session = client.sign_in("").await?;
/// for site in client.list_sites(&session).await? {
///     let site_session = client.sign_in(&site.content_url).await?;
///     let users = client.list_users(&site_session, &site.name).await?;
/// }
/// ```
#[derive(Clone)]
pub struct TableauClient {
    http_client: Client,
    api_url: String,
    token_name: String,
    token_secret: String,
}

impl TableauClient {
    pub fn from_config(config: &TableauConfig) -> RestResult<Self> {
        let http_client = build_http_client(config.timeout(), config.accept_invalid_certs)?;
        Self::with_client(
            http_client,
            &config.base_url(),
            &config.api_version,
            &config.token_name,
            &config.token_secret,
        )
    }

    /// Create a client against `base_url` (e.g. `https://tableau.example.com`).
    pub fn new(
        base_url: &str,
        api_version: &str,
        token_name: &str,
        token_secret: &str,
        timeout: Duration,
    ) -> RestResult<Self> {
        let http_client = build_http_client(timeout, false)?;
        Self::with_client(http_client, base_url, api_version, token_name, token_secret)
    }

    fn with_client(
        http_client: Client,
        base_url: &str,
        api_version: &str,
        token_name: &str,
        token_secret: &str,
    ) -> RestResult<Self> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(RestError::InvalidResponse(format!(
                "{base_url} cannot be used as a base URL"
            )));
        }

        let api_url = format!(
            "{}/api/{}",
            base.as_str().trim_end_matches('/'),
            api_version.trim_matches('/')
        );

        Ok(Self {
            http_client,
            api_url,
            token_name: token_name.to_string(),
            token_secret: token_secret.to_string(),
        })
    }

    /// Exchange the personal access token for a session scoped to one site.
    ///
    /// An empty `content_url` signs in to the default site.
    pub async fn sign_in(&self, content_url: &str) -> RestResult<Session> {
        let url = format!("{}/auth/signin", self.api_url);
        let body = SignInRequest {
            credentials: SignInCredentials {
                personal_access_token_name: &self.token_name,
                personal_access_token_secret: &self.token_secret,
                site: SiteRef { content_url },
            },
        };

        let response = self.http_client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RestError::Authentication {
                site: content_url.to_string(),
                status: status.as_u16(),
            });
        }

        let parsed: SignInResponse = decode(response, "sign-in").await?;
        Ok(Session {
            token: parsed.credentials.token,
            site_id: parsed.credentials.site.id,
        })
    }

    /// List every site visible to the session, in server order.
    pub async fn list_sites(&self, session: &Session) -> RestResult<Vec<Site>> {
        let url = format!("{}/sites", self.api_url);
        let response = self.authorized_get(&url, session, "sites").await?;
        let parsed: SitesResponse = decode(response, "sites").await?;
        Ok(parsed.sites.site)
    }

    /// List the users of the session's site, tagging each record with `site_name`.
    pub async fn list_users(
        &self,
        session: &Session,
        site_name: &str,
    ) -> RestResult<Vec<RawUserRecord>> {
        let url = format!("{}/sites/{}/users", self.api_url, session.site_id);
        let resource = format!("users of site {site_name:?}");
        let response = self.authorized_get(&url, session, &resource).await?;
        let parsed: UsersResponse = decode(response, &resource).await?;

        Ok(parsed
            .users
            .user
            .into_iter()
            .map(|user| RawUserRecord {
                name: user.name,
                last_login: user.last_login,
                site_role: user.site_role,
                site_name: site_name.to_string(),
            })
            .collect())
    }

    async fn authorized_get(
        &self,
        url: &str,
        session: &Session,
        resource: &str,
    ) -> RestResult<Response> {
        let response = self
            .http_client
            .get(url)
            .header(AUTH_HEADER, &session.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RestError::Fetch {
                resource: resource.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

fn build_http_client(timeout: Duration, accept_invalid_certs: bool) -> RestResult<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );

    let builder = Client::builder().timeout(timeout).default_headers(headers);

    #[cfg(feature = "native-http")]
    let builder = builder.danger_accept_invalid_certs(accept_invalid_certs);
    #[cfg(not(feature = "native-http"))]
    let builder = {
        if accept_invalid_certs {
            tracing::warn!("accept_invalid_certs requires the 'native-http' feature and is ignored");
        }
        builder
    };

    Ok(builder.build()?)
}

async fn decode<T: serde::de::DeserializeOwned>(
    response: Response,
    resource: &str,
) -> RestResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| RestError::InvalidResponse(format!("{resource}: {e}")))
}
