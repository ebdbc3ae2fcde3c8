use std::fmt;

use serde::Deserialize;

use super::ConfigError;

/// Connection details and personal access token for the Tableau Server REST API.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableauConfig {
    /// Server hostname, optionally with a port (`tableau.example.com:8443`).
    pub host: String,

    /// URL scheme used to reach the server.
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// REST API version, e.g. `3.19`.
    pub api_version: String,

    /// Name of the personal access token.
    pub token_name: String,

    /// Secret of the personal access token.
    pub token_secret: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Skip TLS certificate verification. Only for servers with self-signed certificates.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl TableauConfig {
    /// Base URL of the server, without the API path.
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host.trim_end_matches('/'))
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("tableau.host", &self.host),
            ("tableau.api_version", &self.api_version),
            ("tableau.token_name", &self.token_name),
            ("tableau.token_secret", &self.token_secret),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(field.to_string()));
            }
        }
        if !matches!(self.scheme.as_str(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "tableau.scheme must be \"http\" or \"https\", got \"{}\"",
                self.scheme
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "tableau.timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for TableauConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableauConfig")
            .field("host", &self.host)
            .field("scheme", &self.scheme)
            .field("api_version", &self.api_version)
            .field("token_name", &self.token_name)
            .field("token_secret", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

pub(super) fn default_scheme() -> String {
    "https".to_string()
}

pub(super) fn default_timeout_secs() -> u64 {
    30
}
