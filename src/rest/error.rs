/// Errors from the Tableau Server REST API.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// Sign-in was rejected or failed. `site` is the content URL, empty for the default site.
    #[error("Sign-in to site {site:?} failed with status {status}")]
    Authentication { site: String, status: u16 },

    /// A listing call returned a non-success status.
    #[error("Fetching {resource} failed with status {status}")]
    Fetch { resource: String, status: u16 },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl RestError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            RestError::Authentication { status, .. } | RestError::Fetch { status, .. } => {
                Some(*status)
            }
            RestError::Request(e) => e.status().map(|s| s.as_u16()),
            RestError::InvalidResponse(_) | RestError::InvalidUrl(_) => None,
        }
    }
}

/// Result type for REST client operations.
pub type RestResult<T> = Result<T, RestError>;
