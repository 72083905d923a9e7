use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything that can go wrong while talking to the video platform.
///
/// None of these are fatal: the service maps each one onto its configured
/// fallback policy.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("no usable API key configured")]
    MissingCredential,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("upstream returned no results")]
    Empty,
}

impl UpstreamError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamError::Request(e) if e.is_timeout())
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}
