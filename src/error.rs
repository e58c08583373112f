/// Everything that can go wrong around an enrichment run
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    /// Missing or invalid trigger credential
    #[error("unauthorized")]
    Unauthorized,

    /// A fetched row does not have the expected shape
    #[error("validation error: {0}")]
    Validation(String),

    /// The backing store rejected or failed a request
    #[error("backend error: {0}")]
    Backend(String),

    /// Another run currently holds the lease
    #[error("an enrichment run is already in progress")]
    AlreadyRunning,

    /// Configuration loading or validation error
    #[error("config error: {0}")]
    Config(String),

    /// Anything unanticipated that escaped the run
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, EnrichmentError>;

impl EnrichmentError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<reqwest::Error> for EnrichmentError {
    fn from(err: reqwest::Error) -> Self {
        Self::Backend(err.to_string())
    }
}
