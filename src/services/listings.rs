use crate::models::{Candidate, Query};
use async_trait::async_trait;
use thiserror::Error;

/// Errors from the external listings provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unauthorized: invalid or missing API key")]
    Unauthorized,

    #[error("API key not configured")]
    MissingApiKey,

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid response format: {0}")]
    InvalidResponse(String),
}

/// External restaurant listings source. The recommender treats this as a
/// black box returning zero or more raw candidates or a provider error;
/// retry policy, if any, lives behind this trait.
#[async_trait]
pub trait ListingsProvider: Send + Sync {
    /// Search for candidates matching the effective query
    async fn search(&self, query: &Query) -> Result<Vec<Candidate>, ProviderError>;

    /// Fetch a short review excerpt for one business, if available.
    /// Best-effort enrichment; providers without reviews keep the default.
    async fn review_snippet(&self, _business_id: &str) -> Result<Option<String>, ProviderError> {
        Ok(None)
    }
}
