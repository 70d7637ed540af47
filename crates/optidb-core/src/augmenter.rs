//! Recommendation augmenter contract
//!
//! An augmenter is an optional remote service (typically an LLM) that can
//! produce recommendations for a query in place of the heuristic rules. Any
//! error means "unavailable for this call"; the caller falls back to its own
//! rules.

use crate::{IndexInfo, QueryStats, Recommendation, TableInfo};
use async_trait::async_trait;
use thiserror::Error;

/// Error type for augmenter calls
#[derive(Debug, Clone, Error)]
pub enum AugmentError {
    /// Network-related error
    #[error("Network error: {0}")]
    Network(String),
    /// Authentication error (invalid API key, etc.)
    #[error("Authentication error: {0}")]
    Authentication(String),
    /// Rate limiting error
    #[error("Rate limited: {0}")]
    RateLimited(String),
    /// The provider returned an invalid response
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// The request was cancelled
    #[error("Request cancelled")]
    Cancelled,
    /// Timeout waiting for response
    #[error("Request timed out")]
    Timeout,
    /// Provider not configured or unavailable
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("Error: {0}")]
    Other(String),
}

/// Result type for augmenter calls
pub type AugmentResult<T> = std::result::Result<T, AugmentError>;

/// Metadata about an augmenter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMetadata {
    /// Display name (e.g., "Azure OpenAI")
    pub name: String,
    /// Model or deployment in use
    pub model: String,
}

impl ProviderMetadata {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
pub trait RecommendationAugmenter: Send + Sync {
    /// Produce recommendations for one query given the schema it runs against.
    ///
    /// Implementations validate their own upstream response shape. Returned
    /// confidence and risk values are sanitized again by the caller.
    async fn generate_recommendations(
        &self,
        query: &QueryStats,
        tables: &[TableInfo],
        indexes: &[IndexInfo],
    ) -> AugmentResult<Vec<Recommendation>>;

    /// Abort every in-flight request of this augmenter, across all callers.
    fn cancel(&self) {}

    fn metadata(&self) -> ProviderMetadata;

    /// Returns true if the provider is configured and can serve requests.
    fn is_available(&self) -> bool;
}
