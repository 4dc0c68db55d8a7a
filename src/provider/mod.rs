//! External search provider abstraction
//!
//! The engine talks to two provider endpoints: a search endpoint answering
//! `site:` queries and an account endpoint reporting a credential's remaining
//! balance. [`SearchProvider`] is the seam; [`SerperClient`] is the production
//! implementation over HTTP.

mod serper;

pub use serper::SerperClient;

use thiserror::Error;

/// Failure of a single provider call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// HTTP 429 for this credential
    #[error("rate limited")]
    RateLimited,

    /// Any other non-200 status
    #[error("unexpected status {0}")]
    Status(u16),

    /// 200 with a body that could not be decoded; the call was still billed
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The request exceeded its timeout
    #[error("request timed out")]
    Timeout,

    /// Connection-level failure
    #[error("network error: {0}")]
    Network(String),

    /// The request could not be constructed
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Whether the provider answered (and therefore billed) the call
    pub fn consumed_quota(&self) -> bool {
        matches!(self, ProviderError::Malformed(_))
    }

    /// Whether the failure happened before any HTTP response arrived
    pub fn is_transport(&self) -> bool {
        matches!(self, ProviderError::Timeout | ProviderError::Network(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ProviderError::Timeout
        } else if error.is_builder() {
            ProviderError::InvalidRequest(error.to_string())
        } else if error.is_decode() {
            ProviderError::Malformed(error.to_string())
        } else {
            ProviderError::Network(error.to_string())
        }
    }
}

/// Links returned for one search query, in result order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResponse {
    /// `organic[].link` values that were present and non-empty
    pub links: Vec<String>,
}

impl SearchResponse {
    /// Extract organic result links from a decoded search body
    ///
    /// Missing `organic`, non-array `organic`, non-object items and items
    /// without a string `link` are all tolerated.
    pub fn from_json(body: &serde_json::Value) -> Self {
        let links = body
            .get("organic")
            .and_then(|organic| organic.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("link").and_then(|link| link.as_str()))
                    .filter(|link| !link.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self { links }
    }
}

/// Abstraction over the external search and account endpoints, enabling testability.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one search query with the given credential
    async fn search(&self, key: &str, query: &str) -> Result<SearchResponse, ProviderError>;

    /// Fetch the remaining balance of a credential
    async fn balance(&self, key: &str) -> Result<i64, ProviderError>;
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn links_extracted_in_order() {
        let body = json!({
            "organic": [
                {"link": "https://a.com/"},
                {"title": "no link"},
                "not an object",
                {"link": ""},
                {"link": "https://a.com/page"}
            ]
        });

        let response = SearchResponse::from_json(&body);
        assert_eq!(response.links, vec!["https://a.com/", "https://a.com/page"]);
    }

    #[test]
    fn missing_or_wrong_typed_organic_is_empty() {
        assert!(SearchResponse::from_json(&json!({})).links.is_empty());
        assert!(
            SearchResponse::from_json(&json!({"organic": {"link": "x"}}))
                .links
                .is_empty()
        );
    }

    #[test]
    fn only_malformed_bodies_consume_quota() {
        assert!(ProviderError::Malformed("eof".into()).consumed_quota());
        assert!(!ProviderError::Status(500).consumed_quota());
        assert!(!ProviderError::RateLimited.consumed_quota());
        assert!(ProviderError::Timeout.is_transport());
        assert!(!ProviderError::Status(502).is_transport());
    }
}
