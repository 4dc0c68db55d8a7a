//! HTTP client for the Serper search and account endpoints.

use super::{ProviderError, SearchProvider, SearchResponse};
use crate::config::ProviderConfig;
use crate::error::Result;
use reqwest::StatusCode;

const API_KEY_HEADER: &str = "X-API-KEY";

/// Production [`SearchProvider`] over reqwest.
pub struct SerperClient {
    client: reqwest::Client,
    search_url: String,
    account_url: String,
}

impl SerperClient {
    /// Build a client with the configured endpoints and request timeout
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            search_url: config.search_url.clone(),
            account_url: config.account_url.clone(),
        })
    }
}

#[async_trait::async_trait]
impl SearchProvider for SerperClient {
    async fn search(&self, key: &str, query: &str) -> std::result::Result<SearchResponse, ProviderError> {
        let response = self
            .client
            .post(&self.search_url)
            .header(API_KEY_HEADER, key)
            .json(&serde_json::json!({ "q": query }))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => return Err(ProviderError::RateLimited),
            other => return Err(ProviderError::Status(other.as_u16())),
        }

        // Read the body first so a decode failure is classified as malformed,
        // not as a transport error.
        let bytes = response.bytes().await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(SearchResponse::from_json(&body))
    }

    async fn balance(&self, key: &str) -> std::result::Result<i64, ProviderError> {
        let response = self
            .client
            .get(&self.account_url)
            .header(API_KEY_HEADER, key)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => return Err(ProviderError::RateLimited),
            other => return Err(ProviderError::Status(other.as_u16())),
        }

        let bytes = response.bytes().await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let balance = match body.get("balance") {
            None => 0,
            Some(value) => value
                .as_i64()
                .or_else(|| value.as_f64().map(|f| f as i64))
                .ok_or_else(|| {
                    ProviderError::Malformed(format!("balance is not a number: {}", value))
                })?,
        };

        Ok(balance.max(0))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> SerperClient {
        let config = ProviderConfig {
            search_url: format!("{}/search", server.uri()),
            account_url: format!("{}/account", server.uri()),
            request_timeout: Duration::from_millis(500),
            ..ProviderConfig::default()
        };
        SerperClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn search_posts_query_with_key_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("X-API-KEY", "k1"))
            .and(body_json(serde_json::json!({"q": "site:a.com"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "organic": [{"link": "https://a.com/"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let response = client.search("k1", "site:a.com").await.unwrap();
        assert_eq!(response.links, vec!["https://a.com/"]);
    }

    #[tokio::test]
    async fn search_maps_status_codes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("X-API-KEY", "throttled"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(header("X-API-KEY", "broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(
            client.search("throttled", "site:a.com").await,
            Err(ProviderError::RateLimited)
        );
        assert_eq!(
            client.search("broken", "site:a.com").await,
            Err(ProviderError::Status(503))
        );
    }

    #[tokio::test]
    async fn search_with_garbled_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let result = client.search("k1", "site:a.com").await;
        assert!(matches!(result, Err(ProviderError::Malformed(_))));
    }

    #[tokio::test]
    async fn slow_response_is_a_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"organic": []}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(
            client.search("k1", "site:a.com").await,
            Err(ProviderError::Timeout)
        );
    }

    #[tokio::test]
    async fn balance_reads_account_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/account"))
            .and(header("X-API-KEY", "k1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"balance": 2450})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(client.balance("k1").await, Ok(2450));
    }

    #[tokio::test]
    async fn balance_missing_field_is_zero_and_errors_propagate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("X-API-KEY", "empty"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(header("X-API-KEY", "revoked"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(client.balance("empty").await, Ok(0));
        assert_eq!(
            client.balance("revoked").await,
            Err(ProviderError::Status(403))
        );
    }
}
