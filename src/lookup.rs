//! Single-URL index lookup with bounded retries
//!
//! One lookup asks the search provider for `site:<url>` and reports whether
//! any organic result points at the URL or below it. Every attempt draws a
//! credential from the pool, so a retry after a rate limit or server error
//! naturally moves to the next credential in rotation.

use crate::config::LookupConfig;
use crate::credentials::CredentialPool;
use crate::provider::{ProviderError, SearchProvider};
use crate::retry::{IsRetryable, retry_delay};
use crate::types::QueryOutcome;
use std::sync::Arc;

/// Outcome of one lookup plus how it was reached
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupReport {
    /// Final outcome for the URL
    pub outcome: QueryOutcome,
    /// `NotIndexed` only because every attempt failed
    pub degraded: bool,
    /// Provider calls made
    pub attempts: u32,
}

impl LookupReport {
    fn settled(outcome: QueryOutcome, attempts: u32) -> Self {
        Self {
            outcome,
            degraded: false,
            attempts,
        }
    }
}

/// Runs lookups against the provider using credentials from the pool
pub struct LookupClient {
    pool: Arc<CredentialPool>,
    provider: Arc<dyn SearchProvider>,
    config: LookupConfig,
}

impl LookupClient {
    /// Create a client sharing the given pool and provider
    pub fn new(
        pool: Arc<CredentialPool>,
        provider: Arc<dyn SearchProvider>,
        config: LookupConfig,
    ) -> Self {
        Self {
            pool,
            provider,
            config,
        }
    }

    /// Check whether `url` is indexed
    pub async fn lookup(&self, url: &str) -> LookupReport {
        let base = url.trim_end_matches('/');
        let query = format!("site:{}", url);
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error: Option<ProviderError> = None;

        for attempt in 1..=max_attempts {
            let Some(credential) = self.pool.acquire().await else {
                tracing::debug!(url, "no credential available");
                return LookupReport::settled(QueryOutcome::OutOfCredentials, attempt - 1);
            };

            match self.provider.search(&credential.key_value, &query).await {
                Ok(response) => {
                    self.pool.decrement(&credential).await;

                    let indexed = response.links.iter().any(|link| link_matches(base, link));
                    let outcome = if indexed {
                        QueryOutcome::Indexed
                    } else {
                        QueryOutcome::NotIndexed
                    };
                    tracing::debug!(url, ?outcome, attempt, "lookup finished");
                    return LookupReport::settled(outcome, attempt);
                }
                Err(error) => {
                    if error == ProviderError::RateLimited {
                        self.pool.release_on_rate_limit(&credential).await;
                    }
                    if error.consumed_quota() {
                        self.pool.decrement(&credential).await;
                    }

                    if !error.is_retryable() {
                        tracing::error!(url, error = %error, "lookup failed permanently");
                        return LookupReport::settled(QueryOutcome::Error(error.to_string()), attempt);
                    }

                    tracing::warn!(
                        url,
                        credential = %credential.name,
                        error = %error,
                        attempt,
                        max_attempts,
                        "lookup attempt failed"
                    );

                    if attempt < max_attempts {
                        tokio::time::sleep(retry_delay(&error, attempt, &self.config)).await;
                    }
                    last_error = Some(error);
                }
            }
        }

        match last_error {
            Some(error) if error.is_transport() => {
                LookupReport::settled(QueryOutcome::Error(error.to_string()), max_attempts)
            }
            _ => {
                tracing::warn!(url, "retries exhausted, recording as not indexed");
                LookupReport {
                    outcome: QueryOutcome::NotIndexed,
                    degraded: true,
                    attempts: max_attempts,
                }
            }
        }
    }
}

/// Whether a result link points at `base` or somewhere below it
///
/// Both sides are compared without trailing slashes.
pub fn link_matches(base: &str, link: &str) -> bool {
    let base = base.trim_end_matches('/');
    let link = link.trim_end_matches('/');
    if base.is_empty() || link.is_empty() {
        return false;
    }

    link == base
        || link
            .strip_prefix(base)
            .is_some_and(|rest| rest.starts_with('/'))
}
