//! Round-robin credential pool with quota tracking.

use super::{Credential, CredentialStore};
use crate::config::ProviderConfig;
use crate::error::Result;
use crate::provider::SearchProvider;
use crate::types::{CredentialInfo, CredentialStatus, PoolStatus};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

struct PoolState {
    credentials: Vec<Credential>,
    /// Position the next scan starts from
    cursor: usize,
    /// Position of the credential returned by the last acquisition
    current: Option<usize>,
}

impl PoolState {
    fn position(&self, credential: &Credential) -> Option<usize> {
        self.credentials.iter().position(|c| c.id == credential.id)
    }
}

/// Shared pool of provider credentials
///
/// All mutation happens under one async lock. Stale balances are refreshed
/// while the lock is held so that concurrent acquirers observe the refreshed
/// quota; the search call itself is always made by the caller, outside the lock.
pub struct CredentialPool {
    state: Mutex<PoolState>,
    provider: Arc<dyn SearchProvider>,
    store: Arc<dyn CredentialStore>,
    warning_threshold: i64,
    staleness_window: Duration,
    refresh_delay: Duration,
}

impl CredentialPool {
    /// Create a pool over an explicit set of credentials
    pub fn new(
        credentials: Vec<Credential>,
        provider: Arc<dyn SearchProvider>,
        store: Arc<dyn CredentialStore>,
        config: &ProviderConfig,
    ) -> Self {
        Self {
            state: Mutex::new(PoolState {
                credentials,
                cursor: 0,
                current: None,
            }),
            provider,
            store,
            warning_threshold: config.warning_threshold,
            staleness_window: config.staleness_window,
            refresh_delay: config.refresh_delay,
        }
    }

    /// Create a pool from every record in the store
    pub async fn load(
        provider: Arc<dyn SearchProvider>,
        store: Arc<dyn CredentialStore>,
        config: &ProviderConfig,
    ) -> Result<Self> {
        let credentials = store.load_credentials().await?;
        tracing::info!(count = credentials.len(), "loaded credentials");
        Ok(Self::new(credentials, provider, store, config))
    }

    /// Quota at or below which a credential is no longer handed out
    pub fn warning_threshold(&self) -> i64 {
        self.warning_threshold
    }

    /// Hand out the next eligible credential in rotation order
    ///
    /// Returns `None` when every credential is rate limited, exhausted, or at
    /// or below the warning threshold.
    pub async fn acquire(&self) -> Option<Credential> {
        let mut state = self.state.lock().await;
        let index = self.find_eligible(&mut state).await?;

        state.current = Some(index);
        state.cursor = index + 1;
        let credential = state.credentials[index].clone();

        tracing::debug!(
            credential = %credential.name,
            remaining = credential.remaining,
            "acquired credential"
        );
        Some(credential)
    }

    /// Whether `acquire` would currently succeed, without advancing the rotation
    pub async fn has_available(&self) -> bool {
        let mut state = self.state.lock().await;
        self.find_eligible(&mut state).await.is_some()
    }

    /// Sideline a credential the provider answered 429 for
    pub async fn release_on_rate_limit(&self, credential: &Credential) {
        let mut state = self.state.lock().await;
        let Some(index) = state.position(credential) else {
            return;
        };

        let entry = &mut state.credentials[index];
        entry.remaining = 0;
        entry.status = CredentialStatus::RateLimited;
        tracing::warn!(credential = %entry.name, "credential rate limited, rotating");

        state.cursor = index + 1;
    }

    /// Record one billed provider call against a credential
    pub async fn decrement(&self, credential: &Credential) {
        let mut state = self.state.lock().await;
        let Some(index) = state.position(credential) else {
            return;
        };

        let threshold = self.warning_threshold;
        let entry = &mut state.credentials[index];
        entry.remaining = (entry.remaining - 1).max(0);
        entry.total_used += 1;

        if entry.remaining <= threshold {
            entry.status = if entry.remaining == 0 {
                CredentialStatus::Exhausted
            } else {
                CredentialStatus::LowQuota
            };
            tracing::info!(
                credential = %entry.name,
                remaining = entry.remaining,
                status = entry.status.as_str(),
                "credential low on quota, switching"
            );

            let len = state.credentials.len();
            if state.cursor % len == index {
                state.cursor = index + 1;
            }
        }
    }

    /// Refresh every credential's balance from the provider, one at a time
    ///
    /// Each updated record is persisted through the store. The pool lock is
    /// only held while a result is applied, not across the provider call.
    pub async fn refresh_all(&self) -> PoolStatus {
        let targets: Vec<Credential> = {
            let state = self.state.lock().await;
            state.credentials.clone()
        };

        tracing::info!(count = targets.len(), "refreshing credential balances");

        for (n, target) in targets.iter().enumerate() {
            if n > 0 && !self.refresh_delay.is_zero() {
                tokio::time::sleep(self.refresh_delay).await;
            }

            let balance = self.fetch_balance(target).await;

            let updated = {
                let mut state = self.state.lock().await;
                let Some(index) = state.position(target) else {
                    continue;
                };
                let entry = &mut state.credentials[index];
                let previous = entry.remaining;
                self.apply_balance(entry, balance);
                tracing::info!(
                    credential = %entry.name,
                    previous,
                    remaining = entry.remaining,
                    status = entry.status.as_str(),
                    "credential refreshed"
                );
                entry.clone()
            };

            self.persist(&updated).await;
        }

        self.status().await
    }

    /// Snapshot of every credential plus aggregates
    pub async fn status(&self) -> PoolStatus {
        let state = self.state.lock().await;

        let credentials: Vec<CredentialInfo> = state
            .credentials
            .iter()
            .enumerate()
            .map(|(i, c)| CredentialInfo {
                index: i + 1,
                id: c.id,
                name: c.name.clone(),
                remaining: c.remaining,
                total_used: c.total_used,
                status: c.status,
                is_current: state.current == Some(i),
                last_refresh: c.last_refresh,
            })
            .collect();

        let total_remaining = state.credentials.iter().map(|c| c.remaining).sum();
        let healthy_count = state
            .credentials
            .iter()
            .filter(|c| c.status.is_usable() && c.remaining > 0)
            .count();

        PoolStatus {
            current_index: state.current.map(|i| i + 1),
            warning_threshold: self.warning_threshold,
            credentials,
            total_remaining,
            healthy_count,
        }
    }

    /// Replace the pool's contents with a fresh set of records
    ///
    /// Credentials present both before and after keep their live quota, usage,
    /// status and refresh time; the store may lag behind recent decrements.
    pub async fn reload(&self, records: Vec<Credential>) {
        let mut state = self.state.lock().await;

        let current_id = state
            .current
            .and_then(|i| state.credentials.get(i))
            .map(|c| c.id);
        let cursor_id = state
            .credentials
            .get(state.cursor % state.credentials.len().max(1))
            .map(|c| c.id);

        let merged: Vec<Credential> = records
            .into_iter()
            .map(|record| {
                match state.credentials.iter().find(|c| c.id == record.id) {
                    Some(live) => Credential {
                        key_value: record.key_value,
                        name: record.name,
                        ..live.clone()
                    },
                    None => record,
                }
            })
            .collect();

        state.current = current_id.and_then(|id| merged.iter().position(|c| c.id == id));
        state.cursor = cursor_id
            .and_then(|id| merged.iter().position(|c| c.id == id))
            .unwrap_or(0);
        tracing::info!(count = merged.len(), "credential pool reloaded");
        state.credentials = merged;
    }

    /// Write every credential back through the store
    ///
    /// Attempts every record and returns the first failure, if any.
    pub async fn persist_all(&self) -> Result<()> {
        let snapshot: Vec<Credential> = {
            let state = self.state.lock().await;
            state.credentials.clone()
        };

        let mut first_error = None;
        for credential in &snapshot {
            if let Err(e) = self.store.save_credential(credential).await {
                tracing::error!(credential = %credential.name, error = %e, "failed to persist credential");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Number of credentials in the pool
    pub async fn len(&self) -> usize {
        self.state.lock().await.credentials.len()
    }

    /// Whether the pool has no credentials at all
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Scan from the cursor, wrapping once, refreshing stale entries on the way
    async fn find_eligible(&self, state: &mut PoolState) -> Option<usize> {
        let len = state.credentials.len();
        if len == 0 {
            return None;
        }

        let start = state.cursor % len;
        for offset in 0..len {
            let index = (start + offset) % len;

            if self.is_stale(&state.credentials[index]) {
                let balance = self.fetch_balance(&state.credentials[index]).await;
                let entry = &mut state.credentials[index];
                self.apply_balance(entry, balance);
                tracing::debug!(
                    credential = %entry.name,
                    remaining = entry.remaining,
                    "refreshed stale credential"
                );
                let updated = entry.clone();
                self.persist(&updated).await;
            }

            if self.is_eligible(&state.credentials[index]) {
                return Some(index);
            }
        }

        tracing::warn!("all credentials exhausted or rate limited");
        None
    }

    fn is_eligible(&self, credential: &Credential) -> bool {
        credential.remaining > self.warning_threshold && credential.status.is_usable()
    }

    fn is_stale(&self, credential: &Credential) -> bool {
        let Some(last) = credential.last_refresh else {
            return true;
        };
        let age = Utc::now().signed_duration_since(last);
        match chrono::Duration::from_std(self.staleness_window) {
            Ok(window) => age > window,
            Err(_) => false,
        }
    }

    async fn fetch_balance(&self, credential: &Credential) -> i64 {
        match self.provider.balance(&credential.key_value).await {
            Ok(balance) => balance,
            Err(e) => {
                tracing::warn!(
                    credential = %credential.name,
                    error = %e,
                    "balance check failed, treating as empty"
                );
                0
            }
        }
    }

    fn apply_balance(&self, credential: &mut Credential, balance: i64) {
        credential.remaining = balance.max(0);
        credential.status = CredentialStatus::from_balance(credential.remaining, self.warning_threshold);
        credential.last_refresh = Some(Utc::now());
    }

    async fn persist(&self, credential: &Credential) {
        if let Err(e) = self.store.save_credential(credential).await {
            tracing::warn!(credential = %credential.name, error = %e, "failed to persist credential");
        }
    }
}
