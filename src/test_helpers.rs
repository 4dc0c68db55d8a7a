//! Shared test doubles for the provider, credential store and credit ledger.

use crate::credentials::{Credential, CredentialStore};
use crate::error::{DatabaseError, Error, Result};
use crate::ledger::{CreditLedger, UserAccount};
use crate::provider::{ProviderError, SearchProvider, SearchResponse};
use crate::types::{CredentialId, CredentialStatus, UserId};
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

type SearchFn = dyn Fn(&str, &str) -> std::result::Result<SearchResponse, ProviderError> + Send + Sync;

/// Provider whose answers are decided by the test.
///
/// Queued search results are served first, in order; afterwards every search
/// is answered by the responder closure (default: no organic results).
pub(crate) struct ScriptedProvider {
    balances: Mutex<HashMap<String, std::result::Result<i64, ProviderError>>>,
    queued: Mutex<VecDeque<std::result::Result<SearchResponse, ProviderError>>>,
    responder: Box<SearchFn>,
    pub(crate) searches: Mutex<Vec<(String, String)>>,
    pub(crate) balance_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self::with_responder(|_, _| Ok(SearchResponse::default()))
    }

    pub(crate) fn with_responder(
        responder: impl Fn(&str, &str) -> std::result::Result<SearchResponse, ProviderError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            queued: Mutex::new(VecDeque::new()),
            responder: Box::new(responder),
            searches: Mutex::new(Vec::new()),
            balance_calls: AtomicUsize::new(0),
        }
    }

    /// Answer balance calls for `key` with `balance`
    pub(crate) fn set_balance(&self, key: &str, balance: i64) {
        self.balances
            .lock()
            .unwrap()
            .insert(key.to_string(), Ok(balance));
    }

    /// Fail balance calls for `key`
    pub(crate) fn fail_balance(&self, key: &str, error: ProviderError) {
        self.balances
            .lock()
            .unwrap()
            .insert(key.to_string(), Err(error));
    }

    /// Serve `result` for the next search before falling back to the responder
    pub(crate) fn push_search(&self, result: std::result::Result<SearchResponse, ProviderError>) {
        self.queued.lock().unwrap().push_back(result);
    }

    /// Keys used for searches so far, in call order
    pub(crate) fn search_keys(&self) -> Vec<String> {
        self.searches
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub(crate) fn search_count(&self) -> usize {
        self.searches.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl SearchProvider for ScriptedProvider {
    async fn search(
        &self,
        key: &str,
        query: &str,
    ) -> std::result::Result<SearchResponse, ProviderError> {
        self.searches
            .lock()
            .unwrap()
            .push((key.to_string(), query.to_string()));

        let queued = self.queued.lock().unwrap().pop_front();
        match queued {
            Some(result) => result,
            None => (self.responder)(key, query),
        }
    }

    async fn balance(&self, key: &str) -> std::result::Result<i64, ProviderError> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        self.balances
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or(Err(ProviderError::Status(401)))
    }
}

/// A search response listing the given links
pub(crate) fn links(links: &[&str]) -> SearchResponse {
    SearchResponse {
        links: links.iter().map(|l| l.to_string()).collect(),
    }
}

/// A credential whose balance was just refreshed
pub(crate) fn fresh_credential(id: i64, key: &str, remaining: i64) -> Credential {
    Credential {
        id: CredentialId(id),
        key_value: key.to_string(),
        name: format!("Key {}", id),
        remaining,
        total_used: 0,
        status: CredentialStatus::from_balance(remaining, 10),
        last_refresh: Some(Utc::now()),
    }
}

/// Credential store kept in memory.
#[derive(Default)]
pub(crate) struct MemoryStore {
    pub(crate) records: Mutex<Vec<Credential>>,
    pub(crate) saves: AtomicUsize,
    pub(crate) fail_saves: AtomicBool,
}

impl MemoryStore {
    pub(crate) fn with_records(records: Vec<Credential>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub(crate) fn record(&self, id: i64) -> Option<Credential> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == CredentialId(id))
            .cloned()
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryStore {
    async fn load_credentials(&self) -> Result<Vec<Credential>> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn save_credential(&self, credential: &Credential) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "store unavailable".into(),
            )));
        }
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|c| c.id == credential.id) {
            Some(existing) => *existing = credential.clone(),
            None => records.push(credential.clone()),
        }
        Ok(())
    }

    async fn add_credential(&self, key_value: &str, name: &str) -> Result<CredentialId> {
        let mut records = self.records.lock().unwrap();
        let id = CredentialId(records.iter().map(|c| c.id.get()).max().unwrap_or(0) + 1);
        records.push(Credential::new(id, key_value, name));
        Ok(id)
    }

    async fn remove_credential(&self, id: CredentialId) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|c| c.id != id);
        if records.len() == before {
            return Err(Error::NotFound(format!("credential {}", id)));
        }
        Ok(())
    }
}

/// Credit ledger kept in memory.
#[derive(Default)]
pub(crate) struct MemoryLedger {
    pub(crate) users: Mutex<HashMap<UserId, (String, i64)>>,
    pub(crate) fail_deduct: AtomicBool,
    pub(crate) refunds: Mutex<Vec<(UserId, i64)>>,
}

impl MemoryLedger {
    pub(crate) fn with_user(user_id: i64, credits: i64) -> Self {
        let ledger = Self::default();
        ledger.users.lock().unwrap().insert(
            UserId(user_id),
            (format!("user{}@example.com", user_id), credits),
        );
        ledger
    }

    pub(crate) fn credits(&self, user_id: i64) -> Option<i64> {
        self.users
            .lock()
            .unwrap()
            .get(&UserId(user_id))
            .map(|(_, credits)| *credits)
    }
}

#[async_trait::async_trait]
impl CreditLedger for MemoryLedger {
    async fn balance(&self, user_id: UserId) -> Result<Option<i64>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|(_, credits)| *credits))
    }

    async fn deduct(&self, user_id: UserId, amount: i64, _description: &str) -> Result<bool> {
        if self.fail_deduct.load(Ordering::SeqCst) {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "ledger locked".into(),
            )));
        }
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&user_id) {
            Some((_, credits)) if *credits >= amount => {
                *credits -= amount;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn refund(&self, user_id: UserId, amount: i64, _description: &str) -> Result<()> {
        self.refunds.lock().unwrap().push((user_id, amount));
        if let Some((_, credits)) = self.users.lock().unwrap().get_mut(&user_id) {
            *credits += amount;
        }
        Ok(())
    }

    async fn create_user(&self, email: &str, credits: i64) -> Result<UserAccount> {
        let mut users = self.users.lock().unwrap();
        let id = UserId(users.keys().map(|id| id.get()).max().unwrap_or(0) + 1);
        users.insert(id, (email.to_string(), credits));
        Ok(UserAccount {
            id,
            email: email.to_string(),
            credits,
        })
    }

    async fn adjust(&self, user_id: UserId, amount: i64, _description: &str) -> Result<UserAccount> {
        let mut users = self.users.lock().unwrap();
        let (email, credits) = users
            .get_mut(&user_id)
            .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))?;
        *credits += amount;
        Ok(UserAccount {
            id: user_id,
            email: email.clone(),
            credits: *credits,
        })
    }
}
