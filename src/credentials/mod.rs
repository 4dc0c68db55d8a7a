//! External API credentials and their rotation
//!
//! A [`Credential`] is one provider API key with its live quota. The
//! [`CredentialPool`] owns every credential behind a single lock, hands them out
//! round robin, and keeps quota current through decrement-on-use and periodic
//! balance refreshes. Durable storage is delegated to a [`CredentialStore`].

mod pool;


pub use pool::CredentialPool;

use crate::error::Result;
use crate::types::{CredentialId, CredentialStatus};
use chrono::{DateTime, Utc};

/// One provider API key and its quota state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    /// Record ID in the credential store
    pub id: CredentialId,
    /// Secret key value sent to the provider
    pub key_value: String,
    /// Display name
    pub name: String,
    /// Remaining quota (never negative)
    pub remaining: i64,
    /// Lookups consumed since the record was created
    pub total_used: i64,
    /// Health status
    pub status: CredentialStatus,
    /// Last balance refresh; `None` means never refreshed
    pub last_refresh: Option<DateTime<Utc>>,
}

impl Credential {
    /// A credential that has not been checked against the provider yet
    pub fn new(id: CredentialId, key_value: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            key_value: key_value.into(),
            name: name.into(),
            remaining: 0,
            total_used: 0,
            status: CredentialStatus::Active,
            last_refresh: None,
        }
    }
}

/// Durable storage for credential records
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Every credential that has not been removed, in insertion order
    async fn load_credentials(&self) -> Result<Vec<Credential>>;

    /// Persist quota, usage, status and refresh time of one credential
    async fn save_credential(&self, credential: &Credential) -> Result<()>;

    /// Insert a new credential and return its ID
    async fn add_credential(&self, key_value: &str, name: &str) -> Result<CredentialId>;

    /// Take a credential out of rotation
    async fn remove_credential(&self, id: CredentialId) -> Result<()>;
}
