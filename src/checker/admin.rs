//! Credential and user administration.
//!
//! Every operation here requires an admin caller. Credential mutations go to
//! the store first and are then reloaded into the live pool, so the pool never
//! holds a record the store does not know about.

use crate::error::{Error, Result};
use crate::ledger::UserAccount;
use crate::types::{Caller, CredentialId, PoolStatus, UserId};

use super::IndexChecker;

fn require_admin(caller: &Caller) -> Result<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(Error::Forbidden("admin access required".into()))
    }
}

impl IndexChecker {
    /// Re-read every balance from the provider
    pub async fn refresh_credentials(&self, caller: &Caller) -> Result<PoolStatus> {
        require_admin(caller)?;
        Ok(self.pool.refresh_all().await)
    }

    /// Add a credential and put it into rotation
    pub async fn add_credential(
        &self,
        caller: &Caller,
        key_value: &str,
        name: &str,
    ) -> Result<CredentialId> {
        require_admin(caller)?;

        let key_value = key_value.trim();
        if key_value.is_empty() {
            return Err(Error::Validation("key_value must not be empty".into()));
        }
        let name = match name.trim() {
            "" => format!("API Key {}", self.pool.len().await + 1),
            name => name.to_string(),
        };

        let id = self.store.add_credential(key_value, &name).await?;
        self.reload_credentials().await?;
        Ok(id)
    }

    /// Take a credential out of rotation
    pub async fn remove_credential(&self, caller: &Caller, id: CredentialId) -> Result<()> {
        require_admin(caller)?;

        self.store.remove_credential(id).await?;
        self.reload_credentials().await
    }

    /// Create a user account with an opening balance
    pub async fn create_user(
        &self,
        caller: &Caller,
        email: &str,
        credits: i64,
    ) -> Result<UserAccount> {
        require_admin(caller)?;

        let email = email.trim();
        if email.is_empty() {
            return Err(Error::Validation("email must not be empty".into()));
        }
        if credits < 0 {
            return Err(Error::Validation("credits must not be negative".into()));
        }

        self.ledger.create_user(email, credits).await
    }

    /// Add (or, with a negative amount, remove) credits
    pub async fn adjust_credits(
        &self,
        caller: &Caller,
        user_id: UserId,
        amount: i64,
        description: Option<&str>,
    ) -> Result<UserAccount> {
        require_admin(caller)?;

        if amount == 0 {
            return Err(Error::Validation("amount must not be zero".into()));
        }
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or("Admin adjustment");

        let account = self.ledger.adjust(user_id, amount, description).await?;
        tracing::info!(user_id = %user_id, amount, credits = account.credits, "credits adjusted");
        Ok(account)
    }

    /// Replace the pool's contents with the store's active records
    pub(crate) async fn reload_credentials(&self) -> Result<()> {
        let records = self.store.load_credentials().await?;
        let count = records.len();
        self.pool.reload(records).await;

        tracing::info!(credentials = count, "credential pool reloaded");
        Ok(())
    }
}
