//! Per-user credit balances
//!
//! Every submitted URL costs one credit. The engine deducts the whole job's
//! cost before any lookup runs and refunds it if the results cannot be saved.

use crate::error::Result;
use crate::types::UserId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A user account as exposed to administrators
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserAccount {
    /// User ID
    pub id: UserId,
    /// Contact address
    pub email: String,
    /// Current credit balance
    pub credits: i64,
}

/// Credit balance collaborator
#[async_trait::async_trait]
pub trait CreditLedger: Send + Sync {
    /// Current balance, `None` for an unknown user
    async fn balance(&self, user_id: UserId) -> Result<Option<i64>>;

    /// Atomically take `amount` credits; `false` if the balance does not cover it
    async fn deduct(&self, user_id: UserId, amount: i64, description: &str) -> Result<bool>;

    /// Give back credits taken by [`deduct`](CreditLedger::deduct)
    async fn refund(&self, user_id: UserId, amount: i64, description: &str) -> Result<()>;

    /// Register a new user with a starting balance
    async fn create_user(&self, email: &str, credits: i64) -> Result<UserAccount>;

    /// Administrative balance change (may be negative); returns the updated account
    async fn adjust(&self, user_id: UserId, amount: i64, description: &str) -> Result<UserAccount>;
}
