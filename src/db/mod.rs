//! Database layer for index-checker
//!
//! SQLite persistence for users, their credit ledger, and provider credentials.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`users`] — Users and credit transactions ([`CreditLedger`](crate::ledger::CreditLedger))
//! - [`credentials`] — API key records ([`CredentialStore`](crate::credentials::CredentialStore))

use sqlx::{FromRow, sqlite::SqlitePool};

mod credentials;
mod migrations;
mod users;

/// Kind of entry in the credit ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Credits taken for a job
    Usage,
    /// Credits returned after a failed job
    Refund,
    /// Manual change by an administrator (including the starting balance)
    AdminAdjust,
}

impl TransactionKind {
    /// Database form
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Usage => "usage",
            TransactionKind::Refund => "refund",
            TransactionKind::AdminAdjust => "admin_adjust",
        }
    }
}

/// Credit transaction record from database
#[derive(Debug, Clone, FromRow)]
pub struct CreditTransaction {
    /// Unique database ID
    pub id: i64,
    /// User the transaction belongs to
    pub user_id: i64,
    /// Signed credit change
    pub amount: i64,
    /// "usage", "refund" or "admin_adjust"
    #[sqlx(rename = "type")]
    pub kind: String,
    /// Free-form description
    pub description: Option<String>,
    /// Unix timestamp
    pub created_at: i64,
}

/// API key record from database
#[derive(Debug, Clone, FromRow)]
struct CredentialRow {
    id: i64,
    key_value: String,
    name: String,
    remaining_credits: i64,
    total_used: i64,
    status: String,
    last_credit_check: Option<i64>,
}

/// Database handle for index-checker
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
