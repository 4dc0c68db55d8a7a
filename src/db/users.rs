//! Users and the credit ledger.

use crate::error::DatabaseError;
use crate::ledger::{CreditLedger, UserAccount};
use crate::types::UserId;
use crate::{Error, Result};
use sqlx::{Sqlite, Transaction};

use super::{CreditTransaction, Database, TransactionKind};

impl Database {
    /// Look up one user
    pub async fn get_user(&self, user_id: UserId) -> Result<Option<UserAccount>> {
        let row: Option<(i64, String, i64)> =
            sqlx::query_as("SELECT id, email, credits FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to get user: {}",
                        e
                    )))
                })?;

        Ok(row.map(|(id, email, credits)| UserAccount {
            id: UserId(id),
            email,
            credits,
        }))
    }

    /// Most recent ledger entries for a user
    pub async fn get_transactions(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<CreditTransaction>> {
        let rows = sqlx::query_as::<_, CreditTransaction>(
            r#"
            SELECT id, user_id, amount, type, description, created_at
            FROM credit_transactions
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list transactions: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    async fn begin(&self) -> Result<Transaction<'_, Sqlite>> {
        self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })
    }

    async fn log_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        user_id: UserId,
        amount: i64,
        kind: TransactionKind,
        description: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO credit_transactions (user_id, amount, type, description, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .bind(kind.as_str())
        .bind(description)
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to log credit transaction: {}",
                e
            )))
        })?;

        Ok(())
    }

    async fn commit(tx: Transaction<'_, Sqlite>) -> Result<()> {
        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit transaction: {}",
                e
            )))
        })
    }
}

#[async_trait::async_trait]
impl CreditLedger for Database {
    async fn balance(&self, user_id: UserId) -> Result<Option<i64>> {
        Ok(self.get_user(user_id).await?.map(|user| user.credits))
    }

    async fn deduct(&self, user_id: UserId, amount: i64, description: &str) -> Result<bool> {
        let mut tx = self.begin().await?;

        let updated = sqlx::query(
            "UPDATE users SET credits = credits - ? WHERE id = ? AND credits >= ?",
        )
        .bind(amount)
        .bind(user_id)
        .bind(amount)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to deduct credits: {}",
                e
            )))
        })?
        .rows_affected();

        if updated == 0 {
            // Dropping the transaction rolls it back
            return Ok(false);
        }

        Self::log_transaction(&mut tx, user_id, -amount, TransactionKind::Usage, description)
            .await?;
        Self::commit(tx).await?;
        Ok(true)
    }

    async fn refund(&self, user_id: UserId, amount: i64, description: &str) -> Result<()> {
        let mut tx = self.begin().await?;

        let updated = sqlx::query("UPDATE users SET credits = credits + ? WHERE id = ?")
            .bind(amount)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to refund credits: {}",
                    e
                )))
            })?
            .rows_affected();

        if updated == 0 {
            return Err(Error::Database(DatabaseError::NotFound(format!(
                "user {}",
                user_id
            ))));
        }

        Self::log_transaction(&mut tx, user_id, amount, TransactionKind::Refund, description)
            .await?;
        Self::commit(tx).await
    }

    async fn create_user(&self, email: &str, credits: i64) -> Result<UserAccount> {
        if credits < 0 {
            return Err(Error::Validation("credits must not be negative".into()));
        }

        let mut tx = self.begin().await?;

        let result = sqlx::query("INSERT INTO users (email, credits, created_at) VALUES (?, ?, ?)")
            .bind(email)
            .bind(credits)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *tx)
            .await;

        let id = match result {
            Ok(done) => UserId(done.last_insert_rowid()),
            Err(e) if is_unique_violation(&e) => {
                return Err(Error::Validation(format!("user {} already exists", email)));
            }
            Err(e) => {
                return Err(Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to create user: {}",
                    e
                ))));
            }
        };

        if credits > 0 {
            Self::log_transaction(
                &mut tx,
                id,
                credits,
                TransactionKind::AdminAdjust,
                "Initial credits",
            )
            .await?;
        }
        Self::commit(tx).await?;

        tracing::info!(user_id = %id, credits, "user created");
        Ok(UserAccount {
            id,
            email: email.to_string(),
            credits,
        })
    }

    async fn adjust(&self, user_id: UserId, amount: i64, description: &str) -> Result<UserAccount> {
        let mut tx = self.begin().await?;

        let current: Option<i64> = sqlx::query_scalar("SELECT credits FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get credits: {}",
                    e
                )))
            })?;

        let Some(current) = current else {
            return Err(Error::NotFound(format!("user {}", user_id)));
        };
        if current + amount < 0 {
            return Err(Error::Validation(format!(
                "adjustment of {} would leave user {} with negative credits",
                amount, user_id
            )));
        }

        sqlx::query("UPDATE users SET credits = credits + ? WHERE id = ?")
            .bind(amount)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to adjust credits: {}",
                    e
                )))
            })?;

        Self::log_transaction(&mut tx, user_id, amount, TransactionKind::AdminAdjust, description)
            .await?;
        Self::commit(tx).await?;

        self.get_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))
    }
}

pub(super) fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|db_error| db_error.is_unique_violation())
}
