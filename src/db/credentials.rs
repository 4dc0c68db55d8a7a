//! API key records backing the credential pool.

use crate::credentials::{Credential, CredentialStore};
use crate::error::DatabaseError;
use crate::types::{CredentialId, CredentialStatus};
use crate::{Error, Result};
use chrono::DateTime;

use super::users::is_unique_violation;
use super::{CredentialRow, Database};

impl From<CredentialRow> for Credential {
    fn from(row: CredentialRow) -> Self {
        Self {
            id: CredentialId(row.id),
            key_value: row.key_value,
            name: row.name,
            remaining: row.remaining_credits.max(0),
            total_used: row.total_used.max(0),
            status: CredentialStatus::from_db(&row.status),
            last_refresh: row
                .last_credit_check
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
        }
    }
}

#[async_trait::async_trait]
impl CredentialStore for Database {
    async fn load_credentials(&self) -> Result<Vec<Credential>> {
        let rows = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, key_value, name, remaining_credits, total_used, status, last_credit_check
            FROM api_keys
            WHERE is_active = 1
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to load API keys: {}",
                e
            )))
        })?;

        Ok(rows.into_iter().map(Credential::from).collect())
    }

    async fn save_credential(&self, credential: &Credential) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE api_keys
            SET remaining_credits = ?, total_used = ?, status = ?, last_credit_check = ?
            WHERE id = ?
            "#,
        )
        .bind(credential.remaining)
        .bind(credential.total_used)
        .bind(credential.status.as_str())
        .bind(credential.last_refresh.map(|t| t.timestamp()))
        .bind(credential.id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update API key: {}",
                e
            )))
        })?;

        Ok(())
    }

    async fn add_credential(&self, key_value: &str, name: &str) -> Result<CredentialId> {
        // A removed key that is added again comes back with a clean slate
        let result: std::result::Result<Option<i64>, sqlx::Error> = sqlx::query_scalar(
            r#"
            INSERT INTO api_keys (key_value, name, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key_value) DO UPDATE SET
                name = excluded.name,
                is_active = 1,
                remaining_credits = 2500,
                total_used = 0,
                status = 'active',
                last_credit_check = NULL
            WHERE api_keys.is_active = 0
            RETURNING id
            "#,
        )
        .bind(key_value)
        .bind(name)
        .bind(chrono::Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(id)) => {
                tracing::info!(credential_id = id, name, "API key added");
                Ok(CredentialId(id))
            }
            Ok(None) => Err(Error::Validation("API key already exists".into())),
            Err(e) if is_unique_violation(&e) => {
                Err(Error::Validation("API key already exists".into()))
            }
            Err(e) => Err(Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to add API key: {}",
                e
            )))),
        }
    }

    async fn remove_credential(&self, id: CredentialId) -> Result<()> {
        let updated = sqlx::query("UPDATE api_keys SET is_active = 0 WHERE id = ? AND is_active = 1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to remove API key: {}",
                    e
                )))
            })?
            .rows_affected();

        if updated == 0 {
            return Err(Error::NotFound(format!("credential {}", id)));
        }

        tracing::info!(credential_id = %id, "API key removed");
        Ok(())
    }
}
