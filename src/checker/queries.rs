//! Read-side queries used by pollers and the HTTP surface.

use crate::error::{Error, Result};
use crate::types::{Caller, HealthReport, Job, JobId, JobStatus, PoolStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

use super::IndexChecker;

/// Credential overview for an admin: the pool plus the job count
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminOverview {
    /// Pool snapshot
    #[serde(flatten)]
    pub pool: PoolStatus,
    /// Jobs submitted since startup
    pub total_jobs: usize,
    /// Always true
    pub is_admin: bool,
}

/// Credential overview for a regular user: their own balance
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UserOverview {
    /// Credits left in the ledger
    pub user_credits: i64,
    /// Always false
    pub is_admin: bool,
}

/// Response of the credential status endpoint, shaped by the caller's role
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum CredentialOverview {
    /// Admin view
    Admin(AdminOverview),
    /// User view
    User(UserOverview),
}

impl IndexChecker {
    /// Jobs visible to the caller, most recent first
    pub async fn list_jobs(&self, caller: &Caller) -> Vec<Job> {
        self.registry.list(caller).await
    }

    /// One job snapshot, if the caller may see it
    pub async fn get_job(&self, caller: &Caller, id: JobId) -> Result<Job> {
        let job = self
            .registry
            .snapshot(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("job {}", id)))?;

        if !caller.can_access(&job) {
            return Err(Error::Forbidden(format!("job {} belongs to another user", id)));
        }

        Ok(job)
    }

    /// Location of a finished job's result table
    ///
    /// Returns the file name and its full path. Jobs that are not `done`, or
    /// whose file has gone missing, are reported as not found.
    pub async fn result_file(&self, caller: &Caller, id: JobId) -> Result<(String, PathBuf)> {
        let job = self.get_job(caller, id).await?;

        let filename = match (&job.status, job.result_filename) {
            (JobStatus::Done, Some(filename)) => filename,
            _ => return Err(Error::NotFound(format!("results for job {}", id))),
        };

        let path = self.writer.path_for(&filename);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::warn!(job_id = %id, path = %path.display(), "result file missing");
            return Err(Error::NotFound(format!("results for job {}", id)));
        }

        Ok((filename, path))
    }

    /// Current pool snapshot
    pub async fn pool_status(&self) -> PoolStatus {
        self.pool.status().await
    }

    /// Credential overview shaped by the caller's role
    pub async fn credential_overview(&self, caller: &Caller) -> Result<CredentialOverview> {
        if caller.is_admin() {
            return Ok(CredentialOverview::Admin(AdminOverview {
                pool: self.pool.status().await,
                total_jobs: self.registry.len().await,
                is_admin: true,
            }));
        }

        let user_credits = self.user_credits(caller).await?;
        Ok(CredentialOverview::User(UserOverview {
            user_credits,
            is_admin: false,
        }))
    }

    /// The caller's own credit balance
    pub async fn user_credits(&self, caller: &Caller) -> Result<i64> {
        self.ledger
            .balance(caller.user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {}", caller.user_id)))
    }

    /// Liveness summary
    pub async fn health(&self) -> HealthReport {
        let pool = self.pool.status().await;

        HealthReport {
            status: "ok".to_string(),
            api_keys: format!("{}/{} active", pool.healthy_count, pool.credentials.len()),
            total_quota: pool.total_remaining,
            active_projects: self.registry.running_count().await,
        }
    }
}
