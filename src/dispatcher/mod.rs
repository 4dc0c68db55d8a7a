//! Batch dispatch of one job's URLs.
//!
//! Split into focused submodules:
//! - [`batching`] - Fixed-size batches through a bounded worker pool
//! - [`finalization`] - Result table assembly, persistence and final status
//!
//! A job goes through [`Dispatcher::admit`] (credit check and deduction)
//! before [`Dispatcher::process`] runs its lookups. Only admission and
//! persistence can fail a job; per-URL failures end up in the result table.

mod batching;
mod finalization;


use crate::config::DispatchConfig;
use crate::credentials::CredentialPool;
use crate::error::AdmissionError;
use crate::jobs::JobRegistry;
use crate::ledger::CreditLedger;
use crate::lookup::LookupClient;
use crate::results::ResultWriter;
use crate::types::{Job, JobId, UserId};
use std::sync::Arc;

/// Everything a job needs to run, detached from the registry entry
#[derive(Clone, Debug)]
pub struct JobRequest {
    /// Registered job
    pub job_id: JobId,
    /// Project name (also names the result file)
    pub name: String,
    /// URLs in submission order; duplicates are kept
    pub urls: Vec<String>,
    /// Owner charged for the job
    pub user_id: UserId,
}

impl JobRequest {
    /// Request for an already registered job
    pub fn for_job(job: &Job, urls: Vec<String>) -> Self {
        Self {
            job_id: job.id,
            name: job.name.clone(),
            urls,
            user_id: job.user_id,
        }
    }

    /// Credits the job costs (one per URL)
    pub fn cost(&self) -> i64 {
        self.urls.len() as i64
    }
}

/// Runs jobs against the shared pool, registry, ledger and result writer
pub struct Dispatcher {
    registry: Arc<JobRegistry>,
    pool: Arc<CredentialPool>,
    client: Arc<LookupClient>,
    writer: Arc<ResultWriter>,
    ledger: Arc<dyn CreditLedger>,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Create a dispatcher over shared components
    pub fn new(
        registry: Arc<JobRegistry>,
        pool: Arc<CredentialPool>,
        client: Arc<LookupClient>,
        writer: Arc<ResultWriter>,
        ledger: Arc<dyn CreditLedger>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            registry,
            pool,
            client,
            writer,
            ledger,
            config,
        }
    }

    /// Check the owner's balance and take the job's cost up front
    ///
    /// On rejection the job is marked `error` and nothing is charged.
    pub async fn admit(&self, request: &JobRequest) -> Result<(), AdmissionError> {
        let cost = request.cost();

        let rejection = match self.ledger.balance(request.user_id).await {
            Ok(None) => Some(AdmissionError::UnknownUser {
                job_id: request.job_id,
                user_id: request.user_id,
            }),
            Ok(Some(available)) if available < cost => Some(AdmissionError::InsufficientCredits {
                job_id: request.job_id,
                required: cost,
                available,
            }),
            Ok(Some(_)) => {
                let description = format!("Used {} credits for index checking", cost);
                match self
                    .ledger
                    .deduct(request.user_id, cost, &description)
                    .await
                {
                    Ok(true) => None,
                    // Balance changed between the check and the deduction
                    Ok(false) => Some(AdmissionError::DeductionFailed {
                        job_id: request.job_id,
                        reason: "balance no longer covers the job".to_string(),
                    }),
                    Err(e) => Some(AdmissionError::DeductionFailed {
                        job_id: request.job_id,
                        reason: e.to_string(),
                    }),
                }
            }
            Err(e) => Some(AdmissionError::DeductionFailed {
                job_id: request.job_id,
                reason: e.to_string(),
            }),
        };

        match rejection {
            None => {
                tracing::info!(
                    job_id = %request.job_id,
                    user_id = %request.user_id,
                    cost,
                    "job admitted"
                );
                Ok(())
            }
            Some(error) => {
                tracing::warn!(job_id = %request.job_id, error = %error, "job rejected");
                self.registry
                    .mark_error(request.job_id, error.job_message())
                    .await;
                Err(error)
            }
        }
    }

    /// Run every URL of an admitted job and persist the result table
    pub async fn process(&self, request: JobRequest) {
        tracing::info!(
            job_id = %request.job_id,
            name = %request.name,
            urls = request.urls.len(),
            "starting job"
        );

        let results = batching::run_batches(self, &request).await;
        finalization::finalize(self, &request, results).await;
    }

    /// Admit and process a job in one call
    pub async fn run(&self, request: JobRequest) -> Result<(), AdmissionError> {
        self.admit(&request).await?;
        self.process(request).await;
        Ok(())
    }
}
