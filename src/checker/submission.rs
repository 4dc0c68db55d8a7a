//! Job submission, admission and the supervised job runner.

use crate::dispatcher::JobRequest;
use crate::error::{Error, Result};
use crate::types::{Caller, JobId};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use utoipa::ToSchema;

use super::IndexChecker;

/// Accepted job, as returned to the submitter
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Submission {
    /// Registered job ID, used for polling and download
    pub job_id: JobId,
    /// Number of URLs after blank lines were dropped
    pub total_urls: usize,
    /// Credits charged
    pub cost: i64,
}

/// Split newline-separated text into URLs, dropping blank lines
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

impl IndexChecker {
    /// Register a job, charge the caller and start it in the background
    ///
    /// Admission runs before this returns: an unknown user or a balance below
    /// the URL count leaves the job in `error` and returns
    /// [`Error::Admission`] without charging anything.
    pub async fn submit(
        &self,
        caller: &Caller,
        project_name: &str,
        url_list: &str,
    ) -> Result<Submission> {
        if !self.runner.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let name = project_name.trim();
        if name.is_empty() {
            return Err(Error::Validation("project_name must not be empty".into()));
        }

        let urls = parse_url_list(url_list);
        if urls.is_empty() {
            return Err(Error::Validation("url_list contains no URLs".into()));
        }

        let job = self
            .registry
            .submit(name, urls.len(), caller.user_id)
            .await;
        let request = JobRequest::for_job(&job, urls);

        self.dispatcher.admit(&request).await?;

        let submission = Submission {
            job_id: job.id,
            total_urls: job.total_urls,
            cost: request.cost(),
        };
        self.spawn_job(request).await;

        Ok(submission)
    }

    /// Run an admitted job once a concurrency permit is free
    async fn spawn_job(&self, request: JobRequest) {
        let job_id = request.job_id;
        self.runner.active_jobs.lock().await.insert(job_id);

        let checker = self.clone();
        tokio::spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = checker.runner.shutdown_token.cancelled() => None,
                permit = checker.runner.concurrent_limit.clone().acquire_owned() => permit.ok(),
            };

            match permit {
                Some(_permit) => checker.dispatcher.process(request).await,
                None => checker.abandon(request).await,
            }

            checker.runner.active_jobs.lock().await.remove(&job_id);
        });

        tracing::debug!(job_id = %job_id, "job spawned");
    }

    /// Fail a job that never started because the service is shutting down
    async fn abandon(&self, request: JobRequest) {
        tracing::warn!(job_id = %request.job_id, "shutdown before job started");

        self.registry
            .mark_error(request.job_id, "Shut down before processing started")
            .await;

        let description = format!("Refund for job {}", request.job_id);
        if let Err(e) = self
            .ledger
            .refund(request.user_id, request.cost(), &description)
            .await
        {
            tracing::error!(job_id = %request.job_id, error = %e, "failed to refund credits");
        }
    }
}
