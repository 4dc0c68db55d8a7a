//! Job finalization -- result table assembly, persistence, final status.

use crate::types::{NOT_PROCESSED_LABEL, QueryOutcome, ResultRow};

use super::batching::BatchResults;
use super::{Dispatcher, JobRequest};

/// One row per submitted URL, in submission order
pub(super) fn build_rows(urls: &[String], outcomes: &[Option<QueryOutcome>]) -> Vec<ResultRow> {
    urls.iter()
        .zip(outcomes)
        .map(|(url, outcome)| ResultRow {
            url: url.clone(),
            status: match outcome {
                Some(outcome) => outcome.label(),
                None => NOT_PROCESSED_LABEL.to_string(),
            },
        })
        .collect()
}

/// Persist the table and move the job to `done`, or to `error` with a refund
pub(super) async fn finalize(dispatcher: &Dispatcher, request: &JobRequest, results: BatchResults) {
    let job_id = request.job_id;
    let rows = build_rows(&request.urls, &results.outcomes);

    match dispatcher.writer.write(&request.name, rows).await {
        Ok(filename) => match dispatcher.registry.mark_done(job_id, filename).await {
            Some(job) => {
                let stats = job.final_stats.unwrap_or_default();
                tracing::info!(
                    job_id = %job_id,
                    total = stats.total,
                    indexed = stats.indexed,
                    errors = stats.errors,
                    degraded = job.degraded_count,
                    index_rate = stats.index_rate,
                    stopped_early = results.stopped_early,
                    "job completed"
                );
            }
            None => {
                tracing::warn!(job_id = %job_id, "job finished elsewhere before completion");
            }
        },
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "failed to persist results");
            dispatcher
                .registry
                .mark_error(job_id, format!("Failed to save results: {}", e))
                .await;

            let description = format!("Refund for job {}", job_id);
            if let Err(refund_error) = dispatcher
                .ledger
                .refund(request.user_id, request.cost(), &description)
                .await
            {
                tracing::error!(
                    job_id = %job_id,
                    error = %refund_error,
                    "failed to refund credits"
                );
            }
        }
    }
}
