//! URL batching -- fixed-size batches, bounded parallel lookups, early stop.

use futures::stream::{self, StreamExt};

use crate::retry::random_delay;
use crate::types::QueryOutcome;

use super::{Dispatcher, JobRequest};

/// Per-URL outcomes in submission order; `None` means never attempted
pub(super) struct BatchResults {
    pub(super) outcomes: Vec<Option<QueryOutcome>>,
    pub(super) stopped_early: bool,
}

/// Run the job's URLs batch by batch.
///
/// Within a batch, up to `workers` lookups run at once and each completion is
/// counted in the registry immediately. Between batches the run stops if no
/// credential is left; otherwise it pauses briefly.
pub(super) async fn run_batches(dispatcher: &Dispatcher, request: &JobRequest) -> BatchResults {
    let config = &dispatcher.config;
    let total = request.urls.len();
    let batch_size = config.batch_size.max(1);
    let workers = config.workers.max(1);

    let mut outcomes: Vec<Option<QueryOutcome>> = vec![None; total];
    let mut stopped_early = false;

    let mut start = 0;
    while start < total {
        let end = (start + batch_size).min(total);

        let completed: Vec<(usize, QueryOutcome)> = stream::iter(start..end)
            .map(|index| check_url(dispatcher, request, index))
            .buffer_unordered(workers)
            .collect()
            .await;

        for (index, outcome) in completed {
            outcomes[index] = Some(outcome);
        }

        tracing::debug!(
            job_id = %request.job_id,
            batch_start = start,
            batch_end = end,
            "batch finished"
        );

        start = end;
        if start >= total {
            break;
        }

        if !dispatcher.pool.has_available().await {
            tracing::warn!(
                job_id = %request.job_id,
                remaining = total - start,
                "no credentials left, stopping job early"
            );
            stopped_early = true;
            break;
        }

        if !config.batch_pause.is_zero() {
            tokio::time::sleep(config.batch_pause).await;
        }
    }

    BatchResults {
        outcomes,
        stopped_early,
    }
}

/// Look up one URL under the per-URL deadline and record the outcome
async fn check_url(
    dispatcher: &Dispatcher,
    request: &JobRequest,
    index: usize,
) -> (usize, QueryOutcome) {
    let config = &dispatcher.config;
    let url = &request.urls[index];

    let (outcome, degraded) =
        match tokio::time::timeout(config.url_deadline, dispatcher.client.lookup(url)).await {
            Ok(report) => (report.outcome, report.degraded),
            Err(_) => {
                tracing::warn!(job_id = %request.job_id, url = %url, "lookup exceeded deadline");
                (QueryOutcome::Error("timed out".to_string()), false)
            }
        };

    dispatcher
        .registry
        .record_outcome(request.job_id, &outcome, degraded)
        .await;

    let pause = random_delay(config.smoothing_min, config.smoothing_max);
    if !pause.is_zero() {
        tokio::time::sleep(pause).await;
    }

    (index, outcome)
}
