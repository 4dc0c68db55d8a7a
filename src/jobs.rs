//! In-memory registry of submitted jobs
//!
//! Jobs are only ever added; finished jobs stay readable for the life of the
//! process. Counters are updated by the dispatcher after every URL completes
//! and are frozen once the job reaches `done` or `error`.

use crate::types::{Caller, FinalStats, Job, JobId, JobStatus, QueryOutcome, UserId};
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

struct RegistryInner {
    next_id: i64,
    jobs: BTreeMap<JobId, Job>,
}

/// Concurrent-safe mapping of job IDs to jobs
pub struct JobRegistry {
    inner: Mutex<RegistryInner>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    /// Create an empty registry; the first job gets ID 1
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                next_id: 1,
                jobs: BTreeMap::new(),
            }),
        }
    }

    /// Register a new running job and return its snapshot
    pub async fn submit(&self, name: &str, total_urls: usize, user_id: UserId) -> Job {
        let mut inner = self.inner.lock().await;
        let id = JobId(inner.next_id);
        inner.next_id += 1;

        let job = Job {
            id,
            name: name.to_string(),
            status: JobStatus::Running,
            total_urls,
            completed_count: 0,
            indexed_count: 0,
            error_count: 0,
            degraded_count: 0,
            progress: format!("0/{}", total_urls),
            final_stats: None,
            created_at: Utc::now(),
            completed_at: None,
            user_id,
            result_filename: None,
            error_message: None,
        };
        inner.jobs.insert(id, job.clone());
        job
    }

    /// Copy of one job
    pub async fn snapshot(&self, id: JobId) -> Option<Job> {
        self.inner.lock().await.jobs.get(&id).cloned()
    }

    /// Jobs visible to `caller`, most recent first
    pub async fn list(&self, caller: &Caller) -> Vec<Job> {
        let inner = self.inner.lock().await;
        inner
            .jobs
            .values()
            .rev()
            .filter(|job| caller.can_access(job))
            .cloned()
            .collect()
    }

    /// Total number of jobs ever submitted
    pub async fn len(&self) -> usize {
        self.inner.lock().await.jobs.len()
    }

    /// Whether no job was ever submitted
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Jobs currently in `running`
    pub async fn running_count(&self) -> usize {
        self.inner
            .lock()
            .await
            .jobs
            .values()
            .filter(|job| job.status == JobStatus::Running)
            .count()
    }

    /// Count one completed URL
    ///
    /// Returns `false` if the job is unknown or already finished.
    pub async fn record_outcome(&self, id: JobId, outcome: &QueryOutcome, degraded: bool) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(job) = inner.jobs.get_mut(&id) else {
            return false;
        };
        if job.is_finished() || job.completed_count >= job.total_urls {
            return false;
        }

        job.completed_count += 1;
        match outcome {
            QueryOutcome::Indexed => job.indexed_count += 1,
            outcome if outcome.is_error() => job.error_count += 1,
            _ => {}
        }
        if degraded {
            job.degraded_count += 1;
        }
        job.progress = format!("{}/{}", job.completed_count, job.total_urls);
        true
    }

    /// Finish a job whose result table was written
    pub async fn mark_done(&self, id: JobId, result_filename: String) -> Option<Job> {
        let mut inner = self.inner.lock().await;
        let job = inner.jobs.get_mut(&id)?;
        if job.is_finished() {
            return None;
        }

        job.status = JobStatus::Done;
        job.final_stats = Some(FinalStats::compute(
            job.total_urls,
            job.indexed_count,
            job.error_count,
        ));
        job.result_filename = Some(result_filename);
        job.completed_at = Some(Utc::now());
        Some(job.clone())
    }

    /// Fail a job with a reason
    pub async fn mark_error(&self, id: JobId, message: impl Into<String>) -> Option<Job> {
        let mut inner = self.inner.lock().await;
        let job = inner.jobs.get_mut(&id)?;
        if job.is_finished() {
            return None;
        }

        job.status = JobStatus::Error;
        job.error_message = Some(message.into());
        job.completed_at = Some(Utc::now());
        Some(job.clone())
    }
}
