//! Index checking service split into focused submodules.
//!
//! The `IndexChecker` struct and its methods are organized by domain:
//! - [`submission`] - Job submission, admission and the supervised job runner
//! - [`queries`] - Read-side queries (jobs, result files, pool status, health)
//! - [`admin`] - Credential and user administration
//! - [`lifecycle`] - Startup seeding and graceful shutdown

mod admin;
mod lifecycle;
mod queries;
mod submission;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use queries::{AdminOverview, CredentialOverview, UserOverview};
pub use submission::{Submission, parse_url_list};

use crate::config::Config;
use crate::credentials::{CredentialPool, CredentialStore};
use crate::db::Database;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::jobs::JobRegistry;
use crate::ledger::CreditLedger;
use crate::lookup::LookupClient;
use crate::provider::{SearchProvider, SerperClient};
use crate::results::ResultWriter;
use crate::types::JobId;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Background job supervision
#[derive(Clone)]
pub(crate) struct JobRunner {
    /// Bounds concurrently processing jobs (respects max_concurrent_jobs config)
    pub(crate) concurrent_limit: Arc<tokio::sync::Semaphore>,
    /// Jobs spawned and not yet finished, including those waiting for a permit
    pub(crate) active_jobs: Arc<tokio::sync::Mutex<HashSet<JobId>>>,
    /// Cleared during shutdown
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Cancelled when shutdown begins; stops waiting jobs and the API server
    pub(crate) shutdown_token: tokio_util::sync::CancellationToken,
}

/// Main service instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct IndexChecker {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// In-memory job table
    pub(crate) registry: Arc<JobRegistry>,
    /// Shared credential rotation
    pub(crate) pool: Arc<CredentialPool>,
    /// Credential records backing the pool
    pub(crate) store: Arc<dyn CredentialStore>,
    /// Per-user credit balances
    pub(crate) ledger: Arc<dyn CreditLedger>,
    /// Result table writer
    pub(crate) writer: Arc<ResultWriter>,
    /// Runs admitted jobs
    pub(crate) dispatcher: Arc<Dispatcher>,
    /// Background job supervision
    pub(crate) runner: JobRunner,
}

impl IndexChecker {
    /// Create a checker backed by the SQLite database and the Serper API
    ///
    /// Opens (and migrates) the database at `persistence.database_path` and
    /// loads the active credentials from it.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let db = Arc::new(Database::new(&config.persistence.database_path).await?);
        let provider = Arc::new(SerperClient::new(&config.provider)?);

        Self::with_components(config, provider, db.clone(), db).await
    }

    /// Create a checker over explicit collaborators
    pub async fn with_components(
        config: Config,
        provider: Arc<dyn SearchProvider>,
        store: Arc<dyn CredentialStore>,
        ledger: Arc<dyn CreditLedger>,
    ) -> Result<Self> {
        let pool = Arc::new(
            CredentialPool::load(provider.clone(), store.clone(), &config.provider).await?,
        );
        let writer = Arc::new(ResultWriter::new(&config.persistence.results_dir)?);
        let registry = Arc::new(JobRegistry::new());
        let client = Arc::new(LookupClient::new(
            pool.clone(),
            provider,
            config.lookup.clone(),
        ));

        let dispatcher = Arc::new(Dispatcher::new(
            registry.clone(),
            pool.clone(),
            client,
            writer.clone(),
            ledger.clone(),
            config.dispatch.clone(),
        ));

        let runner = JobRunner {
            concurrent_limit: Arc::new(tokio::sync::Semaphore::new(
                config.dispatch.max_concurrent_jobs.max(1),
            )),
            active_jobs: Arc::new(tokio::sync::Mutex::new(HashSet::new())),
            accepting_new: Arc::new(AtomicBool::new(true)),
            shutdown_token: tokio_util::sync::CancellationToken::new(),
        };

        tracing::info!(
            credentials = pool.len().await,
            max_concurrent_jobs = config.dispatch.max_concurrent_jobs,
            "index checker ready"
        );

        Ok(Self {
            config: Arc::new(config),
            registry,
            pool,
            store,
            ledger,
            writer,
            dispatcher,
            runner,
        })
    }

    /// Configuration the checker was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Spawn the API server as a background task
    ///
    /// The server stops gracefully once [`IndexChecker::shutdown`] begins.
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let checker = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(checker, config).await })
    }
}
