//! Shared test helpers for creating IndexChecker instances in tests.

use crate::checker::IndexChecker;
use crate::config::Config;
use crate::credentials::Credential;
use crate::test_helpers::{MemoryLedger, MemoryStore, ScriptedProvider};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

/// Collaborators handed to a test checker, kept for inspection
pub(crate) struct TestParts {
    pub(crate) provider: Arc<ScriptedProvider>,
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) ledger: Arc<MemoryLedger>,
    /// Holds the results directory; must be kept alive
    pub(crate) temp_dir: tempfile::TempDir,
}

/// Configuration with every delay shortened for tests
pub(crate) fn fast_config(temp_dir: &tempfile::TempDir) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = temp_dir.path().join("test.db");
    config.persistence.results_dir = temp_dir.path().join("results");
    config.provider.refresh_delay = Duration::ZERO;
    config.lookup.backoff_base = Duration::from_millis(1);
    config.lookup.network_backoff_base = Duration::from_millis(1);
    config.lookup.timeout_delay = Duration::from_millis(1);
    config.lookup.rate_limit_delay = Duration::from_millis(1);
    config.dispatch.smoothing_min = Duration::ZERO;
    config.dispatch.smoothing_max = Duration::ZERO;
    config.dispatch.batch_pause = Duration::ZERO;
    config.dispatch.shutdown_grace = Duration::from_secs(5);
    config
}

/// Helper to create a test IndexChecker over in-memory collaborators.
///
/// User 1 starts with `credits`; the store holds `credentials`.
pub(crate) async fn create_test_checker(
    credentials: Vec<Credential>,
    credits: i64,
) -> (IndexChecker, TestParts) {
    let temp_dir = tempdir().unwrap();
    let config = fast_config(&temp_dir);
    create_test_checker_with(config, temp_dir, credentials, credits).await
}

/// Same as [`create_test_checker`] with a caller-supplied configuration
pub(crate) async fn create_test_checker_with(
    config: Config,
    temp_dir: tempfile::TempDir,
    credentials: Vec<Credential>,
    credits: i64,
) -> (IndexChecker, TestParts) {
    let provider = Arc::new(ScriptedProvider::new());
    let store = Arc::new(MemoryStore::with_records(credentials));
    let ledger = Arc::new(MemoryLedger::with_user(1, credits));

    let checker =
        IndexChecker::with_components(config, provider.clone(), store.clone(), ledger.clone())
            .await
            .unwrap();

    (
        checker,
        TestParts {
            provider,
            store,
            ledger,
            temp_dir,
        },
    )
}

/// Poll until the job leaves `running`
pub(crate) async fn wait_for_job(
    checker: &IndexChecker,
    id: crate::types::JobId,
) -> crate::types::Job {
    let admin = crate::types::Caller::admin(crate::types::UserId(0));
    for _ in 0..500 {
        let job = checker.get_job(&admin, id).await.unwrap();
        if job.is_finished() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not finish", id);
}
