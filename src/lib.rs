//! # index-checker
//!
//! Batch search-index checker built around a pool of metered API credentials.
//!
//! A job is a named list of URLs. Each URL is looked up with a `site:` query
//! against the search provider; the job is charged one credit per URL up
//! front, runs in the background in fixed-size batches through a bounded
//! worker pool, and ends with a two-column result table on disk.
//!
//! ## Components
//!
//! - [`credentials::CredentialPool`] - Round-robin credential rotation with
//!   live quota, lazy balance refresh and health status
//! - [`lookup::LookupClient`] - One lookup for one URL with bounded retries
//! - [`dispatcher::Dispatcher`] - Admission, batching and finalization of a job
//! - [`jobs::JobRegistry`] - Live job state for pollers
//! - [`results::ResultWriter`] - Result table persistence
//! - [`checker::IndexChecker`] - Service facade tying everything together
//!
//! ## Quick Start
//!
//! ```no_run
//! use index_checker::{Caller, Config, IndexChecker, UserId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let checker = IndexChecker::new(Config::default()).await?;
//!
//!     let submission = checker
//!         .submit(&Caller::user(UserId(1)), "launch", "https://example.com\nhttps://example.org")
//!         .await?;
//!     println!("job {} charged {} credits", submission.job_id, submission.cost);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Service facade
pub mod checker;
/// Configuration types
pub mod config;
/// Credential pool
pub mod credentials;
/// Database persistence layer
pub mod db;
/// Batch dispatch of jobs
pub mod dispatcher;
/// Error types
pub mod error;
/// In-memory job registry
pub mod jobs;
/// Per-user credit ledger seam
pub mod ledger;
/// Single-URL lookups with retries
pub mod lookup;
/// Search provider clients
pub mod provider;
/// Result table persistence
pub mod results;
/// Retry classification and delays
pub mod retry;
/// Core types
pub mod types;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use checker::{IndexChecker, Submission};
pub use config::Config;
pub use credentials::{Credential, CredentialPool, CredentialStore};
pub use db::Database;
pub use error::{AdmissionError, ApiError, DatabaseError, Error, ErrorDetail, Result, ToHttpStatus};
pub use ledger::{CreditLedger, UserAccount};
pub use provider::{ProviderError, SearchProvider, SerperClient};
pub use types::{
    Caller, CredentialId, CredentialStatus, FinalStats, Job, JobId, JobStatus, PoolStatus,
    QueryOutcome, UserId,
};

/// Wait for SIGTERM or Ctrl+C, then shut the checker down gracefully
pub async fn run_with_shutdown(checker: &IndexChecker) -> Result<()> {
    wait_for_signal().await;
    checker.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments; Ctrl+C still works
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::warn!(error = %e, "could not register SIGTERM handler");
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        _ = wait_for_ctrl_c() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C, shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
