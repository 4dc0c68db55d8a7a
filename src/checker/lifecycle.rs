//! Startup seeding and shutdown coordination.

use crate::error::{Error, Result};
use std::sync::atomic::Ordering;

use super::IndexChecker;

impl IndexChecker {
    /// Import credentials into an empty store
    ///
    /// `keys` are `(name, key_value)` pairs, typically from
    /// [`crate::config::api_keys_from_env`]. Does nothing if the pool already
    /// holds credentials. Returns the number of credentials added.
    pub async fn seed_credentials(&self, keys: Vec<(String, String)>) -> Result<usize> {
        if !self.pool.is_empty().await || keys.is_empty() {
            return Ok(0);
        }

        let mut added = 0;
        for (name, key_value) in keys {
            match self.store.add_credential(&key_value, &name).await {
                Ok(_) => added += 1,
                Err(Error::Validation(reason)) => {
                    tracing::warn!(name = %name, reason = %reason, "skipping credential");
                }
                Err(e) => return Err(e),
            }
        }

        self.reload_credentials().await?;
        tracing::info!(added, "seeded credentials from environment");
        Ok(added)
    }

    /// Gracefully shut down the checker
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting submissions
    /// 2. Signals waiting jobs (and the API server) to stop
    /// 3. Waits for processing jobs to finish, bounded by `shutdown_grace`
    /// 4. Persists every credential's live quota
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.runner.accepting_new.store(false, Ordering::SeqCst);
        self.runner.shutdown_token.cancel();

        let grace = self.config.dispatch.shutdown_grace;
        match tokio::time::timeout(grace, self.wait_for_active_jobs()).await {
            Ok(()) => tracing::info!("All jobs finished"),
            Err(_) => {
                let remaining = self.runner.active_jobs.lock().await.len();
                tracing::warn!(remaining, "Timeout waiting for jobs, proceeding with shutdown");
            }
        }

        self.pool.persist_all().await?;
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether shutdown has begun
    pub fn is_shutting_down(&self) -> bool {
        !self.runner.accepting_new.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown begins
    pub async fn shutdown_signal(&self) {
        self.runner.shutdown_token.cancelled().await
    }

    async fn wait_for_active_jobs(&self) {
        loop {
            let active_count = self.runner.active_jobs.lock().await.len();
            if active_count == 0 {
                return;
            }

            tracing::debug!(active_count, "Waiting for jobs to finish");
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}
