//! index-checker service binary
//!
//! Usage: `index-checker [config.json]`
//!
//! The configuration path may also come from `INDEX_CHECKER_CONFIG`; without
//! either, defaults are used. `INDEX_CHECKER_ADMIN_KEY` overrides the admin
//! key, and `API_KEY_1..n` seed the credential store on first start.

use index_checker::config::api_keys_from_env;
use index_checker::{Caller, Config, IndexChecker, UserId, run_with_shutdown};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    tracing::info!(
        database = %config.persistence.database_path.display(),
        results = %config.persistence.results_dir.display(),
        "configuration loaded"
    );

    let checker = Arc::new(IndexChecker::new(config).await?);

    let seeded = checker.seed_credentials(api_keys_from_env()).await?;
    if seeded == 0 && checker.pool_status().await.credentials.is_empty() {
        tracing::warn!("no API keys configured; every lookup will report OUT_OF_QUERIES");
    }

    let status = checker
        .refresh_credentials(&Caller::admin(UserId(0)))
        .await?;
    tracing::info!(
        healthy = status.healthy_count,
        total = status.credentials.len(),
        total_remaining = status.total_remaining,
        "startup balance refresh complete"
    );

    let mut server = checker.spawn_api_server();

    tokio::select! {
        result = run_with_shutdown(&checker) => {
            result?;
            match server.await {
                Ok(result) => result?,
                Err(e) => tracing::error!(error = %e, "API server task failed"),
            }
        }
        // The server only returns on its own if it failed (e.g. bind error)
        joined = &mut server => {
            checker.shutdown().await?;
            match joined {
                Ok(result) => result?,
                Err(e) => tracing::error!(error = %e, "API server task failed"),
            }
        }
    }

    Ok(())
}

fn load_config() -> index_checker::Result<Config> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("INDEX_CHECKER_CONFIG").ok());

    let mut config = match path {
        Some(path) => Config::load(&path)?,
        None => {
            tracing::info!("no configuration file given, using defaults");
            Config::default()
        }
    };

    if let Ok(key) = std::env::var("INDEX_CHECKER_ADMIN_KEY")
        && !key.trim().is_empty()
    {
        config.api.admin_key = Some(key);
    }

    Ok(config)
}
