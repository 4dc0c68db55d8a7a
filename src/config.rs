//! Configuration types for index-checker

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Main configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// External search provider endpoints and credential quota policy
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Per-URL retry behavior
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Batch and worker pool sizing
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Database and result file locations
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

/// Search provider configuration
///
/// Covers both the search endpoint used for lookups and the account endpoint
/// used to refresh each credential's remaining quota.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ProviderConfig {
    /// Search endpoint (default: "https://google.serper.dev/search")
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Account balance endpoint (default: "https://google.serper.dev/account")
    #[serde(default = "default_account_url")]
    pub account_url: String,

    /// Per-request timeout in seconds (default: 10)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub request_timeout: Duration,

    /// Credentials at or below this quota are no longer handed out (default: 10)
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: i64,

    /// Balance older than this is refreshed before use, in seconds (default: 300)
    #[serde(default = "default_staleness_window", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub staleness_window: Duration,

    /// Delay between balance calls in a full refresh, in milliseconds (default: 500)
    #[serde(default = "default_refresh_delay", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub refresh_delay: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            account_url: default_account_url(),
            request_timeout: default_request_timeout(),
            warning_threshold: default_warning_threshold(),
            staleness_window: default_staleness_window(),
            refresh_delay: default_refresh_delay(),
        }
    }
}

/// Retry configuration for a single URL lookup
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LookupConfig {
    /// Attempts per URL (default: 2)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base of the backoff after a non-200 response, in milliseconds (default: 300)
    #[serde(default = "default_backoff_base", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub backoff_base: Duration,

    /// Base of the backoff after a transport error, in milliseconds (default: 500)
    #[serde(default = "default_network_backoff_base", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub network_backoff_base: Duration,

    /// Fixed delay after a request timeout, in milliseconds (default: 200)
    #[serde(default = "default_timeout_delay", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub timeout_delay: Duration,

    /// Delay after a 429 before trying another credential, in milliseconds (default: 1000)
    #[serde(default = "default_rate_limit_delay", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub rate_limit_delay: Duration,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base: default_backoff_base(),
            network_backoff_base: default_network_backoff_base(),
            timeout_delay: default_timeout_delay(),
            rate_limit_delay: default_rate_limit_delay(),
        }
    }
}

impl LookupConfig {
    /// Longest one lookup can take when every attempt runs to `request_timeout`
    ///
    /// Counts each attempt at the full request timeout plus the longest delay
    /// any failure can cause between attempts (jitter at its upper bound).
    pub fn worst_case(&self, request_timeout: Duration) -> Duration {
        let attempts = self.max_attempts.max(1);
        let mut total = request_timeout * attempts;
        for attempt in 1..attempts {
            let factor = attempt + 1;
            total += self
                .rate_limit_delay
                .max(self.timeout_delay)
                .max(self.backoff_base * factor)
                .max(self.network_backoff_base * factor);
        }
        total
    }
}

/// Batch dispatch configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DispatchConfig {
    /// URLs per batch (default: 30)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Concurrent lookups within a batch (default: 5)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Lower bound of the per-completion smoothing sleep, in milliseconds (default: 100)
    #[serde(default = "default_smoothing_min", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub smoothing_min: Duration,

    /// Upper bound (exclusive) of the smoothing sleep, in milliseconds (default: 200)
    #[serde(default = "default_smoothing_max", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub smoothing_max: Duration,

    /// Pause between batches, in milliseconds (default: 500)
    #[serde(default = "default_batch_pause", with = "duration_ms_serde")]
    #[schema(value_type = u64)]
    pub batch_pause: Duration,

    /// Upper bound on one URL lookup including retries, in seconds (default: 25)
    ///
    /// Must cover the lookup's full retry budget; see [`LookupConfig::worst_case`].
    #[serde(default = "default_url_deadline", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub url_deadline: Duration,

    /// Jobs processed at the same time (default: 4)
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// How long shutdown waits for in-flight jobs, in seconds (default: 30)
    #[serde(default = "default_shutdown_grace", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub shutdown_grace: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            workers: default_workers(),
            smoothing_min: default_smoothing_min(),
            smoothing_max: default_smoothing_max(),
            batch_pause: default_batch_pause(),
            url_deadline: default_url_deadline(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./index-checker.db")
    #[serde(default = "default_database_path")]
    #[schema(value_type = String)]
    pub database_path: PathBuf,

    /// Directory receiving result tables (default: "./results")
    #[serde(default = "default_results_dir")]
    #[schema(value_type = String)]
    pub results_dir: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            results_dir: default_results_dir(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8080)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Key identifying the administrator through the X-Api-Key header
    #[serde(default)]
    pub admin_key: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            admin_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

impl Config {
    /// Read a JSON configuration file and validate it
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("provider.search_url", &self.provider.search_url),
            ("provider.account_url", &self.provider.account_url),
        ] {
            url::Url::parse(value).map_err(|e| Error::Config {
                message: format!("invalid URL '{}': {}", value, e),
                key: Some(key.to_string()),
            })?;
        }

        if self.provider.warning_threshold < 0 {
            return Err(config_error(
                "provider.warning_threshold",
                "must not be negative",
            ));
        }
        if self.lookup.max_attempts == 0 {
            return Err(config_error("lookup.max_attempts", "must be at least 1"));
        }
        if self.dispatch.batch_size == 0 {
            return Err(config_error("dispatch.batch_size", "must be at least 1"));
        }
        if self.dispatch.workers == 0 {
            return Err(config_error("dispatch.workers", "must be at least 1"));
        }
        if self.dispatch.max_concurrent_jobs == 0 {
            return Err(config_error(
                "dispatch.max_concurrent_jobs",
                "must be at least 1",
            ));
        }
        let budget = self.lookup.worst_case(self.provider.request_timeout);
        if self.dispatch.url_deadline < budget {
            return Err(config_error(
                "dispatch.url_deadline",
                &format!(
                    "must be at least {:?}, the worst case of one lookup with retries",
                    budget
                ),
            ));
        }
        if self.dispatch.smoothing_min > self.dispatch.smoothing_max {
            return Err(config_error(
                "dispatch.smoothing_min",
                "must not exceed dispatch.smoothing_max",
            ));
        }

        Ok(())
    }
}

fn config_error(key: &str, message: &str) -> Error {
    Error::Config {
        message: format!("{} {}", key, message),
        key: Some(key.to_string()),
    }
}

/// Collect `API_KEY_1`, `API_KEY_2`, ... from the process environment
///
/// Stops at the first missing index. Returns `(name, key_value)` pairs.
pub fn api_keys_from_env() -> Vec<(String, String)> {
    collect_api_keys(|name| std::env::var(name).ok())
}

fn collect_api_keys(lookup: impl Fn(&str) -> Option<String>) -> Vec<(String, String)> {
    let mut keys = Vec::new();
    for index in 1.. {
        let Some(value) = lookup(&format!("API_KEY_{}", index)) else {
            break;
        };
        let value = value.trim().to_string();
        if !value.is_empty() {
            keys.push((format!("API Key {}", index), value));
        }
    }
    keys
}

fn default_search_url() -> String {
    "https://google.serper.dev/search".to_string()
}

fn default_account_url() -> String {
    "https://google.serper.dev/account".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_warning_threshold() -> i64 {
    10
}

fn default_staleness_window() -> Duration {
    Duration::from_secs(300)
}

fn default_refresh_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_attempts() -> u32 {
    2
}

fn default_backoff_base() -> Duration {
    Duration::from_millis(300)
}

fn default_network_backoff_base() -> Duration {
    Duration::from_millis(500)
}

fn default_timeout_delay() -> Duration {
    Duration::from_millis(200)
}

fn default_rate_limit_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_batch_size() -> usize {
    30
}

fn default_workers() -> usize {
    5
}

fn default_smoothing_min() -> Duration {
    Duration::from_millis(100)
}

fn default_smoothing_max() -> Duration {
    Duration::from_millis(200)
}

fn default_batch_pause() -> Duration {
    Duration::from_millis(500)
}

fn default_url_deadline() -> Duration {
    Duration::from_secs(25)
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(30)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./index-checker.db")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("./results")
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn empty_json_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();

        assert_eq!(config.provider.warning_threshold, 10);
        assert_eq!(config.provider.staleness_window, Duration::from_secs(300));
        assert_eq!(config.provider.request_timeout, Duration::from_secs(10));
        assert_eq!(config.lookup.max_attempts, 2);
        assert_eq!(config.lookup.rate_limit_delay, Duration::from_secs(1));
        assert_eq!(config.dispatch.batch_size, 30);
        assert_eq!(config.dispatch.workers, 5);
        assert_eq!(config.dispatch.url_deadline, Duration::from_secs(25));
        assert_eq!(config.dispatch.max_concurrent_jobs, 4);
        assert_eq!(
            config.api.bind_address,
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
        assert!(config.api.admin_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn millisecond_fields_round_trip() {
        let json = r#"{"dispatch": {"smoothing_min": 5, "smoothing_max": 10, "batch_pause": 0}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.dispatch.smoothing_min, Duration::from_millis(5));
        assert_eq!(config.dispatch.smoothing_max, Duration::from_millis(10));
        assert_eq!(config.dispatch.batch_pause, Duration::ZERO);

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["dispatch"]["smoothing_max"], 10);
        assert_eq!(value["dispatch"]["url_deadline"], 25);
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut config = Config::default();
        config.dispatch.batch_size = 0;

        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("dispatch.batch_size"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_unparsable_endpoint() {
        let mut config = Config::default();
        config.provider.account_url = "not a url".to_string();

        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("provider.account_url"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_inverted_smoothing_range() {
        let mut config = Config::default();
        config.dispatch.smoothing_min = Duration::from_millis(300);

        assert!(config.validate().is_err());
    }

    #[test]
    fn default_deadline_covers_retry_budget() {
        let config = Config::default();
        let budget = config.lookup.worst_case(config.provider.request_timeout);

        // Two 10 s attempts plus the 1 s rate-limit wait between them
        assert_eq!(budget, Duration::from_secs(21));
        assert!(config.dispatch.url_deadline >= budget);
    }

    #[test]
    fn worst_case_uses_longest_delay_per_gap() {
        let lookup = LookupConfig {
            max_attempts: 3,
            backoff_base: Duration::from_millis(300),
            network_backoff_base: Duration::from_millis(500),
            timeout_delay: Duration::from_millis(200),
            rate_limit_delay: Duration::from_secs(1),
        };

        // 3 × 1 s + max(1 s, 1 s) + max(1 s, 1.5 s)
        assert_eq!(
            lookup.worst_case(Duration::from_secs(1)),
            Duration::from_millis(5500)
        );
    }

    #[test]
    fn validate_rejects_deadline_below_retry_budget() {
        let mut config = Config::default();
        config.dispatch.url_deadline = Duration::from_secs(15);

        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("dispatch.url_deadline"));
            }
            other => panic!("expected config error, got {other:?}"),
        }

        config.provider.request_timeout = Duration::from_secs(5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_reads_and_validates_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"api": {{"admin_key": "secret"}}, "lookup": {{"max_attempts": 3}}, "dispatch": {{"url_deadline": 40}}}}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.api.admin_key.as_deref(), Some("secret"));
        assert_eq!(config.lookup.max_attempts, 3);
    }

    #[test]
    fn load_reports_missing_file() {
        let result = Config::load("/definitely/not/here.json");
        assert!(matches!(result, Err(Error::Config { key: None, .. })));
    }

    #[test]
    fn api_keys_collected_until_first_gap() {
        let env: HashMap<&str, &str> = [
            ("API_KEY_1", "first"),
            ("API_KEY_2", "  "),
            ("API_KEY_3", "third"),
            ("API_KEY_5", "unreachable"),
        ]
        .into_iter()
        .collect();

        let keys = collect_api_keys(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(
            keys,
            vec![
                ("API Key 1".to_string(), "first".to_string()),
                ("API Key 3".to_string(), "third".to_string()),
            ]
        );
    }
}
