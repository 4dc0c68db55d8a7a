//! Core types for index-checker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Declares an integer newtype identifier with conversions and SQLite bindings.
macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Get the inner i64 value
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }

        impl sqlx::Type<sqlx::Sqlite> for $name {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
            }

            fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
                <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
            ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
                sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $name {
            fn decode(
                value: sqlx::sqlite::SqliteValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
                Ok(Self(id))
            }
        }
    };
}

id_newtype!(
    /// Unique identifier for a submitted job (monotonic per process)
    JobId
);

id_newtype!(
    /// Identifier of a user owning jobs and credits
    UserId
);

id_newtype!(
    /// Identifier of an external API credential record
    CredentialId
);

/// Health of a single credential
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    /// Quota above the warning threshold
    Active,
    /// Quota at or below the warning threshold but not zero
    LowQuota,
    /// Provider answered 429 for this credential
    RateLimited,
    /// No quota left
    Exhausted,
}

impl CredentialStatus {
    /// Stable string form used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialStatus::Active => "active",
            CredentialStatus::LowQuota => "low_quota",
            CredentialStatus::RateLimited => "rate_limited",
            CredentialStatus::Exhausted => "exhausted",
        }
    }

    /// Parse the database form; unknown values are treated as exhausted
    pub fn from_db(value: &str) -> Self {
        match value {
            "active" => CredentialStatus::Active,
            "low_quota" | "low_credits" => CredentialStatus::LowQuota,
            "rate_limited" => CredentialStatus::RateLimited,
            _ => CredentialStatus::Exhausted,
        }
    }

    /// Classify a freshly fetched balance against the warning threshold
    pub fn from_balance(balance: i64, warning_threshold: i64) -> Self {
        if balance > warning_threshold {
            CredentialStatus::Active
        } else if balance > 0 {
            CredentialStatus::LowQuota
        } else {
            CredentialStatus::Exhausted
        }
    }

    /// Whether a credential in this state may serve lookups
    pub fn is_usable(&self) -> bool {
        matches!(self, CredentialStatus::Active | CredentialStatus::LowQuota)
    }
}

/// Job lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Admitted and processing (or waiting for a worker slot)
    Running,
    /// Every URL has a recorded outcome and the result file exists
    Done,
    /// Admission or persistence failed
    Error,
}

/// Result of checking a single URL
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// The search provider returned a link for the URL
    Indexed,
    /// No matching link (or retries exhausted on provider failures)
    NotIndexed,
    /// No credential had usable quota
    OutOfCredentials,
    /// Transport failure on the final attempt
    Error(String),
}

impl QueryOutcome {
    /// Label written to the result table
    pub fn label(&self) -> String {
        match self {
            QueryOutcome::Indexed => "Indexed".to_string(),
            QueryOutcome::NotIndexed => "No".to_string(),
            QueryOutcome::OutOfCredentials => "OUT_OF_QUERIES".to_string(),
            QueryOutcome::Error(reason) => format!("Error: {}", reason),
        }
    }

    /// Whether this outcome counts toward a job's error total
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            QueryOutcome::OutOfCredentials | QueryOutcome::Error(_)
        )
    }
}

/// Label for URLs the dispatcher never reached
pub const NOT_PROCESSED_LABEL: &str = "Error: Not processed";

/// Aggregate statistics computed when a job finishes
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FinalStats {
    /// Number of submitted URLs
    pub total: usize,
    /// URLs found in the index
    pub indexed: usize,
    /// URLs that ended in an error outcome
    pub errors: usize,
    /// indexed / total × 100, two decimals
    pub index_rate: f64,
    /// (total − errors) / total × 100, one decimal
    pub success_rate: f64,
}

impl FinalStats {
    /// Compute rates from raw counters; both rates are 0 for an empty job
    pub fn compute(total: usize, indexed: usize, errors: usize) -> Self {
        if total == 0 {
            return Self {
                total,
                indexed,
                errors,
                index_rate: 0.0,
                success_rate: 0.0,
            };
        }

        let total_f = total as f64;
        let index_rate = round_to(indexed as f64 / total_f * 100.0, 2);
        let success_rate = round_to(total.saturating_sub(errors) as f64 / total_f * 100.0, 1);

        Self {
            total,
            indexed,
            errors,
            index_rate,
            success_rate,
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// One submitted job as seen by pollers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Job {
    /// Job ID
    pub id: JobId,
    /// Project name given at submission
    pub name: String,
    /// Current status
    pub status: JobStatus,
    /// Number of submitted URLs
    pub total_urls: usize,
    /// URLs with a recorded outcome
    pub completed_count: usize,
    /// URLs found in the index so far
    pub indexed_count: usize,
    /// URLs that ended in an error outcome so far
    pub error_count: usize,
    /// URLs recorded as not indexed only because retries ran out
    pub degraded_count: usize,
    /// Human readable progress, "completed/total"
    pub progress: String,
    /// Set once the job is done
    pub final_stats: Option<FinalStats>,
    /// Submission time
    pub created_at: DateTime<Utc>,
    /// Completion time (done or error)
    pub completed_at: Option<DateTime<Utc>>,
    /// Owner of the job
    pub user_id: UserId,
    /// Result file name inside the results directory
    pub result_filename: Option<String>,
    /// Reason for the error status
    pub error_message: Option<String>,
}

impl Job {
    /// Whether the job reached a terminal status
    pub fn is_finished(&self) -> bool {
        !matches!(self.status, JobStatus::Running)
    }
}

/// Role of the caller making a request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Sees every job and the credential pool
    Admin,
    /// Sees only own jobs and credit balance
    User,
}

/// Identity of the caller as established by the enclosing service
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caller {
    /// User ID (the admin identity uses ID 0 unless it also sends X-User-Id)
    pub user_id: UserId,
    /// Caller role
    pub role: Role,
}

impl Caller {
    /// Build an admin caller
    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    /// Build a regular user caller
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::User,
        }
    }

    /// Whether the caller has elevated privileges
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether the caller may see the given job
    pub fn can_access(&self, job: &Job) -> bool {
        self.is_admin() || job.user_id == self.user_id
    }
}

/// Per-credential entry in the pool status report
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CredentialInfo {
    /// 1-based position in the rotation
    pub index: usize,
    /// Credential record ID
    pub id: CredentialId,
    /// Display name
    pub name: String,
    /// Remaining quota
    pub remaining: i64,
    /// Lookups consumed
    pub total_used: i64,
    /// Health status
    pub status: CredentialStatus,
    /// Whether this is the credential that served the last acquisition
    pub is_current: bool,
    /// Time of the last balance refresh
    pub last_refresh: Option<DateTime<Utc>>,
}

/// Snapshot of the credential pool
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PoolStatus {
    /// 1-based position of the current credential, if any was acquired yet
    pub current_index: Option<usize>,
    /// Quota at or below which a credential is no longer handed out
    pub warning_threshold: i64,
    /// Every credential in rotation order
    pub credentials: Vec<CredentialInfo>,
    /// Sum of remaining quota
    pub total_remaining: i64,
    /// Credentials usable with quota left
    pub healthy_count: usize,
}

/// Response body for GET /health
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthReport {
    /// Always "ok" when the service answers
    pub status: String,
    /// "active/total active"
    pub api_keys: String,
    /// Sum of remaining quota across credentials
    pub total_quota: i64,
    /// Jobs currently running
    pub active_projects: usize,
}

/// One row of the persisted result table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultRow {
    /// Submitted URL
    pub url: String,
    /// Outcome label
    pub status: String,
}
