//! Application state for the API server

use crate::Config;
use crate::checker::IndexChecker;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The service instance
    pub checker: Arc<IndexChecker>,

    /// Configuration (identity resolution reads the admin key from here)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(checker: Arc<IndexChecker>, config: Arc<Config>) -> Self {
        Self { checker, config }
    }
}
