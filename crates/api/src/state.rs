//! Application state shared across handlers.

use std::sync::Arc;

use analysis_core::Analyzer;
use database::Database;
use object_storage::StorageAdapter;

use crate::analysis::ProgressTracker;
use crate::auth::JwtKeys;
use crate::config::AppEnv;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// Exam file bucket.
    pub documents: Arc<StorageAdapter>,
    /// Educational materials bucket.
    pub materials: Arc<StorageAdapter>,
    pub analyzer: Arc<dyn Analyzer>,
    pub jwt: JwtKeys,
    /// Last reported analysis progress per plan.
    pub progress: ProgressTracker,
    pub app_env: AppEnv,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        db: Database,
        documents: Arc<StorageAdapter>,
        materials: Arc<StorageAdapter>,
        analyzer: Arc<dyn Analyzer>,
        jwt: JwtKeys,
        app_env: AppEnv,
    ) -> Self {
        Self {
            db,
            documents,
            materials,
            analyzer,
            jwt,
            progress: ProgressTracker::default(),
            app_env,
        }
    }
}
