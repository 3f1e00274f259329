//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use analysis_core::{
    async_trait, AnalysisError, AnalysisInput, AnalysisResult, Analyzer, ProgressFn,
};
use database::company::{create_company, NewCompany};
use database::user::{create_user, NewUser};
use database::{Database, Profession, Role, User};
use mock_analyzer::MockAnalyzer;
use object_storage::{BucketPolicy, MemoryObjectStore, StorageAdapter};

use crate::auth::JwtKeys;
use crate::config::AppEnv;
use crate::state::AppState;

pub const TEST_SECRET: &str = "test-secret-with-at-least-32-characters";

/// Instant mock that counts its calls.
pub struct CountingAnalyzer {
    inner: MockAnalyzer,
    calls: AtomicUsize,
}

impl CountingAnalyzer {
    pub fn new() -> Self {
        Self {
            inner: MockAnalyzer::instant(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Analyzer for CountingAnalyzer {
    async fn analyze(&self, input: &AnalysisInput, on_progress: &ProgressFn) -> AnalysisResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.analyze(input, on_progress).await
    }

    fn name(&self) -> &str {
        "CountingAnalyzer"
    }

    fn is_mock(&self) -> bool {
        true
    }
}

/// Fails the first call with a network error, then answers like the mock.
pub struct FlakyAnalyzer {
    inner: MockAnalyzer,
    calls: AtomicUsize,
}

impl FlakyAnalyzer {
    pub fn new() -> Self {
        Self {
            inner: MockAnalyzer::instant(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Analyzer for FlakyAnalyzer {
    async fn analyze(&self, input: &AnalysisInput, on_progress: &ProgressFn) -> AnalysisResult {
        match self.try_analyze(input, on_progress).await {
            Ok(result) => result,
            Err(e) => AnalysisResult::fallback(&e),
        }
    }

    async fn try_analyze(
        &self,
        input: &AnalysisInput,
        on_progress: &ProgressFn,
    ) -> Result<AnalysisResult, AnalysisError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            on_progress(100);
            return Err(AnalysisError::Network("connection reset".to_string()));
        }
        Ok(self.inner.analyze(input, on_progress).await)
    }

    fn name(&self) -> &str {
        "FlakyAnalyzer"
    }
}

pub async fn test_state(analyzer: Arc<dyn Analyzer>) -> AppState {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();

    let store = Arc::new(MemoryObjectStore::new());
    let documents = Arc::new(StorageAdapter::new(
        store.clone(),
        "plan-documents",
        "us-east-1",
        BucketPolicy::PublicRead,
    ));
    let materials = Arc::new(StorageAdapter::new(
        store,
        "plan-materials",
        "us-east-1",
        BucketPolicy::Private,
    ));
    documents.ensure_bucket().await.unwrap();
    materials.ensure_bucket().await.unwrap();

    AppState::new(
        db,
        documents,
        materials,
        analyzer,
        JwtKeys::new(TEST_SECRET, 3600),
        AppEnv::Development,
    )
}

/// Create a company with one admin.
pub async fn seed_admin(state: &AppState) -> User {
    let company = create_company(
        state.db.pool(),
        &NewCompany {
            name: "Clinic".to_string(),
            email_domain: None,
        },
    )
    .await
    .unwrap();

    create_user(
        state.db.pool(),
        &NewUser {
            company_id: company.id,
            name: "Dr. Lima".to_string(),
            email: "lima@clinic.com".to_string(),
            password_hash: "hash".to_string(),
            role: Role::Admin,
            profession: Profession::Physician,
            registration_number: None,
        },
    )
    .await
    .unwrap()
}
