//! Clinical plans API server.

use std::sync::Arc;

use api::analysis::select_analyzer;
use api::auth::JwtKeys;
use api::{AppState, Config, StorageBackend};
use database::Database;
use llm_analyzer::LlmAnalyzerConfig;
use object_storage::{BucketPolicy, MemoryObjectStore, ObjectStore, S3ObjectStore, StorageAdapter};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, env = ?config.app_env, "Starting plans API");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    // Object storage
    let store: Arc<dyn ObjectStore> = match &config.storage {
        StorageBackend::Memory => {
            warn!("Using in-memory object storage, uploads are lost on restart");
            Arc::new(MemoryObjectStore::new())
        }
        StorageBackend::S3(s3) => Arc::new(S3ObjectStore::new(s3)),
    };
    let documents = Arc::new(StorageAdapter::new(
        store.clone(),
        &config.documents_bucket,
        &config.region,
        BucketPolicy::PublicRead,
    ));
    let materials_policy = match &config.materials_email_domain {
        Some(domain) => BucketPolicy::EmailDomain(domain.clone()),
        None => BucketPolicy::Private,
    };
    let materials = Arc::new(StorageAdapter::new(
        store,
        &config.materials_bucket,
        &config.region,
        materials_policy,
    ));

    // Uploads answer 503 until their bucket is ready; reads keep working.
    for adapter in [&documents, &materials] {
        if let Err(e) = adapter.ensure_bucket().await {
            warn!(bucket = %adapter.bucket(), "Bucket initialization failed: {}", e);
        }
    }

    let analyzer = select_analyzer(config.app_env, LlmAnalyzerConfig::from_env());
    info!(analyzer = %analyzer.name(), "Analyzer selected");

    // Build application state
    let state = AppState::new(
        db,
        documents,
        materials,
        analyzer,
        JwtKeys::new(&config.jwt_secret, config.jwt_expiry_secs),
        config.app_env,
    );

    // Start server
    info!(addr = %config.addr, "Plans API listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, api::app(state)).await?;

    Ok(())
}
