//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

use object_storage::S3Config;

/// Secret used when `JWT_SECRET` is unset outside production.
const DEV_JWT_SECRET: &str = "development-secret-do-not-use-in-production";

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn is_production(&self) -> bool {
        *self == AppEnv::Production
    }
}

/// Where uploaded objects are kept.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// In-process buckets; contents are lost on restart.
    Memory,
    S3(S3Config),
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    pub app_env: AppEnv,
    /// Token signing secret.
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiry_secs: u64,
    pub storage: StorageBackend,
    pub region: String,
    pub documents_bucket: String,
    pub materials_bucket: String,
    /// Domain allowed to read the materials bucket.
    pub materials_email_domain: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `API_ADDR` | Server bind address | `127.0.0.1:8790` |
    /// | `DATABASE_URL` | SQLite database URL | `sqlite:plans.db?mode=rwc` |
    /// | `APP_ENV` | `production` or `development` | `development` |
    /// | `JWT_SECRET` | Token signing secret, 32+ chars | (required in production) |
    /// | `JWT_EXPIRY_SECS` | Token lifetime | `86400` |
    /// | `STORAGE_BACKEND` | `s3` or `memory` | `memory` |
    /// | `S3_ENDPOINT` | Custom S3 endpoint (MinIO) | AWS |
    /// | `S3_REGION` | Bucket region | `us-east-1` |
    /// | `S3_ACCESS_KEY` | Access key | (required for `s3`) |
    /// | `S3_SECRET_KEY` | Secret key | (required for `s3`) |
    /// | `S3_DOCUMENTS_BUCKET` | Exam file bucket | `plan-documents` |
    /// | `S3_MATERIALS_BUCKET` | Materials bucket | `plan-materials` |
    /// | `MATERIALS_EMAIL_DOMAIN` | Domain allowed to read materials | (none) |
    ///
    /// The analyzer reads its own `LLM_*` variables, see
    /// [`llm_analyzer::LlmAnalyzerConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("API_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8790".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:plans.db?mode=rwc".to_string());

        let app_env = match env::var("APP_ENV").ok().as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("production") => AppEnv::Production,
            _ => AppEnv::Development,
        };

        let jwt_secret = match env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()) {
            Some(secret) if secret.len() < 32 && app_env.is_production() => {
                return Err(ConfigError::WeakJwtSecret)
            }
            Some(secret) => secret,
            None if app_env.is_production() => return Err(ConfigError::MissingJwtSecret),
            None => DEV_JWT_SECRET.to_string(),
        };

        let jwt_expiry_secs = env::var("JWT_EXPIRY_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let region = env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        let storage = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "s3" => StorageBackend::S3(S3Config {
                endpoint: env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty()),
                region: region.clone(),
                access_key: env::var("S3_ACCESS_KEY")
                    .map_err(|_| ConfigError::Missing("S3_ACCESS_KEY"))?,
                secret_key: env::var("S3_SECRET_KEY")
                    .map_err(|_| ConfigError::Missing("S3_SECRET_KEY"))?,
            }),
            other => return Err(ConfigError::InvalidStorageBackend(other.to_string())),
        };

        let documents_bucket =
            env::var("S3_DOCUMENTS_BUCKET").unwrap_or_else(|_| "plan-documents".to_string());
        let materials_bucket =
            env::var("S3_MATERIALS_BUCKET").unwrap_or_else(|_| "plan-materials".to_string());
        let materials_email_domain = env::var("MATERIALS_EMAIL_DOMAIN")
            .ok()
            .map(|d| d.trim().trim_start_matches('@').to_lowercase())
            .filter(|d| !d.is_empty());

        Ok(Self {
            addr,
            database_url,
            app_env,
            jwt_secret,
            jwt_expiry_secs,
            storage,
            region,
            documents_bucket,
            materials_bucket,
            materials_email_domain,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid API_ADDR format")]
    InvalidAddr,

    #[error("JWT_SECRET is required in production")]
    MissingJwtSecret,

    #[error("JWT_SECRET must be at least 32 characters")]
    WeakJwtSecret,

    #[error("Unknown STORAGE_BACKEND: {0} (expected s3 or memory)")]
    InvalidStorageBackend(String),

    #[error("{0} environment variable is required")]
    Missing(&'static str),
}
