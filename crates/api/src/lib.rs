//! REST API and dashboard for multi-tenant clinical plans.
//!
//! Practitioners register a company, manage patient plans and educational
//! materials, upload exam files to object storage and run the staged analysis
//! pipeline. Every tenant-owned query is scoped by the caller's company.

pub mod analysis;
pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_support;

use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use crate::config::{AppEnv, Config, ConfigError, StorageBackend};
pub use crate::error::{ApiError, Result};
pub use crate::state::AppState;

/// Build the application: API routes, pages and static assets.
pub fn app(state: AppState) -> Router {
    routes::router()
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
