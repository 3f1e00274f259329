//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: String,
    pub analyzer: String,
    pub storage: StorageHealth,
}

/// Whether each bucket finished initialization.
#[derive(Serialize)]
pub struct StorageHealth {
    pub documents: bool,
    pub materials: bool,
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        analyzer: state.analyzer.name().to_string(),
        storage: StorageHealth {
            documents: state.documents.is_ready(),
            materials: state.materials.is_ready(),
        },
    })
}
