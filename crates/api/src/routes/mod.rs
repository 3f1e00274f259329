//! Route handlers for the REST API and dashboard pages.

pub mod auth;
pub mod company;
pub mod files;
pub mod health;
pub mod materials;
pub mod pages;
pub mod plans;
pub mod users;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;
use crate::upload::MAX_UPLOAD_BYTES;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // HTML pages
        .route("/", get(pages::dashboard_page))
        .route("/plans/:id", get(pages::plan_page))
        // Health check
        .route("/health", get(health::health))
        // Accounts
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/auth/validate", get(auth::validate))
        .route(
            "/api/company",
            get(company::get_company).put(company::update_company),
        )
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route(
            "/api/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // Plans
        .route("/api/plans", get(plans::list_plans).post(plans::create_plan))
        .route("/api/plans/:id", get(plans::get_plan).put(plans::update_plan))
        .route("/api/plans/:id/status", post(plans::change_status))
        .route(
            "/api/plans/:id/exams/:exam_id/files",
            post(plans::upload_exam_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/plans/:id/analysis/progress", get(plans::analysis_progress))
        .route("/api/plans/:id/analysis/:stage", post(plans::run_analysis))
        .route("/api/plans/:id/contexts", get(plans::list_contexts))
        // Materials
        .route(
            "/api/materials",
            get(materials::list_materials)
                .post(materials::create_material)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/materials/:id",
            get(materials::get_material).delete(materials::delete_material),
        )
        .route("/api/materials/:id/download", get(materials::download_material))
        .route("/api/materials/:id/status", post(materials::advance_status))
        // Stored objects
        .route("/api/files/url", get(files::file_url))
        .route("/api/files", axum::routing::delete(files::delete_file))
}
