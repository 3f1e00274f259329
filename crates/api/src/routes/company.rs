//! Company settings.

use axum::extract::State;
use axum::Json;
use database::{company, Company};
use serde::Deserialize;
use tracing::info;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UpdateCompanyRequest {
    pub name: String,
    #[serde(default)]
    pub email_domain: Option<String>,
}

pub async fn get_company(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Company>> {
    let company = company::get_company(state.db.pool(), auth.company_id()).await?;
    Ok(Json(company))
}

/// Rename the company or change its e-mail domain. Admin only.
pub async fn update_company(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdateCompanyRequest>,
) -> Result<Json<Company>> {
    auth.require_admin()?;

    let company = company::update_company(
        state.db.pool(),
        auth.company_id(),
        &req.name,
        req.email_domain.as_deref(),
    )
    .await?;

    info!(company_id = %company.id, "Company updated");
    Ok(Json(company))
}
