//! User management within the caller's company.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use database::user::{self, NewUser, UserUpdate};
use database::validation::validate_password;
use database::{DatabaseError, Profession, Role, User};
use serde::Deserialize;
use tracing::info;

use crate::auth::{hash_password, AuthUser};
use crate::error::{ApiError, Result};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub profession: Option<Profession>,
    #[serde(default)]
    pub registration_number: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub profession: Option<Profession>,
    #[serde(default)]
    pub registration_number: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

pub async fn list_users(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<User>>> {
    let users = user::list_users(state.db.pool(), auth.company_id()).await?;
    Ok(Json(users))
}

/// Add a user to the caller's company. Admin only.
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>)> {
    auth.require_admin()?;
    validate_password(&req.password).map_err(DatabaseError::from)?;

    let password_hash = hash_password(&req.password)?;
    let created = user::create_user(
        state.db.pool(),
        &NewUser {
            company_id: auth.company_id().to_string(),
            name: req.name,
            email: req.email,
            password_hash,
            role: req.role.unwrap_or(Role::User),
            profession: req.profession.unwrap_or(Profession::Other),
            registration_number: req.registration_number,
        },
    )
    .await?;

    info!(user_id = %created.id, created_by = %auth.id(), "User created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<User>> {
    let found = user::get_user(state.db.pool(), auth.company_id(), &id).await?;
    Ok(Json(found))
}

/// Edit a profile. Users edit themselves; admins edit anyone and alone may
/// change roles.
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>> {
    if id != auth.id() && !auth.is_admin() {
        return Err(ApiError::Forbidden(
            "Only administrators can edit other users".to_string(),
        ));
    }
    if req.role.is_some() && !auth.is_admin() {
        return Err(ApiError::Forbidden(
            "Only administrators can change roles".to_string(),
        ));
    }

    let updated = user::update_user(
        state.db.pool(),
        auth.company_id(),
        &id,
        &UserUpdate {
            name: req.name,
            profession: req.profession,
            registration_number: req.registration_number,
            role: req.role,
        },
    )
    .await?;

    Ok(Json(updated))
}

/// Remove a user. Admin only; admins cannot remove themselves.
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    auth.require_admin()?;
    if id == auth.id() {
        return Err(ApiError::BadRequest("You cannot delete your own account".to_string()));
    }

    user::delete_user(state.db.pool(), auth.company_id(), &id).await?;

    info!(user_id = %id, deleted_by = %auth.id(), "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
