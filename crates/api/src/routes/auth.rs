//! Account routes: registration, login, password reset and token validation.

use std::time::Duration;

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use database::company::{self, NewCompany};
use database::user::{self, NewUser};
use database::validation::validate_password;
use database::{Company, DatabaseError, Profession, Role, User};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::auth::{
    hash_password, hash_reset_token, new_reset_token, verify_password, AuthUser, TOKEN_COOKIE,
};
use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Lifetime of a password-reset token.
const RESET_TOKEN_TTL: Duration = Duration::from_secs(3600);

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub company_name: String,
    #[serde(default)]
    pub email_domain: Option<String>,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub profession: Option<Profession>,
    #[serde(default)]
    pub registration_number: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<Company>,
}

/// Create a company together with its first administrator.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let pool = state.db.pool();
    validate_password(&req.password).map_err(DatabaseError::from)?;

    match user::get_user_by_email(pool, &req.email).await {
        Ok(_) => {
            return Err(DatabaseError::AlreadyExists {
                entity: "User",
                id: req.email.trim().to_lowercase(),
            }
            .into())
        }
        Err(DatabaseError::NotFound { .. }) => {}
        Err(e) => return Err(e.into()),
    }

    let password_hash = hash_password(&req.password)?;
    let (company, user) = company::create_company_with_owner(
        pool,
        &NewCompany {
            name: req.company_name,
            email_domain: req.email_domain,
        },
        NewUser {
            company_id: String::new(),
            name: req.name,
            email: req.email,
            password_hash,
            role: Role::Admin,
            profession: req.profession.unwrap_or(Profession::Other),
            registration_number: req.registration_number,
        },
    )
    .await?;

    info!(company_id = %company.id, user_id = %user.id, "Company registered");

    let token = state.jwt.issue(&user)?;
    let cookie = session_cookie(&state, &token);
    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie)],
        Json(SessionResponse {
            token,
            user,
            company: Some(company),
        }),
    ))
}

/// Exchange credentials for a token.
///
/// The token is returned in the body and also set as the session cookie used
/// by the dashboard pages.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = match user::get_user_by_email(state.db.pool(), &req.email).await {
        Ok(user) => user,
        Err(DatabaseError::NotFound { .. }) => return Err(invalid()),
        Err(e) => return Err(e.into()),
    };
    if !verify_password(&req.password, &user.password_hash) {
        return Err(invalid());
    }

    info!(user_id = %user.id, "User logged in");

    let token = state.jwt.issue(&user)?;
    let cookie = session_cookie(&state, &token);
    Ok((
        [(SET_COOKIE, cookie)],
        Json(SessionResponse {
            token,
            user,
            company: None,
        }),
    ))
}

/// Clear the session cookie.
pub async fn logout() -> impl IntoResponse {
    (
        [(SET_COOKIE, format!("{TOKEN_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0"))],
        Json(json!({ "message": "Logged out" })),
    )
}

/// Start a password reset.
///
/// Always answers 200 so the endpoint does not reveal which e-mails exist.
/// Reset tokens are not mailed; outside production the token is returned in
/// the body.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    let message = "If the account exists, a reset link has been issued";

    let user = match user::get_user_by_email(state.db.pool(), &req.email).await {
        Ok(user) => user,
        Err(DatabaseError::NotFound { .. }) => return Ok(Json(json!({ "message": message }))),
        Err(e) => return Err(e.into()),
    };

    let token = new_reset_token();
    user::set_reset_token(
        state.db.pool(),
        &user.id,
        &hash_reset_token(&token),
        RESET_TOKEN_TTL,
    )
    .await?;

    info!(user_id = %user.id, "Password reset requested");

    if state.app_env.is_production() {
        Ok(Json(json!({ "message": message })))
    } else {
        Ok(Json(json!({ "message": message, "reset_token": token })))
    }
}

/// Set a new password with a reset token. Tokens work once.
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    validate_password(&req.password).map_err(DatabaseError::from)?;

    let user = user::find_by_reset_token(state.db.pool(), &hash_reset_token(&req.token))
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid or expired reset token".to_string()))?;

    let password_hash = hash_password(&req.password)?;
    user::set_password_hash(state.db.pool(), &user.id, &password_hash).await?;

    info!(user_id = %user.id, "Password reset");

    Ok(Json(json!({ "message": "Password updated" })))
}

/// Confirm the token is valid and return the current profile.
pub async fn validate(auth: AuthUser) -> Json<serde_json::Value> {
    Json(json!({ "valid": true, "user": auth.0 }))
}

fn session_cookie(state: &AppState, token: &str) -> String {
    let mut cookie = format!(
        "{TOKEN_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        state.jwt.expiry_secs()
    );
    if state.app_env.is_production() {
        cookie.push_str("; Secure");
    }
    cookie
}
