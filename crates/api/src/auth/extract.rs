//! Authenticated-user extractor.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use database::{DatabaseError, User};

use crate::error::ApiError;
use crate::state::AppState;

/// Cookie carrying the session token for server-rendered pages.
pub const TOKEN_COOKIE: &str = "token";

/// The user behind a request, loaded fresh from the database.
///
/// The token is read from `Authorization: Bearer` first, then from the
/// `token` cookie.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn company_id(&self) -> &str {
        &self.0.company_id
    }

    pub fn is_admin(&self) -> bool {
        self.0.is_admin()
    }

    /// Fail with 403 unless the user is an admin.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Administrator role required".to_string()))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .or_else(|| cookie_token(&parts.headers))
            .ok_or_else(|| ApiError::Unauthorized("Missing token".to_string()))?;

        let claims = state.jwt.verify(&token)?;

        let user = match database::user::get_user_by_id(state.db.pool(), &claims.sub).await {
            Ok(user) => user,
            Err(DatabaseError::NotFound { .. }) => {
                return Err(ApiError::Unauthorized("Account no longer exists".to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        if user.company_id != claims.company_id {
            return Err(ApiError::Unauthorized("Invalid or expired token".to_string()));
        }

        Ok(AuthUser(user))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_token_sources() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());
        assert!(cookie_token(&headers).is_none());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert!(bearer_token(&headers).is_none());

        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; token=jwt.value"));
        assert_eq!(cookie_token(&headers).as_deref(), Some("jwt.value"));
    }
}
