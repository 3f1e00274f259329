//! Thin HTTP client for the account endpoints.

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::error::{Result, SessionError};
use crate::types::{
    ErrorBody, ForgotPasswordResponse, LoginRequest, RegisterRequest, SessionResponse,
    StoredSession, UserProfile, ValidateResponse,
};

/// Client for the account endpoints of the plans API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| SessionError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<StoredSession> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        let body: SessionResponse = read_json(response).await?;
        Ok(StoredSession {
            token: body.token,
            user: body.user,
        })
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<StoredSession> {
        let response = self
            .http
            .post(self.url("/api/auth/register"))
            .json(request)
            .send()
            .await?;

        let body: SessionResponse = read_json(response).await?;
        Ok(StoredSession {
            token: body.token,
            user: body.user,
        })
    }

    pub async fn forgot_password(&self, email: &str) -> Result<ForgotPasswordResponse> {
        let response = self
            .http
            .post(self.url("/api/auth/forgot-password"))
            .json(&json!({ "email": email }))
            .send()
            .await?;

        read_json(response).await
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> Result<()> {
        let response = self
            .http
            .post(self.url("/api/auth/reset-password"))
            .json(&json!({ "token": token, "password": password }))
            .send()
            .await?;

        let _: serde_json::Value = read_json(response).await?;
        Ok(())
    }

    /// Check a token against a protected endpoint.
    ///
    /// A 401 maps to [`SessionError::SessionInvalid`]; network trouble does not.
    pub async fn validate(&self, token: &str) -> Result<UserProfile> {
        let response = self
            .http
            .get(self.url("/api/auth/validate"))
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Token rejected by server");
            return Err(SessionError::SessionInvalid);
        }

        let body: ValidateResponse = read_json(response).await?;
        Ok(body.user)
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();

        // The API answers `{"error": "..."}`; fall back to the raw text.
        let message = match serde_json::from_str::<ErrorBody>(&error_text) {
            Ok(body) => body.error,
            Err(_) => error_text,
        };

        return Err(SessionError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| SessionError::Decode(e.to_string()))
}
