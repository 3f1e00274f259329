//! The session store: token plus profile, persisted and validated.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::error::{Result, SessionError};
use crate::persistence::SessionPersistence;
use crate::types::{ForgotPasswordResponse, RegisterRequest, StoredSession, UserProfile};

/// One user's session.
///
/// Every handler that needs the session receives the store explicitly, so
/// several sessions can live side by side.
pub struct SessionStore {
    api: ApiClient,
    persistence: Arc<dyn SessionPersistence>,
    session: RwLock<Option<StoredSession>>,
}

impl SessionStore {
    /// Create an empty store. Call [`restore`](Self::restore) to load a saved session.
    pub fn new(api: ApiClient, persistence: Arc<dyn SessionPersistence>) -> Self {
        Self {
            api,
            persistence,
            session: RwLock::new(None),
        }
    }

    /// Load the persisted session, if any. Returns whether one was found.
    pub async fn restore(&self) -> Result<bool> {
        let loaded = self.persistence.load().await?;
        let found = loaded.is_some();
        *self.session.write().await = loaded;
        Ok(found)
    }

    pub async fn token(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.token.clone())
    }

    pub async fn user(&self) -> Option<UserProfile> {
        self.session.read().await.as_ref().map(|s| s.user.clone())
    }

    /// Whether a token is held. Says nothing about its validity.
    pub async fn has_token(&self) -> bool {
        self.session.read().await.is_some()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
        let session = self.api.login(email, password).await?;
        info!(user_id = %session.user.id, "Logged in");
        self.replace(session).await
    }

    /// Register a company and sign in as its first administrator.
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile> {
        let session = self.api.register(request).await?;
        info!(user_id = %session.user.id, "Registered");
        self.replace(session).await
    }

    /// Drop the token and profile, in memory and in persistence.
    pub async fn logout(&self) -> Result<()> {
        *self.session.write().await = None;
        self.persistence.clear().await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<ForgotPasswordResponse> {
        self.api.forgot_password(email).await
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> Result<()> {
        self.api.reset_password(token, password).await
    }

    /// Validate the held token and refresh the profile.
    ///
    /// A rejected token logs the session out before
    /// [`SessionError::SessionInvalid`] is returned. Network failures keep the
    /// session.
    pub async fn validate(&self) -> Result<UserProfile> {
        let token = self.token().await.ok_or(SessionError::NotAuthenticated)?;

        match self.api.validate(&token).await {
            Ok(user) => {
                let session = StoredSession { token, user };
                self.replace(session).await
            }
            Err(SessionError::SessionInvalid) => {
                warn!("Stored token rejected, logging out");
                self.logout().await?;
                Err(SessionError::SessionInvalid)
            }
            Err(e) => Err(e),
        }
    }

    async fn replace(&self, session: StoredSession) -> Result<UserProfile> {
        self.persistence.save(&session).await?;
        let user = session.user.clone();
        *self.session.write().await = Some(session);
        Ok(user)
    }
}
