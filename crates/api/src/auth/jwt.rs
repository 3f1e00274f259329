//! HS256 bearer tokens.

use std::time::{SystemTime, UNIX_EPOCH};

use database::{Role, User};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Payload stored in a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub company_id: String,
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Signing and verification keys.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_secs: u64,
}

impl JwtKeys {
    pub fn new(secret: &str, expiry_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_secs,
        }
    }

    /// Token lifetime in seconds.
    pub fn expiry_secs(&self) -> u64 {
        self.expiry_secs
    }

    /// Issue a token for a user.
    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ApiError::Internal(format!("System time error: {}", e)))?
            .as_secs();

        let claims = Claims {
            sub: user.id.clone(),
            company_id: user.company_id.clone(),
            role: user.role,
            iat: now,
            exp: now + self.expiry_secs,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Verify signature and expiry and return the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token rejected: {}", e);
                ApiError::Unauthorized("Invalid or expired token".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::Profession;

    fn user() -> User {
        User {
            id: "user-1".to_string(),
            company_id: "company-1".to_string(),
            name: "Dr. Lima".to_string(),
            email: "lima@clinic.com".to_string(),
            password_hash: String::new(),
            role: Role::Admin,
            profession: Profession::Physician,
            registration_number: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = JwtKeys::new("a-test-secret-that-is-long-enough-123", 3600);
        let token = keys.issue(&user()).unwrap();

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.company_id, "company-1");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let token = JwtKeys::new("first-secret-first-secret-first-secret", 3600)
            .issue(&user())
            .unwrap();
        let other = JwtKeys::new("second-secret-second-secret-second-se", 3600);

        assert!(matches!(other.verify(&token), Err(ApiError::Unauthorized(_))));
        assert!(other.verify("garbage").is_err());
    }
}
