//! Password and reset-token hashing.
//!
//! Passwords use argon2id with default parameters. Reset tokens are random
//! and only their SHA-256 digest is stored.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::ApiError;

const RESET_TOKEN_LEN: usize = 48;

/// Hash a password, returning the PHC string (salt and parameters included).
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored PHC hash.
///
/// An unparseable hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is invalid: {e}");
            false
        }
    }
}

/// Generate a password-reset token to hand to the user.
pub fn new_reset_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Digest stored in place of a reset token.
pub fn hash_reset_token(token: &str) -> String {
    let digest = Sha256::digest(token.trim().as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct-horse-42").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct-horse-42", &hash));
        assert!(!verify_password("wrong-password-1", &hash));
    }

    #[test]
    fn test_invalid_hash_does_not_verify() {
        assert!(!verify_password("password1", "not-a-valid-hash"));
    }

    #[test]
    fn test_reset_tokens() {
        let token = new_reset_token();
        assert_eq!(token.len(), RESET_TOKEN_LEN);
        assert_ne!(token, new_reset_token());

        let digest = hash_reset_token(&token);
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_reset_token(&format!(" {token} ")));
    }
}
