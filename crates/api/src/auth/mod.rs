//! Authentication: password hashing, bearer tokens and the request extractor.

mod extract;
mod jwt;
mod password;

pub use extract::{AuthUser, TOKEN_COOKIE};
pub use jwt::{Claims, JwtKeys};
pub use password::{hash_password, hash_reset_token, new_reset_token, verify_password};
