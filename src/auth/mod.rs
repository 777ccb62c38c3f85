//! Authentication
//!
//! Password hashing, JWT tokens and, with the `server` feature, the axum
//! middleware that guards every protected `/api` route.

pub mod jwt;
pub mod password;

#[cfg(feature = "server")]
pub mod middleware;

pub use jwt::{Claims, JwtConfig};
pub use password::{hash_password, verify_password};

use crate::database::DatabaseKey;

/// The authenticated caller, inserted into request extensions by the middleware
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub username: String,
    pub role: String,
    pub db: DatabaseKey,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}
