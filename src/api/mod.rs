//! REST API
//!
//! `router::build_router` assembles the public and protected `/api` routes,
//! the static pages and the shared middleware. Handlers receive [`AppState`]
//! and, on protected routes, the caller's [`crate::auth::AuthContext`]
//! through request extensions.

pub mod handlers;
pub mod router;

use std::sync::Arc;

use axum::Json;
use axum_extra::extract::WithRejection;

use crate::auth::{AuthContext, JwtConfig};
use crate::config::ServerConfig;
use crate::database::{DatabaseRegistry, DepartmentDb};
use crate::error::{AppError, AppResult};
use crate::portal::Roster;
use crate::services::LoginGate;

pub use router::build_router;

/// JSON request body whose rejections answer as `{"error"}` with 400
pub type ApiJson<T> = WithRejection<Json<T>, AppError>;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub databases: Arc<DatabaseRegistry>,
    pub jwt: JwtConfig,
    /// Present when exclusive login is enabled
    pub login_gate: Option<Arc<LoginGate>>,
    pub roster: Arc<Roster>,
}

impl AppState {
    pub fn new(config: ServerConfig, databases: DatabaseRegistry, roster: Roster) -> Self {
        let jwt = JwtConfig::new(config.jwt_secret.as_bytes(), config.token_ttl);
        let login_gate = config
            .exclusive_login
            .then(|| Arc::new(LoginGate::new(config.idle_logout)));
        Self {
            config: Arc::new(config),
            databases: Arc::new(databases),
            jwt,
            login_gate,
            roster: Arc::new(roster),
        }
    }

    /// The department database the caller works against
    pub async fn department(&self, auth: &AuthContext) -> AppResult<DepartmentDb> {
        Ok(self.databases.get(auth.db).await?)
    }
}
