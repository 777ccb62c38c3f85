//! JWT authentication middleware
//!
//! The token is read from `Authorization: Bearer <token>` or, for links
//! opened directly in a browser (report previews, backups), from `?token=`.

use axum::{
    extract::Request,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
    Extension,
};

use super::AuthContext;
use crate::api::AppState;
use crate::database::DatabaseKey;
use crate::error::AppError;

/// Bearer token from the `Authorization` header, if well formed
pub fn bearer_token(req: &Request) -> Option<String> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn query_token(req: &Request) -> Option<String> {
    let query = req.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
}

pub async fn jwt_auth(
    Extension(state): Extension<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req)
        .or_else(|| query_token(&req))
        .ok_or_else(|| AppError::unauthorized("Missing authorization token"))?;

    let claims = state.jwt.verify(&token).map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        AppError::unauthorized("Invalid or expired token")
    })?;

    let db = claims
        .db
        .as_deref()
        .ok_or_else(|| AppError::bad_request("Token does not name a database"))?;
    let db = DatabaseKey::from_claim(db)
        .ok_or_else(|| AppError::bad_request(format!("Unknown database in token: {}", db)))?;

    if let Some(gate) = &state.login_gate {
        gate.touch(&claims.sub).await;
    }

    req.extensions_mut().insert(AuthContext {
        username: claims.sub,
        role: claims.role,
        db,
    });
    Ok(next.run(req).await)
}
