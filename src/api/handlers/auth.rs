//! Login, registration and account management

use axum::{
    extract::{Query, Request},
    http::{header::AUTHORIZATION, StatusCode},
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde::Deserialize;
use stockroom_types::{
    ChangePasswordRequest, Credentials, DbUriResponse, MessageResponse, TokenResponse, UserInfo,
    UserSummary,
};
use tracing::{info, warn};

use crate::api::{ApiJson, AppState};
use crate::auth::{hash_password, verify_password, AuthContext};
use crate::database::DatabaseKey;
use crate::error::{AppError, AppResult};

fn trimmed(field: &Option<String>) -> &str {
    field.as_deref().map(str::trim).unwrap_or_default()
}

/// Trimmed username and password, 400 when either is blank
fn credentials(body: &Credentials) -> AppResult<(String, String)> {
    let username = trimmed(&body.username);
    let password = trimmed(&body.password);
    if username.is_empty() || password.is_empty() {
        return Err(AppError::bad_request("Username and password are required"));
    }
    Ok((username.to_string(), password.to_string()))
}

pub async fn login(
    Extension(state): Extension<AppState>,
    WithRejection(Json(body), _): ApiJson<Credentials>,
) -> AppResult<Json<TokenResponse>> {
    let (username, password) = credentials(&body)?;

    let users = state.databases.users().await?;
    let user = match users.find(&username).await? {
        Some(user) if verify_password(&password, &user.password_hash) => user,
        _ => {
            warn!("Failed login for {}", username);
            return Err(AppError::unauthorized("Invalid username or password"));
        }
    };

    if let Some(gate) = &state.login_gate {
        if !gate.try_login(&user.username).await {
            return Err(AppError::Locked(
                "Another user is logged in, you have been queued".to_string(),
            ));
        }
    }

    let db = DatabaseKey::for_username(&user.username);
    let access_token = state
        .jwt
        .issue(&user.username, &user.role, db)
        .map_err(|e| AppError::Internal(e.into()))?;
    info!("User {} logged in ({})", user.username, db.as_claim());
    Ok(Json(TokenResponse { access_token }))
}

pub async fn register(
    Extension(state): Extension<AppState>,
    WithRejection(Json(body), _): ApiJson<Credentials>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let (username, password) = credentials(&body)?;

    let main = state.databases.main().await?;
    let _guard = main.write_lock.lock().await;
    let users = main.users();
    if users.find(&username).await?.is_some() {
        return Err(AppError::conflict("Username already exists"));
    }
    let hash = hash_password(&password)?;
    users.insert(&username, &hash, "user", Utc::now()).await?;

    info!("Registered user {}", username);
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered".to_string(),
        }),
    ))
}

/// Echo the bearer token back to pages that only hold it in a header
pub async fn auto_auth(req: Request) -> AppResult<Json<TokenResponse>> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => {
            Ok(Json(TokenResponse {
                access_token: token.to_string(),
            }))
        }
        _ => Err(AppError::unauthorized("Malformed authorization header")),
    }
}

#[derive(Debug, Deserialize)]
pub struct DbUriQuery {
    #[serde(default)]
    username: Option<String>,
}

pub async fn get_db_uri(
    Extension(state): Extension<AppState>,
    Query(query): Query<DbUriQuery>,
) -> AppResult<Json<DbUriResponse>> {
    let username = query
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::bad_request("username is required"))?;
    let key = DatabaseKey::for_username(username);
    Ok(Json(DbUriResponse {
        db_uri: key.uri_in(&state.config.data_dir),
    }))
}

pub async fn userinfo(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> AppResult<Json<UserInfo>> {
    let user = state
        .databases
        .users()
        .await?
        .find(&auth.username)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(UserInfo {
        username: user.username,
    }))
}

pub async fn list_users(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> AppResult<Json<Vec<UserSummary>>> {
    let users = state.databases.users().await?;
    // Stored role, not the token claim
    let caller = users.find(&auth.username).await?;
    if !caller.is_some_and(|u| u.is_admin()) {
        return Err(AppError::forbidden("Admin access required"));
    }
    let list = users
        .list()
        .await?
        .into_iter()
        .map(|u| UserSummary {
            username: u.username,
            role: u.role,
        })
        .collect();
    Ok(Json(list))
}

pub async fn change_password(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    WithRejection(Json(body), _): ApiJson<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let target_name = trimmed(&body.username);
    let new_password = trimmed(&body.new_password);
    if target_name.is_empty() || new_password.is_empty() {
        return Err(AppError::bad_request("username and new_password are required"));
    }

    let users = state.databases.users().await?;
    let caller = users
        .find(&auth.username)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let target = users
        .find(target_name)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let own = caller.id == target.id;
    if !own && !caller.is_admin() {
        return Err(AppError::forbidden("You may only change your own password"));
    }
    if own {
        let old = trimmed(&body.old_password);
        if old.is_empty() || !verify_password(old, &target.password_hash) {
            return Err(AppError::bad_request("Old password is incorrect"));
        }
    }

    let hash = hash_password(new_password)?;
    users.set_password(target.id, &hash, Utc::now()).await?;
    info!("Password of {} changed by {}", target.username, caller.username);
    Ok(Json(MessageResponse {
        message: "Password updated".to_string(),
    }))
}

pub async fn logout(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Json<MessageResponse> {
    if let Some(gate) = &state.login_gate {
        gate.notify_logout(&auth.username).await;
    }
    info!("User {} logged out", auth.username);
    Json(MessageResponse {
        message: "Logged out".to_string(),
    })
}
