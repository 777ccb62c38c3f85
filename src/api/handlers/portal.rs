use axum::{extract::Query, Extension, Json};
use stockroom_types::{PortalAccount, RoleFilter};

use crate::api::AppState;
use crate::error::{AppError, AppResult};

/// Portal roster, optionally narrowed to one role
pub async fn accounts(
    Extension(state): Extension<AppState>,
    Query(filter): Query<RoleFilter>,
) -> AppResult<Json<Vec<PortalAccount>>> {
    let accounts = state
        .roster
        .filter(filter.role.as_deref())
        .map_err(|e| AppError::bad_request(e.to_string()))?;
    Ok(Json(accounts.into_iter().cloned().collect()))
}
