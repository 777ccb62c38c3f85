//! Database backup download

use axum::{http::header, response::IntoResponse, Extension};
use tracing::{info, warn};

use super::file_timestamp;
use crate::api::AppState;
use crate::auth::AuthContext;
use crate::error::{AppError, AppResult};

/// Consistent copy of the caller's database via `VACUUM INTO`
pub async fn backup_database(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> AppResult<impl IntoResponse> {
    let data_dir = state.databases.data_dir();
    let source = auth.db.path_in(data_dir);
    if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
        return Err(AppError::not_found("Database file not found"));
    }

    let filename = format!("{}_backup_{}.db", auth.username, file_timestamp());
    let temp = data_dir.join(format!(".{}.tmp", filename));
    let db = state.department(&auth).await?;

    // Path inlined as a quoted SQL literal
    let target = temp.to_string_lossy().replace('\'', "''");
    sqlx::query(&format!("VACUUM INTO '{}'", target))
        .execute(&db.pool)
        .await?;

    let bytes = tokio::fs::read(&temp).await;
    if let Err(e) = tokio::fs::remove_file(&temp).await {
        warn!("Could not remove backup temp file {}: {}", temp.display(), e);
    }
    let bytes = bytes?;

    info!("{} downloaded backup {} ({} bytes)", auth.username, filename, bytes.len());
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    ))
}
