use axum::{Extension, Json};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use stockroom_types::FontResponse;
use tracing::error;

use crate::api::AppState;
use crate::error::{AppError, AppResult};

/// The report font, base64 encoded for client-side PDF rendering
pub async fn noto_sans_tc(Extension(state): Extension<AppState>) -> AppResult<Json<FontResponse>> {
    let path = &state.config.font_path;
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        error!("Cannot read font {}: {}", path.display(), e);
        AppError::Internal(anyhow::anyhow!("font file unavailable"))
    })?;
    Ok(Json(FontResponse {
        font_base64: STANDARD.encode(bytes),
    }))
}
