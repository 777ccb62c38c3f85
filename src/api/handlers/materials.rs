//! Material catalog endpoints

use axum::{
    extract::{Path, Query},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use stockroom_types::{
    CategoryFilter, MaterialCreated, MaterialDto, MaterialPatch, MaterialSummary, MessageResponse,
    NewMaterialRequest,
};
use tracing::info;

use super::category_filter;
use crate::api::{ApiJson, AppState};
use crate::auth::AuthContext;
use crate::error::{AppError, AppResult};
use crate::export::{barcode_sheet as render_sheet, BarcodeLabel};
use crate::services::InventoryService;

pub async fn list(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<CategoryFilter>,
) -> AppResult<Json<Vec<MaterialDto>>> {
    let db = state.department(&auth).await?;
    let materials = db
        .materials()
        .list(category_filter(filter.category.as_deref()))
        .await?;
    Ok(Json(materials.into_iter().map(MaterialDto::from).collect()))
}

pub async fn create(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    WithRejection(Json(body), _): ApiJson<NewMaterialRequest>,
) -> AppResult<(StatusCode, Json<MaterialCreated>)> {
    let service = InventoryService::new(state.department(&auth).await?);
    let material = service.create_material(&body).await?;
    Ok((
        StatusCode::CREATED,
        Json(MaterialCreated {
            message: "Material created".to_string(),
            barcode: material.barcode.clone().unwrap_or_default(),
            item_id: material.item_id,
        }),
    ))
}

pub async fn update(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(item_id): Path<String>,
    WithRejection(Json(patch), _): ApiJson<MaterialPatch>,
) -> AppResult<Json<MaterialDto>> {
    let service = InventoryService::new(state.department(&auth).await?);
    let material = service.update_material(&item_id, &patch).await?;
    Ok(Json(material.into()))
}

pub async fn remove(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(item_id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let service = InventoryService::new(state.department(&auth).await?);
    service.delete_material(&item_id).await?;
    Ok(Json(MessageResponse {
        message: "Material deleted".to_string(),
    }))
}

pub async fn by_barcode(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(barcode): Path<String>,
) -> AppResult<Json<MaterialDto>> {
    let barcode = barcode.trim();
    if barcode.is_empty() {
        return Err(AppError::bad_request("Barcode is required"));
    }
    let material = state
        .department(&auth)
        .await?
        .materials()
        .find_by_barcode(barcode)
        .await?
        .ok_or_else(|| AppError::not_found("Material not found"))?;
    Ok(Json(material.into()))
}

pub async fn summary(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> AppResult<Json<MaterialSummary>> {
    let (total, low_stock) = state.department(&auth).await?.materials().summary().await?;
    Ok(Json(MaterialSummary { total, low_stock }))
}

/// Printable Code128 sheet of the caller's materials
pub async fn barcode_sheet(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<CategoryFilter>,
) -> AppResult<impl IntoResponse> {
    let materials = state
        .department(&auth)
        .await?
        .materials()
        .list(category_filter(filter.category.as_deref()))
        .await?;
    let labels: Vec<BarcodeLabel> = materials.iter().map(BarcodeLabel::from).collect();
    if labels.is_empty() {
        return Err(AppError::not_found("No materials to generate barcodes for"));
    }

    let font_path = state.config.font_path.clone();
    let sheet = tokio::task::spawn_blocking(move || render_sheet(&labels, Some(&font_path)))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Export(e.to_string()))?;
    if sheet.generated == 0 {
        return Err(AppError::not_found("No material has an encodable barcode"));
    }

    info!(
        "Barcode sheet for {}: {} generated, {} skipped",
        auth.username, sheet.generated, sheet.skipped
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "inline; filename=\"barcodes.pdf\"".to_string(),
            ),
        ],
        sheet.pdf,
    ))
}
