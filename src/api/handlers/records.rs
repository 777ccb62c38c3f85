//! Stock movement endpoints

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use stockroom_types::{
    CategoryFilter, InRecordRow, ManualRecordRequest, ManualRecordResponse, MessageResponse,
    OutRecordRow, QuantityEcho, RecordEcho, RecordKind, RecordRequest, RecordResponse,
};

use super::category_filter;
use crate::api::{ApiJson, AppState};
use crate::auth::AuthContext;
use crate::database::record_repository::RecordFilter;
use crate::error::{AppError, AppResult};
use crate::models::{NewInRecord, NewOutRecord};
use crate::services::inventory_service::{parse_quantity, Movement, MovementOutcome};
use crate::services::InventoryService;

/// Scan-page movement, also mounted as `/inventory/record`
pub async fn scan_record(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    WithRejection(Json(body), _): ApiJson<RecordRequest>,
) -> AppResult<(StatusCode, Json<RecordResponse>)> {
    let service = InventoryService::new(state.department(&auth).await?);
    let outcome = service.record_scan(&body, &auth.username).await?;
    Ok((
        StatusCode::CREATED,
        Json(RecordResponse {
            success: true,
            record: RecordEcho {
                kind: outcome.kind,
                quantity: outcome.quantity,
            },
            material: outcome.material,
        }),
    ))
}

pub async fn list_in(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<CategoryFilter>,
) -> AppResult<Json<Vec<InRecordRow>>> {
    let filter = RecordFilter {
        category_loose: category_filter(filter.category.as_deref()),
        ..Default::default()
    };
    let rows = state.department(&auth).await?.records().list_in(&filter).await?;
    Ok(Json(rows.into_iter().map(InRecordRow::from).collect()))
}

pub async fn list_out(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<CategoryFilter>,
) -> AppResult<Json<Vec<OutRecordRow>>> {
    let filter = RecordFilter {
        category_loose: category_filter(filter.category.as_deref()),
        ..Default::default()
    };
    let rows = state.department(&auth).await?.records().list_out(&filter).await?;
    Ok(Json(rows.into_iter().map(OutRecordRow::from).collect()))
}

fn manual_response(kind: RecordKind, outcome: MovementOutcome) -> ManualRecordResponse {
    let message = match kind {
        RecordKind::In => "Inbound record added",
        RecordKind::Out => "Outbound record added",
    };
    ManualRecordResponse {
        message: message.to_string(),
        stock: outcome.stock,
        record: QuantityEcho {
            quantity: outcome.quantity,
        },
        material: outcome.material,
    }
}

fn manual_target(body: &ManualRecordRequest) -> AppResult<(String, i64)> {
    let item_id = body
        .material_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::bad_request("material_id is required"))?;
    let quantity = body
        .quantity
        .as_ref()
        .filter(|q| !q.is_null())
        .ok_or_else(|| AppError::bad_request("quantity is required"))?;
    Ok((item_id.to_string(), parse_quantity(quantity)?))
}

pub async fn create_in(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    WithRejection(Json(body), _): ApiJson<ManualRecordRequest>,
) -> AppResult<(StatusCode, Json<ManualRecordResponse>)> {
    let (item_id, quantity) = manual_target(&body)?;
    let movement = Movement::In(NewInRecord {
        quantity,
        source: body.source,
        handler: body.handler,
    });
    let service = InventoryService::new(state.department(&auth).await?);
    let outcome = service.record_manual(&item_id, movement).await?;
    Ok((StatusCode::CREATED, Json(manual_response(RecordKind::In, outcome))))
}

pub async fn create_out(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    WithRejection(Json(body), _): ApiJson<ManualRecordRequest>,
) -> AppResult<(StatusCode, Json<ManualRecordResponse>)> {
    let (item_id, quantity) = manual_target(&body)?;
    let movement = Movement::Out(NewOutRecord {
        quantity,
        user: body.user,
        department: body.department,
        purpose: body.purpose,
        source: body.source,
        handler: body.handler,
    });
    let service = InventoryService::new(state.department(&auth).await?);
    let outcome = service.record_manual(&item_id, movement).await?;
    Ok((StatusCode::CREATED, Json(manual_response(RecordKind::Out, outcome))))
}

async fn delete_record(
    state: &AppState,
    auth: &AuthContext,
    kind: RecordKind,
    id: i64,
) -> AppResult<Json<MessageResponse>> {
    let service = InventoryService::new(state.department(auth).await?);
    service.delete_record(kind, id).await?;
    Ok(Json(MessageResponse {
        message: "Record deleted".to_string(),
    }))
}

pub async fn delete_in(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    delete_record(&state, &auth, RecordKind::In, id).await
}

pub async fn delete_out(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    delete_record(&state, &auth, RecordKind::Out, id).await
}
