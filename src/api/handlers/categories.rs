//! Category endpoints

use axum::{extract::Path, http::StatusCode, Extension, Json};
use axum_extra::extract::WithRejection;
use stockroom_types::{CategoryCreated, CategoryDto, CategoryRequest, MessageResponse};
use tracing::info;

use crate::api::{ApiJson, AppState};
use crate::auth::AuthContext;
use crate::error::{AppError, AppResult};

fn required_name(body: &CategoryRequest) -> AppResult<String> {
    body.name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::bad_request("Category name is required"))
}

pub async fn list(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> AppResult<Json<Vec<CategoryDto>>> {
    let categories = state.department(&auth).await?.categories().list().await?;
    Ok(Json(
        categories
            .into_iter()
            .map(|c| CategoryDto {
                id: c.id,
                name: c.name,
            })
            .collect(),
    ))
}

pub async fn create(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    WithRejection(Json(body), _): ApiJson<CategoryRequest>,
) -> AppResult<(StatusCode, Json<CategoryCreated>)> {
    let name = required_name(&body)?;
    let db = state.department(&auth).await?;
    let repo = db.categories();

    let _guard = db.write_lock.lock().await;
    if repo.name_taken(&name, None).await? {
        return Err(AppError::conflict("Category already exists"));
    }
    let id = repo.insert(&name).await?;

    info!("Category {} created ({})", name, id);
    Ok((
        StatusCode::CREATED,
        Json(CategoryCreated {
            message: "Category created".to_string(),
            id,
        }),
    ))
}

pub async fn rename(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    WithRejection(Json(body), _): ApiJson<CategoryRequest>,
) -> AppResult<Json<MessageResponse>> {
    let name = required_name(&body)?;
    let db = state.department(&auth).await?;
    let repo = db.categories();

    let _guard = db.write_lock.lock().await;
    if repo.find(id).await?.is_none() {
        return Err(AppError::not_found("Category not found"));
    }
    if repo.name_taken(&name, Some(id)).await? {
        return Err(AppError::conflict("Category already exists"));
    }
    repo.rename(id, &name).await?;

    info!("Category {} renamed to {}", id, name);
    Ok(Json(MessageResponse {
        message: "Category updated".to_string(),
    }))
}

pub async fn remove(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    let db = state.department(&auth).await?;
    let repo = db.categories();

    let _guard = db.write_lock.lock().await;
    let category = repo
        .find(id)
        .await?
        .ok_or_else(|| AppError::not_found("Category not found"))?;
    if db.materials().category_in_use(&category.name).await? {
        return Err(AppError::bad_request(
            "Category is still used by materials and cannot be deleted",
        ));
    }
    repo.delete(id).await?;

    info!("Category {} deleted", category.name);
    Ok(Json(MessageResponse {
        message: "Category deleted".to_string(),
    }))
}
