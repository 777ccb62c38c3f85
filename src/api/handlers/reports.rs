//! Report preview (PDF) and export (XLSX)

use axum::{
    extract::Query,
    http::header,
    response::IntoResponse,
    Extension,
};
use stockroom_types::ReportQuery;
use tracing::info;

use super::file_timestamp;
use crate::api::AppState;
use crate::auth::AuthContext;
use crate::error::{AppError, AppResult};
use crate::export::{report_pdf, report_xlsx};
use crate::services::{build_report, Report, ReportParams};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

async fn load_report(state: &AppState, auth: &AuthContext, query: &ReportQuery) -> AppResult<Report> {
    let params = ReportParams::from_query(query, &state.config.school_dept)?;
    let db = state.department(auth).await?;
    build_report(&db, &params).await
}

/// Run a renderer off the async runtime
async fn render<F>(report: Report, f: F) -> AppResult<Vec<u8>>
where
    F: FnOnce(&Report) -> anyhow::Result<Vec<u8>> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&report))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Export(e.to_string()))
}

pub async fn preview_pdf(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ReportQuery>,
) -> AppResult<impl IntoResponse> {
    let report = load_report(&state, &auth, &query).await?;
    let disposition = format!("inline; filename=\"{}.pdf\"", report.file_stem());
    let rows = report.rows.len();
    let font_path = state.config.font_path.clone();
    let pdf = render(report, move |r| report_pdf(r, Some(&font_path))).await?;

    info!(
        "{} previewed {} ({} rows)",
        auth.username,
        query.report_type.as_str(),
        rows
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    ))
}

pub async fn export_excel(
    Extension(state): Extension<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ReportQuery>,
) -> AppResult<impl IntoResponse> {
    let report = load_report(&state, &auth, &query).await?;
    let filename = format!(
        "{}_report_{}.xlsx",
        query.report_type.as_str(),
        file_timestamp()
    );
    let xlsx = render(report, report_xlsx).await?;

    info!("{} exported {}", auth.username, filename);
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        xlsx,
    ))
}
