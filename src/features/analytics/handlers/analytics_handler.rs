use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppQuery;
use crate::features::analytics::dtos::{DashboardStats, ExportFormat, ExportQuery};
use crate::features::analytics::models::FactReport;
use crate::features::analytics::services::AnalyticsService;
use crate::shared::types::ErrorResponse;

/// Dashboard KPIs
#[utoipa::path(
    get,
    path = "/api/v1/analytics/dashboard",
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStats),
        (status = 500, description = "Analytics store unavailable", body = ErrorResponse)
    ),
    tag = "analytics"
)]
pub async fn get_dashboard(
    State(service): State<Arc<AnalyticsService>>,
) -> Result<Json<DashboardStats>> {
    let stats = service.dashboard_stats().await?;
    Ok(Json(stats))
}

/// Export recent analytics rows as CSV or JSON
#[utoipa::path(
    get,
    path = "/api/v1/analytics/export",
    params(ExportQuery),
    responses(
        (status = 200, description = "CSV file (default) or JSON array", content(
            (String = "text/csv"),
            (Vec<FactReport> = "application/json")
        )),
        (status = 422, description = "Unknown format", body = ErrorResponse)
    ),
    tag = "analytics"
)]
pub async fn export_reports(
    State(service): State<Arc<AnalyticsService>>,
    AppQuery(query): AppQuery<ExportQuery>,
) -> Result<Response> {
    let rows = service.export_recent().await?;

    match query.format {
        ExportFormat::Json => Ok(Json(rows).into_response()),
        ExportFormat::Csv => {
            let body = to_csv(&rows)?;
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                    (
                        header::CONTENT_DISPOSITION,
                        "attachment; filename=\"reports_export.csv\"",
                    ),
                ],
                body,
            )
                .into_response())
        }
    }
}

fn to_csv(rows: &[FactReport]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer
        .write_record(FactReport::CSV_HEADERS)
        .map_err(|e| AppError::Internal(format!("Failed to write CSV header: {}", e)))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::Internal(format!("Failed to write CSV row: {}", e)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to flush CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV is not UTF-8: {}", e)))
}
