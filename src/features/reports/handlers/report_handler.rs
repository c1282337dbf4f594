use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::Result;
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::reports::dtos::{
    CreateReportDto, ListReportsQuery, ReportListResponseDto, ReportResponseDto,
    UpdateReportStatusDto,
};
use crate::features::reports::handlers::ReportState;
use crate::shared::types::ErrorResponse;

/// Submit a new incident report
#[utoipa::path(
    post,
    path = "/api/v1/reports",
    request_body = CreateReportDto,
    responses(
        (status = 201, description = "Report created", body = ReportResponseDto),
        (status = 400, description = "Malformed JSON", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn create_report(
    State(state): State<ReportState>,
    AppJson(dto): AppJson<CreateReportDto>,
) -> Result<(StatusCode, Json<ReportResponseDto>)> {
    dto.validate()?;

    let report = state.report_service.create(dto).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// List reports, newest first
#[utoipa::path(
    get,
    path = "/api/v1/reports",
    params(ListReportsQuery),
    responses(
        (status = 200, description = "Page of reports", body = ReportListResponseDto),
        (status = 422, description = "Invalid paging or filter", body = ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn list_reports(
    State(state): State<ReportState>,
    AppQuery(query): AppQuery<ListReportsQuery>,
) -> Result<Json<ReportListResponseDto>> {
    query.validate()?;

    let page = state.report_service.list(&query).await?;
    Ok(Json(page))
}

/// Get report by ID
#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    responses(
        (status = 200, description = "Report found", body = ReportResponseDto),
        (status = 404, description = "Report not found", body = ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn get_report(
    State(state): State<ReportState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportResponseDto>> {
    let report = state.report_service.get(id).await?;
    Ok(Json(report))
}

/// Update report status
#[utoipa::path(
    put,
    path = "/api/v1/reports/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    request_body = UpdateReportStatusDto,
    responses(
        (status = 200, description = "Status updated", body = ReportResponseDto),
        (status = 404, description = "Report not found", body = ErrorResponse),
        (status = 422, description = "Unknown status", body = ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn update_report_status(
    State(state): State<ReportState>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateReportStatusDto>,
) -> Result<Json<ReportResponseDto>> {
    dto.validate()?;

    let report = state.report_service.update_status(id, dto).await?;
    Ok(Json(report))
}

/// Delete a report permanently
#[utoipa::path(
    delete,
    path = "/api/v1/reports/{id}",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    responses(
        (status = 204, description = "Report deleted"),
        (status = 404, description = "Report not found", body = ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn delete_report(
    State(state): State<ReportState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.report_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
