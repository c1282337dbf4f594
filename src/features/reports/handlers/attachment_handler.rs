use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    http::{header, StatusCode},
    Json,
};
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppQuery;
use crate::features::reports::dtos::{
    AttachmentResponseDto, DownloadUrlQuery, DownloadUrlResponseDto, UploadAttachmentsDto,
    UploadedFile,
};
use crate::features::reports::handlers::ReportState;
use crate::modules::storage::BlobMetadata;
use crate::shared::types::ErrorResponse;

/// Upload files to a report
///
/// Accepts multipart/form-data with one or more `files` parts (`file` also works).
#[utoipa::path(
    post,
    path = "/api/v1/reports/{id}/attachments",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    request_body(
        content = UploadAttachmentsDto,
        content_type = "multipart/form-data",
    ),
    responses(
        (status = 201, description = "Attachments created", body = Vec<AttachmentResponseDto>),
        (status = 404, description = "Report not found", body = ErrorResponse),
        (status = 422, description = "Missing, oversized or mistyped file", body = ErrorResponse),
        (status = 502, description = "Blob storage unavailable", body = ErrorResponse)
    ),
    tag = "attachments"
)]
pub async fn upload_attachments(
    State(state): State<ReportState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<AttachmentResponseDto>>)> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name != "files" && field_name != "file" {
            debug!("Ignoring unknown field: {}", field_name);
            continue;
        }

        let content_type = part_content_type(&field);
        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unnamed".to_string());
        let data = field.bytes().await.map_err(|e| {
            debug!("Failed to read file bytes: {}", e);
            AppError::BadRequest(format!("Failed to read file data: {}", e))
        })?;

        files.push(UploadedFile {
            filename,
            content_type,
            data: data.to_vec(),
        });
    }

    let created = state.attachment_service.upload(id, files).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Raw part `Content-Type`, so malformed values reach validation instead of being dropped
fn part_content_type(field: &Field<'_>) -> String {
    field
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// List a report's attachments
#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}/attachments",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    responses(
        (status = 200, description = "Attachments", body = Vec<AttachmentResponseDto>),
        (status = 404, description = "Report not found", body = ErrorResponse)
    ),
    tag = "attachments"
)]
pub async fn list_attachments(
    State(state): State<ReportState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AttachmentResponseDto>>> {
    let attachments = state.attachment_service.list(id).await?;
    Ok(Json(attachments))
}

/// Get a time-limited download link
#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}/attachments/{attachment_id}/download",
    params(
        ("id" = Uuid, Path, description = "Report ID"),
        ("attachment_id" = Uuid, Path, description = "Attachment ID"),
        DownloadUrlQuery
    ),
    responses(
        (status = 200, description = "Signed URL", body = DownloadUrlResponseDto),
        (status = 404, description = "Attachment not found", body = ErrorResponse),
        (status = 422, description = "Expiry out of range", body = ErrorResponse),
        (status = 502, description = "Signing unavailable", body = ErrorResponse)
    ),
    tag = "attachments"
)]
pub async fn get_download_url(
    State(state): State<ReportState>,
    Path((id, attachment_id)): Path<(Uuid, Uuid)>,
    AppQuery(query): AppQuery<DownloadUrlQuery>,
) -> Result<Json<DownloadUrlResponseDto>> {
    query.validate()?;

    let link = state
        .attachment_service
        .download_url(id, attachment_id, query.expiry_hours)
        .await?;
    Ok(Json(link))
}

/// Get stored file properties
#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}/attachments/{attachment_id}/metadata",
    params(
        ("id" = Uuid, Path, description = "Report ID"),
        ("attachment_id" = Uuid, Path, description = "Attachment ID")
    ),
    responses(
        (status = 200, description = "Blob properties", body = BlobMetadata),
        (status = 404, description = "Attachment not found", body = ErrorResponse),
        (status = 502, description = "Blob storage unavailable", body = ErrorResponse)
    ),
    tag = "attachments"
)]
pub async fn get_attachment_metadata(
    State(state): State<ReportState>,
    Path((id, attachment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<BlobMetadata>> {
    let metadata = state.attachment_service.metadata(id, attachment_id).await?;
    Ok(Json(metadata))
}

/// Delete one attachment
#[utoipa::path(
    delete,
    path = "/api/v1/reports/{id}/attachments/{attachment_id}",
    params(
        ("id" = Uuid, Path, description = "Report ID"),
        ("attachment_id" = Uuid, Path, description = "Attachment ID")
    ),
    responses(
        (status = 204, description = "Attachment deleted"),
        (status = 404, description = "Attachment not found", body = ErrorResponse)
    ),
    tag = "attachments"
)]
pub async fn delete_attachment(
    State(state): State<ReportState>,
    Path((id, attachment_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    state.attachment_service.delete(id, attachment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::features::reports::routes;
    use crate::features::reports::services::{AttachmentService, ReportService};
    use crate::shared::test_helpers::{
        create_report_dto, FakeBlobStorage, InMemoryAnalyticsRepository, InMemoryReportRepository,
    };
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use serde_json::Value;
    use std::sync::Arc;
    use uuid::Uuid;

    async fn setup() -> (TestServer, Uuid) {
        let reports = Arc::new(InMemoryReportRepository::default());
        let storage = Arc::new(FakeBlobStorage::default());
        let report_service = Arc::new(ReportService::new(
            reports.clone(),
            Arc::new(InMemoryAnalyticsRepository::default()),
            storage.clone(),
        ));
        let report = report_service.create(create_report_dto()).await.unwrap();
        let attachment_service = Arc::new(AttachmentService::new(reports, storage));

        let server = TestServer::new(routes::routes(report_service, attachment_service)).unwrap();
        (server, report.report_id)
    }

    fn file(name: &str, mime: &str, data: &'static [u8]) -> Part {
        Part::bytes(data).file_name(name).mime_type(mime)
    }

    const BOUNDARY: &str = "civic-report-boundary";

    /// Hand-built body, for part headers a `MultipartForm` refuses to produce
    fn raw_multipart(filename: &str, content_type: &str, data: &str) -> String {
        format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"files\"; filename=\"{f}\"\r\n\
             Content-Type: {c}\r\n\
             \r\n\
             {d}\r\n\
             --{b}--\r\n",
            b = BOUNDARY,
            f = filename,
            c = content_type,
            d = data
        )
    }

    #[tokio::test]
    async fn test_upload_list_and_download() {
        let (server, report_id) = setup().await;
        let base = format!("/api/v1/reports/{}/attachments", report_id);

        let form = MultipartForm::new()
            .add_part("files", file("test.jpg", "image/jpeg", b"fake image content"))
            .add_part("file", file("memo.pdf", "application/pdf", b"%PDF-1.4"));
        let response = server.post(&base).multipart(form).await;
        response.assert_status(StatusCode::CREATED);
        let created: Vec<Value> = response.json();
        assert_eq!(created.len(), 2);
        assert_eq!(created[0]["fileType"], "image");
        assert_eq!(created[1]["fileType"], "document");

        let listed: Vec<Value> = server.get(&base).await.json();
        assert_eq!(listed.len(), 3);

        let attachment_id = created[0]["attachmentId"].as_str().unwrap();
        let response = server
            .get(&format!("{}/{}/download", base, attachment_id))
            .add_query_param("expiryHours", 24)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert!(body["url"].as_str().unwrap().ends_with("expiry=24"));
        assert!(body["expiresAt"].is_string());

        server
            .get(&format!("{}/{}/download", base, attachment_id))
            .add_query_param("expiryHours", 169)
            .expect_failure()
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let metadata: Value = server
            .get(&format!("{}/{}/metadata", base, attachment_id))
            .await
            .json();
        assert_eq!(metadata["size"], 18);
        assert_eq!(metadata["contentType"], "image/jpeg");
    }

    #[tokio::test]
    async fn test_upload_rejects_missing_and_invalid_files() {
        let (server, report_id) = setup().await;
        let base = format!("/api/v1/reports/{}/attachments", report_id);

        let form = MultipartForm::new().add_text("note", "no files here");
        server
            .post(&base)
            .multipart(form)
            .expect_failure()
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let response = server
            .post(&base)
            .content_type(&format!("multipart/form-data; boundary={}", BOUNDARY))
            .bytes(raw_multipart("x", "bad_mime_type", "data").into_bytes().into())
            .expect_failure()
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json();
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("bad_mime_type"));

        let form = MultipartForm::new().add_part("files", file("a.png", "image/png", b"png"));
        server
            .post(&format!("/api/v1/reports/{}/attachments", Uuid::now_v7()))
            .multipart(form)
            .expect_failure()
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_raw_part_content_type_is_kept() {
        let (server, report_id) = setup().await;

        let response = server
            .post(&format!("/api/v1/reports/{}/attachments", report_id))
            .content_type(&format!("multipart/form-data; boundary={}", BOUNDARY))
            .bytes(raw_multipart("clip.mp4", "video/mp4", "mp4").into_bytes().into())
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: Vec<Value> = response.json();
        assert_eq!(created[0]["mimeType"], "video/mp4");
        assert_eq!(created[0]["fileType"], "video");
    }

    #[tokio::test]
    async fn test_delete_attachment() {
        let (server, report_id) = setup().await;
        let base = format!("/api/v1/reports/{}/attachments", report_id);

        let form = MultipartForm::new().add_part("files", file("a.png", "image/png", b"png"));
        let created: Vec<Value> = server.post(&base).multipart(form).await.json();
        let path = format!("{}/{}", base, created[0]["attachmentId"].as_str().unwrap());

        server
            .delete(&path)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .delete(&path)
            .expect_failure()
            .await
            .assert_status_not_found();
        server
            .get(&format!("{}/metadata", path))
            .expect_failure()
            .await
            .assert_status_not_found();
    }
}
