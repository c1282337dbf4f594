use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::reports::dtos::{AttachmentResponseDto, DownloadUrlResponseDto, UploadedFile};
use crate::features::reports::models::{Attachment, CreateAttachment, FileType};
use crate::features::reports::repositories::ReportRepository;
use crate::modules::storage::{BlobMetadata, BlobStorage};
use crate::shared::constants::{
    DEFAULT_DOWNLOAD_URL_EXPIRY_HOURS, MAX_ATTACHMENTS_PER_REQUEST, MAX_ATTACHMENT_SIZE_BYTES,
    MAX_DOWNLOAD_URL_EXPIRY_HOURS,
};
use crate::shared::validation::MIME_TYPE_REGEX;

/// Service for files attached to an existing report
pub struct AttachmentService {
    reports: Arc<dyn ReportRepository>,
    storage: Arc<dyn BlobStorage>,
}

impl AttachmentService {
    pub fn new(reports: Arc<dyn ReportRepository>, storage: Arc<dyn BlobStorage>) -> Self {
        Self { reports, storage }
    }

    /// Store each file and record it against the report.
    ///
    /// All files are checked before anything is stored. A storage failure part way
    /// through keeps the attachments already recorded.
    pub async fn upload(
        &self,
        report_id: Uuid,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<AttachmentResponseDto>> {
        self.ensure_report(report_id).await?;
        validate_files(&files)?;

        let mut created = Vec::with_capacity(files.len());
        for file in files {
            let size = file.data.len() as i64;
            let url = self
                .storage
                .upload(file.data, &file.filename, &file.content_type)
                .await?;

            let attachment = self
                .reports
                .add_attachment(
                    report_id,
                    CreateAttachment {
                        blob_storage_uri: url,
                        file_type: FileType::from_mime(&file.content_type),
                        mime_type: file.content_type,
                        file_size_bytes: size,
                    },
                )
                .await?;

            tracing::info!(
                "Attached {} ({} bytes) to report {}",
                attachment.id,
                size,
                report_id
            );
            created.push(attachment.into());
        }

        Ok(created)
    }

    pub async fn list(&self, report_id: Uuid) -> Result<Vec<AttachmentResponseDto>> {
        self.ensure_report(report_id).await?;
        let attachments = self.reports.list_attachments(&[report_id]).await?;
        Ok(attachments.into_iter().map(Into::into).collect())
    }

    pub async fn download_url(
        &self,
        report_id: Uuid,
        attachment_id: Uuid,
        expiry_hours: Option<u32>,
    ) -> Result<DownloadUrlResponseDto> {
        let hours = expiry_hours.unwrap_or(DEFAULT_DOWNLOAD_URL_EXPIRY_HOURS);
        if !(1..=MAX_DOWNLOAD_URL_EXPIRY_HOURS).contains(&hours) {
            return Err(AppError::Validation(format!(
                "expiryHours must be between 1 and {}",
                MAX_DOWNLOAD_URL_EXPIRY_HOURS
            )));
        }

        let attachment = self.find(report_id, attachment_id).await?;
        let url = self
            .storage
            .generate_download_url(&attachment.blob_storage_uri, hours)
            .await?;

        Ok(DownloadUrlResponseDto {
            url,
            expires_at: Utc::now() + Duration::hours(i64::from(hours)),
        })
    }

    pub async fn metadata(&self, report_id: Uuid, attachment_id: Uuid) -> Result<BlobMetadata> {
        let attachment = self.find(report_id, attachment_id).await?;
        Ok(self
            .storage
            .get_metadata(&attachment.blob_storage_uri)
            .await?)
    }

    /// Remove the attachment record; the stored file is deleted on a best-effort basis
    pub async fn delete(&self, report_id: Uuid, attachment_id: Uuid) -> Result<()> {
        let attachment = self
            .reports
            .delete_attachment(report_id, attachment_id)
            .await?
            .ok_or_else(|| attachment_not_found(attachment_id))?;

        if let Err(e) = self.storage.delete(&attachment.blob_storage_uri).await {
            tracing::warn!(
                "Failed to delete blob {} of attachment {}: {}",
                attachment.blob_storage_uri,
                attachment_id,
                e
            );
        }

        tracing::info!("Deleted attachment {} of report {}", attachment_id, report_id);
        Ok(())
    }

    async fn ensure_report(&self, report_id: Uuid) -> Result<()> {
        self.reports
            .find_by_id(report_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Report with ID {} not found", report_id)))
    }

    async fn find(&self, report_id: Uuid, attachment_id: Uuid) -> Result<Attachment> {
        self.reports
            .find_attachment(report_id, attachment_id)
            .await?
            .ok_or_else(|| attachment_not_found(attachment_id))
    }
}

fn attachment_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Attachment with ID {} not found", id))
}

fn validate_files(files: &[UploadedFile]) -> Result<()> {
    if files.is_empty() {
        return Err(AppError::Validation("At least one file is required".to_string()));
    }
    if files.len() > MAX_ATTACHMENTS_PER_REQUEST {
        return Err(AppError::Validation(format!(
            "At most {} files may be uploaded at once",
            MAX_ATTACHMENTS_PER_REQUEST
        )));
    }

    for file in files {
        let size = file.data.len() as i64;
        if size == 0 || size > MAX_ATTACHMENT_SIZE_BYTES {
            return Err(AppError::Validation(format!(
                "File '{}' must be between 1 and {} bytes",
                file.filename, MAX_ATTACHMENT_SIZE_BYTES
            )));
        }
        if !MIME_TYPE_REGEX.is_match(&file.content_type) {
            return Err(AppError::Validation(format!(
                "File '{}' has an invalid MIME type '{}'",
                file.filename, file.content_type
            )));
        }
    }

    Ok(())
}
