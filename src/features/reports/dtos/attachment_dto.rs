use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::reports::models::{Attachment, CreateAttachment, FileType};
use crate::shared::validation::MIME_TYPE_REGEX;

/// Attachment already stored elsewhere, submitted together with a report
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentCreateDto {
    #[validate(url)]
    pub blob_storage_uri: String,

    #[validate(regex(path = *MIME_TYPE_REGEX))]
    #[schema(example = "image/jpeg")]
    pub mime_type: String,

    pub file_type: FileType,

    /// At most 50 MiB
    #[validate(range(min = 1, max = 52_428_800))]
    pub file_size_bytes: i64,
}

impl From<AttachmentCreateDto> for CreateAttachment {
    fn from(dto: AttachmentCreateDto) -> Self {
        Self {
            blob_storage_uri: dto.blob_storage_uri,
            mime_type: dto.mime_type,
            file_type: dto.file_type,
            file_size_bytes: dto.file_size_bytes,
        }
    }
}

/// One file read from a multipart upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Upload form for OpenAPI documentation only; the handler reads multipart directly
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadAttachmentsDto {
    /// One or more files (also accepted under the field name `file`)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub files: Vec<String>,
}

/// Response DTO for attachment
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentResponseDto {
    pub attachment_id: Uuid,
    pub report_id: Uuid,
    pub blob_storage_uri: String,
    pub mime_type: String,
    pub file_type: FileType,
    pub file_size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Attachment> for AttachmentResponseDto {
    fn from(a: Attachment) -> Self {
        Self {
            attachment_id: a.id,
            report_id: a.report_id,
            blob_storage_uri: a.blob_storage_uri,
            mime_type: a.mime_type,
            file_type: a.file_type,
            file_size_bytes: a.file_size_bytes,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DownloadUrlQuery {
    /// Link lifetime in hours (default: 1, max: 168)
    #[validate(range(min = 1, max = 168))]
    #[param(minimum = 1, maximum = 168)]
    pub expiry_hours: Option<u32>,
}

/// Time-limited read link for an attachment
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUrlResponseDto {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attachment(overrides: serde_json::Value) -> AttachmentCreateDto {
        let mut body = json!({
            "blobStorageUri": "https://myaccount.blob.core.windows.net/container/image.png",
            "mimeType": "image/png",
            "fileType": "image",
            "fileSizeBytes": 1024
        });
        for (key, value) in overrides.as_object().unwrap() {
            body[key] = value.clone();
        }
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_valid_attachment() {
        assert!(attachment(json!({})).validate().is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let errors = attachment(json!({ "blobStorageUri": "not_a_url" }))
            .validate()
            .unwrap_err();
        assert!(errors.field_errors().contains_key("blob_storage_uri"));
    }

    #[test]
    fn test_size_boundary() {
        assert!(attachment(json!({ "fileSizeBytes": 52_428_800 }))
            .validate()
            .is_ok());
        assert!(attachment(json!({ "fileSizeBytes": 52_428_801 }))
            .validate()
            .is_err());
        assert!(attachment(json!({ "fileSizeBytes": 0 })).validate().is_err());
    }

    #[test]
    fn test_bad_mime_type() {
        let errors = attachment(json!({ "mimeType": "bad_mime_type" }))
            .validate()
            .unwrap_err();
        assert!(errors.field_errors().contains_key("mime_type"));
    }

    #[test]
    fn test_unknown_file_type() {
        let body = json!({
            "blobStorageUri": "https://valid-url.com/file",
            "mimeType": "image/png",
            "fileType": "spreadsheet",
            "fileSizeBytes": 100
        });
        assert!(serde_json::from_value::<AttachmentCreateDto>(body).is_err());
    }
}
