use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

/// Attachment kind matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "file_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Image,
    Video,
    Audio,
    Document,
}

impl FileType {
    /// Classify by MIME prefix; anything that is not image, video or audio is a document
    pub fn from_mime(mime_type: &str) -> Self {
        let top_level = mime_type
            .split('/')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        match top_level.as_str() {
            "image" => FileType::Image,
            "video" => FileType::Video,
            "audio" => FileType::Audio,
            _ => FileType::Document,
        }
    }
}

/// Database model for report attachment
#[derive(Debug, Clone, FromRow)]
pub struct Attachment {
    pub id: Uuid,
    pub report_id: Uuid,
    pub blob_storage_uri: String,
    pub mime_type: String,
    pub file_type: FileType,
    pub file_size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

/// Data for creating a new attachment
#[derive(Debug, Clone)]
pub struct CreateAttachment {
    pub blob_storage_uri: String,
    pub mime_type: String,
    pub file_type: FileType,
    pub file_size_bytes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_from_mime() {
        assert_eq!(FileType::from_mime("image/jpeg"), FileType::Image);
        assert_eq!(FileType::from_mime("VIDEO/mp4"), FileType::Video);
        assert_eq!(FileType::from_mime("audio/mpeg"), FileType::Audio);
        assert_eq!(FileType::from_mime("application/pdf"), FileType::Document);
        assert_eq!(FileType::from_mime("text/plain"), FileType::Document);
    }
}
