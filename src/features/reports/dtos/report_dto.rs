use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::reports::dtos::{AttachmentCreateDto, AttachmentResponseDto};
use crate::features::reports::models::{
    Attachment, CreateAttachment, CreateReport, Report, ReportCategory, ReportFilter,
    ReportStatus,
};
use crate::shared::constants::DEFAULT_PAGE_SIZE;

/// Request DTO for submitting a report
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportDto {
    #[validate(length(min = 5, max = 200))]
    #[schema(example = "Broken streetlight")]
    pub title: String,

    #[validate(length(min = 10, max = 5000))]
    pub description_text: String,

    pub category_id: ReportCategory,

    /// Free-text location, required even when coordinates are given
    #[validate(length(min = 3, max = 500))]
    pub location: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,

    #[serde(default)]
    pub is_anonymous: bool,

    #[validate(length(max = 128))]
    pub hashed_device_id: Option<String>,

    /// Ignored for anonymous reports
    pub user_id: Option<Uuid>,

    #[serde(default)]
    #[validate(length(max = 10), nested)]
    pub attachments: Vec<AttachmentCreateDto>,
}

impl CreateReportDto {
    /// Split into report and attachment rows; anonymous reports lose their user reference
    pub fn into_parts(self) -> (CreateReport, Vec<CreateAttachment>) {
        let user_id = if self.is_anonymous { None } else { self.user_id };

        let report = CreateReport {
            title: self.title,
            description_text: self.description_text,
            category: self.category_id,
            location: self.location,
            latitude: self.latitude,
            longitude: self.longitude,
            is_anonymous: self.is_anonymous,
            hashed_device_id: self.hashed_device_id,
            user_id,
        };
        let attachments = self.attachments.into_iter().map(Into::into).collect();

        (report, attachments)
    }
}

/// Query parameters for listing reports
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListReportsQuery {
    /// Rows to skip (default: 0)
    #[serde(default)]
    #[validate(range(min = 0))]
    #[param(minimum = 0)]
    pub skip: i64,

    /// Page size (default: 10, max: 100)
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    #[param(minimum = 1, maximum = 100)]
    pub limit: i64,

    pub status: Option<ReportStatus>,

    pub category: Option<ReportCategory>,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl ListReportsQuery {
    pub fn filter(&self) -> ReportFilter {
        ReportFilter {
            status: self.status,
            category: self.category,
        }
    }

    /// 1-based page number for this window
    pub fn page(&self) -> i64 {
        self.skip / self.limit.max(1) + 1
    }
}

/// Request DTO for updating report status
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateReportStatusDto {
    pub status: ReportStatus,

    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Response DTO for report
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponseDto {
    pub report_id: Uuid,
    pub title: String,
    pub description_text: String,
    pub category_id: ReportCategory,
    pub status: ReportStatus,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_anonymous: bool,
    pub hashed_device_id: Option<String>,
    pub user_id: Option<Uuid>,
    pub status_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub attachments: Vec<AttachmentResponseDto>,
}

impl ReportResponseDto {
    pub fn new(report: Report, attachments: Vec<Attachment>) -> Self {
        Self {
            report_id: report.id,
            title: report.title,
            description_text: report.description_text,
            category_id: report.category,
            status: report.status,
            location: report.location,
            latitude: report.latitude,
            longitude: report.longitude,
            is_anonymous: report.is_anonymous,
            hashed_device_id: report.hashed_device_id,
            user_id: report.user_id,
            status_notes: report.status_notes,
            created_at: report.created_at,
            updated_at: report.updated_at,
            attachments: attachments.into_iter().map(Into::into).collect(),
        }
    }
}

/// Response DTO for a page of reports
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportListResponseDto {
    pub reports: Vec<ReportResponseDto>,
    pub total: i64,
    pub page: i64,
}
