use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

/// Report lifecycle status matching database enum
///
/// Any status may follow any other; updates only require a known value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "report_status")]
pub enum ReportStatus {
    Submitted,
    Assigned,
    InProgress,
    Resolved,
    Closed,
    Rejected,
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportStatus::Submitted => write!(f, "Submitted"),
            ReportStatus::Assigned => write!(f, "Assigned"),
            ReportStatus::InProgress => write!(f, "InProgress"),
            ReportStatus::Resolved => write!(f, "Resolved"),
            ReportStatus::Closed => write!(f, "Closed"),
            ReportStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

/// Report category matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "report_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    Infrastructure,
    Utilities,
    Sanitation,
    Environment,
    PublicSafety,
    Traffic,
    Corruption,
    Other,
}

impl std::fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportCategory::Infrastructure => write!(f, "infrastructure"),
            ReportCategory::Utilities => write!(f, "utilities"),
            ReportCategory::Sanitation => write!(f, "sanitation"),
            ReportCategory::Environment => write!(f, "environment"),
            ReportCategory::PublicSafety => write!(f, "public_safety"),
            ReportCategory::Traffic => write!(f, "traffic"),
            ReportCategory::Corruption => write!(f, "corruption"),
            ReportCategory::Other => write!(f, "other"),
        }
    }
}

/// Database model for report
#[derive(Debug, Clone, FromRow)]
pub struct Report {
    pub id: Uuid,
    pub title: String,
    pub description_text: String,
    pub category: ReportCategory,
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
}

/// Data for creating a new report
#[derive(Debug, Clone)]
pub struct CreateReport {
    pub title: String,
    pub description_text: String,
    pub category: ReportCategory,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_anonymous: bool,
    pub hashed_device_id: Option<String>,
    pub user_id: Option<Uuid>,
}

/// Optional list filters
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub category: Option<ReportCategory>,
}
