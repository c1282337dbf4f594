use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Denormalized analytics row mirroring one report.
///
/// Hot rows are kept current as reports change; cold rows hold archived facts.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FactReport {
    pub report_id: Uuid,
    pub status: String,
    pub category_id: String,
    pub ai_confidence: Option<f64>,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
}

impl FactReport {
    /// Column order used by the CSV export
    pub const CSV_HEADERS: [&'static str; 6] = [
        "reportId",
        "status",
        "categoryId",
        "aiConfidence",
        "isAnonymous",
        "createdAt",
    ];
}
