use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

/// Headline figures for the admin dashboard
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Hot plus cold rows
    pub total_reports: i64,
    pub hot_reports: i64,
    /// Zero when the cold table cannot be queried
    pub cold_reports: i64,
    pub status_breakdown: BTreeMap<String, i64>,
    pub category_breakdown: BTreeMap<String, i64>,
    pub avg_ai_confidence: f64,
    pub anonymous_reports: i64,
    pub registered_reports: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ExportQuery {
    /// `csv` (default) or `json`
    #[serde(default)]
    pub format: ExportFormat,
}
