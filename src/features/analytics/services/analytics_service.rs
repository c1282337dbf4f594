use std::sync::Arc;

use crate::core::error::Result;
use crate::features::analytics::dtos::DashboardStats;
use crate::features::analytics::models::FactReport;
use crate::features::analytics::repositories::AnalyticsRepository;
use crate::shared::constants::EXPORT_ROW_LIMIT;

/// Service for dashboard aggregates and exports over the fact tables
pub struct AnalyticsService {
    repository: Arc<dyn AnalyticsRepository>,
}

impl AnalyticsService {
    pub fn new(repository: Arc<dyn AnalyticsRepository>) -> Self {
        Self { repository }
    }

    /// Breakdowns, confidence and the anonymous split come from the hot table only.
    /// A failing cold count is reported as zero.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let hot_reports = self.repository.count_hot().await?;

        let cold_reports = match self.repository.count_cold().await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("Cold fact count unavailable, using 0: {}", e);
                0
            }
        };

        let status_breakdown = self
            .repository
            .hot_status_breakdown()
            .await?
            .into_iter()
            .collect();
        let category_breakdown = self
            .repository
            .hot_category_breakdown()
            .await?
            .into_iter()
            .collect();
        let avg_ai_confidence = self
            .repository
            .hot_average_confidence()
            .await?
            .unwrap_or(0.0);
        let anonymous_reports = self.repository.count_hot_anonymous().await?;

        Ok(DashboardStats {
            total_reports: hot_reports + cold_reports,
            hot_reports,
            cold_reports,
            status_breakdown,
            category_breakdown,
            avg_ai_confidence,
            anonymous_reports,
            registered_reports: hot_reports - anonymous_reports,
        })
    }

    /// Most recent hot rows, capped at the export limit
    pub async fn export_recent(&self) -> Result<Vec<FactReport>> {
        let rows = self.repository.recent_hot(EXPORT_ROW_LIMIT).await?;
        tracing::info!("Exporting {} fact rows", rows.len());
        Ok(rows)
    }
}
