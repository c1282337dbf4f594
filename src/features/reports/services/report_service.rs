use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::analytics::models::FactReport;
use crate::features::analytics::repositories::AnalyticsRepository;
use crate::features::reports::dtos::{
    CreateReportDto, ListReportsQuery, ReportListResponseDto, ReportResponseDto,
    UpdateReportStatusDto,
};
use crate::features::reports::models::{Attachment, Report};
use crate::features::reports::repositories::ReportRepository;
use crate::modules::storage::BlobStorage;

/// Service for report operations
pub struct ReportService {
    reports: Arc<dyn ReportRepository>,
    analytics: Arc<dyn AnalyticsRepository>,
    storage: Arc<dyn BlobStorage>,
}

impl ReportService {
    pub fn new(
        reports: Arc<dyn ReportRepository>,
        analytics: Arc<dyn AnalyticsRepository>,
        storage: Arc<dyn BlobStorage>,
    ) -> Self {
        Self {
            reports,
            analytics,
            storage,
        }
    }

    /// Create a report in `Submitted` state with its attachments.
    ///
    /// The hot analytics row is written afterwards and its failure does not fail the request.
    pub async fn create(&self, dto: CreateReportDto) -> Result<ReportResponseDto> {
        let (report, attachments) = dto.into_parts();

        if let Some(user_id) = report.user_id {
            let user = self
                .reports
                .find_user(user_id)
                .await?
                .ok_or_else(|| AppError::Validation(format!("User {} does not exist", user_id)))?;
            tracing::debug!("Report submitted by {} user {}", user.role, user.id);
        }

        let (report, attachments) = self.reports.create(report, attachments).await?;

        tracing::info!(
            "Created report: {} ({} attachments)",
            report.id,
            attachments.len()
        );

        let fact = FactReport {
            report_id: report.id,
            status: report.status.to_string(),
            category_id: report.category.to_string(),
            ai_confidence: None,
            is_anonymous: report.is_anonymous,
            created_at: report.created_at,
        };
        if let Err(e) = self.analytics.record_hot(&fact).await {
            tracing::warn!("Failed to mirror report {} to analytics: {}", report.id, e);
        }

        Ok(ReportResponseDto::new(report, attachments))
    }

    pub async fn list(&self, query: &ListReportsQuery) -> Result<ReportListResponseDto> {
        let (reports, total) = self
            .reports
            .list(query.filter(), query.skip, query.limit)
            .await?;

        let ids: Vec<Uuid> = reports.iter().map(|r| r.id).collect();
        let mut by_report: HashMap<Uuid, Vec<Attachment>> = HashMap::new();
        for attachment in self.reports.list_attachments(&ids).await? {
            by_report
                .entry(attachment.report_id)
                .or_default()
                .push(attachment);
        }

        let reports = reports
            .into_iter()
            .map(|report| {
                let attachments = by_report.remove(&report.id).unwrap_or_default();
                ReportResponseDto::new(report, attachments)
            })
            .collect();

        Ok(ReportListResponseDto {
            reports,
            total,
            page: query.page(),
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<ReportResponseDto> {
        let report = self.find(id).await?;
        let attachments = self.reports.list_attachments(&[id]).await?;
        Ok(ReportResponseDto::new(report, attachments))
    }

    /// Set a new status; any known status may follow any other
    pub async fn update_status(
        &self,
        id: Uuid,
        dto: UpdateReportStatusDto,
    ) -> Result<ReportResponseDto> {
        let report = self
            .reports
            .update_status(id, dto.status, dto.notes)
            .await?
            .ok_or_else(|| not_found(id))?;

        tracing::info!("Updated report {} status to {}", id, report.status);

        if let Err(e) = self
            .analytics
            .update_hot_status(id, &report.status.to_string())
            .await
        {
            tracing::warn!("Failed to mirror status of report {}: {}", id, e);
        }

        let attachments = self.reports.list_attachments(&[id]).await?;
        Ok(ReportResponseDto::new(report, attachments))
    }

    /// Delete a report; its hot analytics row and stored files are removed
    /// afterwards on a best-effort basis
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let attachments = self.reports.delete(id).await?.ok_or_else(|| not_found(id))?;

        tracing::info!("Deleted report {}", id);

        if let Err(e) = self.analytics.delete_hot(id).await {
            tracing::warn!("Failed to remove analytics row of report {}: {}", id, e);
        }

        for attachment in attachments {
            if let Err(e) = self.storage.delete(&attachment.blob_storage_uri).await {
                tracing::warn!(
                    "Failed to delete blob {} of report {}: {}",
                    attachment.blob_storage_uri,
                    id,
                    e
                );
            }
        }

        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Report> {
        self.reports.find_by_id(id).await?.ok_or_else(|| not_found(id))
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Report with ID {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::analytics::services::AnalyticsService;
    use crate::features::reports::models::{ReportCategory, ReportStatus, UserRole};
    use crate::shared::test_helpers::{
        create_report_dto, FakeBlobStorage, InMemoryAnalyticsRepository,
        InMemoryReportRepository,
    };

    struct Fixture {
        service: ReportService,
        reports: Arc<InMemoryReportRepository>,
        analytics: Arc<InMemoryAnalyticsRepository>,
        storage: Arc<FakeBlobStorage>,
    }

    fn fixture() -> Fixture {
        let reports = Arc::new(InMemoryReportRepository::default());
        let analytics = Arc::new(InMemoryAnalyticsRepository::default());
        let storage = Arc::new(FakeBlobStorage::default());
        let service = ReportService::new(reports.clone(), analytics.clone(), storage.clone());
        Fixture {
            service,
            reports,
            analytics,
            storage,
        }
    }

    #[tokio::test]
    async fn test_create_mirrors_hot_fact() {
        let f = fixture();
        let created = f.service.create(create_report_dto()).await.unwrap();

        assert_eq!(created.status, ReportStatus::Submitted);
        let hot = f.analytics.hot_rows();
        assert_eq!(hot.len(), 1);
        assert_eq!(hot[0].report_id, created.report_id);
        assert_eq!(hot[0].status, "Submitted");
        assert_eq!(hot[0].category_id, "infrastructure");
    }

    #[tokio::test]
    async fn test_create_succeeds_when_analytics_fails() {
        let f = fixture();
        f.analytics.fail_writes();

        let created = f.service.create(create_report_dto()).await.unwrap();
        assert!(f.service.get(created.report_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_registered_report_requires_known_user() {
        let f = fixture();
        let mut dto = create_report_dto();
        dto.is_anonymous = false;
        dto.user_id = Some(Uuid::now_v7());

        let err = f.service.create(dto.clone()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let user_id = f.reports.add_user(UserRole::Citizen);
        dto.user_id = Some(user_id);
        let created = f.service.create(dto).await.unwrap();
        assert_eq!(created.user_id, Some(user_id));
    }

    #[tokio::test]
    async fn test_list_pages_are_disjoint() {
        let f = fixture();
        for _ in 0..5 {
            f.service.create(create_report_dto()).await.unwrap();
        }

        let first = f
            .service
            .list(&ListReportsQuery {
                skip: 0,
                limit: 2,
                status: None,
                category: None,
            })
            .await
            .unwrap();
        let second = f
            .service
            .list(&ListReportsQuery {
                skip: 2,
                limit: 2,
                status: None,
                category: None,
            })
            .await
            .unwrap();

        assert_eq!(first.total, 5);
        assert_eq!(second.total, 5);
        assert_eq!((first.page, second.page), (1, 2));
        assert!(first
            .reports
            .iter()
            .all(|a| second.reports.iter().all(|b| a.report_id != b.report_id)));
    }

    #[tokio::test]
    async fn test_list_filters_by_category() {
        let f = fixture();
        f.service.create(create_report_dto()).await.unwrap();
        let mut dto = create_report_dto();
        dto.category_id = ReportCategory::Traffic;
        f.service.create(dto).await.unwrap();

        let page = f
            .service
            .list(&ListReportsQuery {
                skip: 0,
                limit: 10,
                status: None,
                category: Some(ReportCategory::Traffic),
            })
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.reports[0].category_id, ReportCategory::Traffic);
    }

    #[tokio::test]
    async fn test_update_status_mirrors_hot_row() {
        let f = fixture();
        let created = f.service.create(create_report_dto()).await.unwrap();

        let updated = f
            .service
            .update_status(
                created.report_id,
                UpdateReportStatusDto {
                    status: ReportStatus::Assigned,
                    notes: Some("Assigned to maintenance team".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, ReportStatus::Assigned);
        assert_eq!(
            updated.status_notes.as_deref(),
            Some("Assigned to maintenance team")
        );
        assert_eq!(f.analytics.hot_rows()[0].status, "Assigned");
    }

    #[tokio::test]
    async fn test_update_unknown_report_is_not_found() {
        let f = fixture();
        let err = f
            .service
            .update_status(
                Uuid::now_v7(),
                UpdateReportStatusDto {
                    status: ReportStatus::Closed,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_blobs_best_effort() {
        let f = fixture();
        let url = f.storage.put("evidence.png");
        let mut dto = create_report_dto();
        dto.attachments[0].blob_storage_uri = url.clone();
        dto.attachments.push(dto.attachments[0].clone());
        dto.attachments[1].blob_storage_uri =
            "https://blob.test/report-attachments/missing.png".to_string();

        let created = f.service.create(dto).await.unwrap();
        f.service.delete(created.report_id).await.unwrap();

        assert!(!f.storage.contains(&url));
        assert!(matches!(
            f.service.get(created.report_id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service.delete(created.report_id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_hot_fact_from_dashboard() {
        let f = fixture();
        let kept = f.service.create(create_report_dto()).await.unwrap();
        let deleted = f.service.create(create_report_dto()).await.unwrap();

        f.service.delete(deleted.report_id).await.unwrap();

        let hot = f.analytics.hot_rows();
        assert_eq!(hot.len(), 1);
        assert_eq!(hot[0].report_id, kept.report_id);

        let stats = AnalyticsService::new(f.analytics.clone())
            .dashboard_stats()
            .await
            .unwrap();
        assert_eq!(stats.hot_reports, 1);
        assert_eq!(stats.status_breakdown.get("Submitted"), Some(&1));
    }

    #[tokio::test]
    async fn test_delete_succeeds_when_analytics_fails() {
        let f = fixture();
        let created = f.service.create(create_report_dto()).await.unwrap();
        f.analytics.fail_writes();

        f.service.delete(created.report_id).await.unwrap();
        assert!(matches!(
            f.service.get(created.report_id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_leaves_foreign_urls_alone() {
        let f = fixture();
        let own = f.storage.put("evidence.jpg");

        // Points at a file of the same name on another host
        let created = f.service.create(create_report_dto()).await.unwrap();
        f.service.delete(created.report_id).await.unwrap();

        assert!(f.storage.contains(&own));
        assert_eq!(f.storage.len(), 1);
    }
}
