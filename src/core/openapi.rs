use utoipa::{Modify, OpenApi};

use crate::features::analytics::{
    dtos as analytics_dtos, handlers as analytics_handlers, models as analytics_models,
};
use crate::features::reports::{
    dtos as reports_dtos, handlers as reports_handlers, models as reports_models,
};
use crate::modules::storage::BlobMetadata;
use crate::shared::types::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        // Reports
        reports_handlers::create_report,
        reports_handlers::list_reports,
        reports_handlers::get_report,
        reports_handlers::update_report_status,
        reports_handlers::delete_report,
        // Attachments
        reports_handlers::upload_attachments,
        reports_handlers::list_attachments,
        reports_handlers::get_download_url,
        reports_handlers::get_attachment_metadata,
        reports_handlers::delete_attachment,
        // Analytics
        analytics_handlers::get_dashboard,
        analytics_handlers::export_reports,
    ),
    components(
        schemas(
            // Shared
            ErrorResponse,
            BlobMetadata,
            // Reports
            reports_models::ReportStatus,
            reports_models::ReportCategory,
            reports_models::FileType,
            reports_dtos::CreateReportDto,
            reports_dtos::AttachmentCreateDto,
            reports_dtos::UpdateReportStatusDto,
            reports_dtos::ReportResponseDto,
            reports_dtos::ReportListResponseDto,
            reports_dtos::AttachmentResponseDto,
            reports_dtos::UploadAttachmentsDto,
            reports_dtos::DownloadUrlResponseDto,
            // Analytics
            analytics_models::FactReport,
            analytics_dtos::DashboardStats,
            analytics_dtos::ExportFormat,
        )
    ),
    tags(
        (name = "reports", description = "Citizen incident reports"),
        (name = "attachments", description = "Files attached to a report"),
        (name = "analytics", description = "Dashboard aggregates and fact exports"),
    ),
    info(
        title = "Civic Report API",
        version = "0.1.0",
        description = "Citizen incident reporting API",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
