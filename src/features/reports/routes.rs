use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::features::reports::handlers::{self, ReportState};
use crate::features::reports::services::{AttachmentService, ReportService};
use crate::shared::constants::MAX_UPLOAD_BODY_BYTES;

/// Create routes for the reports feature
pub fn routes(
    report_service: Arc<ReportService>,
    attachment_service: Arc<AttachmentService>,
) -> Router {
    let state = ReportState {
        report_service,
        attachment_service,
    };

    Router::new()
        .route(
            "/api/v1/reports",
            post(handlers::create_report).get(handlers::list_reports),
        )
        .route(
            "/api/v1/reports/",
            post(handlers::create_report).get(handlers::list_reports),
        )
        .route(
            "/api/v1/reports/{id}",
            get(handlers::get_report).delete(handlers::delete_report),
        )
        .route(
            "/api/v1/reports/{id}/status",
            put(handlers::update_report_status),
        )
        .route(
            "/api/v1/reports/{id}/attachments",
            post(handlers::upload_attachments)
                .get(handlers::list_attachments)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        .route(
            "/api/v1/reports/{id}/attachments/{attachment_id}",
            axum::routing::delete(handlers::delete_attachment),
        )
        .route(
            "/api/v1/reports/{id}/attachments/{attachment_id}/download",
            get(handlers::get_download_url),
        )
        .route(
            "/api/v1/reports/{id}/attachments/{attachment_id}/metadata",
            get(handlers::get_attachment_metadata),
        )
        .with_state(state)
}
