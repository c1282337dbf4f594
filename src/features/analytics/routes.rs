use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::analytics::handlers;
use crate::features::analytics::services::AnalyticsService;

/// Create routes for the analytics feature
pub fn routes(service: Arc<AnalyticsService>) -> Router {
    Router::new()
        .route("/api/v1/analytics/dashboard", get(handlers::get_dashboard))
        .route("/api/v1/analytics/export", get(handlers::export_reports))
        .with_state(service)
}
