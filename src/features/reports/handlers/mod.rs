mod attachment_handler;
mod report_handler;

pub use attachment_handler::*;
pub use report_handler::*;

use std::sync::Arc;

use crate::features::reports::services::{AttachmentService, ReportService};

/// State for report and attachment handlers
#[derive(Clone)]
pub struct ReportState {
    pub report_service: Arc<ReportService>,
    pub attachment_service: Arc<AttachmentService>,
}
