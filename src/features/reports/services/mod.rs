mod attachment_service;
mod report_service;

pub use attachment_service::AttachmentService;
pub use report_service::ReportService;
