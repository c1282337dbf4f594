mod attachment;
mod report;
mod user;

pub use attachment::{Attachment, CreateAttachment, FileType};
pub use report::{CreateReport, Report, ReportCategory, ReportFilter, ReportStatus};
pub use user::{User, UserRole};
