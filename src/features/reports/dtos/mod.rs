mod attachment_dto;
mod report_dto;

pub use attachment_dto::{
    AttachmentCreateDto, AttachmentResponseDto, DownloadUrlQuery, DownloadUrlResponseDto,
    UploadAttachmentsDto, UploadedFile,
};
pub use report_dto::{
    CreateReportDto, ListReportsQuery, ReportListResponseDto, ReportResponseDto,
    UpdateReportStatusDto,
};
