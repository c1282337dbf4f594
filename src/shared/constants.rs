/// Default page size for report listings
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest attachment accepted, in bytes (50 MiB)
pub const MAX_ATTACHMENT_SIZE_BYTES: i64 = 52_428_800;

/// Most attachments accepted in one create or upload request
pub const MAX_ATTACHMENTS_PER_REQUEST: usize = 10;

/// Rows returned by the analytics export
pub const EXPORT_ROW_LIMIT: i64 = 10_000;

/// Signed download URL lifetime bounds, in hours
pub const DEFAULT_DOWNLOAD_URL_EXPIRY_HOURS: u32 = 1;
pub const MAX_DOWNLOAD_URL_EXPIRY_HOURS: u32 = 168;

/// Body limit for a multipart upload batch: every file at full size plus 1 MiB framing each
pub const MAX_UPLOAD_BODY_BYTES: usize =
    MAX_ATTACHMENTS_PER_REQUEST * (MAX_ATTACHMENT_SIZE_BYTES as usize + 1024 * 1024);
