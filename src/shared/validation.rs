use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for MIME types in `type/subtype` form
    /// - Valid: "image/png", "video/mp4", "application/vnd.ms-excel", "image/svg+xml"
    /// - Invalid: "bad_mime_type", "image/", "/png", "image png"
    pub static ref MIME_TYPE_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*/[A-Za-z0-9][A-Za-z0-9!#$&^_.+-]*$").unwrap();
}
