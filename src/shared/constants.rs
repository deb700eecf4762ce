/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

/// Content type recorded when the uploader declares none
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
