use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::features::files::models::FileRecord;
use crate::features::files::services::LookupResult;
use crate::shared::validation::MIME_TYPE_REGEX;

/// Upload file request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFileDto {
    /// The file to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    /// "true" makes the file retrievable by code; anything else keeps it private
    #[schema(example = "true")]
    pub public: Option<String>,
    /// Fallback MIME type used when the file part carries none
    #[schema(example = "application/pdf")]
    pub r#type: Option<String>,
}

/// Upload fields collected from the multipart form, validated before upload
#[derive(Debug, Validate)]
pub struct UploadFormDto {
    #[validate(length(min = 1, max = 255, message = "Filename must be 1-255 characters"))]
    pub file_name: String,
    #[validate(regex(path = *MIME_TYPE_REGEX, message = "Invalid content type"))]
    pub content_type: Option<String>,
}

/// Metadata safe to show to any caller (no storage key, no owner)
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct FileMetaDto {
    /// Share code, six characters from A-Z and 0-9
    #[schema(example = "K3X9QZ")]
    pub code: String,
    /// Original filename as uploaded
    pub name: String,
    /// MIME type of the file
    pub content_type: String,
    /// Whether the file can be retrieved by code
    pub is_public: bool,
    /// Size of the file in bytes
    pub size_bytes: i64,
    /// Timestamp when the file was uploaded
    pub created_at: DateTime<Utc>,
}

impl From<&FileRecord> for FileMetaDto {
    fn from(record: &FileRecord) -> Self {
        Self {
            code: record.code.clone(),
            name: record.name.clone(),
            content_type: record.content_type.clone(),
            is_public: record.is_public,
            size_bytes: record.size_bytes,
            created_at: record.created_at,
        }
    }
}

/// Response DTO for a code lookup
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileLookupResponseDto {
    pub meta: FileMetaDto,
    /// Short-lived download URL; do not cache
    pub url: String,
    /// Seconds until `url` stops working
    pub expires_in: u32,
}

impl From<LookupResult> for FileLookupResponseDto {
    fn from(result: LookupResult) -> Self {
        Self {
            meta: FileMetaDto::from(&result.record),
            url: result.handle.url,
            expires_in: result.handle.expires_in,
        }
    }
}

/// Interpret the `public` form field
pub fn parse_public_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// `Content-Disposition` value that survives non-ASCII filenames
pub fn attachment_disposition(file_name: &str) -> String {
    let ascii_fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let encoded: String = file_name
        .bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b) {
                (b as char).to_string()
            } else {
                format!("%{:02X}", b)
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback, encoded
    )
}
