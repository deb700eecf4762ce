use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for a shared file.
///
/// Created once at upload and never updated. `storage_key` is internal and
/// must not leave the service.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct FileRecord {
    pub code: String,
    pub name: String,
    pub content_type: String,
    pub storage_key: String,
    pub is_public: bool,
    pub owner: Option<String>,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}
