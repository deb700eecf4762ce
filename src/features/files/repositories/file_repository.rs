use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::features::files::models::FileRecord;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Another record already holds this code; the insert did not happen.
    #[error("Share code '{0}' is already taken")]
    DuplicateCode(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Metadata store for file records, keyed by share code
#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn exists(&self, code: &str) -> Result<bool, RepositoryError>;

    /// Conditional insert: fails with [`RepositoryError::DuplicateCode`]
    /// instead of overwriting when the code is already present.
    async fn insert(&self, record: &FileRecord) -> Result<(), RepositoryError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<FileRecord>, RepositoryError>;

    /// Public records, newest first
    async fn list_public(&self, limit: i64, offset: i64)
        -> Result<Vec<FileRecord>, RepositoryError>;

    async fn count_public(&self) -> Result<i64, RepositoryError>;
}

/// PostgreSQL-backed [`FileRepository`] over the `files` table
pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn exists(&self, code: &str) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(SELECT 1 FROM files WHERE code = $1)"#,
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert(&self, record: &FileRecord) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO files (code, name, content_type, storage_key, is_public, owner, size_bytes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(&record.code)
        .bind(&record.name)
        .bind(&record.content_type)
        .bind(&record.storage_key)
        .bind(record.is_public)
        .bind(&record.owner)
        .bind(record.size_bytes)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::DuplicateCode(record.code.clone()));
        }

        Ok(())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<FileRecord>, RepositoryError> {
        let record = sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT code, name, content_type, storage_key, is_public, owner, size_bytes, created_at
            FROM files
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_public(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FileRecord>, RepositoryError> {
        let records = sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT code, name, content_type, storage_key, is_public, owner, size_bytes, created_at
            FROM files
            WHERE is_public = TRUE
            ORDER BY created_at DESC, code ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn count_public(&self) -> Result<i64, RepositoryError> {
        let total =
            sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM files WHERE is_public = TRUE"#)
                .fetch_one(&self.pool)
                .await?;

        Ok(total)
    }
}
