use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::config::ShareConfig;
use crate::features::files::error::FileError;
use crate::features::files::models::FileRecord;
use crate::features::files::repositories::{FileRepository, RepositoryError};
use crate::features::files::services::code_generator::{
    is_well_formed, normalize_code, CodeGenerator,
};
use crate::modules::storage::{ObjectAttributes, ObjectStore};
use crate::shared::constants::DEFAULT_CONTENT_TYPE;
use crate::shared::types::PaginationQuery;

/// A payload to be shared
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub data: Vec<u8>,
    pub file_name: String,
    /// Declared MIME type; `None` or empty falls back to `application/octet-stream`
    pub content_type: Option<String>,
    pub is_public: bool,
    pub owner: Option<String>,
}

/// Short-lived URL granting read access to a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalHandle {
    pub url: String,
    pub expires_in: u32,
}

#[derive(Debug, Clone)]
pub struct LookupResult {
    pub record: FileRecord,
    pub handle: RetrievalHandle,
}

#[derive(Debug, Clone)]
pub struct PublicFilesPage {
    pub records: Vec<FileRecord>,
    pub total: i64,
}

/// Maps share codes to stored payloads.
///
/// Both stores are injected; the service holds no other shared state.
pub struct FileService {
    object_store: Arc<dyn ObjectStore>,
    repository: Arc<dyn FileRepository>,
    code_generator: Arc<dyn CodeGenerator>,
    max_code_attempts: u32,
    retrieval_url_ttl_secs: u32,
    max_upload_size: usize,
}

impl FileService {
    pub fn new(
        object_store: Arc<dyn ObjectStore>,
        repository: Arc<dyn FileRepository>,
        code_generator: Arc<dyn CodeGenerator>,
        config: &ShareConfig,
    ) -> Self {
        Self {
            object_store,
            repository,
            code_generator,
            max_code_attempts: config.max_code_attempts.max(1),
            retrieval_url_ttl_secs: config.retrieval_url_ttl_secs,
            max_upload_size: config.max_upload_size,
        }
    }

    /// Largest payload `upload` accepts, in bytes
    pub fn max_upload_size(&self) -> usize {
        self.max_upload_size
    }

    /// Draw codes until one is not present in the metadata store.
    ///
    /// The answer is only valid at the moment of the check; `upload` relies on
    /// the repository's conditional insert to settle races.
    pub async fn allocate_code(&self) -> Result<String, FileError> {
        let mut attempts = 0;
        self.next_free_code(&mut attempts).await
    }

    /// Like `allocate_code`, but draws count against a caller-held budget so
    /// retries after a lost insert race share the same bound.
    async fn next_free_code(&self, attempts: &mut u32) -> Result<String, FileError> {
        while *attempts < self.max_code_attempts {
            *attempts += 1;
            let code = self.code_generator.generate();
            let taken = self
                .repository
                .exists(&code)
                .await
                .map_err(|e| FileError::MetadataUnavailable(e.to_string()))?;

            if !taken {
                return Ok(code);
            }
            debug!("Share code {} already taken (attempt {})", code, attempts);
        }

        warn!(
            "Gave up allocating a share code after {} attempts",
            self.max_code_attempts
        );
        Err(FileError::CodeSpaceExhausted(self.max_code_attempts))
    }

    /// Store a payload and issue its share code.
    ///
    /// The object is written before the record. If the record write fails the
    /// object stays behind as an orphan; nothing is rolled back.
    pub async fn upload(&self, upload: NewUpload) -> Result<FileRecord, FileError> {
        if upload.data.is_empty() {
            return Err(FileError::InvalidInput("File is required".to_string()));
        }
        if upload.data.len() > self.max_upload_size {
            return Err(FileError::InvalidInput(format!(
                "File too large. Maximum size is {} bytes ({} MB)",
                self.max_upload_size,
                self.max_upload_size / 1024 / 1024
            )));
        }
        let file_name = upload.file_name.trim();
        if file_name.is_empty() {
            return Err(FileError::InvalidInput("Filename is required".to_string()));
        }

        let content_type = upload
            .content_type
            .as_deref()
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let mut attributes = ObjectAttributes::new();
        attributes.insert("public".to_string(), upload.is_public.to_string());

        let mut attempts = 0;
        loop {
            let code = self.next_free_code(&mut attempts).await?;
            let now = Utc::now();
            let storage_key = storage_key_for(&code, file_name, now);

            self.object_store
                .put(&storage_key, &upload.data, &content_type, &attributes)
                .await
                .map_err(|e| FileError::StorageUnavailable(e.to_string()))?;

            let record = FileRecord {
                code,
                name: file_name.to_string(),
                content_type: content_type.clone(),
                storage_key,
                is_public: upload.is_public,
                owner: upload.owner.clone(),
                size_bytes: upload.data.len() as i64,
                created_at: now,
            };

            match self.repository.insert(&record).await {
                Ok(()) => {
                    info!(
                        "File shared: code={}, size={}, public={}, owner={}",
                        record.code,
                        record.size_bytes,
                        record.is_public,
                        record.owner.as_deref().unwrap_or("-")
                    );
                    return Ok(record);
                }
                Err(RepositoryError::DuplicateCode(code)) => {
                    warn!(
                        "Share code {} claimed concurrently (attempt {}); orphaned object '{}'",
                        code, attempts, record.storage_key
                    );
                }
                Err(e) => {
                    warn!(
                        "Metadata write failed for code {}; orphaned object '{}'",
                        record.code, record.storage_key
                    );
                    return Err(FileError::MetadataWriteFailed(e.to_string()));
                }
            }
        }
    }

    /// Resolve a code to its metadata and a short-lived retrieval URL
    pub async fn lookup(&self, code: &str) -> Result<LookupResult, FileError> {
        let record = self.find_public(code).await?;

        let url = self
            .object_store
            .retrieval_handle(&record.storage_key, self.retrieval_url_ttl_secs)
            .await
            .map_err(|e| FileError::StorageUnavailable(e.to_string()))?;

        Ok(LookupResult {
            record,
            handle: RetrievalHandle {
                url,
                expires_in: self.retrieval_url_ttl_secs,
            },
        })
    }

    /// Resolve a code to its metadata and the payload bytes themselves
    pub async fn fetch_content(&self, code: &str) -> Result<(FileRecord, Vec<u8>), FileError> {
        let record = self.find_public(code).await?;

        let data = self
            .object_store
            .get(&record.storage_key)
            .await
            .map_err(|e| FileError::StorageUnavailable(e.to_string()))?;

        Ok((record, data))
    }

    /// Page through public files, newest first
    pub async fn list_public(
        &self,
        pagination: &PaginationQuery,
    ) -> Result<PublicFilesPage, FileError> {
        let records = self
            .repository
            .list_public(pagination.limit(), pagination.offset())
            .await
            .map_err(|e| FileError::MetadataUnavailable(e.to_string()))?;
        let total = self
            .repository
            .count_public()
            .await
            .map_err(|e| FileError::MetadataUnavailable(e.to_string()))?;

        Ok(PublicFilesPage { records, total })
    }

    async fn find_public(&self, code: &str) -> Result<FileRecord, FileError> {
        let code = normalize_code(code);
        if !is_well_formed(&code, self.code_generator.code_length()) {
            return Err(FileError::NotFound);
        }

        let record = self
            .repository
            .find_by_code(&code)
            .await
            .map_err(|e| FileError::MetadataUnavailable(e.to_string()))?
            .ok_or(FileError::NotFound)?;

        // TODO: let the owner through once private files get an access flow
        if !record.is_public {
            debug!("Refusing private file {}", record.code);
            return Err(FileError::Forbidden);
        }

        Ok(record)
    }
}

/// `files/{code}/{unix_millis}_{name}`; the name is made path-safe.
pub fn storage_key_for(code: &str, file_name: &str, now: DateTime<Utc>) -> String {
    format!(
        "files/{}/{}_{}",
        code,
        now.timestamp_millis(),
        sanitize_file_name(file_name)
    )
}

fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    if sanitized.is_empty() {
        "file".to_string()
    } else {
        sanitized
    }
}
