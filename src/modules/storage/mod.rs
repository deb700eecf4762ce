//! Storage module for file payloads
//!
//! Defines the [`ObjectStore`] contract the file service writes payloads
//! through, plus the MinIO/S3-compatible implementation used in production.

mod minio_client;

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

pub use minio_client::MinIOClient;

/// Store-level metadata attached to an object (e.g. `public=true`).
///
/// Best-effort only; the metadata store holds the authoritative record.
pub type ObjectAttributes = HashMap<String, String>;

#[derive(Debug, Error)]
#[error("Object store error: {0}")]
pub struct StorageError(pub String);

/// Binary payload storage addressed by opaque keys
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `data` under `key`. Existing objects are never overwritten by
    /// the file service since every key embeds a freshly issued code.
    async fn put(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
        attributes: &ObjectAttributes,
    ) -> Result<(), StorageError>;

    /// Issue a time-limited URL that grants read access to `key`
    async fn retrieval_handle(&self, key: &str, ttl_secs: u32) -> Result<String, StorageError>;

    /// Read the whole payload stored under `key`
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;
}
