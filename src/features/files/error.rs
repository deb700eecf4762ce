use thiserror::Error;

/// Failures of the upload and lookup operations
#[derive(Debug, Error)]
pub enum FileError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File not found")]
    NotFound,

    /// Private records are never served, not even to their owner.
    #[error("File is private")]
    Forbidden,

    #[error("Object store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Failed to write file metadata: {0}")]
    MetadataWriteFailed(String),

    #[error("Metadata store unavailable: {0}")]
    MetadataUnavailable(String),

    #[error("No free share code found after {0} attempts")]
    CodeSpaceExhausted(u32),
}
