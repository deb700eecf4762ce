pub mod code_generator;
mod file_service;

pub use code_generator::{CodeGenerator, RandomCodeGenerator};
pub use file_service::{FileService, LookupResult, NewUpload};
