pub mod dtos;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use error::FileError;
pub use routes::routes;
pub use services::FileService;
