//! Modules layer - Infrastructure components for external integrations
//!
//! Contains the object storage contract and its MinIO/S3 client.

pub mod storage;
