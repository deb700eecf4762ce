//! In-memory stores and fixtures for tests

use async_trait::async_trait;
use axum::{extract::Request, middleware::Next, Router};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::core::config::ShareConfig;
use crate::features::auth::{AuthenticatedUser, JwksClient, JwtValidator};
use crate::features::files::models::FileRecord;
use crate::features::files::repositories::{FileRepository, RepositoryError};
use crate::features::files::services::{CodeGenerator, FileService};
use crate::modules::storage::{ObjectAttributes, ObjectStore, StorageError};

struct StoredObject {
    data: Vec<u8>,
    attributes: ObjectAttributes,
}

/// Object store with its own clock so handle expiry can be tested
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    handles: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
    now: Mutex<DateTime<Utc>>,
    pub fail_puts: AtomicBool,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            handles: Mutex::new(HashMap::new()),
            now: Mutex::new(Utc::now()),
            fail_puts: AtomicBool::new(false),
        }
    }

    pub fn advance_clock(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    /// Fetch through a retrieval handle the way an HTTP client would
    pub fn resolve(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        let (key, expires_at) = self
            .handles
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| StorageError(format!("unknown handle {}", url)))?;

        if *self.now.lock().unwrap() > expires_at {
            return Err(StorageError(format!("handle {} expired", url)));
        }

        self.objects
            .lock()
            .unwrap()
            .get(&key)
            .map(|object| object.data.clone())
            .ok_or_else(|| StorageError(format!("no object at {}", key)))
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn attributes(&self, key: &str) -> Option<ObjectAttributes> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|object| object.attributes.clone())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        data: &[u8],
        _content_type: &str,
        attributes: &ObjectAttributes,
    ) -> Result<(), StorageError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError("simulated outage".to_string()));
        }
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                attributes: attributes.clone(),
            },
        );
        Ok(())
    }

    async fn retrieval_handle(&self, key: &str, ttl_secs: u32) -> Result<String, StorageError> {
        let url = format!("memory://objects/{}?token={}", key, Uuid::new_v4());
        let expires_at = *self.now.lock().unwrap() + Duration::seconds(i64::from(ttl_secs));
        self.handles
            .lock()
            .unwrap()
            .insert(url.clone(), (key.to_string(), expires_at));
        Ok(url)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|object| object.data.clone())
            .ok_or_else(|| StorageError(format!("no object at {}", key)))
    }
}

/// Repository whose insert is atomic under a lock, like a primary key
pub struct InMemoryFileRepository {
    records: Mutex<HashMap<String, FileRecord>>,
    checks: Mutex<Vec<String>>,
    /// Report every code as free, as if a concurrent writer raced the check
    pub stale_exists: AtomicBool,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl InMemoryFileRepository {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            checks: Mutex::new(Vec::new()),
            stale_exists: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn record(&self, code: &str) -> Option<FileRecord> {
        self.records.lock().unwrap().get(code).cloned()
    }

    /// Codes passed to `exists`, in order
    pub fn exists_checks(&self) -> Vec<String> {
        self.checks.lock().unwrap().clone()
    }

    fn check_reads(&self) -> Result<(), RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl FileRepository for InMemoryFileRepository {
    async fn exists(&self, code: &str) -> Result<bool, RepositoryError> {
        self.check_reads()?;
        // Let other uploads run between the check and the insert
        tokio::task::yield_now().await;
        self.checks.lock().unwrap().push(code.to_string());
        if self.stale_exists.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self.records.lock().unwrap().contains_key(code))
    }

    async fn insert(&self, record: &FileRecord) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
        }
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.code) {
            return Err(RepositoryError::DuplicateCode(record.code.clone()));
        }
        records.insert(record.code.clone(), record.clone());
        Ok(())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<FileRecord>, RepositoryError> {
        self.check_reads()?;
        Ok(self.records.lock().unwrap().get(code).cloned())
    }

    async fn list_public(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FileRecord>, RepositoryError> {
        self.check_reads()?;
        let mut public: Vec<FileRecord> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.is_public)
            .cloned()
            .collect();
        public.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.code.cmp(&b.code))
        });
        Ok(public
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_public(&self) -> Result<i64, RepositoryError> {
        self.check_reads()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.is_public)
            .count() as i64)
    }
}

/// Hands out the given codes in order, then repeats the last one
pub struct ScriptedCodeGenerator {
    codes: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    length: usize,
}

impl ScriptedCodeGenerator {
    pub fn new(codes: &[&str]) -> Self {
        let first = codes.first().map(|c| c.to_string()).unwrap_or_default();
        Self {
            length: first.len(),
            last: Mutex::new(first),
            codes: Mutex::new(codes.iter().map(|c| c.to_string()).collect()),
        }
    }
}

impl CodeGenerator for ScriptedCodeGenerator {
    fn generate(&self) -> String {
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.codes.lock().unwrap().pop_front() {
            *last = next;
        }
        last.clone()
    }

    fn code_length(&self) -> usize {
        self.length
    }
}

/// Service over in-memory stores: 3 code attempts, 1 MiB upload cap, 60 s handles
pub fn file_service(
    store: Arc<InMemoryObjectStore>,
    repo: Arc<InMemoryFileRepository>,
    generator: impl CodeGenerator + 'static,
) -> FileService {
    let config = ShareConfig {
        code_length: generator.code_length(),
        max_code_attempts: 3,
        retrieval_url_ttl_secs: 60,
        max_upload_size: 1024 * 1024,
    };
    FileService::new(store, repo, Arc::new(generator), &config)
}

/// Make every request through `router` appear authenticated as `sub`
pub fn with_user(router: Router, sub: &str) -> Router {
    let user = AuthenticatedUser {
        sub: sub.to_string(),
    };
    router.layer(axum::middleware::from_fn(
        move |mut request: Request, next: Next| {
            let user = user.clone();
            async move {
                request.extensions_mut().insert(user);
                next.run(request).await
            }
        },
    ))
}

/// Validator whose JWKS endpoint is unreachable: any presented token fails
pub fn unreachable_validator() -> Arc<JwtValidator> {
    let jwks = Arc::new(JwksClient::new(
        "http://127.0.0.1:9/oidc",
        std::time::Duration::from_secs(60),
    ));
    Arc::new(JwtValidator::new(
        jwks,
        "http://127.0.0.1:9/oidc".to_string(),
        "codedrop".to_string(),
        std::time::Duration::from_secs(0),
    ))
}
