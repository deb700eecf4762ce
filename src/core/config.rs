use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: Option<AuthConfig>,
    pub swagger: SwaggerConfig,
    pub minio: MinIOConfig,
    pub share: ShareConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

/// Bearer token validation settings.
///
/// Identity is optional for this service: when no issuer is configured
/// every upload is recorded as anonymous.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub issuer: String,
    pub audience: String,
    pub jwks_cache_ttl: Duration,
    pub jwt_leeway: Duration,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// MinIO/S3 storage configuration for file payloads
#[derive(Debug, Clone)]
pub struct MinIOConfig {
    /// MinIO/S3 endpoint URL
    pub endpoint: String,
    /// Access key for authentication
    pub access_key: String,
    /// Secret key for authentication
    pub secret_key: String,
    /// Bucket name for storing files
    pub bucket: String,
    /// AWS region (for S3 compatibility)
    pub region: String,
}

/// Settings for share code issuing and retrieval
#[derive(Debug, Clone)]
pub struct ShareConfig {
    /// Number of characters in an issued code
    pub code_length: usize,
    /// Upper bound on code draws before giving up with `CodeSpaceExhausted`
    pub max_code_attempts: u32,
    /// Lifetime of presigned retrieval URLs in seconds
    pub retrieval_url_ttl_secs: u32,
    /// Largest accepted payload in bytes
    pub max_upload_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            // Only error if it's not "file not found" - that's acceptable
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            minio: MinIOConfig::from_env()?,
            share: ShareConfig::from_env()?,
        })
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    // Default values for database connection pool (conservative defaults for small-medium apps)
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MAX_CONNECTIONS must be a valid number".to_string())?;

        let min_connections = env::var("DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MIN_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MIN_CONNECTIONS must be a valid number".to_string())?;

        let acquire_timeout_secs = env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_ACQUIRE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_ACQUIRE_TIMEOUT_SECS must be a valid number".to_string())?;

        let idle_timeout_secs = env::var("DB_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_IDLE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_IDLE_TIMEOUT_SECS must be a valid number".to_string())?;

        let max_lifetime_secs = env::var("DB_MAX_LIFETIME_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_LIFETIME_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_MAX_LIFETIME_SECS must be a valid number".to_string())?;

        Ok(Self {
            url,
            max_connections,
            min_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
        })
    }
}

impl AuthConfig {
    // Default values for JWT authentication
    const DEFAULT_JWKS_CACHE_TTL_SECS: u64 = 3600; // 1 hour
    const DEFAULT_JWT_LEEWAY_SECS: u64 = 60; // 1 minute

    /// Returns `None` when `AUTH_ISSUER` is unset or empty.
    pub fn from_env() -> Result<Option<Self>, String> {
        let Some(issuer) = env::var("AUTH_ISSUER").ok().filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        let audience = env::var("AUTH_AUDIENCE").map_err(|_| {
            "AUTH_AUDIENCE environment variable is required when AUTH_ISSUER is set".to_string()
        })?;

        let jwks_cache_ttl_secs = env::var("JWKS_CACHE_TTL")
            .unwrap_or_else(|_| Self::DEFAULT_JWKS_CACHE_TTL_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "JWKS_CACHE_TTL must be a valid number".to_string())?;

        let jwt_leeway_secs = env::var("JWT_LEEWAY")
            .unwrap_or_else(|_| Self::DEFAULT_JWT_LEEWAY_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "JWT_LEEWAY must be a valid number".to_string())?;

        Ok(Some(Self {
            issuer,
            audience,
            jwks_cache_ttl: Duration::from_secs(jwks_cache_ttl_secs),
            jwt_leeway: Duration::from_secs(jwt_leeway_secs),
        }))
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Codedrop API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "Share files by short access code".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl MinIOConfig {
    pub fn from_env() -> Result<Self, String> {
        let endpoint =
            env::var("MINIO_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".to_string());

        let access_key = env::var("MINIO_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string());

        let secret_key = env::var("MINIO_SECRET_KEY").unwrap_or_else(|_| "minioadmin".to_string());

        let bucket = env::var("MINIO_BUCKET").unwrap_or_else(|_| "codedrop-files".to_string());

        let region = env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        Ok(Self {
            endpoint,
            access_key,
            secret_key,
            bucket,
            region,
        })
    }
}

impl ShareConfig {
    pub const DEFAULT_CODE_LENGTH: usize = 6;
    pub const DEFAULT_MAX_CODE_ATTEMPTS: u32 = 16;
    pub const DEFAULT_RETRIEVAL_URL_TTL_SECS: u32 = 60; // 1 minute
    pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024; // 50MB
    /// Longest lifetime S3 accepts for a presigned URL (7 days)
    pub const MAX_RETRIEVAL_URL_TTL_SECS: u32 = 604_800;

    pub fn from_env() -> Result<Self, String> {
        let code_length = env::var("SHARE_CODE_LENGTH")
            .unwrap_or_else(|_| Self::DEFAULT_CODE_LENGTH.to_string())
            .parse::<usize>()
            .map_err(|_| "SHARE_CODE_LENGTH must be a valid number".to_string())?;

        let max_code_attempts = env::var("SHARE_CODE_MAX_ATTEMPTS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CODE_ATTEMPTS.to_string())
            .parse::<u32>()
            .map_err(|_| "SHARE_CODE_MAX_ATTEMPTS must be a valid number".to_string())?;

        let retrieval_url_ttl_secs = env::var("RETRIEVAL_URL_TTL_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_RETRIEVAL_URL_TTL_SECS.to_string())
            .parse::<u32>()
            .map_err(|_| "RETRIEVAL_URL_TTL_SECS must be a valid number".to_string())?;

        let max_upload_size = env::var("MAX_UPLOAD_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_UPLOAD_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_UPLOAD_SIZE must be a valid number".to_string())?;

        let config = Self {
            code_length,
            max_code_attempts,
            retrieval_url_ttl_secs,
            max_upload_size,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.code_length == 0 {
            return Err("SHARE_CODE_LENGTH must be greater than zero".to_string());
        }
        if self.max_code_attempts == 0 {
            return Err("SHARE_CODE_MAX_ATTEMPTS must be greater than zero".to_string());
        }
        if self.retrieval_url_ttl_secs == 0
            || self.retrieval_url_ttl_secs > Self::MAX_RETRIEVAL_URL_TTL_SECS
        {
            return Err(format!(
                "RETRIEVAL_URL_TTL_SECS must be between 1 and {}",
                Self::MAX_RETRIEVAL_URL_TTL_SECS
            ));
        }
        if self.max_upload_size == 0 {
            return Err("MAX_UPLOAD_SIZE must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            code_length: Self::DEFAULT_CODE_LENGTH,
            max_code_attempts: Self::DEFAULT_MAX_CODE_ATTEMPTS,
            retrieval_url_ttl_secs: Self::DEFAULT_RETRIEVAL_URL_TTL_SECS,
            max_upload_size: Self::DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_config_defaults_are_valid() {
        assert!(ShareConfig::default().validate().is_ok());
    }

    #[test]
    fn test_share_config_rejects_unusable_values() {
        let cases = [
            (
                ShareConfig {
                    code_length: 0,
                    ..ShareConfig::default()
                },
                "SHARE_CODE_LENGTH",
            ),
            (
                ShareConfig {
                    max_code_attempts: 0,
                    ..ShareConfig::default()
                },
                "SHARE_CODE_MAX_ATTEMPTS",
            ),
            (
                ShareConfig {
                    retrieval_url_ttl_secs: 0,
                    ..ShareConfig::default()
                },
                "RETRIEVAL_URL_TTL_SECS",
            ),
            (
                ShareConfig {
                    retrieval_url_ttl_secs: ShareConfig::MAX_RETRIEVAL_URL_TTL_SECS + 1,
                    ..ShareConfig::default()
                },
                "RETRIEVAL_URL_TTL_SECS",
            ),
            (
                ShareConfig {
                    max_upload_size: 0,
                    ..ShareConfig::default()
                },
                "MAX_UPLOAD_SIZE",
            ),
        ];

        for (config, var) in cases {
            let err = config.validate().unwrap_err();
            assert!(err.contains(var), "expected {} in '{}'", var, err);
        }
    }

    #[test]
    fn test_share_config_accepts_ttl_bounds() {
        for ttl in [1, ShareConfig::MAX_RETRIEVAL_URL_TTL_SECS] {
            let config = ShareConfig {
                retrieval_url_ttl_secs: ttl,
                ..ShareConfig::default()
            };
            assert!(config.validate().is_ok());
        }
    }
}
