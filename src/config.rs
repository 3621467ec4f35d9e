//! Runtime configuration

use std::time::Duration;

use crate::pagination::PaginationConfig;
use crate::ApiError;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_playground: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            enable_playground: true,
        }
    }
}

/// Token signing settings.
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret.
    pub secret: String,
    /// Lifetime of issued tokens.
    pub token_ttl: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"****")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: "change-me".to_string(),
            token_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

/// Where records are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StoreBackend {
    #[default]
    Memory,
    Mongo { uri: String, database: String },
}

/// Everything the server needs to start.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub pagination: PaginationConfig,
    pub store: StoreBackend,
}

impl AppConfig {
    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.auth.secret.is_empty() {
            return Err(ApiError::Configuration("JWT secret must not be empty".into()));
        }
        if self.auth.token_ttl.is_zero() {
            return Err(ApiError::Configuration("token TTL must be positive".into()));
        }
        let pagination = &self.pagination;
        if pagination.max_first == 0 {
            return Err(ApiError::Configuration("max page size must be positive".into()));
        }
        if pagination.default_first > pagination.max_first {
            return Err(ApiError::Configuration(format!(
                "default page size {} exceeds max page size {}",
                pagination.default_first, pagination.max_first
            )));
        }
        if let StoreBackend::Mongo { uri, database } = &self.store {
            if cfg!(not(feature = "mongo")) {
                return Err(ApiError::Configuration(
                    "built without the `mongo` feature".into(),
                ));
            }
            if uri.is_empty() || database.is_empty() {
                return Err(ApiError::Configuration(
                    "MongoDB URI and database name are required".into(),
                ));
            }
        }
        Ok(())
    }
}
