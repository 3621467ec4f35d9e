//! # tracker-graphql
//!
//! GraphQL API for a lightweight issue tracker backed by a document store.
//!
//! ## Features
//!
//! - **Cursor Pagination** - Relay-style connections over native store queries
//! - **Record Store** - in-memory and MongoDB backends behind one trait
//! - **Schema** - repositories, issues, labels, milestones and users
//! - **DataLoader** - per-request batch loading of related records
//! - **Auth** - JWT bearer tokens and argon2 password hashes
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tracker_graphql::{schema::build_schema, store::Stores, AppConfig};
//!
//! let config = AppConfig::default();
//! let schema = build_schema(Stores::in_memory(), &config);
//! ```

pub mod auth;
pub mod config;
pub mod dataloaders;
pub mod models;
pub mod pagination;
pub mod schema;
pub mod server;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use config::{AppConfig, AuthConfig, ServerConfig, StoreBackend};
pub use pagination::{
    paginate, BoundaryStrategy, Connection, CursorCodec, Edge, PageInfo, PaginationConfig, Window,
};
pub use store::{StoreError, Stores};
pub use types::DateTime;

use async_graphql::ErrorExtensions;
use thiserror::Error;

/// API errors
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Pagination error: {0}")]
    Pagination(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("This endpoint requires you to be authenticated.")]
    Unauthenticated,

    #[error("{0}")]
    UserInput(String),

    #[error("Invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Value of `extensions.code` in the GraphQL error.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidCursor(_) | ApiError::Pagination(_) | ApiError::UserInput(_) => {
                "BAD_USER_INPUT"
            }
            ApiError::Unauthenticated | ApiError::Token(_) => "UNAUTHENTICATED",
            ApiError::Store(_) | ApiError::Configuration(_) | ApiError::Internal(_) => {
                "INTERNAL_SERVER_ERROR"
            }
        }
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> async_graphql::Error {
        let code = self.code();
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", code))
    }
}

impl ErrorExtensions for StoreError {
    fn extend(&self) -> async_graphql::Error {
        ApiError::Store(self.clone()).extend()
    }
}

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
