//! Collaborators invoked by request handlers
//!
//! The dispatcher only sees these traits. Each has one small concrete
//! implementation so the server runs out of the box:
//!
//! - **`cache`**: in-memory key/value store with per-entry TTL
//! - **`files`**: sandbox-rooted file store
//! - **`exec`**: shell executor with a timeout and output cap
//! - **`auth`**: static credential table

pub mod auth;
pub mod cache;
pub mod exec;
pub mod files;

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub use auth::StaticAuthenticator;
pub use cache::MemoryCache;
pub use exec::ShellExecutor;
pub use files::SandboxFileStore;

/// Failure reported by a collaborator
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("not found")]
    NotFound,

    #[error("credentials rejected")]
    Rejected,

    #[error("path escapes sandbox: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("command failed: {0}")]
    Exec(String),
}

/// Privilege returned by a successful credential check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthLevel {
    #[default]
    User,
    Admin,
}

impl AuthLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthLevel::User => "user",
            AuthLevel::Admin => "admin",
        }
    }
}

/// Output of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: Vec<u8>,
    /// Exit code, `None` when the process was killed by a signal
    pub status: Option<i32>,
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key` for `ttl`. Last write wins.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), ServiceError>;

    /// Remove `key`, returning whether it was present.
    async fn delete(&self, key: &str) -> bool;

    /// Drop expired entries, returning how many were removed.
    async fn evict_expired(&self) -> usize;
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Read a file relative to the store's root.
    async fn read(&self, path: &str) -> Result<Vec<u8>, ServiceError>;

    /// Create or replace a file relative to the store's root.
    async fn write(&self, path: &str, contents: &[u8]) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait Executor: Send + Sync {
    async fn run(&self, command_line: &str) -> Result<ExecOutput, ServiceError>;
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, principal: &str, secret: &str) -> Result<AuthLevel, ServiceError>;
}

/// The collaborators a router dispatches into
#[derive(Clone)]
pub struct Services {
    pub cache: Arc<dyn Cache>,
    pub files: Arc<dyn FileStore>,
    pub executor: Arc<dyn Executor>,
    pub auth: Arc<dyn Authenticator>,
}

impl Services {
    /// Build the default collaborators from configuration
    pub fn from_config(cfg: &crate::config::Config) -> Self {
        Self {
            cache: Arc::new(MemoryCache::new()),
            files: Arc::new(SandboxFileStore::new(cfg.files.root.clone())),
            executor: Arc::new(ShellExecutor::new(cfg.exec.timeout(), cfg.exec.max_output_bytes)),
            auth: Arc::new(StaticAuthenticator::from_config(&cfg.auth)),
        }
    }
}
