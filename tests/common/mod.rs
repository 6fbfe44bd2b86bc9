//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use turnstile::config::{Config, UserConfig};
use turnstile::registry::Registry;
use turnstile::router::Router;
use turnstile::services::{
    AuthLevel, ExecOutput, Executor, FileStore, MemoryCache, ServiceError, Services, StaticAuthenticator,
};

pub fn peer(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// File store backed by a map; can be switched into a failing mode
#[derive(Default)]
pub struct MapFiles {
    pub files: Mutex<HashMap<String, Vec<u8>>>,
    pub broken: bool,
}

impl MapFiles {
    pub fn with_file(path: &str, contents: &[u8]) -> Self {
        let files = MapFiles::default();
        files.files.lock().unwrap().insert(path.to_string(), contents.to_vec());
        files
    }

    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl FileStore for MapFiles {
    async fn read(&self, path: &str) -> Result<Vec<u8>, ServiceError> {
        if self.broken {
            return Err(ServiceError::Io(std::io::Error::other("disk on fire")));
        }
        self.files.lock().unwrap().get(path).cloned().ok_or(ServiceError::NotFound)
    }

    async fn write(&self, path: &str, contents: &[u8]) -> Result<(), ServiceError> {
        if self.broken {
            return Err(ServiceError::Io(std::io::Error::other("disk on fire")));
        }
        self.files.lock().unwrap().insert(path.to_string(), contents.to_vec());
        Ok(())
    }
}

/// Executor that echoes the command line back
pub struct EchoExecutor;

#[async_trait]
impl Executor for EchoExecutor {
    async fn run(&self, command_line: &str) -> Result<ExecOutput, ServiceError> {
        if command_line == "fail" {
            return Err(ServiceError::Exec("exit by request".to_string()));
        }
        Ok(ExecOutput {
            stdout: command_line.as_bytes().to_vec(),
            status: Some(0),
        })
    }
}

pub fn users() -> Vec<UserConfig> {
    vec![UserConfig {
        principal: "alice".to_string(),
        secret: "wonderland".to_string(),
        level: AuthLevel::User,
    }]
}

pub fn services_with(files: Arc<MapFiles>) -> Services {
    Services {
        cache: Arc::new(MemoryCache::new()),
        files: files as Arc<dyn FileStore>,
        executor: Arc::new(EchoExecutor),
        auth: Arc::new(StaticAuthenticator::new(users())),
    }
}

pub fn config(exec_enabled: bool) -> Config {
    let mut cfg = Config::default();
    cfg.exec.enabled = exec_enabled;
    cfg.auth.users = users();
    cfg
}

pub fn router(registry: Arc<Registry>, files: Arc<MapFiles>, exec_enabled: bool) -> Router {
    Router::standard(&config(exec_enabled), services_with(files), registry)
}
