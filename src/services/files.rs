//! Sandbox-rooted file store
//!
//! Request paths are resolved against a fixed root. Anything that is not a
//! plain relative path (`..`, absolute paths, empty names) is rejected
//! before the filesystem is touched.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use super::{FileStore, ServiceError};

#[derive(Debug, Clone)]
pub struct SandboxFileStore {
    root: PathBuf,
}

impl SandboxFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a request path onto the sandbox.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ServiceError> {
        let relative = Path::new(path.trim_start_matches('/'));

        let mut resolved = self.root.clone();
        let mut depth = 0;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(ServiceError::InvalidPath(path.to_string()));
                }
            }
        }

        if depth == 0 {
            return Err(ServiceError::InvalidPath(path.to_string()));
        }

        Ok(resolved)
    }
}

fn not_found_or_io(err: std::io::Error) -> ServiceError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ServiceError::NotFound
    } else {
        ServiceError::Io(err)
    }
}

#[async_trait]
impl FileStore for SandboxFileStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>, ServiceError> {
        let full = self.resolve(path)?;
        tracing::trace!(path = %full.display(), "Reading file");
        tokio::fs::read(&full).await.map_err(not_found_or_io)
    }

    async fn write(&self, path: &str, contents: &[u8]) -> Result<(), ServiceError> {
        let full = self.resolve(path)?;
        tracing::trace!(path = %full.display(), bytes = contents.len(), "Writing file");
        tokio::fs::write(&full, contents).await.map_err(not_found_or_io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_rejects_traversal() {
        let store = SandboxFileStore::new("/srv");
        assert!(matches!(store.resolve("../etc/passwd"), Err(ServiceError::InvalidPath(_))));
        assert!(matches!(store.resolve("a/../../b"), Err(ServiceError::InvalidPath(_))));
        assert!(matches!(store.resolve(""), Err(ServiceError::InvalidPath(_))));
    }

    #[test]
    fn resolve_strips_leading_slash() {
        let store = SandboxFileStore::new("/srv");
        assert_eq!(store.resolve("/a/b.txt").unwrap(), PathBuf::from("/srv/a/b.txt"));
        assert_eq!(store.resolve("./c.txt").unwrap(), PathBuf::from("/srv/c.txt"));
    }
}
