//! Static credential table
//!
//! A placeholder credential check backed by the `auth.users` config list.
//! It stores secrets in memory as configured and compares them directly.

use async_trait::async_trait;

use super::{AuthLevel, Authenticator, ServiceError};
use crate::config::{AuthConfig, UserConfig};

#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    users: Vec<UserConfig>,
}

impl StaticAuthenticator {
    pub fn new(users: Vec<UserConfig>) -> Self {
        Self { users }
    }

    pub fn from_config(cfg: &AuthConfig) -> Self {
        Self::new(cfg.users.clone())
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, principal: &str, secret: &str) -> Result<AuthLevel, ServiceError> {
        self.users
            .iter()
            .find(|u| u.principal == principal && u.secret == secret)
            .map(|u| u.level)
            .ok_or(ServiceError::Rejected)
    }
}
