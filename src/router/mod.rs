//! Request routing
//!
//! This module maps `(method, path)` to an endpoint and runs it against the
//! connection's session, turning every outcome into a response.
//!
//! Routes are checked in declaration order and the first match wins. A
//! path that is routed for some other method yields 405; an unrouted path
//! yields 404. Endpoint failures never reach the connection loop.

pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::registry::{Registry, Session};
use crate::services::{ServiceError, Services};

/// How a route matches a request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatcher {
    /// The whole path must be equal
    Exact(String),
    /// The path must start with the prefix; the remainder goes to the endpoint
    Prefix(String),
}

impl PathMatcher {
    pub fn exact(path: impl Into<String>) -> Self {
        PathMatcher::Exact(path.into())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        PathMatcher::Prefix(prefix.into())
    }

    /// Returns the unmatched remainder of `path` on a match.
    pub fn matches<'p>(&self, path: &'p str) -> Option<&'p str> {
        match self {
            PathMatcher::Exact(expected) => (path == expected).then_some(""),
            PathMatcher::Prefix(prefix) => path.strip_prefix(prefix.as_str()),
        }
    }
}

/// The operations a route can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Live connection count
    Status,
    /// Per-slot listing; requires a logged-in session
    Connections,
    /// File contents from the sandbox
    ReadFile,
    CacheGet,
    CachePut,
    CacheDelete,
    /// Credential check; updates the session on success
    Login,
    /// Writes a file into the sandbox
    Upload,
    /// Runs the body as a command line
    Exec,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub method: Method,
    pub matcher: PathMatcher,
    pub endpoint: Endpoint,
}

/// Outcome of looking a request up in the routing table
#[derive(Debug, PartialEq, Eq)]
pub enum Resolution<'r, 'p> {
    Matched { route: &'r Route, rest: &'p str },
    MethodNotAllowed,
    NotFound,
}

pub struct Router {
    routes: Vec<Route>,
    services: Services,
    registry: Arc<Registry>,
    cache_ttl: Duration,
}

impl Router {
    /// Create a router with an empty routing table
    pub fn new(services: Services, registry: Arc<Registry>) -> Self {
        Self {
            routes: Vec::new(),
            services,
            registry,
            cache_ttl: Duration::from_secs(300),
        }
    }

    /// Create a router with the standard routing table.
    ///
    /// `POST /exec` is only registered when `exec.enabled` is set.
    pub fn standard(cfg: &Config, services: Services, registry: Arc<Registry>) -> Self {
        let router = Self::new(services, registry)
            .with_cache_ttl(cfg.cache.default_ttl())
            .route(Method::GET, PathMatcher::exact("/status"), Endpoint::Status)
            .route(Method::GET, PathMatcher::exact("/connections"), Endpoint::Connections)
            .route(Method::GET, PathMatcher::prefix("/file/"), Endpoint::ReadFile)
            .route(Method::GET, PathMatcher::prefix("/cache/"), Endpoint::CacheGet)
            .route(Method::POST, PathMatcher::prefix("/cache/"), Endpoint::CachePut)
            .route(Method::DELETE, PathMatcher::prefix("/cache/"), Endpoint::CacheDelete)
            .route(Method::POST, PathMatcher::exact("/login"), Endpoint::Login)
            .route(Method::POST, PathMatcher::exact("/upload"), Endpoint::Upload);

        if cfg.exec.enabled {
            router.route(Method::POST, PathMatcher::exact("/exec"), Endpoint::Exec)
        } else {
            router
        }
    }

    /// Append a route; earlier routes take precedence
    pub fn route(mut self, method: Method, matcher: PathMatcher, endpoint: Endpoint) -> Self {
        self.routes.push(Route {
            method,
            matcher,
            endpoint,
        });
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn resolve<'p>(&self, method: Method, path: &'p str) -> Resolution<'_, 'p> {
        let mut path_routed = false;

        for route in &self.routes {
            if let Some(rest) = route.matcher.matches(path) {
                if route.method == method {
                    return Resolution::Matched { route, rest };
                }
                path_routed = true;
            }
        }

        if path_routed {
            Resolution::MethodNotAllowed
        } else {
            Resolution::NotFound
        }
    }

    /// Route a request and run its endpoint.
    ///
    /// Always produces a response: collaborator failures are logged and
    /// mapped to an error status.
    pub async fn dispatch(&self, request: &Request<'_>, session: &mut Session) -> Response {
        let (route, rest) = match self.resolve(request.method, request.path) {
            Resolution::Matched { route, rest } => (route, rest),
            Resolution::MethodNotAllowed => {
                tracing::debug!(method = %request.method, path = %request.path, "Method not allowed");
                return Response::method_not_allowed();
            }
            Resolution::NotFound => {
                tracing::debug!(method = %request.method, path = %request.path, "No route");
                return Response::not_found();
            }
        };

        match self.invoke(route.endpoint, request, rest, session).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(
                    endpoint = ?route.endpoint,
                    method = %request.method,
                    path = %request.path,
                    error = %err,
                    "Endpoint failed"
                );
                error_response(&err)
            }
        }
    }

    async fn invoke(
        &self,
        endpoint: Endpoint,
        request: &Request<'_>,
        rest: &str,
        session: &mut Session,
    ) -> Result<Response, ServiceError> {
        let services = &self.services;

        match endpoint {
            Endpoint::Status => Ok(handlers::status(&self.registry)),
            Endpoint::Connections => Ok(handlers::connections(&self.registry, session)),
            Endpoint::ReadFile => handlers::read_file(services, rest).await,
            Endpoint::CacheGet => handlers::cache_get(services, rest).await,
            Endpoint::CachePut => handlers::cache_put(services, rest, request.body, self.cache_ttl).await,
            Endpoint::CacheDelete => handlers::cache_delete(services, rest).await,
            Endpoint::Login => handlers::login(services, request.body, session).await,
            Endpoint::Upload => handlers::upload(services, request.body).await,
            Endpoint::Exec => handlers::exec(services, request.body).await,
        }
    }
}

/// Map a collaborator failure onto a response status.
pub fn error_response(err: &ServiceError) -> Response {
    match err {
        ServiceError::NotFound | ServiceError::InvalidPath(_) => Response::not_found(),
        ServiceError::Rejected => Response::unauthorized("Invalid credentials"),
        ServiceError::Io(_) | ServiceError::Timeout(_) | ServiceError::Exec(_) => Response::internal_error(),
    }
}
