//! Endpoint implementations
//!
//! Each handler is a function of the request parts and session state. Side
//! effects go through the collaborators in [`Services`].

use std::fmt::Write as _;
use std::time::Duration;

use crate::http::parser::find;
use crate::http::response::{Response, StatusCode};
use crate::registry::slot::MAX_PRINCIPAL_LEN;
use crate::registry::{Registry, Session};
use crate::services::{ServiceError, Services};

pub fn status(registry: &Registry) -> Response {
    Response::ok(format!("Server running, connections: {}", registry.len()))
}

pub fn connections(registry: &Registry, session: &Session) -> Response {
    if !session.authenticated {
        return Response::unauthorized("Login required");
    }

    let mut listing = String::new();
    for slot in registry.snapshot() {
        let _ = writeln!(
            listing,
            "[{}] {} - auth: {} - user: {}",
            slot.id,
            slot.peer_address,
            slot.authenticated,
            slot.principal.as_deref().unwrap_or("-"),
        );
    }

    Response::ok(listing)
}

pub async fn read_file(services: &Services, path: &str) -> Result<Response, ServiceError> {
    let contents = services.files.read(path).await?;

    Ok(Response::builder(StatusCode::Ok)
        .body(contents)
        .content_length()
        .build())
}

pub async fn cache_get(services: &Services, key: &str) -> Result<Response, ServiceError> {
    if key.is_empty() {
        return Ok(Response::bad_request("Missing cache key"));
    }

    services
        .cache
        .get(key)
        .await
        .map(Response::ok)
        .ok_or(ServiceError::NotFound)
}

pub async fn cache_put(services: &Services, key: &str, body: &[u8], ttl: Duration) -> Result<Response, ServiceError> {
    if key.is_empty() {
        return Ok(Response::bad_request("Missing cache key"));
    }
    let Ok(value) = std::str::from_utf8(body) else {
        return Ok(Response::bad_request("Cache value must be UTF-8"));
    };

    services.cache.set(key, value.to_string(), ttl).await?;
    Ok(Response::ok("Stored"))
}

pub async fn cache_delete(services: &Services, key: &str) -> Result<Response, ServiceError> {
    if key.is_empty() {
        return Ok(Response::bad_request("Missing cache key"));
    }

    if services.cache.delete(key).await {
        Ok(Response::ok("Deleted"))
    } else {
        Err(ServiceError::NotFound)
    }
}

/// Checks `user=<principal>&pass=<secret>` and marks the session logged in.
///
/// Only the principal and level are kept; the secret is dropped here.
pub async fn login(services: &Services, body: &[u8], session: &mut Session) -> Result<Response, ServiceError> {
    let form = std::str::from_utf8(body).unwrap_or_default();
    let (Some(principal), Some(secret)) = (form_field(form, "user"), form_field(form, "pass")) else {
        return Ok(Response::bad_request("Expected user=<name>&pass=<secret>"));
    };

    if principal.is_empty() || principal.chars().count() > MAX_PRINCIPAL_LEN {
        return Ok(Response::bad_request("Invalid user name"));
    }

    match services.auth.authenticate(principal, secret).await {
        Ok(level) => {
            session.login(principal, level);
            tracing::info!(principal, level = level.as_str(), "Login succeeded");
            Ok(Response::ok("Login successful"))
        }
        Err(ServiceError::Rejected) => {
            tracing::info!(principal, "Login rejected");
            Ok(Response::unauthorized("Invalid credentials"))
        }
        Err(err) => Err(err),
    }
}

/// Stores `filename=<name>&content=<bytes>` in the sandbox.
///
/// Everything after `&content=` is written verbatim.
pub async fn upload(services: &Services, body: &[u8]) -> Result<Response, ServiceError> {
    const CONTENT_MARKER: &[u8] = b"&content=";

    let parsed = body.strip_prefix(b"filename=").and_then(|rest| {
        let split = find(rest, CONTENT_MARKER)?;
        let name = std::str::from_utf8(&rest[..split]).ok()?;
        Some((name, &rest[split + CONTENT_MARKER.len()..]))
    });

    let Some((name, contents)) = parsed.filter(|(name, _)| !name.is_empty()) else {
        return Ok(Response::bad_request("Expected filename=<name>&content=<data>"));
    };

    services.files.write(name, contents).await?;
    tracing::info!(file = name, bytes = contents.len(), "File saved");
    Ok(Response::ok("File saved"))
}

pub async fn exec(services: &Services, body: &[u8]) -> Result<Response, ServiceError> {
    let command_line = std::str::from_utf8(body).unwrap_or_default().trim();
    if command_line.is_empty() {
        return Ok(Response::bad_request("Empty command"));
    }

    let output = services.executor.run(command_line).await?;

    let mut response = Response::builder(StatusCode::Ok);
    if let Some(code) = output.status {
        response = response.header("X-Exit-Status", code.to_string());
    }
    Ok(response.body(output.stdout).build())
}

/// Value of `name` in an `a=1&b=2` form, trimmed.
fn form_field<'a>(form: &'a str, name: &str) -> Option<&'a str> {
    form.split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
}
