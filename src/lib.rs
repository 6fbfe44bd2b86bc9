//! Turnstile - bounded connection registry and request dispatcher
//!
//! Core library for the connection table, the line protocol codec, routing
//! and the per-connection worker.

pub mod config;
pub mod http;
pub mod registry;
pub mod router;
pub mod server;
pub mod services;
