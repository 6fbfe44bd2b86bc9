//! Line protocol implementation.
//!
//! A minimal HTTP-shaped request/response protocol over persistent
//! connections: one request per read, one response per request.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection worker implementing the state machine
//! - **`parser`**: Parses a receive buffer into a borrowed [`request::Request`]
//! - **`request`**: Methods and the parsed request view
//! - **`response`**: Status codes and responses with a builder
//! - **`writer`**: Serializes responses, decodes them client-side, and writes them
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← One read into the fixed-size buffer
//!        └──────┬──────┘
//!               │ Bytes received          (EOF / error / close signal → Closed)
//!               ▼
//!        ┌──────────────────┐
//!        │     Parsing      │ ← Parse, then dispatch through the router
//!        └──────┬───────────┘   (malformed → 400, connection kept)
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Single write call
//!        └──────┬───────────┘
//!               ├─ Written → Reading (same connection)
//!               └─ Write error → Closed
//! ```
//!
//! `Closed` releases the registry slot and drops the stream. It is the only
//! way out of the loop.
//!
//! # Example
//!
//! ```ignore
//! use turnstile::http::connection::Connection;
//!
//! let socket = SocketHandle::new();
//! let handle = registry.acquire(socket.clone(), peer)?;
//! tokio::spawn(Connection::new(stream, peer, handle, socket, router, 2048).run());
//! ```

pub mod connection;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
