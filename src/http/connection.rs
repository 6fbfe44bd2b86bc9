use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::http::parser::parse_request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::registry::{SlotHandle, SocketHandle};
use crate::router::Router;

/// Drives one connection's request/response loop.
pub struct Connection<S> {
    stream: S,
    peer: SocketAddr,
    buffer: BytesMut,
    buffer_size: usize,
    handle: SlotHandle,
    socket: SocketHandle,
    router: Arc<Router>,
}

pub enum ConnectionState {
    Reading,
    Parsing,
    Writing(ResponseWriter),
    Closed(CloseReason),
}

/// Why a connection's worker stopped
#[derive(Debug, thiserror::Error)]
pub enum CloseReason {
    #[error("peer closed the connection")]
    PeerClosed,

    #[error("connection closed by registry")]
    ForcedClose,

    #[error("read failed: {0}")]
    ReadFailed(#[source] std::io::Error),

    #[error("write failed: {0}")]
    WriteFailed(#[source] std::io::Error),
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        peer: SocketAddr,
        handle: SlotHandle,
        socket: SocketHandle,
        router: Arc<Router>,
        buffer_size: usize,
    ) -> Self {
        Self {
            stream,
            peer,
            buffer: BytesMut::with_capacity(buffer_size),
            buffer_size,
            handle,
            socket,
            router,
        }
    }

    /// Serve requests until the transport closes.
    ///
    /// This is the worker's only exit: the slot is released and the stream
    /// dropped before returning.
    pub async fn run(mut self) -> CloseReason {
        let mut state = ConnectionState::Reading;

        let reason = loop {
            state = match state {
                ConnectionState::Reading => self.read_request().await,

                ConnectionState::Parsing => ConnectionState::Writing(self.handle_request().await),

                ConnectionState::Writing(writer) => self.write_response(writer).await,

                ConnectionState::Closed(reason) => break reason,
            };
        };

        let released = self.router.registry().release(&self.handle);
        tracing::info!(
            peer = %self.peer,
            slot = self.handle.index(),
            released,
            reason = %reason,
            "Connection closed"
        );

        reason
    }

    /// One read into the fixed-size buffer, raced against the close signal.
    async fn read_request(&mut self) -> ConnectionState {
        self.buffer.clear();
        self.buffer.resize(self.buffer_size, 0);

        let outcome = tokio::select! {
            biased;
            _ = self.socket.closed() => return ConnectionState::Closed(CloseReason::ForcedClose),
            res = self.stream.read(&mut self.buffer[..]) => res,
        };

        match outcome {
            Ok(0) => ConnectionState::Closed(CloseReason::PeerClosed),
            Ok(n) => {
                self.buffer.truncate(n);
                ConnectionState::Parsing
            }
            Err(e) => ConnectionState::Closed(CloseReason::ReadFailed(e)),
        }
    }

    /// One write of the serialized response, raced against the close signal
    /// so a peer that stops reading cannot pin the worker.
    async fn write_response(&mut self, mut writer: ResponseWriter) -> ConnectionState {
        let outcome = tokio::select! {
            biased;
            _ = self.socket.closed() => return ConnectionState::Closed(CloseReason::ForcedClose),
            res = writer.write_once(&mut self.stream) => res,
        };

        match outcome {
            Ok(n) => {
                if n < writer.len() {
                    tracing::warn!(peer = %self.peer, written = n, expected = writer.len(), "Short write");
                }
                ConnectionState::Reading
            }
            Err(e) => ConnectionState::Closed(CloseReason::WriteFailed(e)),
        }
    }

    /// Parse the buffered bytes and dispatch them.
    ///
    /// A malformed request gets an error response; the connection stays open.
    async fn handle_request(&mut self) -> ResponseWriter {
        let response = match parse_request(&self.buffer) {
            Ok(request) => {
                if request.body_truncated {
                    tracing::warn!(peer = %self.peer, path = %request.path, "Request body truncated");
                }

                let mut session = self.handle.session();
                let response = self.router.dispatch(&request, &mut session).await;
                self.handle.store_session(session);

                tracing::info!(
                    peer = %self.peer,
                    method = %request.method,
                    path = %request.path,
                    status = response.status.as_u16(),
                    "Request handled"
                );
                response
            }
            Err(e) => {
                tracing::debug!(peer = %self.peer, error = %e, "Malformed request");
                Response::bad_request("Malformed request")
            }
        };

        ResponseWriter::new(&response)
    }
}
