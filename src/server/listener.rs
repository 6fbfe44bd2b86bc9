use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::http::connection::Connection;
use crate::registry::{Registry, SocketHandle};
use crate::router::Router;
use crate::services::{Cache, Services};

/// Bind the configured address and serve until the future is dropped.
pub async fn serve(cfg: &Config, registry: Arc<Registry>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.server.listen_addr).await?;
    info!(
        addr = %cfg.server.listen_addr,
        capacity = registry.capacity(),
        "Listening"
    );

    let services = Services::from_config(cfg);
    let _sweeper = spawn_cache_sweeper(Arc::clone(&services.cache), cfg.cache.sweep_interval());
    let router = Arc::new(Router::standard(cfg, services, registry));

    run(listener, router, cfg.server.recv_buffer_size).await
}

/// Pause after a failed accept. Errors such as EMFILE return immediately
/// and would otherwise spin the loop.
pub const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Source of incoming connections
#[async_trait]
pub trait Acceptor: Send {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    async fn accept(&mut self) -> std::io::Result<(Self::Stream, SocketAddr)>;
}

#[async_trait]
impl Acceptor for TcpListener {
    type Stream = TcpStream;

    async fn accept(&mut self) -> std::io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

/// Accept loop: admit each connection through the registry and spawn its
/// worker. A full registry means the socket is dropped immediately.
pub async fn run<A>(mut listener: A, router: Arc<Router>, recv_buffer_size: usize) -> anyhow::Result<()>
where
    A: Acceptor,
{
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "Accept failed");
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                continue;
            }
        };

        let socket = SocketHandle::new();
        let handle = match router.registry().acquire(socket.clone(), peer) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(%peer, error = %e, "Rejecting connection");
                drop(stream);
                continue;
            }
        };

        info!(%peer, slot = handle.index(), "Accepted connection");

        let conn = Connection::new(stream, peer, handle, socket, Arc::clone(&router), recv_buffer_size);
        tokio::spawn(conn.run());
    }
}

/// Periodically drop expired cache entries.
pub fn spawn_cache_sweeper(cache: Arc<dyn Cache>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            cache.evict_expired().await;
        }
    })
}
