use std::sync::Arc;

use turnstile::config::Config;
use turnstile::registry::Registry;
use turnstile::server::listener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let registry = Arc::new(Registry::new(cfg.server.max_connections));

    tokio::select! {
        res = listener::serve(&cfg, Arc::clone(&registry)) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    let closed = registry.close_all();
    tracing::info!(closed, "Closed remaining connections");

    Ok(())
}
