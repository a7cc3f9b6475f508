//! Server entry point: environment configuration, logging, the game
//! service, and the WebSocket accept loop. Everything here is a thin
//! adapter; game logic lives in `warren-core` and `warren-runtime`.

mod ws;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use warren_runtime::{GameService, RuntimeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .init();

    let config = RuntimeConfig::from_env();
    let port = config.listen_port;
    let handle = GameService::spawn(config);

    // Bind failure is the one startup error that takes the process down.
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind listen socket on port {port}"))?;
    info!(port, "listening for websocket connections");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            accepted = listener.accept() => {
                let (stream, addr) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        warn!(error = %err, "accept failed");
                        continue;
                    }
                };
                debug!(%addr, "connection accepted");
                let handle = handle.clone();
                tokio::spawn(async move {
                    if let Err(err) = ws::serve_connection(stream, handle).await {
                        debug!(%addr, error = %err, "connection closed");
                    }
                });
            }
        }
    }

    Ok(())
}
