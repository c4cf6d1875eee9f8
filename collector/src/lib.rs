//! Central ingest collector: registers agents, tracks liveness via
//! heartbeats, receives metric batches, and evicts silent agents.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use agent_common::pb::agent_service_server::AgentServiceServer;
use clap::Parser;
use tonic::transport::Server;
use tracing::{error, info, warn};

pub mod error;
pub mod gc_sweeper;
pub mod registry;
pub mod service;

pub use error::CollectorError;
pub use registry::Registry;
pub use service::AgentServiceImpl;

const GRACEFUL_DRAIN_WINDOW: Duration = Duration::from_secs(5);

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Node telemetry collector", long_about = None)]
pub struct Args {
    /// Address to listen on, e.g. ":50051" or "0.0.0.0:50051".
    #[arg(long, default_value = ":50051")]
    pub listen: String,
}

/// Parses a `Config`-style address (`":50051"` meaning "all interfaces")
/// into a `SocketAddr`.
fn parse_listen_addr(listen: &str) -> Result<SocketAddr, CollectorError> {
    let normalized =
        if let Some(port) = listen.strip_prefix(':') { format!("0.0.0.0:{port}") } else { listen.to_string() };
    normalized
        .parse()
        .map_err(|e: std::net::AddrParseError| CollectorError::Bind(listen.to_string(), e.to_string()))
}

pub async fn run(args: Args) -> Result<(), CollectorError> {
    let addr = parse_listen_addr(&args.listen)?;
    let registry = Arc::new(Registry::new());

    tokio::spawn(gc_sweeper::run(
        registry.clone(),
        gc_sweeper::DEFAULT_SWEEP_INTERVAL,
        gc_sweeper::DEFAULT_TTL,
    ));

    let service = AgentServiceImpl::new(registry.clone());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    info!(%addr, "collector listening");
    let mut server_task = tokio::spawn(async move {
        Server::builder()
            .add_service(AgentServiceServer::new(service))
            .serve_with_shutdown(addr, async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    // Race the shutdown signal against the server task itself: a bind
    // or serve failure must surface immediately, not only once a
    // SIGINT/SIGTERM eventually arrives.
    tokio::select! {
        _ = shutdown_signal() => {
            info!("shutdown signal received, draining in-flight requests (up to {:?})", GRACEFUL_DRAIN_WINDOW);
            let _ = shutdown_tx.send(());

            match tokio::time::timeout(GRACEFUL_DRAIN_WINDOW, server_task).await {
                Ok(Ok(Ok(()))) => info!("collector shut down cleanly"),
                Ok(Ok(Err(e))) => {
                    error!("server error: {e}");
                    return Err(CollectorError::Transport(e));
                }
                Ok(Err(join_err)) => error!("server task failed: {join_err}"),
                Err(_) => warn!("drain window exceeded, forcing stop"),
            }
        }
        result = &mut server_task => {
            match result {
                Ok(Ok(())) => error!("server exited before any shutdown signal"),
                Ok(Err(e)) => {
                    error!("server failed to bind or serve: {e}");
                    return Err(CollectorError::Transport(e));
                }
                Err(join_err) => error!("server task failed: {join_err}"),
            }
        }
    }

    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
