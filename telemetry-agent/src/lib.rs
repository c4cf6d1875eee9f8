//! Node-resident telemetry agent: samples CPU/memory/disk/process
//! metrics on a fixed interval and reports them to a collector over
//! unary gRPC. Runs happily with no collector reachable at all — RPC
//! is an optional capability, never a hard dependency.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use agent_core::{detect_env, EnvBackend, WithKubernetesMeta};
use clap::Parser;
use tracing::{error, info, warn};

pub mod agent_loop;
pub mod error;
pub mod rpc_client;

pub use agent_loop::AgentLoop;
pub use error::AgentError;
pub use rpc_client::{BackoffConfig, RpcClient};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Node telemetry agent", long_about = None)]
pub struct Args {
    /// Path to a JSON config file. Empty or omitted means defaults.
    #[arg(long, default_value = "")]
    pub config: String,

    /// Run exactly one collection cycle, print it, then exit.
    #[arg(long, default_value_t = false)]
    pub once: bool,
}

/// Loads config, detects the environment, registers with the
/// collector (best-effort), then runs the agent loop until shutdown.
pub async fn run_agent(args: Args) -> Result<(), AgentError> {
    let config = agent_core::config::load(&args.config)?;
    info!(interval = ?config.interval, listen_addr = %config.listen_addr, "agent starting");

    let env = detect_env(Path::new("/"));
    info!(backend = env.kind(), "environment detected");

    let env: Box<dyn EnvBackend> = match agent_core::detect_kubernetes() {
        Some(meta) => {
            info!(namespace = %meta.namespace, pod = %meta.pod_name, node = %meta.node_name, "kubernetes enrichment active");
            Box::new(WithKubernetesMeta::new(env, meta))
        }
        None => env,
    };

    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let rpc = match RpcClient::connect_lazy(&config.listen_addr, BackoffConfig::default()) {
        Ok(client) => {
            let client = Arc::new(client);
            match client.register(&hostname).await {
                Ok(agent_id) => {
                    info!(%agent_id, "registered with collector");
                    Some(client)
                }
                Err(e) => {
                    warn!("register failed, continuing in stdout-only mode: {e}");
                    None
                }
            }
        }
        Err(e) => {
            warn!("failed to build rpc channel, continuing in stdout-only mode: {e}");
            None
        }
    };

    let agent_loop = AgentLoop::new(env, rpc, config.interval);
    agent_loop.run(args.once, shutdown_signal()).await;
    agent_loop.shutdown();

    info!("agent stopped");
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
