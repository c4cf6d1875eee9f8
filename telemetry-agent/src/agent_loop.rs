//! Ticker-driven orchestrator: `Collect -> ConsoleOut -> SendHeartbeat ->
//! SendMetrics`, once per tick, never overlapping.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agent_core::{project, CollectedTick, EnvBackend, KubernetesMeta};
use tracing::{debug, info, warn};

use crate::rpc_client::RpcClient;

pub struct AgentLoop {
    env: Box<dyn EnvBackend>,
    rpc: Option<Arc<RpcClient>>,
    interval: Duration,
    seq: AtomicI64,
}

impl AgentLoop {
    pub fn new(env: Box<dyn EnvBackend>, rpc: Option<Arc<RpcClient>>, interval: Duration) -> Self {
        Self { env, rpc, interval, seq: AtomicI64::new(0) }
    }

    /// Runs until `shutdown` resolves. If `once` is set, performs
    /// exactly one tick and returns regardless of `shutdown`.
    pub async fn run(&self, once: bool, shutdown: impl std::future::Future<Output = ()>) {
        if once {
            self.tick().await;
            return;
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = &mut shutdown => {
                    info!("shutdown signal received, stopping agent loop");
                    break;
                }
            }
        }
    }

    /// Consumes the loop and closes the RPC connection, if one was
    /// ever established. Called once after `run` returns.
    pub fn shutdown(self) {
        if let Some(rpc) = self.rpc {
            match Arc::try_unwrap(rpc) {
                Ok(client) => client.close(),
                Err(_) => debug!("rpc client still referenced elsewhere, skipping explicit close"),
            }
        }
    }

    async fn tick(&self) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let tick = self.collect(seq);
        console_out(&tick, self.env.kind(), self.env.k8s_meta().as_ref());

        if let Some(rpc) = &self.rpc {
            match rpc.send_heartbeat().await {
                Ok(resp) => {
                    if !resp.pending_commands.is_empty() {
                        debug!(count = resp.pending_commands.len(), "received pending commands");
                    }
                }
                Err(e) => warn!("heartbeat failed: {e}"),
            }

            let points = project(&tick);
            if let Err(e) = rpc.send_metrics(&points).await {
                warn!("send_metrics failed: {e}");
            }
        }
    }

    fn collect(&self, seq: i64) -> CollectedTick {
        CollectedTick {
            seq,
            ts: chrono::Utc::now(),
            cpu: self.env.cpu(),
            mem: self.env.mem(),
            disk: self.env.disk(),
            proc: self.env.procs(),
        }
    }
}

/// One human-readable line per tick, per S6: must contain `Seq:`,
/// `CPU:`, `Mem:`, `Disk:`, `Procs:`.
fn console_out(tick: &CollectedTick, kind: &str, k8s: Option<&KubernetesMeta>) {
    println!("{}", format_console_line(tick, kind, k8s));
}

/// Builds the line `console_out` prints. Split out so tests can assert
/// on the formatted content instead of just observing that printing
/// doesn't panic.
fn format_console_line(tick: &CollectedTick, kind: &str, k8s: Option<&KubernetesMeta>) -> String {
    let cpu = if tick.cpu.valid { format!("{:.1}%", tick.cpu.usage_percent) } else { "n/a".to_string() };
    let mem = if tick.mem.valid {
        if tick.mem.used_percent.is_nan() {
            format!("{} bytes", tick.mem.used_bytes)
        } else {
            format!("{:.1}%", tick.mem.used_percent)
        }
    } else {
        "n/a".to_string()
    };
    let disk = if tick.disk.valid { format!("{:.1}%", tick.disk.used_percent) } else { "n/a".to_string() };
    let procs = if tick.proc.valid { tick.proc.count.to_string() } else { "n/a".to_string() };

    let mut line = format!(
        "[{kind}] Seq: {} | Time: {} | CPU: {cpu} | Mem: {mem} | Disk: {disk} | Procs: {procs}",
        tick.seq,
        tick.ts.to_rfc3339(),
    );
    if let Some(meta) = k8s {
        line.push_str(&format!(" | Pod: {}/{}@{}", meta.namespace, meta.pod_name, meta.node_name));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{CpuSample, DiskSample, MemSample, ProcSample};

    fn invalid_tick() -> CollectedTick {
        CollectedTick {
            seq: 7,
            ts: chrono::Utc::now(),
            cpu: CpuSample::invalid(),
            mem: MemSample::invalid(),
            disk: DiskSample::invalid(),
            proc: ProcSample::invalid(),
        }
    }

    #[test]
    fn console_out_does_not_panic_on_all_invalid_samples() {
        console_out(&invalid_tick(), "host", None);
    }

    #[test]
    fn formatted_line_contains_every_s6_token() {
        let tick = CollectedTick {
            seq: 3,
            ts: chrono::Utc::now(),
            cpu: CpuSample { usage_percent: 12.5, limit_cores: 4.0, valid: true },
            mem: MemSample { used_bytes: 100, limit_bytes: 200, used_percent: 50.0, valid: true },
            disk: DiskSample { total_bytes: 100, used_bytes: 50, used_percent: 50.0, valid: true },
            proc: ProcSample { count: 9, valid: true },
        };
        let line = format_console_line(&tick, "host", None);
        for token in ["Seq:", "CPU:", "Mem:", "Disk:", "Procs:"] {
            assert!(line.contains(token), "line {line:?} is missing {token}");
        }
        assert!(line.contains("Seq: 3"));
        assert!(line.contains("Procs: 9"));
    }

    #[test]
    fn formatted_line_includes_kubernetes_meta_when_present() {
        let meta = KubernetesMeta {
            namespace: "ns".to_string(),
            pod_name: "pod".to_string(),
            node_name: "node".to_string(),
            valid: true,
        };
        let line = format_console_line(&invalid_tick(), "container", Some(&meta));
        assert!(line.contains("Pod: ns/pod@node"));
    }

    #[tokio::test]
    async fn once_mode_runs_a_single_tick() {
        let env = Box::new(agent_core::HostEnv::new("/nonexistent-root"));
        let agent_loop = AgentLoop::new(env, None, Duration::from_millis(10));
        agent_loop.run(true, std::future::pending()).await;
        assert_eq!(agent_loop.seq.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_with_no_rpc_client_is_a_no_op() {
        let env = Box::new(agent_core::HostEnv::new("/nonexistent-root"));
        let agent_loop = AgentLoop::new(env, None, Duration::from_millis(10));
        agent_loop.shutdown();
    }

    #[tokio::test]
    async fn shutdown_closes_a_solely_owned_rpc_client() {
        let env = Box::new(agent_core::HostEnv::new("/nonexistent-root"));
        let rpc = Arc::new(
            RpcClient::connect_lazy("http://127.0.0.1:1", crate::rpc_client::BackoffConfig::default())
                .unwrap(),
        );
        let agent_loop = AgentLoop::new(env, Some(rpc), Duration::from_millis(10));
        agent_loop.shutdown();
    }
}
