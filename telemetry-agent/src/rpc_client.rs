//! Unary gRPC client for the agent. One long-lived [`tonic::transport::Channel`]
//! per process; every call carries its own deadline so a hung collector
//! can never block the ticker indefinitely.

use std::time::Duration;

use agent_common::pb::agent_service_client::AgentServiceClient;
use agent_common::pb::{
    Ack, CommandResult, CommandStatus, Heartbeat, HeartbeatResponse, Metric, MetricBatch,
    RegisterRequest,
};
use agent_common::unix_now;
use agent_core::MetricPoint;
use tokio::sync::Mutex;
use tonic::transport::{Channel, Endpoint};
use tonic::Request;

use crate::error::AgentError;

pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(3);
pub const METRICS_TIMEOUT: Duration = Duration::from_secs(5);
pub const COMMAND_RESULT_TIMEOUT: Duration = Duration::from_secs(3);
pub const REGISTER_TIMEOUT: Duration = Duration::from_secs(5);

/// Dial-retry backoff parameters for the underlying channel, per the
/// design's "lazy reconnect via the transport's built-in backoff":
/// `connect_lazy` defers the TCP handshake to the first call, and a
/// failed connect is retried no sooner than `base`, growing by
/// `multiplier` each attempt up to `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    pub base: Duration,
    pub multiplier: f64,
    pub max: Duration,
    pub min_connect_timeout: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(200),
            multiplier: 1.6,
            max: Duration::from_secs(5),
            min_connect_timeout: Duration::from_secs(3),
        }
    }
}

impl BackoffConfig {
    /// Delay before reconnect attempt `attempt` (0-indexed), capped at `max`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self.base.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(scaled).min(self.max)
    }
}

/// Single-endpoint unary client. `agent_id` is populated by [`RpcClient::register`]
/// and is required by every call after it.
pub struct RpcClient {
    client: Mutex<AgentServiceClient<Channel>>,
    identity: Mutex<Option<(String, String)>>,
}

impl RpcClient {
    /// Builds the channel without blocking — the first RPC pays the
    /// cost of the actual TCP/HTTP2 handshake.
    pub fn connect_lazy(addr: &str, backoff: BackoffConfig) -> Result<Self, AgentError> {
        let endpoint: Endpoint = Channel::from_shared(addr.to_string())?
            .connect_timeout(backoff.min_connect_timeout);
        let channel = endpoint.connect_lazy();
        Ok(Self { client: Mutex::new(AgentServiceClient::new(channel)), identity: Mutex::new(None) })
    }

    /// Must be called exactly once before any other operation.
    pub async fn register(&self, hostname: &str) -> Result<String, AgentError> {
        if hostname.is_empty() {
            return Err(AgentError::EmptyHostname);
        }
        let req = Request::new(RegisterRequest { hostname: hostname.to_string() });
        let resp = call_with_timeout(self.client.lock().await.register(req), REGISTER_TIMEOUT).await?;
        let agent_id = resp.into_inner().agent_id;
        *self.identity.lock().await = Some((agent_id.clone(), hostname.to_string()));
        Ok(agent_id)
    }

    pub async fn send_heartbeat(&self) -> Result<HeartbeatResponse, AgentError> {
        let (agent_id, hostname) = self.identity().await?;
        let req = Request::new(Heartbeat { agent_id, hostname, time: unix_now() });
        let resp =
            call_with_timeout(self.client.lock().await.send_heartbeat(req), HEARTBEAT_TIMEOUT).await?;
        Ok(resp.into_inner())
    }

    pub async fn send_metrics(&self, points: &[MetricPoint]) -> Result<Ack, AgentError> {
        let (agent_id, _hostname) = self.identity().await?;
        let metrics = points
            .iter()
            .map(|p| Metric { name: p.name.to_string(), value: p.value, unit: p.unit.to_string() })
            .collect();
        let req = Request::new(MetricBatch { agent_id, time: unix_now(), metrics });
        let resp = call_with_timeout(self.client.lock().await.send_metrics(req), METRICS_TIMEOUT).await?;
        Ok(resp.into_inner())
    }

    pub async fn report_command_result(
        &self,
        command_id: &str,
        status: CommandStatus,
        output: &str,
        error: &str,
    ) -> Result<Ack, AgentError> {
        let (agent_id, _hostname) = self.identity().await?;
        let req = Request::new(CommandResult {
            agent_id,
            command_id: command_id.to_string(),
            time: unix_now(),
            status: status as i32,
            output: output.to_string(),
            error: error.to_string(),
        });
        let resp =
            call_with_timeout(self.client.lock().await.report_command_result(req), COMMAND_RESULT_TIMEOUT)
                .await?;
        Ok(resp.into_inner())
    }

    /// Graceful teardown. The channel has no explicit close; dropping
    /// it releases the connection, so this just documents the exit path.
    pub fn close(self) {
        drop(self);
    }

    async fn identity(&self) -> Result<(String, String), AgentError> {
        self.identity
            .lock()
            .await
            .clone()
            .ok_or_else(|| AgentError::Status(tonic::Status::failed_precondition("register() not called")))
    }
}

async fn call_with_timeout<F, T>(fut: F, timeout: Duration) -> Result<T, AgentError>
where
    F: std::future::Future<Output = Result<T, tonic::Status>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(status)) => Err(AgentError::Status(status)),
        Err(_) => Err(AgentError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_by_multiplier_and_caps_at_max() {
        let cfg = BackoffConfig::default();
        let d0 = cfg.delay_for_attempt(0);
        let d1 = cfg.delay_for_attempt(1);
        assert_eq!(d0, Duration::from_millis(200));
        assert!(d1 > d0);
        let d_far = cfg.delay_for_attempt(100);
        assert_eq!(d_far, cfg.max);
    }

    #[test]
    fn connect_lazy_does_not_block() {
        let client = RpcClient::connect_lazy("http://127.0.0.1:1", BackoffConfig::default());
        assert!(client.is_ok());
    }
}
