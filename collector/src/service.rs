//! `AgentService` gRPC handlers. Each call validates `agent_id`
//! against the registry before doing anything else; handlers never
//! hold the registry lock across a response construction beyond
//! reading the current timestamp.

use std::sync::Arc;

use agent_common::pb::agent_service_server::AgentService;
use agent_common::pb::{
    Ack, CommandResult, Heartbeat, HeartbeatResponse, MetricBatch, RegisterRequest,
    RegisterResponse,
};
use tonic::{Request, Response, Status};
use tracing::{debug, info};

use crate::registry::Registry;

pub struct AgentServiceImpl {
    registry: Arc<Registry>,
}

impl AgentServiceImpl {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

#[tonic::async_trait]
impl AgentService for AgentServiceImpl {
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterResponse>, Status> {
        let hostname = request.into_inner().hostname;
        let agent_id = self.registry.register(&hostname).await?;
        info!(%agent_id, %hostname, "agent registered");
        Ok(Response::new(RegisterResponse { agent_id }))
    }

    async fn send_heartbeat(
        &self,
        request: Request<Heartbeat>,
    ) -> Result<Response<HeartbeatResponse>, Status> {
        let req = request.into_inner();
        self.registry.touch(&req.agent_id).await?;
        debug!(agent_id = %req.agent_id, "heartbeat received");
        Ok(Response::new(HeartbeatResponse { ok: true, pending_commands: Vec::new() }))
    }

    async fn send_metrics(&self, request: Request<MetricBatch>) -> Result<Response<Ack>, Status> {
        let req = request.into_inner();
        self.registry.touch(&req.agent_id).await?;
        for metric in &req.metrics {
            info!(agent_id = %req.agent_id, name = %metric.name, value = metric.value, unit = %metric.unit, "metric point");
        }
        Ok(Response::new(Ack { ok: true, message: String::new() }))
    }

    async fn report_command_result(
        &self,
        request: Request<CommandResult>,
    ) -> Result<Response<Ack>, Status> {
        let req = request.into_inner();
        self.registry.exists(&req.agent_id).await?;
        info!(agent_id = %req.agent_id, command_id = %req.command_id, status = req.status, "command result reported");
        Ok(Response::new(Ack { ok: true, message: String::new() }))
    }
}
