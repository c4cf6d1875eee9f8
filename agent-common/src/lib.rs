//! Types and generated gRPC stubs shared between `telemetry-agent` and
//! `collector`. Kept deliberately thin: the wire schema and the one
//! identity type both sides need to agree on, nothing else.

use serde::{Deserialize, Serialize};

/// Generated from `proto/agent.proto`. Message field order is pinned by
/// the `.proto` file for binary compatibility with any other peer
/// speaking the same schema.
pub mod pb {
    tonic::include_proto!("agent");
}

/// An agent's identity as established by `Register`. `agent_id` is
/// allocated by the collector; `hostname` is supplied by the agent and
/// never changes for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub agent_id: String,
    pub hostname: String,
}

impl AgentIdentity {
    pub fn new(agent_id: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self { agent_id: agent_id.into(), hostname: hostname.into() }
    }
}

/// Generates a fresh agent identifier. Collector-side only — agents
/// never mint their own id, they receive one from `Register`.
pub fn new_agent_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time as Unix seconds, the wire representation used by every
/// timestamped message (`Heartbeat.time`, `MetricBatch.time`, …).
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
