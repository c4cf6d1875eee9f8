//! In-memory agent registry: `agent_id -> AgentState`, guarded by a
//! single mutex per the design's concurrency model — handlers never
//! hold it across I/O, only the GC sweeper holds it for a full pass.

use std::collections::HashMap;
use std::time::Duration;

use agent_common::{new_agent_id, pb};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tonic::Status;

#[derive(Debug, Clone)]
pub struct AgentState {
    pub hostname: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub boot_id: Option<String>,
    pub pending_commands: Vec<pb::Command>,
}

#[derive(Default)]
pub struct Registry {
    agents: Mutex<HashMap<String, AgentState>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fresh entry and returns its id. Rejects an empty
    /// hostname before ever touching the map.
    pub async fn register(&self, hostname: &str) -> Result<String, Status> {
        if hostname.is_empty() {
            return Err(Status::invalid_argument("hostname must not be empty"));
        }
        let id = new_agent_id();
        let now = Utc::now();
        let state = AgentState {
            hostname: hostname.to_string(),
            first_seen: now,
            last_seen: now,
            boot_id: None,
            pending_commands: Vec::new(),
        };
        self.agents.lock().await.insert(id.clone(), state);
        Ok(id)
    }

    /// Always updates `last_seen` on a known id — heartbeats and
    /// metrics both keep an agent alive, not just heartbeats alone.
    pub async fn touch(&self, agent_id: &str) -> Result<(), Status> {
        if agent_id.is_empty() {
            return Err(Status::invalid_argument("agent_id must not be empty"));
        }
        let mut agents = self.agents.lock().await;
        match agents.get_mut(agent_id) {
            Some(state) => {
                state.last_seen = Utc::now();
                Ok(())
            }
            None => Err(Status::not_found("unknown agent_id")),
        }
    }

    pub async fn exists(&self, agent_id: &str) -> Result<(), Status> {
        if agent_id.is_empty() {
            return Err(Status::invalid_argument("agent_id must not be empty"));
        }
        if self.agents.lock().await.contains_key(agent_id) {
            Ok(())
        } else {
            Err(Status::not_found("unknown agent_id"))
        }
    }

    pub async fn len(&self) -> usize {
        self.agents.lock().await.len()
    }

    /// Evicts every entry whose silence exceeds `ttl`. Holds the lock
    /// for the full pass: acceptable since the registry stays small.
    pub async fn sweep(&self, ttl: Duration) -> Vec<String> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
        let mut agents = self.agents.lock().await;
        let expired: Vec<String> = agents
            .iter()
            .filter(|(_, state)| now - state.last_seen > ttl)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            agents.remove(id);
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_heartbeat_round_trips() {
        let registry = Registry::new();
        let id = registry.register("host-a").await.unwrap();
        assert!(registry.touch(&id).await.is_ok());
    }

    #[tokio::test]
    async fn empty_hostname_is_rejected() {
        let registry = Registry::new();
        let err = registry.register("").await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn unknown_agent_id_is_not_found() {
        let registry = Registry::new();
        let err = registry.touch("does-not-exist").await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::NotFound);
    }

    #[tokio::test]
    async fn sweep_evicts_only_entries_past_ttl() {
        let registry = Registry::new();
        let fresh = registry.register("fresh").await.unwrap();
        let stale = registry.register("stale").await.unwrap();
        {
            let mut agents = registry.agents.lock().await;
            agents.get_mut(&stale).unwrap().last_seen = Utc::now() - chrono::Duration::seconds(120);
        }

        let evicted = registry.sweep(Duration::from_secs(60)).await;
        assert_eq!(evicted, vec![stale.clone()]);
        assert!(registry.exists(&fresh).await.is_ok());
        assert!(registry.exists(&stale).await.is_err());
    }

    #[tokio::test]
    async fn heartbeat_after_eviction_returns_not_found() {
        let registry = Registry::new();
        let id = registry.register("h").await.unwrap();
        {
            let mut agents = registry.agents.lock().await;
            agents.get_mut(&id).unwrap().last_seen = Utc::now() - chrono::Duration::seconds(3600);
        }
        registry.sweep(Duration::from_secs(60)).await;
        assert!(registry.touch(&id).await.is_err());
    }
}
