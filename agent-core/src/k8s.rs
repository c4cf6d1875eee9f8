//! Optional Kubernetes enrichment. Deliberately not a real client of
//! the Kubernetes API — it reads the same environment variables the
//! kubelet injects into every pod and nothing else. Call sites probe
//! for the capability via [`crate::env::EnvBackend::k8s_meta`] and skip
//! enrichment silently when it's absent; there is no separate
//! "running in Kubernetes" branch anywhere else in the agent.

use std::path::Path;

use crate::env::EnvBackend;
use crate::samples::{CpuSample, DiskSample, MemSample, ProcSample};

const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KubernetesMeta {
    pub namespace: String,
    pub pod_name: String,
    pub node_name: String,
    pub valid: bool,
}

/// Reads `POD_NAME`/`POD_NAMESPACE`/`NODE_NAME` once at startup.
/// Returns `None` outside a cluster or when the pod identity vars are
/// unset — enrichment is best-effort, never required.
pub fn detect_kubernetes() -> Option<KubernetesMeta> {
    if !in_cluster() {
        return None;
    }
    let namespace = std::env::var("POD_NAMESPACE").ok()?;
    let pod_name = std::env::var("POD_NAME").ok()?;
    if namespace.is_empty() || pod_name.is_empty() {
        return None;
    }
    let node_name = std::env::var("NODE_NAME").unwrap_or_default();
    Some(KubernetesMeta { namespace, pod_name, node_name, valid: true })
}

fn in_cluster() -> bool {
    std::env::var("KUBERNETES_SERVICE_HOST").map(|v| !v.is_empty()).unwrap_or(false)
        || Path::new(SERVICE_ACCOUNT_TOKEN).exists()
}

/// Wraps any `EnvBackend` to additionally expose the Kubernetes
/// identity probed once at startup.
pub struct WithKubernetesMeta<E> {
    inner: E,
    meta: KubernetesMeta,
}

impl<E: EnvBackend> WithKubernetesMeta<E> {
    pub fn new(inner: E, meta: KubernetesMeta) -> Self {
        Self { inner, meta }
    }
}

impl<E: EnvBackend> EnvBackend for WithKubernetesMeta<E> {
    fn kind(&self) -> &'static str {
        self.inner.kind()
    }
    fn cpu(&self) -> CpuSample {
        self.inner.cpu()
    }
    fn mem(&self) -> MemSample {
        self.inner.mem()
    }
    fn disk(&self) -> DiskSample {
        self.inner.disk()
    }
    fn procs(&self) -> ProcSample {
        self.inner.procs()
    }
    fn k8s_meta(&self) -> Option<KubernetesMeta> {
        Some(self.meta.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outside_a_cluster_yields_none() {
        std::env::remove_var("KUBERNETES_SERVICE_HOST");
        std::env::remove_var("POD_NAME");
        std::env::remove_var("POD_NAMESPACE");
        assert!(detect_kubernetes().is_none());
    }
}
