//! Metric-sampling core shared by the telemetry agent: environment
//! detection, the two sampling backends, and the pure projection from
//! a collected tick to wire-ready metric points.
//!
//! This crate touches no network and does no logging of its own — it
//! hands back sample structs with a `valid` flag and lets the caller
//! (`telemetry-agent`) decide what to do with a bad reading.

pub mod config;
pub mod container_env;
pub mod detector;
pub mod env;
pub mod error;
pub mod host_env;
pub mod k8s;
pub mod metrics;
pub mod samples;
pub mod sysreader;

pub use config::Config;
pub use container_env::ContainerEnv;
pub use detector::detect_env;
pub use env::EnvBackend;
pub use error::ConfigError;
pub use host_env::HostEnv;
pub use k8s::{detect_kubernetes, KubernetesMeta, WithKubernetesMeta};
pub use metrics::{project, MetricPoint};
pub use samples::{CollectedTick, CpuSample, DiskSample, MemSample, ProcSample};
