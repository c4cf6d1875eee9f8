//! Per-tick sample structs produced by an [`crate::env::EnvBackend`].
//!
//! Every sample carries its own `valid` flag. A sampler that cannot
//! produce a trustworthy reading this tick returns the sample anyway,
//! flagged invalid, rather than propagating an error — a single bad
//! kernel read must never take down the agent loop.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuSample {
    pub usage_percent: f64,
    /// Number of cores available to this process. `-1.0` means
    /// unlimited (host, or an unconstrained container).
    pub limit_cores: f64,
    pub valid: bool,
}

impl CpuSample {
    pub fn invalid() -> Self {
        Self { usage_percent: 0.0, limit_cores: -1.0, valid: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemSample {
    pub used_bytes: u64,
    /// `0` paired with a NaN `used_percent` means unlimited.
    pub limit_bytes: u64,
    pub used_percent: f64,
    pub valid: bool,
}

impl MemSample {
    pub fn invalid() -> Self {
        Self { used_bytes: 0, limit_bytes: 0, used_percent: 0.0, valid: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskSample {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub used_percent: f64,
    pub valid: bool,
}

impl DiskSample {
    pub fn invalid() -> Self {
        Self { total_bytes: 0, used_bytes: 0, used_percent: 0.0, valid: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcSample {
    pub count: i64,
    pub valid: bool,
}

impl ProcSample {
    pub fn invalid() -> Self {
        Self { count: 0, valid: false }
    }
}

/// One full collection cycle: a sequence number, a timestamp, and the
/// four sample kinds a backend produces.
#[derive(Debug, Clone, Copy)]
pub struct CollectedTick {
    pub seq: i64,
    pub ts: chrono::DateTime<chrono::Utc>,
    pub cpu: CpuSample,
    pub mem: MemSample,
    pub disk: DiskSample,
    pub proc: ProcSample,
}
