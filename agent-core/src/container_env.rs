//! Cgroup v2 container metric backend. CPU and memory are read from
//! the container's own cgroup; disk and process counts reuse the host
//! implementation, since both still observe the shared mount namespace
//! and `/proc`.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use crate::env::EnvBackend;
use crate::host_env::disk_at;
use crate::samples::{CpuSample, DiskSample, MemSample, ProcSample};
use crate::sysreader::{self, CgroupV2Reader};

pub struct ContainerEnv {
    reader: CgroupV2Reader,
    proc_root: PathBuf,
    prev: Mutex<Option<(Instant, u64)>>,
}

impl ContainerEnv {
    pub fn new(reader: CgroupV2Reader, proc_root: impl Into<PathBuf>) -> Self {
        Self { reader, proc_root: proc_root.into(), prev: Mutex::new(None) }
    }
}

/// Pure CPU-usage-percent calculation from a usage_usec delta over a
/// wall-clock delta, both in microseconds. `None` on a counter
/// decrease or a non-positive wall delta.
pub fn calc_container_usage(prev_usage_usec: u64, curr_usage_usec: u64, wall_usec: f64) -> Option<f64> {
    if curr_usage_usec < prev_usage_usec || wall_usec <= 0.0 {
        return None;
    }
    let delta_usec = curr_usage_usec - prev_usage_usec;
    Some(delta_usec as f64 / wall_usec * 100.0)
}

impl EnvBackend for ContainerEnv {
    fn kind(&self) -> &'static str {
        "container"
    }

    fn cpu(&self) -> CpuSample {
        let usage_usec = match self.reader.cpu_usage_usec() {
            Some(v) => v,
            None => return CpuSample::invalid(),
        };
        let (quota, period, unlimited) = match self.reader.cpu_max() {
            Some(v) => v,
            None => return CpuSample::invalid(),
        };

        let mut limit_cores = if unlimited { -1.0 } else { quota as f64 / period as f64 };
        if limit_cores <= 0.0 {
            limit_cores = -1.0;
        }

        let now = Instant::now();
        let mut prev_guard = self.prev.lock().unwrap();
        let prev = *prev_guard;
        *prev_guard = Some((now, usage_usec));
        drop(prev_guard);

        let (prev_ts, prev_usage) = match prev {
            Some(p) => p,
            None => return CpuSample { usage_percent: 0.0, limit_cores, valid: false },
        };

        let dt = now.saturating_duration_since(prev_ts);
        if dt.is_zero() {
            return CpuSample { usage_percent: 0.0, limit_cores, valid: false };
        }

        match calc_container_usage(prev_usage, usage_usec, dt.as_micros() as f64) {
            Some(usage_percent) => CpuSample { usage_percent, limit_cores, valid: true },
            None => CpuSample { usage_percent: 0.0, limit_cores, valid: false },
        }
    }

    fn mem(&self) -> MemSample {
        let used = match self.reader.mem_current() {
            Some(v) => v,
            None => return MemSample::invalid(),
        };
        let (limit, unlimited) = match self.reader.mem_max() {
            Some(v) => v,
            None => return MemSample::invalid(),
        };
        if unlimited || limit == 0 {
            return MemSample { used_bytes: used, limit_bytes: 0, used_percent: f64::NAN, valid: true };
        }
        let used_percent = used as f64 / limit as f64 * 100.0;
        MemSample { used_bytes: used, limit_bytes: limit, used_percent, valid: true }
    }

    fn disk(&self) -> DiskSample {
        disk_at(std::path::Path::new("/"))
    }

    fn procs(&self) -> ProcSample {
        match sysreader::count_procs(&self.proc_root) {
            Some(count) => ProcSample { count, valid: true },
            None => ProcSample::invalid(),
        }
    }
}
