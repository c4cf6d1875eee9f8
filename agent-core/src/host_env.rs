//! Bare-host metric backend: reads `/proc` directly, no cgroup layer.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::env::EnvBackend;
use crate::samples::{CpuSample, DiskSample, MemSample, ProcSample};
use crate::sysreader::{self, HostCpuCounters};

pub struct HostEnv {
    proc_root: PathBuf,
    logical_cpus: f64,
    prev: Mutex<Option<HostCpuCounters>>,
}

impl HostEnv {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            logical_cpus: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1) as f64,
            prev: Mutex::new(None),
        }
    }
}

impl EnvBackend for HostEnv {
    fn kind(&self) -> &'static str {
        "host"
    }

    fn cpu(&self) -> CpuSample {
        let curr = match sysreader::read_proc_stat_cpu(&self.proc_root) {
            Some(c) => c,
            None => return CpuSample::invalid(),
        };

        let mut prev_guard = self.prev.lock().unwrap();
        let prev = *prev_guard;
        *prev_guard = Some(curr);
        drop(prev_guard);

        let prev = match prev {
            Some(p) => p,
            None => return CpuSample::invalid(),
        };

        match sysreader::calc_cpu_usage(prev, curr) {
            Some(usage_percent) => {
                CpuSample { usage_percent, limit_cores: self.logical_cpus, valid: true }
            }
            None => CpuSample::invalid(),
        }
    }

    fn mem(&self) -> MemSample {
        let (total_kb, avail_kb) = match sysreader::read_meminfo(&self.proc_root) {
            Some(v) => v,
            None => return MemSample::invalid(),
        };
        match sysreader::calc_mem_usage_percent(total_kb, avail_kb) {
            Some(used_percent) => MemSample {
                used_bytes: (total_kb - avail_kb) * 1024,
                limit_bytes: total_kb * 1024,
                used_percent,
                valid: true,
            },
            None => MemSample::invalid(),
        }
    }

    fn disk(&self) -> DiskSample {
        disk_at(Path::new("/"))
    }

    fn procs(&self) -> ProcSample {
        match sysreader::count_procs(&self.proc_root) {
            Some(count) => ProcSample { count, valid: true },
            None => ProcSample::invalid(),
        }
    }
}

/// Shared with `ContainerEnv`, which reuses the host disk implementation.
pub(crate) fn disk_at(path: &Path) -> DiskSample {
    let (total, avail) = match sysreader::read_disk(path) {
        Some(v) => v,
        None => return DiskSample::invalid(),
    };
    match sysreader::calc_disk_usage_percent(total, avail) {
        Some(used_percent) => {
            DiskSample { total_bytes: total, used_bytes: total - avail, used_percent, valid: true }
        }
        None => DiskSample::invalid(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_proc_root(stat_line: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("proc")).unwrap();
        fs::write(dir.path().join("proc/stat"), stat_line).unwrap();
        dir
    }

    #[test]
    fn first_sample_is_invalid_but_primes_state() {
        let dir = make_proc_root("cpu  1000 0 500 2000 100 10 20 0\n");
        let env = HostEnv::new(dir.path());
        assert!(!env.cpu().valid);
    }

    #[test]
    fn second_sample_yields_a_valid_delta() {
        let dir = make_proc_root("cpu  1000 0 500 2000 100 10 20 0\n");
        let env = HostEnv::new(dir.path());
        assert!(!env.cpu().valid);

        fs::write(dir.path().join("proc/stat"), "cpu  1100 0 550 2100 100 10 20 0\n").unwrap();
        let cpu = env.cpu();
        assert!(cpu.valid);
        assert!((cpu.usage_percent - 60.0).abs() < 0.0001);
    }

    #[test]
    fn missing_stat_file_yields_invalid_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let env = HostEnv::new(dir.path());
        assert!(!env.cpu().valid);
    }
}
