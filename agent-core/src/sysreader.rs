//! Raw readers for kernel-provided text sources, `statfs`, and cgroup
//! v2 pseudo-files, plus the pure delta/percentage math built on top of
//! them.
//!
//! Every parser returns `None` on malformed or missing input rather
//! than erroring — a single unreadable `/proc` entry is a recoverable,
//! per-sample failure, never a process-ending one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The eight jiffy counters on the aggregate `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostCpuCounters {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub total: u64,
}

/// Parses the first line of `<proc_root>/proc/stat`. Requires the
/// `cpu` prefix and at least the eight jiffy fields.
pub fn read_proc_stat_cpu(proc_root: &Path) -> Option<HostCpuCounters> {
    let text = fs::read_to_string(proc_root.join("proc/stat")).ok()?;
    let line = text.lines().next()?;
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 9 || fields[0] != "cpu" {
        return None;
    }
    let parse = |i: usize| fields.get(i)?.parse::<u64>().ok();
    let user = parse(1)?;
    let nice = parse(2)?;
    let system = parse(3)?;
    let idle = parse(4)?;
    let iowait = parse(5)?;
    let irq = parse(6)?;
    let softirq = parse(7)?;
    let steal = parse(8)?;
    let total = user + nice + system + idle + iowait + irq + softirq + steal;
    Some(HostCpuCounters { user, nice, system, idle, iowait, irq, softirq, steal, total })
}

/// Computes host CPU usage percent from two consecutive counter
/// snapshots. `None` on counter reset, zero delta, or an out-of-range
/// result.
pub fn calc_cpu_usage(prev: HostCpuCounters, curr: HostCpuCounters) -> Option<f64> {
    if curr.total < prev.total {
        return None;
    }
    let total_delta = curr.total - prev.total;

    let prev_idle = prev.idle + prev.iowait;
    let curr_idle = curr.idle + curr.iowait;
    if curr_idle < prev_idle {
        return None;
    }
    let idle_delta = curr_idle - prev_idle;

    if total_delta == 0 {
        return None;
    }

    let usage = (1.0 - idle_delta as f64 / total_delta as f64) * 100.0;
    if !(0.0..=100.0).contains(&usage) {
        return None;
    }
    Some(usage)
}

/// Scans `<proc_root>/proc/meminfo` for `MemTotal`/`MemAvailable`, in kB.
pub fn read_meminfo(proc_root: &Path) -> Option<(u64, u64)> {
    let text = fs::read_to_string(proc_root.join("proc/meminfo")).ok()?;
    let mut total = None;
    let mut avail = None;
    for line in text.lines() {
        let mut fields = line.split_whitespace();
        let key = match fields.next() {
            Some(k) => k.trim_end_matches(':'),
            None => continue,
        };
        let value = match fields.next().and_then(|v| v.parse::<u64>().ok()) {
            Some(v) => v,
            None => continue,
        };
        match key {
            "MemTotal" => total = Some(value),
            "MemAvailable" => avail = Some(value),
            _ => {}
        }
    }
    Some((total?, avail?))
}

/// Computes host memory usage percent from total/available in kB.
pub fn calc_mem_usage_percent(total_kb: u64, avail_kb: u64) -> Option<f64> {
    if total_kb == 0 || avail_kb > total_kb {
        return None;
    }
    let used = total_kb - avail_kb;
    let usage = used as f64 / total_kb as f64 * 100.0;
    if !(0.0..=100.0).contains(&usage) {
        return None;
    }
    Some(usage)
}

/// Reads `total`/`avail` bytes for the filesystem mounted at `path` via
/// `statfs(2)`.
pub fn read_disk(path: &Path) -> Option<(u64, u64)> {
    statfs_totals(path)
}

#[cfg(unix)]
fn statfs_totals(path: &Path) -> Option<(u64, u64)> {
    use std::ffi::CString;
    use std::mem::MaybeUninit;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).ok()?;
    let mut stat = MaybeUninit::<libc::statfs>::uninit();
    let rc = unsafe { libc::statfs(c_path.as_ptr(), stat.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    let stat = unsafe { stat.assume_init() };
    let block_size = stat.f_bsize as u64;
    let total = (stat.f_blocks as u64).saturating_mul(block_size);
    let avail = (stat.f_bavail as u64).saturating_mul(block_size);
    Some((total, avail))
}

/// Computes disk usage percent from total/available bytes.
pub fn calc_disk_usage_percent(total: u64, avail: u64) -> Option<f64> {
    if total == 0 || avail > total {
        return None;
    }
    let used = total - avail;
    let usage = used as f64 / total as f64 * 100.0;
    if !(0.0..=100.0).contains(&usage) {
        return None;
    }
    Some(usage)
}

/// Counts all-digit entries directly under `<proc_root>/proc` — one
/// per live process, mirroring how `ps`/`top` enumerate PIDs.
pub fn count_procs(proc_root: &Path) -> Option<i64> {
    let dir = fs::read_dir(proc_root.join("proc")).ok()?;
    let mut count = 0i64;
    for entry in dir.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
            count += 1;
        }
    }
    Some(count)
}

/// Reader over a mounted cgroup v2 hierarchy for the container's own
/// cgroup.
#[derive(Debug, Clone)]
pub struct CgroupV2Reader {
    base: PathBuf,
}

impl CgroupV2Reader {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    fn read_file(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.base.join(name)).map(|s| s.trim().to_string())
    }

    pub fn mem_current(&self) -> Option<u64> {
        self.read_file("memory.current").ok()?.parse().ok()
    }

    /// Returns `(limit, unlimited)`. `memory.max == "max"` means unlimited.
    pub fn mem_max(&self) -> Option<(u64, bool)> {
        let raw = self.read_file("memory.max").ok()?;
        if raw == "max" {
            return Some((0, true));
        }
        raw.parse().ok().map(|v| (v, false))
    }

    pub fn cpu_usage_usec(&self) -> Option<u64> {
        let raw = self.read_file("cpu.stat").ok()?;
        raw.lines().find_map(|line| {
            let mut fields = line.split_whitespace();
            if fields.next()? == "usage_usec" {
                fields.next()?.parse::<u64>().ok()
            } else {
                None
            }
        })
    }

    /// Returns `(quota, period, unlimited)`. First token `"max"` means
    /// unlimited.
    pub fn cpu_max(&self) -> Option<(u64, u64, bool)> {
        let raw = self.read_file("cpu.max").ok()?;
        let mut fields = raw.split_whitespace();
        let quota_field = fields.next()?;
        let period: u64 = fields.next()?.parse().ok()?;
        if quota_field == "max" {
            return Some((0, period, true));
        }
        let quota: u64 = quota_field.parse().ok()?;
        Some((quota, period, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_proc_root(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (rel, content) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    #[test]
    fn s1_meminfo_is_parsed_and_usage_percent_matches() {
        let dir = write_proc_root(&[(
            "proc/meminfo",
            "MemTotal: 16000000 kB\nMemAvailable: 8000000 kB\n",
        )]);
        let (total, avail) = read_meminfo(dir.path()).unwrap();
        assert_eq!(total, 16_000_000);
        assert_eq!(avail, 8_000_000);
        let percent = calc_mem_usage_percent(total, avail).unwrap();
        assert!((percent - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn meminfo_missing_keys_is_none() {
        let dir = write_proc_root(&[("proc/meminfo", "SomeOtherKey: 1 kB\n")]);
        assert!(read_meminfo(dir.path()).is_none());
    }

    #[test]
    fn meminfo_available_exceeding_total_is_none() {
        let dir = write_proc_root(&[(
            "proc/meminfo",
            "MemTotal: 100 kB\nMemAvailable: 200 kB\n",
        )]);
        assert!(read_meminfo(dir.path()).is_none());
    }

    #[test]
    fn proc_count_only_counts_all_digit_names() {
        let dir = write_proc_root(&[
            ("proc/123/stat", "x"),
            ("proc/456/stat", "x"),
            ("proc/self/stat", "x"),
            ("proc/12a/stat", "x"),
        ]);
        assert_eq!(count_procs(dir.path()).unwrap(), 2);
    }

    #[test]
    fn cpu_stat_requires_cpu_prefix_and_eight_fields() {
        let dir = write_proc_root(&[("proc/stat", "notcpu 1 2 3 4 5 6 7 8\n")]);
        assert!(read_proc_stat_cpu(dir.path()).is_none());

        let dir = write_proc_root(&[("proc/stat", "cpu 1 2 3\n")]);
        assert!(read_proc_stat_cpu(dir.path()).is_none());
    }

    #[test]
    fn cpu_stat_line_is_parsed() {
        let dir = write_proc_root(&[("proc/stat", "cpu  1000 0 500 2000 100 10 20 0\n")]);
        let counters = read_proc_stat_cpu(dir.path()).unwrap();
        assert_eq!(counters.user, 1000);
        assert_eq!(counters.idle, 2000);
        assert_eq!(counters.total, 3630);
    }

    #[test]
    fn cpu_delta_matches_formula_across_two_samples() {
        let prev = HostCpuCounters {
            user: 1000,
            nice: 0,
            system: 500,
            idle: 2000,
            iowait: 100,
            irq: 10,
            softirq: 20,
            steal: 0,
            total: 1000 + 500 + 2000 + 100 + 10 + 20,
        };
        let curr = HostCpuCounters {
            user: 1100,
            nice: 0,
            system: 550,
            idle: 2100,
            iowait: 100,
            irq: 10,
            softirq: 20,
            steal: 0,
            total: 1100 + 550 + 2100 + 100 + 10 + 20,
        };
        // idle_delta = (2100+100) - (2000+100) = 100
        // total_delta = 3880 - 3630 = 250
        // usage = (1 - 100/250) * 100 = 60.0
        let usage = calc_cpu_usage(prev, curr).unwrap();
        assert!((usage - 60.0).abs() < 0.0001);
    }

    #[test]
    fn cpu_counter_reset_is_rejected() {
        let prev = HostCpuCounters { total: 200, ..Default::default() };
        let curr = HostCpuCounters { total: 100, ..Default::default() };
        assert!(calc_cpu_usage(prev, curr).is_none());
    }

    #[test]
    fn cpu_zero_total_delta_is_rejected() {
        let prev = HostCpuCounters { total: 100, idle: 50, ..Default::default() };
        let curr = HostCpuCounters { total: 100, idle: 50, ..Default::default() };
        assert!(calc_cpu_usage(prev, curr).is_none());
    }

    #[test]
    fn disk_usage_percent_rejects_avail_over_total() {
        assert!(calc_disk_usage_percent(100, 200).is_none());
        assert_eq!(calc_disk_usage_percent(100, 40).unwrap(), 60.0);
    }

    #[test]
    fn cgroup_v2_reader_parses_unlimited_memory_max() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("memory.max"), "max\n").unwrap();
        fs::write(dir.path().join("memory.current"), "12345\n").unwrap();
        let reader = CgroupV2Reader::new(dir.path().to_path_buf());
        assert_eq!(reader.mem_current(), Some(12345));
        assert_eq!(reader.mem_max(), Some((0, true)));
    }

    #[test]
    fn cgroup_v2_reader_parses_cpu_max_and_usage() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cpu.max"), "50000 100000\n").unwrap();
        fs::write(dir.path().join("cpu.stat"), "usage_usec 42\nnr_periods 0\n").unwrap();
        let reader = CgroupV2Reader::new(dir.path().to_path_buf());
        assert_eq!(reader.cpu_max(), Some((50000, 100000, false)));
        assert_eq!(reader.cpu_usage_usec(), Some(42));
    }

    #[test]
    fn cgroup_v2_reader_parses_unlimited_cpu_max() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cpu.max"), "max 100000\n").unwrap();
        let reader = CgroupV2Reader::new(dir.path().to_path_buf());
        assert_eq!(reader.cpu_max(), Some((0, 100000, true)));
    }
}
