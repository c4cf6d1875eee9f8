//! One-shot backend classifier, invoked once at agent startup. Never
//! fails the process — any ambiguity in detection falls back to
//! `HostEnv`, which is always correct to run, just possibly less
//! precise about resource limits.

use std::path::{Path, PathBuf};

use crate::container_env::ContainerEnv;
use crate::env::EnvBackend;
use crate::host_env::HostEnv;
use crate::sysreader::CgroupV2Reader;

const CONTAINER_MARKERS: [&str; 5] = ["docker", "kubepods", "containerd", "podman", "lxc"];

pub fn detect_env(proc_root: &Path) -> Box<dyn EnvBackend> {
    if is_container(proc_root) && is_cgroup_v2() {
        if let Some(cg_path) = self_cgroup_path_v2(proc_root) {
            let base = PathBuf::from("/sys/fs/cgroup").join(cg_path.trim_start_matches('/'));
            let reader = CgroupV2Reader::new(base);
            return Box::new(ContainerEnv::new(reader, proc_root.to_path_buf()));
        }
    }
    Box::new(HostEnv::new(proc_root.to_path_buf()))
}

fn is_container(proc_root: &Path) -> bool {
    if Path::new("/.dockerenv").exists() || Path::new("/run/.containerenv").exists() {
        return true;
    }
    if let Ok(contents) = std::fs::read_to_string(proc_root.join("proc/1/cgroup")) {
        return CONTAINER_MARKERS.iter().any(|marker| contents.contains(marker));
    }
    false
}

fn is_cgroup_v2() -> bool {
    Path::new("/sys/fs/cgroup/cgroup.controllers").exists()
}

fn self_cgroup_path_v2(proc_root: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(proc_root.join("proc/self/cgroup")).ok()?;
    for line in contents.lines() {
        let parts: Vec<&str> = line.splitn(3, ':').collect();
        if parts.len() != 3 {
            continue;
        }
        if parts[0] == "0" && parts[1].is_empty() {
            if parts[2].is_empty() {
                return None;
            }
            return Some(parts[2].to_string());
        }
    }
    None
}
