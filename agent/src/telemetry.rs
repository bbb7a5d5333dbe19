//! Host statistics

use serde::{Deserialize, Serialize};
use sysinfo::{Disks, System, MINIMUM_CPU_UPDATE_INTERVAL};

/// Usage of one mounted disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskStats {
    pub mount_point: String,

    /// Used space in bytes
    pub used: u64,

    /// Total space in bytes
    pub total: u64,
}

/// System stats snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    /// CPU usage percentage (0-100)
    pub cpu_usage: f32,

    pub cpu_count: usize,

    /// Memory usage in bytes
    pub memory_used: u64,

    /// Total memory in bytes
    pub memory_total: u64,

    pub memory_percent: f32,

    /// Used space over all disks in bytes
    pub disk_used: u64,

    /// Total space over all disks in bytes
    pub disk_total: u64,

    pub disk_percent: f32,

    pub disks: Vec<DiskStats>,

    /// System uptime in seconds
    pub uptime_secs: u64,

    pub hostname: String,
}

/// Collect a stats snapshot. Blocks for the CPU sampling interval, call it
/// from a blocking task.
pub fn collect_stats() -> SystemStats {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.refresh_cpu_usage();
    std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_usage();

    let disks: Vec<DiskStats> = Disks::new_with_refreshed_list()
        .iter()
        .map(|disk| DiskStats {
            mount_point: disk.mount_point().display().to_string(),
            used: disk.total_space().saturating_sub(disk.available_space()),
            total: disk.total_space(),
        })
        .collect();
    let (disk_used, disk_total) = disks
        .iter()
        .fold((0u64, 0u64), |(used, total), d| (used + d.used, total + d.total));

    let memory_used = sys.used_memory();
    let memory_total = sys.total_memory();

    SystemStats {
        cpu_usage: sys.global_cpu_usage(),
        cpu_count: sys.cpus().len(),
        memory_used,
        memory_total,
        memory_percent: percent(memory_used, memory_total),
        disk_used,
        disk_total,
        disk_percent: percent(disk_used, disk_total),
        disks,
        uptime_secs: System::uptime(),
        hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
    }
}

fn percent(used: u64, total: u64) -> f32 {
    if total > 0 {
        (used as f32 / total as f32) * 100.0
    } else {
        0.0
    }
}
