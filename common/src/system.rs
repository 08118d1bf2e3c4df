//! Host metrics reported by the host bridge.

use serde::{Deserialize, Serialize};

/// Capacity of one mounted disk, in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskInfo {
    pub name: String,
    pub total_space: u64,
    pub available_space: u64,
}

/// Snapshot of the local machine. Memory and swap figures are in bytes, usages in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub total_memory: u64,
    pub used_memory: u64,
    pub total_swap: u64,
    pub used_swap: u64,
    pub cpu_usage: f32,
    pub gpu_usage: Option<f32>,
    pub disk_space: Vec<DiskInfo>,
    pub cpu_name: String,
    pub gpu_name: Option<String>,
    pub system_name: String,
    #[serde(default)]
    pub cpu_vendor: String,
    #[serde(default)]
    pub cpu_threads: usize,
    #[serde(default)]
    pub cpu_frequency_mhz: u64,
    #[serde(default)]
    pub architecture: String,
}

impl SystemInfo {
    /// The disk with the largest capacity, if any disk was reported.
    #[must_use]
    pub fn largest_disk(&self) -> Option<&DiskInfo> {
        self.disk_space.iter().max_by_key(|disk| disk.total_space)
    }
}
