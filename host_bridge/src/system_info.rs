//! Host metrics collection backed by `sysinfo`.

use std::{env, thread};

use devicehub_common::{DiskInfo, SystemInfo};
use sysinfo::{CpuRefreshKind, Disks, MINIMUM_CPU_UPDATE_INTERVAL, RefreshKind, System};

use crate::gpu;

const UNKNOWN_CPU: &str = "Unknown CPU";

/// Collects a full [`SystemInfo`] snapshot.
///
/// Blocks for one CPU sampling interval so that usage figures are meaningful; call it from a
/// blocking context.
#[must_use]
pub fn get_system_info() -> SystemInfo {
    let mut sys = System::new_with_specifics(
        RefreshKind::nothing().with_cpu(CpuRefreshKind::everything()),
    );
    thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_all();
    sys.refresh_memory();

    let (cpu_name, cpu_vendor, cpu_frequency_mhz) = sys.cpus().first().map_or_else(
        || (UNKNOWN_CPU.to_owned(), String::new(), 0),
        |cpu| {
            (
                cpu.brand().trim().to_owned(),
                cpu.vendor_id().to_owned(),
                cpu.frequency(),
            )
        },
    );

    SystemInfo {
        total_memory: sys.total_memory(),
        used_memory: sys.used_memory(),
        total_swap: sys.total_swap(),
        used_swap: sys.used_swap(),
        cpu_usage: mean_cpu_usage(&sys),
        gpu_usage: gpu::gpu_usage(),
        disk_space: disk_info(),
        cpu_name: if cpu_name.is_empty() {
            UNKNOWN_CPU.to_owned()
        } else {
            cpu_name
        },
        gpu_name: gpu::gpu_name(),
        system_name: System::name().unwrap_or_else(|| "Unknown".to_owned()),
        cpu_vendor,
        cpu_threads: sys.cpus().len(),
        cpu_frequency_mhz,
        architecture: env::consts::ARCH.to_owned(),
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "core counts are far below f32 precision limits"
)]
fn mean_cpu_usage(sys: &System) -> f32 {
    let cpus = sys.cpus();
    if cpus.is_empty() {
        return 0.0;
    }
    cpus.iter().map(sysinfo::Cpu::cpu_usage).sum::<f32>() / cpus.len() as f32
}

fn disk_info() -> Vec<DiskInfo> {
    Disks::new_with_refreshed_list()
        .iter()
        .map(|disk| DiskInfo {
            name: disk.name().to_str().unwrap_or("Unknown").to_owned(),
            total_space: disk.total_space(),
            available_space: disk.available_space(),
        })
        .collect()
}
