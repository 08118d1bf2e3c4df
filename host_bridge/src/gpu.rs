//! GPU discovery through vendor command line tools.
//!
//! There is no portable GPU API in the dependency stack, so the lookups shell out to whatever
//! tool the platform ships and parse its text output. A missing tool simply yields `None`.

use std::process::Command;

use tracing::debug;

/// Runs `program` and returns its stdout when it exits successfully.
fn capture(program: &str, args: &[&str]) -> Option<String> {
    match Command::new(program).args(args).output() {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(output) => {
            debug!(program, status = ?output.status, "GPU query exited unsuccessfully");
            None
        }
        Err(e) => {
            debug!(program, "GPU query unavailable: {e}");
            None
        }
    }
}

/// Name of the first GPU found on the host.
#[must_use]
pub fn gpu_name() -> Option<String> {
    if let Some(name) = capture(
        "nvidia-smi",
        &["--query-gpu=name", "--format=csv,noheader"],
    )
    .and_then(|out| out.lines().next().map(str::trim).map(str::to_owned))
    .filter(|name| !name.is_empty())
    {
        return Some(name);
    }

    #[cfg(target_os = "linux")]
    {
        capture("lspci", &[]).and_then(|out| parse_lspci(&out))
    }
    #[cfg(target_os = "macos")]
    {
        capture("system_profiler", &["SPDisplaysDataType"])
            .and_then(|out| parse_system_profiler(&out))
    }
    #[cfg(target_os = "windows")]
    {
        capture(
            "powershell",
            &[
                "-NoProfile",
                "-Command",
                "(Get-CimInstance Win32_VideoController | Select-Object -First 1).Name",
            ],
        )
        .map(|out| out.trim().to_owned())
        .filter(|name| !name.is_empty())
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        None
    }
}

/// Current utilization of the first GPU in percent, trying NVIDIA then AMD tooling.
#[must_use]
pub fn gpu_usage() -> Option<f32> {
    capture(
        "nvidia-smi",
        &["--query-gpu=utilization.gpu", "--format=csv,noheader,nounits"],
    )
    .and_then(|out| parse_nvidia_utilization(&out))
    .or_else(|| capture("radeontop", &["-d", "-", "-l", "1"]).and_then(|out| parse_radeontop(&out)))
}

fn parse_nvidia_utilization(output: &str) -> Option<f32> {
    output.lines().next()?.trim().parse().ok()
}

/// Parses a `radeontop -d -` sample such as `1700000000.0: bus 03, gpu 12.50%, ee 0.00%`.
fn parse_radeontop(output: &str) -> Option<f32> {
    output
        .lines()
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .find_map(|field| field.strip_prefix("gpu "))
        .and_then(|value| value.trim().trim_end_matches('%').parse().ok())
}

#[cfg(any(target_os = "linux", test))]
fn parse_lspci(output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| line.contains("VGA compatible controller") || line.contains("3D controller"))
        .and_then(|line| line.splitn(3, ": ").nth(1).or_else(|| line.rsplit(": ").next()))
        .map(|name| name.trim().to_owned())
}

#[cfg(any(target_os = "macos", test))]
fn parse_system_profiler(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Chipset Model:"))
        .map(|name| name.trim().to_owned())
}
