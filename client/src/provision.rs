//! Provisioning orchestrator.
//!
//! Registers this machine as a device for the signed-in user, then creates a CPU, GPU, disk
//! and RAM record and links each one to the device. The component branches only depend on
//! the device: a failing CPU does not stop the GPU, and so on. Nothing is rolled back.

use alloc::sync::Arc;
use core::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};

use chrono::Local;
use devicehub_common::{
    Component, ComponentKind, Cpu, Device, Disk, Gpu, Link, NewDevice, Ram, Record, SystemInfo,
};
use tracing::{Instrument as _, debug, info, warn};

use crate::bridge::{SharedBridge, log_best_effort};
use crate::config::DeviceDefaults;
use crate::services::DeviceService;
use crate::store::{Action, Lifecycle, Store};

const BYTES_PER_GIB: u64 = 1024 * 1024 * 1024;
const BYTES_PER_GB: u64 = 1_000_000_000;

/// Outcome of one provisioning step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome<T> {
    Completed(T),
    Failed(String),
    /// Not attempted because a step it depends on did not complete.
    Skipped,
}

impl<T> StepOutcome<T> {
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(*self, Self::Completed(_))
    }

    #[must_use]
    pub const fn completed(&self) -> Option<&T> {
        match *self {
            Self::Completed(ref value) => Some(value),
            Self::Failed(_) | Self::Skipped => None,
        }
    }
}

/// Create and link outcome for one component kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentReport {
    pub kind: ComponentKind,
    /// Id of the created component record.
    pub component: StepOutcome<i64>,
    pub link: StepOutcome<Link>,
}

impl ComponentReport {
    const fn skipped(kind: ComponentKind) -> Self {
        Self {
            kind,
            component: StepOutcome::Skipped,
            link: StepOutcome::Skipped,
        }
    }
}

/// What a provisioning run achieved, step by step.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionReport {
    pub owner_id: i64,
    pub device: StepOutcome<Device>,
    /// One entry per component kind, in provisioning order.
    pub components: Vec<ComponentReport>,
}

impl ProvisionReport {
    /// True when the device and every component were created and linked.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.device.is_completed()
            && self
                .components
                .iter()
                .all(|c| c.component.is_completed() && c.link.is_completed())
    }

    #[must_use]
    pub fn component(&self, kind: ComponentKind) -> Option<&ComponentReport> {
        self.components.iter().find(|c| c.kind == kind)
    }
}

fn write_outcome<T>(
    f: &mut fmt::Formatter<'_>,
    outcome: &StepOutcome<T>,
    describe: impl FnOnce(&T) -> String,
) -> fmt::Result {
    match *outcome {
        StepOutcome::Completed(ref value) => write!(f, "ok ({})", describe(value)),
        StepOutcome::Failed(ref reason) => write!(f, "failed: {reason}"),
        StepOutcome::Skipped => f.write_str("skipped"),
    }
}

impl fmt::Display for ProvisionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device: ")?;
        write_outcome(f, &self.device, |d| format!("id {}", d.id))?;
        for component in &self.components {
            write!(f, "\n{:<5} create: ", component.kind.to_string())?;
            write_outcome(f, &component.component, |id| format!("id {id}"))?;
            write!(f, ", link: ")?;
            write_outcome(f, &component.link, |link| format!("id {}", link.id))?;
        }
        Ok(())
    }
}

/// Runs the device registration chain, at most once per session when triggered.
pub struct Provisioner {
    started: AtomicBool,
    devices: DeviceService,
    store: Arc<Store>,
    bridge: SharedBridge,
    defaults: DeviceDefaults,
}

impl Provisioner {
    #[must_use]
    pub const fn new(
        devices: DeviceService,
        store: Arc<Store>,
        bridge: SharedBridge,
        defaults: DeviceDefaults,
    ) -> Self {
        Self {
            started: AtomicBool::new(false),
            devices,
            store,
            bridge,
            defaults,
        }
    }

    /// Runs the chain the first time a valid user id is seen; later calls return `None`.
    ///
    /// A missing or non-positive id does not consume the one-shot.
    pub async fn trigger(&self, user_id: Option<i64>) -> Option<ProvisionReport> {
        let owner_id = user_id.filter(|&id| id > 0)?;
        if self.started.swap(true, Ordering::SeqCst) {
            debug!(owner_id, "Provisioning already triggered for this session");
            return None;
        }
        Some(self.run(owner_id).await)
    }

    /// Re-arms the one-shot, e.g. after logout.
    pub fn reset(&self) {
        self.started.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn has_triggered(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Runs the full chain for `owner_id`. Failures are reported, never returned.
    pub async fn run(&self, owner_id: i64) -> ProvisionReport {
        let span = tracing::info_span!("provision", owner_id);
        async {
            self.store.dispatch(Action::ProvisionStarted).await;
            let report = self.run_chain(owner_id).await;
            self.store.dispatch(Action::ProvisionSettled).await;
            info!(complete = report.is_complete(), "Provisioning settled");
            report
        }
        .instrument(span)
        .await
    }

    async fn log(&self, message: &str) {
        log_best_effort(&*self.bridge, message).await;
    }

    async fn run_chain(&self, owner_id: i64) -> ProvisionReport {
        let info = match self.bridge.get_system_info().await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("System info unavailable: {e}");
                self.log(&format!("Failed to get system info: {e}")).await;
                None
            }
        };

        let new_device = NewDevice {
            owner_id,
            status: self.defaults.status.clone(),
            hourly_rate: self.defaults.hourly_rate,
            location: self.defaults.location.clone(),
            last_active: Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        };

        self.store.dispatch(Action::Device(Lifecycle::Pending)).await;
        let device = match self.devices.add_device(&new_device).await.into_data() {
            Ok(device) => {
                self.store
                    .dispatch(Action::Device(Lifecycle::Fulfilled(device.clone())))
                    .await;
                self.log(&format!("Device added successfully with ID: {}", device.id))
                    .await;
                device
            }
            Err(e) => {
                let reason = e.message().to_owned();
                self.store
                    .dispatch(Action::Device(Lifecycle::Rejected(reason.clone())))
                    .await;
                self.log(&format!("Add device failed: {e}")).await;
                return ProvisionReport {
                    owner_id,
                    device: StepOutcome::Failed(reason),
                    components: ComponentKind::ALL
                        .into_iter()
                        .map(ComponentReport::skipped)
                        .collect(),
                };
            }
        };

        let info = info.as_ref();
        let components = vec![
            self.create_and_link(device.id, cpu_payload(info)).await,
            self.create_and_link(device.id, gpu_payload(info)).await,
            self.create_and_link(device.id, disk_payload(info)).await,
            self.create_and_link(device.id, ram_payload(info)).await,
        ];

        ProvisionReport {
            owner_id,
            device: StepOutcome::Completed(device),
            components,
        }
    }

    /// Creates one component and, only if that yielded an id, links it to the device.
    async fn create_and_link<C: Component>(&self, device_id: i64, component: C) -> ComponentReport {
        let kind = C::KIND;

        self.store
            .dispatch(Action::Component(kind, Lifecycle::Pending))
            .await;
        let record: Record<C> = match self.devices.add_component(&component).await.into_data() {
            Ok(record) => record,
            Err(e) => {
                let reason = e.message().to_owned();
                self.store
                    .dispatch(Action::Component(kind, Lifecycle::Rejected(reason.clone())))
                    .await;
                self.log(&format!("Add {kind} failed: {e}")).await;
                return ComponentReport {
                    kind,
                    component: StepOutcome::Failed(reason),
                    link: StepOutcome::Skipped,
                };
            }
        };
        let component_id = record.id;
        self.store
            .dispatch(Action::Component(
                kind,
                Lifecycle::Fulfilled(C::into_any(record)),
            ))
            .await;
        self.log(&format!("{kind} added successfully with ID: {component_id}"))
            .await;

        self.store
            .dispatch(Action::Link(kind, Lifecycle::Pending))
            .await;
        let link = match self
            .devices
            .link_component(kind, device_id, component_id, None)
            .await
            .into_data()
        {
            Ok(link) => {
                self.store
                    .dispatch(Action::Link(kind, Lifecycle::Fulfilled(link.clone())))
                    .await;
                self.log(&format!(
                    "Device and {kind} linked successfully with link ID: {}",
                    link.id
                ))
                .await;
                StepOutcome::Completed(link)
            }
            Err(e) => {
                let reason = e.message().to_owned();
                self.store
                    .dispatch(Action::Link(kind, Lifecycle::Rejected(reason.clone())))
                    .await;
                self.log(&format!("Link {kind} failed: {e}")).await;
                StepOutcome::Failed(reason)
            }
        };

        ComponentReport {
            kind,
            component: StepOutcome::Completed(component_id),
            link,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

#[expect(
    clippy::cast_precision_loss,
    reason = "clock speeds in MHz are far below f64 precision limits"
)]
fn cpu_payload(info: Option<&SystemInfo>) -> Cpu {
    let threads = info.map_or(0, |i| u32::try_from(i.cpu_threads).unwrap_or(u32::MAX));
    Cpu {
        model_name: info
            .and_then(|i| non_empty(&i.cpu_name))
            .unwrap_or_else(|| "Placeholder CPU Model".to_owned()),
        manufacturer: info
            .and_then(|i| non_empty(&i.cpu_vendor))
            .unwrap_or_else(|| "Placeholder Manufacturer".to_owned()),
        architecture: info
            .and_then(|i| non_empty(&i.architecture))
            .unwrap_or_else(|| "Placeholder Architecture".to_owned()),
        cores: 0,
        threads,
        base_clock_ghz: info.map_or(0.0, |i| i.cpu_frequency_mhz as f64 / 1000.0),
        boost_clock_ghz: 0.0,
        tdp_watts: 0,
        l1_cache_kb: 0,
        l2_cache_mb: 0,
        l3_cache_mb: 0,
        integrated_gpu: None,
    }
}

fn gpu_payload(info: Option<&SystemInfo>) -> Gpu {
    Gpu {
        model_name: info
            .and_then(|i| i.gpu_name.as_deref())
            .and_then(non_empty)
            .unwrap_or_else(|| "Placeholder GPU Model".to_owned()),
        manufacturer: "Test Manufacturer".to_owned(),
        architecture: "NVIDIA Ampere".to_owned(),
        vram_mb: 8192,
        cuda_cores: 3584,
        tensor_cores: 112,
        core_clock_mhz: 1500,
        boost_clock_mhz: 1800,
        memory_clock_mhz: 7000,
        memory_type: "GDDR6".to_owned(),
        memory_bus_width: 256,
        tdp_watts: 220,
        directx_support: "12_2".to_owned(),
        opengl_support: "4.6".to_owned(),
        rt_cores: 28,
        metal_support: 0,
        vulkan_support: 1,
    }
}

fn disk_payload(info: Option<&SystemInfo>) -> Disk {
    let largest = info.and_then(SystemInfo::largest_disk);
    Disk {
        model_name: largest
            .and_then(|d| non_empty(&d.name))
            .unwrap_or_else(|| "Test SSD".to_owned()),
        manufacturer: "Test Manufacturer".to_owned(),
        disk_type: "SSD".to_owned(),
        capacity_gb: largest
            .map(|d| d.total_space / BYTES_PER_GB)
            .filter(|&gb| gb > 0)
            .unwrap_or(1000),
        interface: "NVMe".to_owned(),
        read_speed_mbps: 3500,
        write_speed_mbps: 3000,
        rpm: None,
        cache_mb: Some(1024),
        endurance_tbw: Some(600),
        lifespan_hours: Some(1_500_000),
        power_consumption_watts: Some(6.5),
    }
}

fn ram_payload(info: Option<&SystemInfo>) -> Ram {
    let size_gb = info
        .map(|i| i.total_memory.div_ceil(BYTES_PER_GIB))
        .and_then(|gib| u32::try_from(gib).ok())
        .filter(|&gib| gib > 0)
        .unwrap_or(16);
    Ram {
        size_gb,
        memory_type: "DDR4".to_owned(),
        speed_mhz: 3200,
        manufacturer: "Test Manufacturer".to_owned(),
        form_factor: "DIMM".to_owned(),
        voltage: 1.35,
        ecc_support: 0,
    }
}
