//! Domain records exchanged with the REST API.
//!
//! Component payloads mirror the remote schema field-for-field, including its naming
//! (`type` for the RAM technology, `interface` for the disk bus).

use core::fmt;

use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize, Serializer, de::DeserializeOwned};

fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Role of an account on the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// Public profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub phone_number: u64,
}

/// Tokens and profile obtained from a successful login or registration.
///
/// Tokens are kept in [`SecretString`]s so they never show up in `Debug` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(serialize_with = "expose")]
    pub access_token: SecretString,
    #[serde(serialize_with = "expose")]
    pub refresh_token: SecretString,
    pub user: UserData,
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.access_token.expose_secret() == other.access_token.expose_secret()
            && self.refresh_token.expose_secret() == other.refresh_token.expose_secret()
            && self.user == other.user
    }
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginPayload {
    pub email: String,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
}

/// Body of `POST /signup`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterPayload {
    pub name: String,
    pub age: u32,
    pub email: String,
    pub address: String,
    pub role: Role,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
    pub balance: f64,
    pub phone_number: u64,
}

/// Body of `POST /devices/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDevice {
    pub owner_id: i64,
    pub status: String,
    pub hourly_rate: f64,
    pub location: String,
    pub last_active: String,
}

/// A device record as stored by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub owner_id: i64,
    pub status: String,
    pub hourly_rate: f64,
    pub location: String,
    pub last_active: String,
}

/// The hardware component types that can be linked to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Cpu,
    Gpu,
    Disk,
    Ram,
}

impl ComponentKind {
    /// Provisioning order.
    pub const ALL: [Self; 4] = [Self::Cpu, Self::Gpu, Self::Disk, Self::Ram];

    /// Key of the component record inside a create response, also the lowercase name.
    #[must_use]
    pub const fn record_key(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
            Self::Disk => "disk",
            Self::Ram => "ram",
        }
    }

    /// Endpoint creating a component of this kind.
    #[must_use]
    pub const fn create_path(self) -> &'static str {
        match self {
            Self::Cpu => "/cpus/",
            Self::Gpu => "/gpus/",
            Self::Disk => "/disks/",
            Self::Ram => "/rams/",
        }
    }

    /// Endpoint creating a device link for this kind.
    #[must_use]
    pub const fn link_path(self) -> &'static str {
        match self {
            Self::Cpu => "/devicecpus/",
            Self::Gpu => "/devicegpus/",
            Self::Disk => "/devicedisks/",
            Self::Ram => "/devicerams/",
        }
    }

    /// Key of the link record inside a link response.
    #[must_use]
    pub const fn link_key(self) -> &'static str {
        match self {
            Self::Cpu => "devicecpu",
            Self::Gpu => "devicegpu",
            Self::Disk => "devicedisk",
            Self::Ram => "deviceram",
        }
    }

    /// Name of the component id field on link records.
    #[must_use]
    pub const fn link_id_field(self) -> &'static str {
        match self {
            Self::Cpu => "cpu_id",
            Self::Gpu => "gpu_id",
            Self::Disk => "disk_id",
            Self::Ram => "ram_id",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Self::Cpu => "CPU",
            Self::Gpu => "GPU",
            Self::Disk => "Disk",
            Self::Ram => "RAM",
        })
    }
}

/// A component attribute set that can be created through the API.
pub trait Component: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync {
    const KIND: ComponentKind;

    /// Erases the attribute type of a stored record.
    fn into_any(record: Record<Self>) -> ComponentRecord;
}

/// A stored component: the attributes plus the server-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<C> {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub attributes: C,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cpu {
    pub model_name: String,
    pub manufacturer: String,
    pub architecture: String,
    pub cores: u32,
    pub threads: u32,
    pub base_clock_ghz: f64,
    pub boost_clock_ghz: f64,
    pub tdp_watts: u32,
    pub l1_cache_kb: u32,
    pub l2_cache_mb: u32,
    pub l3_cache_mb: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrated_gpu: Option<u8>,
}

impl Component for Cpu {
    const KIND: ComponentKind = ComponentKind::Cpu;

    fn into_any(record: Record<Self>) -> ComponentRecord {
        ComponentRecord::Cpu(record)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gpu {
    pub model_name: String,
    pub manufacturer: String,
    pub architecture: String,
    pub vram_mb: u32,
    pub cuda_cores: u32,
    pub tensor_cores: u32,
    pub core_clock_mhz: u32,
    pub boost_clock_mhz: u32,
    pub memory_clock_mhz: u32,
    pub memory_type: String,
    pub memory_bus_width: u32,
    pub tdp_watts: u32,
    pub directx_support: String,
    pub opengl_support: String,
    pub rt_cores: u32,
    pub metal_support: u8,
    pub vulkan_support: u8,
}

impl Component for Gpu {
    const KIND: ComponentKind = ComponentKind::Gpu;

    fn into_any(record: Record<Self>) -> ComponentRecord {
        ComponentRecord::Gpu(record)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disk {
    pub model_name: String,
    pub manufacturer: String,
    pub disk_type: String,
    pub capacity_gb: u64,
    pub interface: String,
    pub read_speed_mbps: u32,
    pub write_speed_mbps: u32,
    pub rpm: Option<u32>,
    pub cache_mb: Option<u32>,
    pub endurance_tbw: Option<u32>,
    pub lifespan_hours: Option<u64>,
    pub power_consumption_watts: Option<f64>,
}

impl Component for Disk {
    const KIND: ComponentKind = ComponentKind::Disk;

    fn into_any(record: Record<Self>) -> ComponentRecord {
        ComponentRecord::Disk(record)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ram {
    pub size_gb: u32,
    #[serde(rename = "type")]
    pub memory_type: String,
    pub speed_mhz: u32,
    pub manufacturer: String,
    pub form_factor: String,
    pub voltage: f64,
    pub ecc_support: u8,
}

impl Component for Ram {
    const KIND: ComponentKind = ComponentKind::Ram;

    fn into_any(record: Record<Self>) -> ComponentRecord {
        ComponentRecord::Ram(record)
    }
}

/// A stored component of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ComponentRecord {
    Cpu(Record<Cpu>),
    Gpu(Record<Gpu>),
    Disk(Record<Disk>),
    Ram(Record<Ram>),
}

impl ComponentRecord {
    #[must_use]
    pub const fn kind(&self) -> ComponentKind {
        match *self {
            Self::Cpu(_) => ComponentKind::Cpu,
            Self::Gpu(_) => ComponentKind::Gpu,
            Self::Disk(_) => ComponentKind::Disk,
            Self::Ram(_) => ComponentKind::Ram,
        }
    }

    #[must_use]
    pub const fn id(&self) -> i64 {
        match *self {
            Self::Cpu(ref r) => r.id,
            Self::Gpu(ref r) => r.id,
            Self::Disk(ref r) => r.id,
            Self::Ram(ref r) => r.id,
        }
    }
}

/// Body of a `POST /device<kind>s/` call.
///
/// Serialized by hand because the component id field is named after the kind.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub kind: ComponentKind,
    pub device_id: i64,
    pub component_id: i64,
    pub description: Option<String>,
}

impl Serialize for NewLink {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap as _;

        let len = if self.description.is_some() { 3 } else { 2 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry(self.kind.link_id_field(), &self.component_id)?;
        map.serialize_entry("device_id", &self.device_id)?;
        if let Some(ref description) = self.description {
            map.serialize_entry("description", description)?;
        }
        map.end()
    }
}

/// A join record associating a component with a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: i64,
    pub device_id: i64,
    #[serde(alias = "cpu_id", alias = "gpu_id", alias = "disk_id", alias = "ram_id")]
    pub component_id: i64,
    #[serde(default)]
    pub description: Option<String>,
}
