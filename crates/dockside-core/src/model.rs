//! Shared data model: VM state and resource records

use serde::{Deserialize, Serialize};

/// Profile name used when the caller does not name a VM.
pub const DEFAULT_VM_NAME: &str = "default";

/// Lifecycle status of a VM
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VmStatus {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
    Restarting,
    Deleting,
}

impl VmStatus {
    /// True while a lifecycle transition is in flight
    pub fn is_transitioning(&self) -> bool {
        matches!(
            self,
            VmStatus::Starting | VmStatus::Stopping | VmStatus::Restarting | VmStatus::Deleting
        )
    }
}

impl std::fmt::Display for VmStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VmStatus::Stopped => write!(f, "stopped"),
            VmStatus::Starting => write!(f, "starting"),
            VmStatus::Running => write!(f, "running"),
            VmStatus::Stopping => write!(f, "stopping"),
            VmStatus::Restarting => write!(f, "restarting"),
            VmStatus::Deleting => write!(f, "deleting"),
        }
    }
}

/// CPU architecture of the VM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Arm64,
    Amd64,
}

impl Arch {
    /// Architecture of the machine Dockside runs on
    pub fn host() -> Self {
        match std::env::consts::ARCH {
            "aarch64" | "arm" => Arch::Arm64,
            _ => Arch::Amd64,
        }
    }

    /// Normalize a native arch string (`aarch64`, `x86_64`, ...).
    ///
    /// Unknown or absent values resolve to the host architecture.
    pub fn from_native(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("aarch64") | Some("arm64") => Arch::Arm64,
            Some("x86_64") | Some("amd64") => Arch::Amd64,
            _ => Arch::host(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Arm64 => "arm64",
            Arch::Amd64 => "amd64",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Container engine running inside the VM
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    #[default]
    Docker,
    Containerd,
}

impl Runtime {
    /// Map the runtime name reported by the VM manager; anything unrecognised is docker.
    pub fn from_name(raw: &str) -> Self {
        match raw.trim() {
            "containerd" => Runtime::Containerd,
            _ => Runtime::Docker,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Runtime::Docker => "docker",
            Runtime::Containerd => "containerd",
        }
    }
}

impl std::fmt::Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of a VM (sizes are in GiB)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmInfo {
    pub name: String,
    pub arch: Arch,
    pub cpu_cores: u32,
    #[serde(rename = "memoryGiB")]
    pub memory_gib: u64,
    #[serde(rename = "diskGiB")]
    pub disk_gib: u64,
    pub runtime: Runtime,
    pub address: String,
}

impl VmInfo {
    /// Info reported for a VM that is not running
    pub fn defaults(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arch: Arch::host(),
            cpu_cores: 0,
            memory_gib: 0,
            disk_gib: 0,
            runtime: Runtime::Docker,
            address: String::new(),
        }
    }
}

/// Snapshot of a VM as seen by the frontend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmState {
    pub status: VmStatus,
    #[serde(flatten)]
    pub info: VmInfo,
    /// Last lifecycle failure, cleared when a new transition begins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl VmState {
    pub fn stopped(name: impl Into<String>) -> Self {
        Self {
            status: VmStatus::Stopped,
            info: VmInfo::defaults(name),
            last_error: None,
        }
    }

    pub fn running(info: VmInfo) -> Self {
        Self {
            status: VmStatus::Running,
            info,
            last_error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn is_running(&self) -> bool {
        self.status == VmStatus::Running
    }
}

/// Container state as reported by the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRecord {
    pub id: String,
    pub name: String,
    pub image: String,
    /// Human readable status ("Up 3 minutes")
    pub status: String,
    pub state: ContainerState,
    pub ports: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub repository: String,
    pub tag: String,
    pub size_human: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeRecord {
    pub name: String,
    pub driver: String,
    pub mountpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRecord {
    pub id: String,
    pub name: String,
    pub driver: String,
    pub scope: String,
}

/// One row of the engine's disk usage summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskUsageRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub total_count: String,
    pub active: String,
    pub size: String,
    pub reclaimable: String,
}

/// Aggregate resource usage in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    /// Estimate, not measured
    pub disk_percent: f64,
}

impl ResourceUsage {
    pub fn is_zero(&self) -> bool {
        self.cpu_percent == 0.0 && self.memory_percent == 0.0 && self.disk_percent == 0.0
    }
}

/// Cached read models owned by the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryKind {
    Containers,
    Images,
    Volumes,
    Networks,
    Usage,
}

impl std::fmt::Display for InventoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InventoryKind::Containers => write!(f, "containers"),
            InventoryKind::Images => write!(f, "images"),
            InventoryKind::Volumes => write!(f, "volumes"),
            InventoryKind::Networks => write!(f, "networks"),
            InventoryKind::Usage => write!(f, "usage"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_normalization() {
        assert_eq!(Arch::from_native(Some("aarch64")), Arch::Arm64);
        assert_eq!(Arch::from_native(Some("x86_64")), Arch::Amd64);
        assert_eq!(Arch::from_native(Some("riscv64")), Arch::host());
        assert_eq!(Arch::from_native(None), Arch::host());
    }

    #[test]
    fn test_runtime_from_name() {
        assert_eq!(Runtime::from_name("containerd"), Runtime::Containerd);
        assert_eq!(Runtime::from_name("docker"), Runtime::Docker);
        assert_eq!(Runtime::from_name(""), Runtime::Docker);
    }

    #[test]
    fn test_container_state_unknown_values() {
        let state: ContainerState = serde_json::from_str("\"exited\"").unwrap();
        assert_eq!(state, ContainerState::Exited);

        let state: ContainerState = serde_json::from_str("\"hibernating\"").unwrap();
        assert_eq!(state, ContainerState::Unknown);
    }

    #[test]
    fn test_vm_state_wire_shape() {
        let state = VmState::running(VmInfo {
            name: "default".to_string(),
            arch: Arch::Arm64,
            cpu_cores: 4,
            memory_gib: 8,
            disk_gib: 60,
            runtime: Runtime::Docker,
            address: "192.168.106.2".to_string(),
        });

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["name"], "default");
        assert_eq!(json["arch"], "arm64");
        assert_eq!(json["cpuCores"], 4);
        assert_eq!(json["memoryGiB"], 8);
        assert_eq!(json["diskGiB"], 60);
        assert!(json.get("lastError").is_none());
    }

    #[test]
    fn test_transitioning_statuses() {
        assert!(VmStatus::Starting.is_transitioning());
        assert!(VmStatus::Deleting.is_transitioning());
        assert!(!VmStatus::Running.is_transitioning());
        assert!(!VmStatus::Stopped.is_transitioning());
    }
}
