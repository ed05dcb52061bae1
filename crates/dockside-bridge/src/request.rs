//! JSON command surface
//!
//! A frontend sends `{"op": "<operation>", "vm": "...", ...params}` and gets
//! back the operation's result as JSON. Field names are camelCase.

use crate::facade::Dockside;
use dockside_core::Result;
use dockside_vm::StartOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum BridgeRequest {
    GetVmStatus {
        #[serde(default)]
        vm: String,
    },
    ListVmInstances,
    #[serde(rename_all = "camelCase")]
    StartVm {
        #[serde(default)]
        vm: String,
        #[serde(flatten)]
        options: StartOptions,
    },
    StopVm {
        #[serde(default)]
        vm: String,
    },
    RestartVm {
        #[serde(default)]
        vm: String,
    },
    RemoveVm {
        #[serde(default)]
        vm: String,
        #[serde(default)]
        force: bool,
    },
    RefreshAll {
        #[serde(default)]
        vm: String,
    },
    ListContainers {
        #[serde(default)]
        vm: String,
        /// Include stopped containers
        #[serde(default = "default_all")]
        all: bool,
    },
    ListImages {
        #[serde(default)]
        vm: String,
    },
    ListVolumes {
        #[serde(default)]
        vm: String,
    },
    ListNetworks {
        #[serde(default)]
        vm: String,
    },
    GetDockerInfo {
        #[serde(default)]
        vm: String,
    },
    GetDiskUsage {
        #[serde(default)]
        vm: String,
    },
    GetResourceUsage {
        #[serde(default)]
        vm: String,
    },
    StartContainer {
        #[serde(default)]
        vm: String,
        id: String,
    },
    StopContainer {
        #[serde(default)]
        vm: String,
        id: String,
    },
    RestartContainer {
        #[serde(default)]
        vm: String,
        id: String,
    },
    RemoveContainer {
        #[serde(default)]
        vm: String,
        id: String,
        #[serde(default)]
        force: bool,
    },
    #[serde(rename_all = "camelCase")]
    GetContainerLogs {
        #[serde(default)]
        vm: String,
        id: String,
        #[serde(default)]
        tail_lines: Option<u32>,
    },
    PullImage {
        #[serde(default)]
        vm: String,
        image: String,
    },
    RemoveImage {
        #[serde(default)]
        vm: String,
        id: String,
        #[serde(default)]
        force: bool,
    },
    CreateVolume {
        #[serde(default)]
        vm: String,
        name: String,
    },
    RemoveVolume {
        #[serde(default)]
        vm: String,
        name: String,
        #[serde(default)]
        force: bool,
    },
    CreateNetwork {
        #[serde(default)]
        vm: String,
        name: String,
        #[serde(default)]
        driver: Option<String>,
    },
    RemoveNetwork {
        #[serde(default)]
        vm: String,
        name: String,
    },
}

fn default_all() -> bool {
    true
}

impl Dockside {
    /// Run one request and serialize its result
    pub async fn handle(&self, request: BridgeRequest) -> Result<serde_json::Value> {
        use BridgeRequest::*;

        tracing::debug!("Bridge request: {:?}", request);
        let value = match request {
            GetVmStatus { vm } => serde_json::to_value(self.get_vm_status(&vm).await)?,
            ListVmInstances => serde_json::to_value(self.list_vm_instances().await)?,
            StartVm { vm, options } => serde_json::to_value(self.start_vm(&vm, &options).await)?,
            StopVm { vm } => serde_json::to_value(self.stop_vm(&vm).await)?,
            RestartVm { vm } => serde_json::to_value(self.restart_vm(&vm).await)?,
            RemoveVm { vm, force } => serde_json::to_value(self.remove_vm(&vm, force).await)?,
            RefreshAll { vm } => serde_json::to_value(self.refresh_all(&vm).await)?,
            ListContainers { vm, all } => {
                serde_json::to_value(self.list_containers(&vm, all).await)?
            }
            ListImages { vm } => serde_json::to_value(self.list_images(&vm).await)?,
            ListVolumes { vm } => serde_json::to_value(self.list_volumes(&vm).await)?,
            ListNetworks { vm } => serde_json::to_value(self.list_networks(&vm).await)?,
            GetDockerInfo { vm } => serde_json::to_value(self.get_docker_info(&vm).await)?,
            GetDiskUsage { vm } => serde_json::to_value(self.get_disk_usage(&vm).await)?,
            GetResourceUsage { vm } => serde_json::to_value(self.get_resource_usage(&vm).await)?,
            StartContainer { vm, id } => {
                serde_json::to_value(self.start_container(&vm, &id).await)?
            }
            StopContainer { vm, id } => serde_json::to_value(self.stop_container(&vm, &id).await)?,
            RestartContainer { vm, id } => {
                serde_json::to_value(self.restart_container(&vm, &id).await)?
            }
            RemoveContainer { vm, id, force } => {
                serde_json::to_value(self.remove_container(&vm, &id, force).await)?
            }
            GetContainerLogs { vm, id, tail_lines } => {
                serde_json::to_value(self.get_container_logs(&vm, &id, tail_lines).await)?
            }
            PullImage { vm, image } => serde_json::to_value(self.pull_image(&vm, &image).await)?,
            RemoveImage { vm, id, force } => {
                serde_json::to_value(self.remove_image(&vm, &id, force).await)?
            }
            CreateVolume { vm, name } => serde_json::to_value(self.create_volume(&vm, &name).await)?,
            RemoveVolume { vm, name, force } => {
                serde_json::to_value(self.remove_volume(&vm, &name, force).await)?
            }
            CreateNetwork { vm, name, driver } => serde_json::to_value(
                self.create_network(&vm, &name, driver.as_deref()).await,
            )?,
            RemoveNetwork { vm, name } => {
                serde_json::to_value(self.remove_network(&vm, &name).await)?
            }
        };
        Ok(value)
    }

    /// Parse a JSON request, run it and serialize the result
    pub async fn handle_json(&self, request: &str) -> Result<serde_json::Value> {
        let request: BridgeRequest = serde_json::from_str(request)?;
        self.handle(request).await
    }
}
