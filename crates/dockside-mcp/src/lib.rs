//! Dockside MCP Server
//!
//! Serves every Dockside operation as an MCP tool over stdio. Tool results
//! are the JSON form of the operation's result; a failed operation envelope
//! is returned as a tool error.

use anyhow::Result;
use dockside_bridge::{Dockside, OperationResult, StartOptions};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
    handler::server::{tool::ToolCallContext, tool::ToolRouter, wrapper::Parameters},
    model::*,
    service::RequestContext,
    tool, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

// ============================================================================
// Parameters
// ============================================================================

/// VM selector
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct VmParam {
    /// Colima profile name; empty for the default profile
    #[serde(default)]
    pub vm: String,
}

/// VM start parameters
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartVmParam {
    #[serde(default)]
    pub vm: String,
    /// CPU cores
    pub cpu: Option<u32>,
    /// Memory in GiB
    #[serde(rename = "memoryGiB")]
    pub memory_gib: Option<u32>,
    /// Disk size in GiB
    #[serde(rename = "diskGiB")]
    pub disk_gib: Option<u32>,
    /// Container runtime: docker or containerd
    pub runtime: Option<String>,
}

/// VM removal parameters
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RemoveVmParam {
    #[serde(default)]
    pub vm: String,
    /// Delete even when the VM is not stopped
    #[serde(default)]
    pub force: bool,
}

/// Container listing parameters
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListContainersParam {
    #[serde(default)]
    pub vm: String,
    /// Include stopped containers (default: true)
    #[serde(default = "default_all")]
    pub all: bool,
}

fn default_all() -> bool {
    true
}

/// Single container or image
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct IdParam {
    #[serde(default)]
    pub vm: String,
    /// Container or image ID (or name)
    pub id: String,
}

/// Removal of a container or image
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RemoveIdParam {
    #[serde(default)]
    pub vm: String,
    pub id: String,
    #[serde(default)]
    pub force: bool,
}

/// Container log parameters
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogsParam {
    #[serde(default)]
    pub vm: String,
    pub id: String,
    /// Number of lines from the end of the log (defaults to the configured value)
    pub tail_lines: Option<u32>,
}

/// Image pull parameters
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PullImageParam {
    #[serde(default)]
    pub vm: String,
    /// Image reference, e.g. nginx:alpine
    pub image: String,
}

/// Named volume or network
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct NameParam {
    #[serde(default)]
    pub vm: String,
    pub name: String,
}

/// Volume removal parameters
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RemoveVolumeParam {
    #[serde(default)]
    pub vm: String,
    pub name: String,
    #[serde(default)]
    pub force: bool,
}

/// Network creation parameters
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateNetworkParam {
    #[serde(default)]
    pub vm: String,
    pub name: String,
    /// Network driver, e.g. bridge
    pub driver: Option<String>,
}

impl StartVmParam {
    fn options(&self) -> Result<StartOptions, String> {
        let runtime = match self.runtime.as_deref() {
            None => None,
            Some(name) => Some(
                serde_json::from_value(serde_json::Value::String(name.to_lowercase()))
                    .map_err(|_| format!("Unknown runtime: {}", name))?,
            ),
        };
        Ok(StartOptions {
            cpu: self.cpu,
            memory_gib: self.memory_gib,
            disk_gib: self.disk_gib,
            runtime,
        })
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Failed to serialize result: {}", e))
}

fn envelope(result: OperationResult) -> Result<String, String> {
    let json = to_json(&result)?;
    if result.succeeded { Ok(json) } else { Err(json) }
}

// ============================================================================
// MCP server
// ============================================================================

#[derive(Clone)]
pub struct DocksideServer {
    dockside: Arc<Dockside>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl DocksideServer {
    pub fn new(dockside: Arc<Dockside>) -> Self {
        Self {
            dockside,
            tool_router: Self::tool_router(),
        }
    }

    // ----- VM -----

    #[tool(description = "Read the current status, architecture, resources and address of a Colima VM.")]
    async fn dockside_vm_status(&self, params: Parameters<VmParam>) -> Result<String, String> {
        to_json(&self.dockside.get_vm_status(&params.0.vm).await)
    }

    #[tool(description = "List every Colima VM profile with its status and resources.")]
    async fn dockside_vm_list(&self) -> Result<String, String> {
        to_json(&self.dockside.list_vm_instances().await)
    }

    #[tool(description = "Start a stopped Colima VM, optionally with CPU, memory (GiB), disk (GiB) and runtime.")]
    async fn dockside_vm_start(&self, params: Parameters<StartVmParam>) -> Result<String, String> {
        let options = params.0.options()?;
        envelope(self.dockside.start_vm(&params.0.vm, &options).await)
    }

    #[tool(description = "Stop a running Colima VM. Container inventories are cleared.")]
    async fn dockside_vm_stop(&self, params: Parameters<VmParam>) -> Result<String, String> {
        envelope(self.dockside.stop_vm(&params.0.vm).await)
    }

    #[tool(description = "Restart a running Colima VM with its default settings.")]
    async fn dockside_vm_restart(&self, params: Parameters<VmParam>) -> Result<String, String> {
        envelope(self.dockside.restart_vm(&params.0.vm).await)
    }

    #[tool(description = "Delete a Colima VM. Only stopped VMs can be deleted unless force=true.")]
    async fn dockside_vm_delete(&self, params: Parameters<RemoveVmParam>) -> Result<String, String> {
        envelope(self.dockside.remove_vm(&params.0.vm, params.0.force).await)
    }

    #[tool(description = "Re-read the VM status and refresh all container, image, volume, network and usage data.")]
    async fn dockside_refresh(&self, params: Parameters<VmParam>) -> Result<String, String> {
        to_json(&self.dockside.refresh_all(&params.0.vm).await)
    }

    // ----- Inventories -----

    #[tool(description = "List containers in the VM. all=true includes stopped containers.")]
    async fn dockside_ps(&self, params: Parameters<ListContainersParam>) -> Result<String, String> {
        to_json(&self.dockside.list_containers(&params.0.vm, params.0.all).await)
    }

    #[tool(description = "List images in the VM.")]
    async fn dockside_images(&self, params: Parameters<VmParam>) -> Result<String, String> {
        to_json(&self.dockside.list_images(&params.0.vm).await)
    }

    #[tool(description = "List volumes in the VM.")]
    async fn dockside_volumes(&self, params: Parameters<VmParam>) -> Result<String, String> {
        to_json(&self.dockside.list_volumes(&params.0.vm).await)
    }

    #[tool(description = "List networks in the VM.")]
    async fn dockside_networks(&self, params: Parameters<VmParam>) -> Result<String, String> {
        to_json(&self.dockside.list_networks(&params.0.vm).await)
    }

    #[tool(description = "Show Docker engine information (docker info). Returns null when the VM is not running.")]
    async fn dockside_info(&self, params: Parameters<VmParam>) -> Result<String, String> {
        to_json(&self.dockside.get_docker_info(&params.0.vm).await)
    }

    #[tool(description = "Show Docker disk usage per resource type (docker system df).")]
    async fn dockside_df(&self, params: Parameters<VmParam>) -> Result<String, String> {
        to_json(&self.dockside.get_disk_usage(&params.0.vm).await)
    }

    #[tool(description = "Show aggregate CPU and memory usage of running containers. Disk is a configured estimate.")]
    async fn dockside_usage(&self, params: Parameters<VmParam>) -> Result<String, String> {
        to_json(&self.dockside.get_resource_usage(&params.0.vm).await)
    }

    // ----- Containers -----

    #[tool(description = "Start a container.")]
    async fn dockside_container_start(&self, params: Parameters<IdParam>) -> Result<String, String> {
        envelope(self.dockside.start_container(&params.0.vm, &params.0.id).await)
    }

    #[tool(description = "Stop a container.")]
    async fn dockside_container_stop(&self, params: Parameters<IdParam>) -> Result<String, String> {
        envelope(self.dockside.stop_container(&params.0.vm, &params.0.id).await)
    }

    #[tool(description = "Restart a container.")]
    async fn dockside_container_restart(&self, params: Parameters<IdParam>) -> Result<String, String> {
        envelope(self.dockside.restart_container(&params.0.vm, &params.0.id).await)
    }

    #[tool(description = "Remove a container. force=true removes a running container.")]
    async fn dockside_container_rm(&self, params: Parameters<RemoveIdParam>) -> Result<String, String> {
        let p = params.0;
        envelope(self.dockside.remove_container(&p.vm, &p.id, p.force).await)
    }

    #[tool(description = "Fetch the last lines of a container's logs.")]
    async fn dockside_container_logs(&self, params: Parameters<LogsParam>) -> Result<String, String> {
        let p = params.0;
        let logs = self
            .dockside
            .get_container_logs(&p.vm, &p.id, p.tail_lines)
            .await;
        if logs.succeeded {
            Ok(logs.text)
        } else {
            Err(logs.text)
        }
    }

    // ----- Images -----

    #[tool(description = "Pull an image from its registry.")]
    async fn dockside_image_pull(&self, params: Parameters<PullImageParam>) -> Result<String, String> {
        envelope(self.dockside.pull_image(&params.0.vm, &params.0.image).await)
    }

    #[tool(description = "Remove an image. force=true removes it even when tagged or in use.")]
    async fn dockside_image_rm(&self, params: Parameters<RemoveIdParam>) -> Result<String, String> {
        let p = params.0;
        envelope(self.dockside.remove_image(&p.vm, &p.id, p.force).await)
    }

    // ----- Volumes -----

    #[tool(description = "Create a named volume.")]
    async fn dockside_volume_create(&self, params: Parameters<NameParam>) -> Result<String, String> {
        envelope(self.dockside.create_volume(&params.0.vm, &params.0.name).await)
    }

    #[tool(description = "Remove a volume.")]
    async fn dockside_volume_rm(&self, params: Parameters<RemoveVolumeParam>) -> Result<String, String> {
        let p = params.0;
        envelope(self.dockside.remove_volume(&p.vm, &p.name, p.force).await)
    }

    // ----- Networks -----

    #[tool(description = "Create a network, optionally with a driver.")]
    async fn dockside_network_create(&self, params: Parameters<CreateNetworkParam>) -> Result<String, String> {
        let p = params.0;
        envelope(
            self.dockside
                .create_network(&p.vm, &p.name, p.driver.as_deref())
                .await,
        )
    }

    #[tool(description = "Remove a network.")]
    async fn dockside_network_rm(&self, params: Parameters<NameParam>) -> Result<String, String> {
        envelope(self.dockside.remove_network(&params.0.vm, &params.0.name).await)
    }
}

impl ServerHandler for DocksideServer {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.instructions = Some(
            "Dockside MCP server. Manages Colima VMs and the containers, images, volumes and networks inside them."
                .to_string(),
        );
        info
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool_context = ToolCallContext::new(self, request, context);
        self.tool_router.call(tool_context).await
    }
}

/// Run the MCP server over stdio
pub async fn run_server(dockside: Dockside) -> Result<()> {
    let server = DocksideServer::new(Arc::new(dockside));
    let transport = (tokio::io::stdin(), tokio::io::stdout());

    let service = server.serve(transport).await.map_err(|e| {
        error!("MCP server initialization failed: {}", e);
        anyhow::anyhow!("MCP server initialization failed: {}", e)
    })?;

    service.waiting().await.map_err(|e| {
        error!("MCP server error: {}", e);
        anyhow::anyhow!("MCP server error: {}", e)
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockside_config::DocksideConfig;

    #[test]
    fn test_tools_registered() {
        let server = DocksideServer::new(Arc::new(Dockside::new(DocksideConfig::default())));
        let tools = server.tool_router.list_all();
        assert_eq!(tools.len(), 25);

        let names: Vec<String> = tools.iter().map(|t| t.name.to_string()).collect();
        for name in ["dockside_vm_start", "dockside_refresh", "dockside_container_logs", "dockside_df"] {
            assert!(names.iter().any(|n| n == name), "missing tool {}", name);
        }
    }

    #[test]
    fn test_start_options_runtime() {
        let param: StartVmParam = serde_json::from_str(
            r#"{"vm":"work","cpu":2,"memoryGiB":4,"runtime":"Containerd"}"#,
        )
        .unwrap();
        let options = param.options().unwrap();
        assert_eq!(options.cpu, Some(2));
        assert_eq!(options.memory_gib, Some(4));
        assert_eq!(options.runtime.map(|r| r.to_string()).as_deref(), Some("containerd"));

        let param: StartVmParam = serde_json::from_str(r#"{"runtime":"podman"}"#).unwrap();
        assert_eq!(param.options().unwrap_err(), "Unknown runtime: podman");
    }

    #[test]
    fn test_list_containers_defaults_to_all() {
        let param: ListContainersParam = serde_json::from_str("{}").unwrap();
        assert!(param.all);
        assert!(param.vm.is_empty());

        let param: ListContainersParam = serde_json::from_str(r#"{"all":false}"#).unwrap();
        assert!(!param.all);
    }

    #[test]
    fn test_failed_envelope_is_tool_error() {
        let err = envelope(OperationResult::failed("Pull failed")).unwrap_err();
        assert!(err.contains("\"succeeded\": false"));
        assert!(envelope(OperationResult::ok("Image pulled")).is_ok());
    }
}
