//! Single-resource operations
//!
//! Each mutating operation runs one docker command and, when it succeeds,
//! re-fetches the inventory it touched. Nothing else is refreshed.

use crate::docker::DockerCli;
use crate::reconciler::Reconciler;
use dockside_core::{CommandOutput, InventoryKind, LogsResult, OperationResult, Result};
use std::sync::Arc;

pub struct Dispatcher {
    docker: DockerCli,
    reconciler: Arc<Reconciler>,
}

impl Dispatcher {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self {
            docker: reconciler.docker().clone(),
            reconciler,
        }
    }

    async fn finish(
        &self,
        output: Result<CommandOutput>,
        kind: InventoryKind,
        success: &str,
        failure: &str,
    ) -> OperationResult {
        let result = OperationResult::from_output(&output, success, failure);
        if result.succeeded {
            self.refetch(kind).await;
        } else {
            tracing::warn!("{}: {}", failure, result.message);
        }
        result
    }

    async fn refetch(&self, kind: InventoryKind) {
        let result = match kind {
            InventoryKind::Containers => self.reconciler.fetch_containers().await,
            InventoryKind::Images => self.reconciler.fetch_images().await,
            InventoryKind::Volumes => self.reconciler.fetch_volumes().await,
            InventoryKind::Networks => self.reconciler.fetch_networks().await,
            InventoryKind::Usage => self.reconciler.fetch_usage().await,
        };
        if let Err(e) = result {
            tracing::debug!("Re-sync of {} failed: {}", kind, e);
        }
    }

    // ========== Containers ==========

    pub async fn start_container(&self, id: &str) -> OperationResult {
        let output = self.docker.start_container(id).await;
        self.finish(output, InventoryKind::Containers, "Container started", "Start failed")
            .await
    }

    pub async fn stop_container(&self, id: &str) -> OperationResult {
        let output = self.docker.stop_container(id).await;
        self.finish(output, InventoryKind::Containers, "Container stopped", "Stop failed")
            .await
    }

    pub async fn restart_container(&self, id: &str) -> OperationResult {
        let output = self.docker.restart_container(id).await;
        self.finish(
            output,
            InventoryKind::Containers,
            "Container restarted",
            "Restart failed",
        )
        .await
    }

    pub async fn remove_container(&self, id: &str, force: bool) -> OperationResult {
        let output = self.docker.remove_container(id, force).await;
        self.finish(output, InventoryKind::Containers, "Container removed", "Remove failed")
            .await
    }

    /// Read-only; does not touch any inventory
    pub async fn container_logs(&self, id: &str, tail: Option<u32>) -> LogsResult {
        LogsResult::from_output(&self.docker.logs(id, tail).await)
    }

    // ========== Images ==========

    pub async fn pull_image(&self, image: &str) -> OperationResult {
        let output = self.docker.pull_image(image).await;
        self.finish(output, InventoryKind::Images, "Image pulled", "Pull failed")
            .await
    }

    pub async fn remove_image(&self, id: &str, force: bool) -> OperationResult {
        let output = self.docker.remove_image(id, force).await;
        self.finish(output, InventoryKind::Images, "Image removed", "Remove failed")
            .await
    }

    // ========== Volumes ==========

    pub async fn create_volume(&self, name: &str) -> OperationResult {
        let output = self.docker.create_volume(name).await;
        self.finish(output, InventoryKind::Volumes, "Volume created", "Create failed")
            .await
    }

    pub async fn remove_volume(&self, name: &str, force: bool) -> OperationResult {
        let output = self.docker.remove_volume(name, force).await;
        self.finish(output, InventoryKind::Volumes, "Volume removed", "Remove failed")
            .await
    }

    // ========== Networks ==========

    pub async fn create_network(&self, name: &str, driver: Option<&str>) -> OperationResult {
        let output = self.docker.create_network(name, driver).await;
        self.finish(output, InventoryKind::Networks, "Network created", "Create failed")
            .await
    }

    pub async fn remove_network(&self, name: &str) -> OperationResult {
        let output = self.docker.remove_network(name).await;
        self.finish(output, InventoryKind::Networks, "Network removed", "Remove failed")
            .await
    }
}
