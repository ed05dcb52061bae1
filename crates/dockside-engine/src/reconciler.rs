//! Resource inventories
//!
//! The reconciler owns the cached containers, images, volumes, networks and
//! usage of one VM. Each fetch replaces its snapshot wholesale on success and
//! keeps the previous snapshot on failure.
//!
//! Inventories only exist while the VM runs: the reconciler starts inactive,
//! is activated by [`ResourceSync::activate`] and deactivated by
//! [`ResourceSync::clear`]. A fetch that finishes after a clear is dropped.
//!
//! The container inventory always holds every container, running or not.

use crate::docker::{ContainerStats, DockerCli};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dockside_core::{
    ContainerRecord, DiskUsageRecord, ImageRecord, InventoryKind, NetworkRecord, ResourceSync,
    ResourceUsage, Result, VolumeRecord,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Snapshot of every inventory
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub containers: Vec<ContainerRecord>,
    pub images: Vec<ImageRecord>,
    pub volumes: Vec<VolumeRecord>,
    pub networks: Vec<NetworkRecord>,
    pub usage: ResourceUsage,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Inventory {
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
            && self.images.is_empty()
            && self.volumes.is_empty()
            && self.networks.is_empty()
            && self.usage.is_zero()
    }
}

/// Outcome of [`Reconciler::fetch_all`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub failed: Vec<InventoryKind>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sum per-container samples, clamping each total to [0, 100]
pub fn aggregate_usage(stats: &[ContainerStats], disk_estimate_percent: f64) -> ResourceUsage {
    let cpu: f64 = stats.iter().map(|s| s.cpu_percent).sum();
    let memory: f64 = stats.iter().map(|s| s.memory_percent).sum();

    ResourceUsage {
        cpu_percent: cpu.clamp(0.0, 100.0),
        memory_percent: memory.clamp(0.0, 100.0),
        disk_percent: disk_estimate_percent.clamp(0.0, 100.0),
    }
}

pub struct Reconciler {
    docker: DockerCli,
    disk_estimate_percent: f64,
    inventory: RwLock<Inventory>,
    errors: RwLock<HashMap<InventoryKind, String>>,
    active: AtomicBool,
    epoch: AtomicU64,
}

impl Reconciler {
    pub fn new(docker: DockerCli) -> Self {
        Self {
            docker,
            disk_estimate_percent: 30.0,
            inventory: RwLock::new(Inventory::default()),
            errors: RwLock::new(HashMap::new()),
            active: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
        }
    }

    /// Disk usage reported by [`Reconciler::fetch_usage`]; an estimate, not a measurement
    pub fn with_disk_estimate(mut self, percent: f64) -> Self {
        self.disk_estimate_percent = percent;
        self
    }

    pub fn docker(&self) -> &DockerCli {
        &self.docker
    }

    /// Allow fetches to populate inventories
    pub fn activate(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Epoch to tag a fetch with, or `None` when fetching is pointless
    fn begin_fetch(&self, kind: InventoryKind) -> Option<u64> {
        if !self.is_active() {
            tracing::debug!("Skipping {} fetch, VM not running", kind);
            return None;
        }
        Some(self.epoch.load(Ordering::SeqCst))
    }

    async fn apply<T>(
        &self,
        kind: InventoryKind,
        epoch: u64,
        result: Result<T>,
        store: impl FnOnce(&mut Inventory, T),
    ) -> Result<()> {
        match result {
            Ok(value) => {
                let mut inventory = self.inventory.write().await;
                if !self.is_active() || self.epoch.load(Ordering::SeqCst) != epoch {
                    tracing::debug!("Discarding {} fetched before the VM stopped", kind);
                    return Ok(());
                }
                store(&mut inventory, value);
                inventory.refreshed_at = Some(Utc::now());
                drop(inventory);

                self.errors.write().await.remove(&kind);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", kind, e);
                self.errors.write().await.insert(kind, e.to_string());
                Err(e)
            }
        }
    }

    pub async fn fetch_containers(&self) -> Result<()> {
        let Some(epoch) = self.begin_fetch(InventoryKind::Containers) else {
            return Ok(());
        };
        let result = self.docker.list_containers(true).await;
        self.apply(InventoryKind::Containers, epoch, result, |inv, v| {
            inv.containers = v
        })
        .await
    }

    pub async fn fetch_images(&self) -> Result<()> {
        let Some(epoch) = self.begin_fetch(InventoryKind::Images) else {
            return Ok(());
        };
        let result = self.docker.list_images().await;
        self.apply(InventoryKind::Images, epoch, result, |inv, v| inv.images = v)
            .await
    }

    pub async fn fetch_volumes(&self) -> Result<()> {
        let Some(epoch) = self.begin_fetch(InventoryKind::Volumes) else {
            return Ok(());
        };
        let result = self.docker.list_volumes().await;
        self.apply(InventoryKind::Volumes, epoch, result, |inv, v| inv.volumes = v)
            .await
    }

    pub async fn fetch_networks(&self) -> Result<()> {
        let Some(epoch) = self.begin_fetch(InventoryKind::Networks) else {
            return Ok(());
        };
        let result = self.docker.list_networks().await;
        self.apply(InventoryKind::Networks, epoch, result, |inv, v| {
            inv.networks = v
        })
        .await
    }

    pub async fn fetch_usage(&self) -> Result<()> {
        let Some(epoch) = self.begin_fetch(InventoryKind::Usage) else {
            return Ok(());
        };
        let disk = self.disk_estimate_percent;
        let result = self
            .docker
            .stats()
            .await
            .map(|stats| aggregate_usage(&stats, disk));
        self.apply(InventoryKind::Usage, epoch, result, |inv, v| inv.usage = v)
            .await
    }

    /// Run all five fetches concurrently and wait for every one of them
    pub async fn fetch_all(&self) -> RefreshReport {
        let (containers, images, volumes, networks, usage) = tokio::join!(
            self.fetch_containers(),
            self.fetch_images(),
            self.fetch_volumes(),
            self.fetch_networks(),
            self.fetch_usage(),
        );

        let failed = [
            (InventoryKind::Containers, containers.is_err()),
            (InventoryKind::Images, images.is_err()),
            (InventoryKind::Volumes, volumes.is_err()),
            (InventoryKind::Networks, networks.is_err()),
            (InventoryKind::Usage, usage.is_err()),
        ]
        .into_iter()
        .filter_map(|(kind, failed)| failed.then_some(kind))
        .collect();

        RefreshReport { failed }
    }

    /// Drop every inventory and stop accepting fetch results
    pub async fn clear(&self) {
        let mut inventory = self.inventory.write().await;
        self.active.store(false, Ordering::SeqCst);
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *inventory = Inventory::default();
        drop(inventory);

        self.errors.write().await.clear();
        tracing::debug!("Cleared resource inventories");
    }

    pub async fn snapshot(&self) -> Inventory {
        self.inventory.read().await.clone()
    }

    pub async fn containers(&self) -> Vec<ContainerRecord> {
        self.inventory.read().await.containers.clone()
    }

    pub async fn images(&self) -> Vec<ImageRecord> {
        self.inventory.read().await.images.clone()
    }

    pub async fn volumes(&self) -> Vec<VolumeRecord> {
        self.inventory.read().await.volumes.clone()
    }

    pub async fn networks(&self) -> Vec<NetworkRecord> {
        self.inventory.read().await.networks.clone()
    }

    pub async fn usage(&self) -> ResourceUsage {
        self.inventory.read().await.usage
    }

    /// Last failure per inventory, cleared by the next successful fetch
    pub async fn last_errors(&self) -> HashMap<InventoryKind, String> {
        self.errors.read().await.clone()
    }

    /// Engine info; not cached
    pub async fn info(&self) -> Option<serde_json::Value> {
        if !self.is_active() {
            return None;
        }
        match self.docker.info().await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Failed to read engine info: {}", e);
                None
            }
        }
    }

    /// Engine disk usage summary; not cached
    pub async fn disk_usage(&self) -> Vec<DiskUsageRecord> {
        if !self.is_active() {
            return Vec::new();
        }
        self.docker.disk_usage().await.unwrap_or_else(|e| {
            tracing::warn!("Failed to read disk usage: {}", e);
            Vec::new()
        })
    }
}

#[async_trait]
impl ResourceSync for Reconciler {
    fn activate(&self) {
        Reconciler::activate(self);
    }

    async fn refresh(&self) {
        let report = self.fetch_all().await;
        if !report.is_complete() {
            tracing::warn!("Inventory refresh incomplete: {:?}", report.failed);
        }
    }

    async fn clear(&self) {
        Reconciler::clear(self).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockside_core::CommandOutput;
    use dockside_core::testing::FakeRunner;
    use std::sync::Arc;
    use std::time::Duration;

    const CONTAINERS: &str = r#"{"ID":"a1","Names":"web","Image":"nginx","State":"running","Status":"Up"}"#;
    const IMAGES: &str = r#"{"ID":"sha256:1","Repository":"nginx","Tag":"alpine","Size":"43MB"}"#;
    const VOLUMES: &str = r#"{"Name":"data","Driver":"local","Mountpoint":"/var/lib/docker/volumes/data/_data"}"#;
    const NETWORKS: &str = r#"{"ID":"n1","Name":"bridge","Driver":"bridge","Scope":"local"}"#;
    const STATS: &str = "{\"CPUPerc\":\"70.0%\",\"MemPerc\":\"40%\"}\n{\"CPUPerc\":\"55.5%\",\"MemPerc\":\"10%\"}";

    fn scripted() -> Arc<FakeRunner> {
        let runner = Arc::new(FakeRunner::new());
        runner.on("docker ps", CommandOutput::success(CONTAINERS));
        runner.on("docker images", CommandOutput::success(IMAGES));
        runner.on("docker volume ls", CommandOutput::success(VOLUMES));
        runner.on("docker network ls", CommandOutput::success(NETWORKS));
        runner.on("docker stats", CommandOutput::success(STATS));
        runner
    }

    fn reconciler(runner: &Arc<FakeRunner>) -> Reconciler {
        let reconciler = Reconciler::new(DockerCli::new(runner.clone())).with_disk_estimate(30.0);
        reconciler.activate();
        reconciler
    }

    #[test]
    fn test_aggregate_usage_clamps() {
        let stats = [
            ContainerStats {
                cpu_percent: 70.0,
                memory_percent: 40.0,
            },
            ContainerStats {
                cpu_percent: 55.5,
                memory_percent: 10.0,
            },
        ];
        let usage = aggregate_usage(&stats, 30.0);
        assert_eq!(usage.cpu_percent, 100.0);
        assert_eq!(usage.memory_percent, 50.0);
        assert_eq!(usage.disk_percent, 30.0);

        assert_eq!(aggregate_usage(&[], 0.0), ResourceUsage::default());
    }

    #[tokio::test]
    async fn test_fetch_all_populates_everything() {
        let runner = scripted();
        let reconciler = reconciler(&runner);

        let report = reconciler.fetch_all().await;
        assert!(report.is_complete());

        let inventory = reconciler.snapshot().await;
        assert_eq!(inventory.containers.len(), 1);
        assert_eq!(inventory.images.len(), 1);
        assert_eq!(inventory.volumes[0].name, "data");
        assert_eq!(inventory.networks[0].scope, "local");
        assert_eq!(inventory.usage.cpu_percent, 100.0);
        assert!(inventory.refreshed_at.is_some());
    }

    #[tokio::test]
    async fn test_fetch_all_survives_one_failure() {
        let runner = scripted();
        let reconciler = reconciler(&runner);
        reconciler.fetch_all().await;

        runner.on("docker ps", CommandOutput::success(""));
        runner.on(
            "docker images",
            CommandOutput::failure(1, "Cannot connect to the Docker daemon"),
        );
        runner.on("docker volume ls", CommandOutput::success(""));
        runner.on("docker network ls", CommandOutput::success(""));
        runner.on("docker stats", CommandOutput::success(""));

        let report = reconciler.fetch_all().await;
        assert_eq!(report.failed, vec![InventoryKind::Images]);

        let inventory = reconciler.snapshot().await;
        assert!(inventory.containers.is_empty());
        assert!(inventory.volumes.is_empty());
        assert!(inventory.networks.is_empty());
        assert_eq!(inventory.usage.cpu_percent, 0.0);
        // failed fetch keeps the previous snapshot
        assert_eq!(inventory.images.len(), 1);

        let errors = reconciler.last_errors().await;
        assert_eq!(errors.len(), 1);
        assert!(errors[&InventoryKind::Images].contains("Cannot connect"));
    }

    #[tokio::test]
    async fn test_error_cleared_by_next_success() {
        let runner = scripted();
        let reconciler = reconciler(&runner);
        runner.on("docker volume ls", CommandOutput::failure(1, "boom"));
        assert!(reconciler.fetch_volumes().await.is_err());
        assert!(reconciler.last_errors().await.contains_key(&InventoryKind::Volumes));

        runner.on("docker volume ls", CommandOutput::success(VOLUMES));
        reconciler.fetch_volumes().await.unwrap();
        assert!(reconciler.last_errors().await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_empties_and_deactivates() {
        let runner = scripted();
        let reconciler = reconciler(&runner);
        reconciler.fetch_all().await;

        reconciler.clear().await;
        assert!(reconciler.snapshot().await.is_empty());
        assert!(reconciler.usage().await.is_zero());
        assert!(!reconciler.is_active());

        runner.reset_calls();
        reconciler.fetch_all().await;
        assert!(runner.calls().is_empty());
        assert!(reconciler.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_finishing_after_clear_is_dropped() {
        let runner = scripted();
        runner.on_delayed(
            "docker ps",
            CommandOutput::success(CONTAINERS),
            Duration::from_millis(200),
        );
        let reconciler = Arc::new(reconciler(&runner));

        let fetch = {
            let reconciler = reconciler.clone();
            tokio::spawn(async move { reconciler.fetch_containers().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        reconciler.clear().await;
        reconciler.activate();

        fetch.await.unwrap().unwrap();
        assert!(reconciler.containers().await.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_needs_activation() {
        let runner = scripted();
        let reconciler = Reconciler::new(DockerCli::new(runner.clone()));
        assert!(!reconciler.is_active());

        ResourceSync::refresh(&reconciler).await;
        assert!(runner.calls().is_empty());
        assert!(reconciler.snapshot().await.is_empty());

        ResourceSync::activate(&reconciler);
        ResourceSync::refresh(&reconciler).await;
        assert!(reconciler.is_active());
        assert_eq!(reconciler.containers().await.len(), 1);
        assert_eq!(runner.count("docker ps -a"), 1);
    }

    #[tokio::test]
    async fn test_info_absent_on_failure() {
        let runner = scripted();
        let reconciler = reconciler(&runner);

        runner.on("docker info", CommandOutput::failure(1, "daemon down"));
        assert!(reconciler.info().await.is_none());

        runner.on(
            "docker info",
            CommandOutput::success(r#"{"ServerVersion":"26.1.1","NCPU":4}"#),
        );
        let info = reconciler.info().await.unwrap();
        assert_eq!(info["ServerVersion"], "26.1.1");
    }
}
