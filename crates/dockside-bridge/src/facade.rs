//! One async method per frontend operation
//!
//! Every method names the VM it acts on; an empty name means the configured
//! default profile. Machines are created on first use and live for the
//! lifetime of the facade.

use crate::machine::Machine;
use dockside_config::DocksideConfig;
use dockside_core::{
    CommandRunner, ContainerRecord, ContainerState, DiskUsageRecord, DocksideError, ImageRecord,
    LogsResult, NetworkRecord, OperationResult, ProcessRunner, ResourceUsage, VmState, VmStatus,
    VolumeRecord,
};
use dockside_vm::{Colima, StartOptions};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct Dockside {
    config: DocksideConfig,
    runner: Arc<dyn CommandRunner>,
    machines: Mutex<HashMap<String, Arc<Machine>>>,
}

impl Dockside {
    /// Facade running real `colima` / `docker` processes
    pub fn new(config: DocksideConfig) -> Self {
        Self::with_runner(config, Arc::new(ProcessRunner::new()))
    }

    pub fn with_runner(config: DocksideConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config,
            runner,
            machines: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &DocksideConfig {
        &self.config
    }

    fn resolve<'a>(&'a self, vm: &'a str) -> &'a str {
        if vm.trim().is_empty() {
            &self.config.default_profile
        } else {
            vm
        }
    }

    /// Machine for `vm`, created on first use
    pub async fn machine(&self, vm: &str) -> Arc<Machine> {
        let name = self.resolve(vm);
        let mut machines = self.machines.lock().await;
        machines
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!("Tracking VM '{}'", name);
                Arc::new(Machine::build(name, &self.config, self.runner.clone()))
            })
            .clone()
    }

    /// Machine for `vm` when it is running; inventories are only queried then
    async fn running(&self, vm: &str) -> Option<Arc<Machine>> {
        let machine = self.machine(vm).await;
        is_running(&machine).await.then_some(machine)
    }

    fn colima(&self) -> Colima {
        Colima::new(self.runner.clone())
            .with_binary(&self.config.vm_binary)
            .with_timeouts(
                self.config.timeouts.query(),
                self.config.timeouts.lifecycle(),
            )
    }

    // ========== VM ==========

    /// Re-read the VM status; a failed query keeps the last snapshot and records the error
    pub async fn get_vm_status(&self, vm: &str) -> VmState {
        let machine = self.machine(vm).await;
        match machine.controller.fetch_status().await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("Failed to read status of VM '{}': {}", machine.controller.name(), e);
                machine.controller.snapshot().await
            }
        }
    }

    /// Every colima profile; tracked VMs report their in-flight transition
    pub async fn list_vm_instances(&self) -> Vec<VmState> {
        let mut instances = match self.colima().list().await {
            Ok(instances) => instances,
            Err(e) => {
                tracing::warn!("Failed to list VM instances: {}", e);
                return Vec::new();
            }
        };

        let machines = self.machines.lock().await;
        for instance in &mut instances {
            if let Some(machine) = machines.get(instance.name()) {
                let status = machine.controller.status().await;
                if status.is_transitioning() {
                    instance.status = status;
                }
            }
        }
        instances
    }

    pub async fn start_vm(&self, vm: &str, options: &StartOptions) -> OperationResult {
        let machine = self.machine(vm).await;
        envelope(machine.controller.start(options).await, "VM started", "Start failed")
    }

    pub async fn stop_vm(&self, vm: &str) -> OperationResult {
        let machine = self.machine(vm).await;
        envelope(machine.controller.stop().await, "VM stopped", "Stop failed")
    }

    pub async fn restart_vm(&self, vm: &str) -> OperationResult {
        let machine = self.machine(vm).await;
        envelope(machine.controller.restart().await, "VM restarted", "Restart failed")
    }

    pub async fn remove_vm(&self, vm: &str, force: bool) -> OperationResult {
        let machine = self.machine(vm).await;
        envelope(machine.controller.remove(force).await, "VM deleted", "Delete failed")
    }

    /// Re-read the status and, when the VM was already running, every inventory
    pub async fn refresh_all(&self, vm: &str) -> VmState {
        let machine = self.machine(vm).await;
        let was_running = is_running(&machine).await;
        let state = self.get_vm_status(vm).await;

        // a VM observed starting up has just been refreshed by the controller
        if was_running && state.is_running() {
            let report = machine.reconciler.fetch_all().await;
            if !report.is_complete() {
                tracing::warn!("Refresh incomplete: {:?}", report.failed);
            }
        }
        state
    }

    // ========== Inventories ==========

    /// Containers of the VM; running ones only unless `all` is set.
    ///
    /// The cached inventory always holds every container.
    pub async fn list_containers(&self, vm: &str, all: bool) -> Vec<ContainerRecord> {
        let machine = self.machine(vm).await;
        if is_running(&machine).await
            && let Err(e) = machine.reconciler.fetch_containers().await
        {
            tracing::debug!("Serving cached containers: {}", e);
        }
        machine
            .reconciler
            .containers()
            .await
            .into_iter()
            .filter(|c| all || c.state == ContainerState::Running)
            .collect()
    }

    pub async fn list_images(&self, vm: &str) -> Vec<ImageRecord> {
        let machine = self.machine(vm).await;
        if is_running(&machine).await
            && let Err(e) = machine.reconciler.fetch_images().await
        {
            tracing::debug!("Serving cached images: {}", e);
        }
        machine.reconciler.images().await
    }

    pub async fn list_volumes(&self, vm: &str) -> Vec<VolumeRecord> {
        let machine = self.machine(vm).await;
        if is_running(&machine).await
            && let Err(e) = machine.reconciler.fetch_volumes().await
        {
            tracing::debug!("Serving cached volumes: {}", e);
        }
        machine.reconciler.volumes().await
    }

    pub async fn list_networks(&self, vm: &str) -> Vec<NetworkRecord> {
        let machine = self.machine(vm).await;
        if is_running(&machine).await
            && let Err(e) = machine.reconciler.fetch_networks().await
        {
            tracing::debug!("Serving cached networks: {}", e);
        }
        machine.reconciler.networks().await
    }

    pub async fn get_resource_usage(&self, vm: &str) -> ResourceUsage {
        let machine = self.machine(vm).await;
        if is_running(&machine).await
            && let Err(e) = machine.reconciler.fetch_usage().await
        {
            tracing::debug!("Serving cached usage: {}", e);
        }
        machine.reconciler.usage().await
    }

    pub async fn get_docker_info(&self, vm: &str) -> Option<serde_json::Value> {
        match self.running(vm).await {
            Some(machine) => machine.reconciler.info().await,
            None => None,
        }
    }

    pub async fn get_disk_usage(&self, vm: &str) -> Vec<DiskUsageRecord> {
        match self.running(vm).await {
            Some(machine) => machine.reconciler.disk_usage().await,
            None => Vec::new(),
        }
    }

    // ========== Containers ==========

    pub async fn start_container(&self, vm: &str, id: &str) -> OperationResult {
        self.machine(vm).await.dispatcher.start_container(id).await
    }

    pub async fn stop_container(&self, vm: &str, id: &str) -> OperationResult {
        self.machine(vm).await.dispatcher.stop_container(id).await
    }

    pub async fn restart_container(&self, vm: &str, id: &str) -> OperationResult {
        self.machine(vm).await.dispatcher.restart_container(id).await
    }

    pub async fn remove_container(&self, vm: &str, id: &str, force: bool) -> OperationResult {
        self.machine(vm)
            .await
            .dispatcher
            .remove_container(id, force)
            .await
    }

    /// `tail_lines` defaults to the configured `log_tail_lines`
    pub async fn get_container_logs(
        &self,
        vm: &str,
        id: &str,
        tail_lines: Option<u32>,
    ) -> LogsResult {
        let tail = tail_lines.unwrap_or(self.config.log_tail_lines);
        self.machine(vm)
            .await
            .dispatcher
            .container_logs(id, Some(tail))
            .await
    }

    // ========== Images ==========

    pub async fn pull_image(&self, vm: &str, image: &str) -> OperationResult {
        self.machine(vm).await.dispatcher.pull_image(image).await
    }

    pub async fn remove_image(&self, vm: &str, id: &str, force: bool) -> OperationResult {
        self.machine(vm).await.dispatcher.remove_image(id, force).await
    }

    // ========== Volumes ==========

    pub async fn create_volume(&self, vm: &str, name: &str) -> OperationResult {
        self.machine(vm).await.dispatcher.create_volume(name).await
    }

    pub async fn remove_volume(&self, vm: &str, name: &str, force: bool) -> OperationResult {
        self.machine(vm)
            .await
            .dispatcher
            .remove_volume(name, force)
            .await
    }

    // ========== Networks ==========

    pub async fn create_network(
        &self,
        vm: &str,
        name: &str,
        driver: Option<&str>,
    ) -> OperationResult {
        self.machine(vm)
            .await
            .dispatcher
            .create_network(name, driver)
            .await
    }

    pub async fn remove_network(&self, vm: &str, name: &str) -> OperationResult {
        self.machine(vm).await.dispatcher.remove_network(name).await
    }
}

async fn is_running(machine: &Machine) -> bool {
    machine.controller.status().await == VmStatus::Running
}

fn envelope(result: Result<(), DocksideError>, success: &str, failure: &str) -> OperationResult {
    match result {
        Ok(()) => OperationResult::ok(success),
        Err(e) => OperationResult::failed(e.failure_message(failure)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_messages() {
        assert_eq!(
            envelope(Ok(()), "VM started", "Start failed"),
            OperationResult::ok("VM started")
        );

        let busy = DocksideError::Busy {
            name: "default".to_string(),
        };
        let result = envelope(Err(busy), "VM started", "Start failed");
        assert!(!result.succeeded);
        assert_eq!(
            result.message,
            "VM 'default' is busy with another lifecycle operation"
        );

        let silent = DocksideError::NonZeroExit {
            program: "colima".to_string(),
            code: Some(1),
            stderr: "  ".to_string(),
        };
        assert_eq!(
            envelope(Err(silent), "VM stopped", "Stop failed"),
            OperationResult::failed("Stop failed")
        );
    }

    #[tokio::test]
    async fn test_empty_name_resolves_to_default_profile() {
        let dockside = Dockside::new(DocksideConfig::default());
        let a = dockside.machine("").await;
        let b = dockside.machine("default").await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.controller.name(), "default");

        let other = dockside.machine("work").await;
        assert!(!Arc::ptr_eq(&a, &other));
    }
}
