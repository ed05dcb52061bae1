//! One managed VM and the engine state bound to it

use dockside_config::DocksideConfig;
use dockside_core::{CommandRunner, ResourceSync};
use dockside_engine::{Dispatcher, DockerCli, Reconciler, context_for_profile};
use dockside_vm::{Colima, VmController};
use std::sync::Arc;

pub struct Machine {
    pub controller: VmController,
    pub reconciler: Arc<Reconciler>,
    pub dispatcher: Dispatcher,
}

impl Machine {
    pub fn build(name: &str, config: &DocksideConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let context = config
            .pin_docker_context
            .then(|| context_for_profile(name));

        let docker = DockerCli::new(runner.clone())
            .with_binary(&config.engine_binary)
            .with_context(context)
            .with_timeouts(config.timeouts.query(), config.timeouts.operation());
        let reconciler = Arc::new(
            Reconciler::new(docker).with_disk_estimate(config.usage.disk_estimate_percent),
        );

        let colima = Colima::new(runner)
            .with_binary(&config.vm_binary)
            .with_timeouts(config.timeouts.query(), config.timeouts.lifecycle());
        let sync: Arc<dyn ResourceSync> = reconciler.clone();
        let controller =
            VmController::new(name, colima, sync).with_settle_delay(config.restart_settle());

        let dispatcher = Dispatcher::new(reconciler.clone());

        Self {
            controller,
            reconciler,
            dispatcher,
        }
    }
}
