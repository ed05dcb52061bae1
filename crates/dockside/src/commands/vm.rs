use super::{print_json, report};
use colored::Colorize;
use dockside_bridge::{Dockside, Runtime, StartOptions, VmState, VmStatus};

fn colored_status(status: VmStatus, width: usize) -> colored::ColoredString {
    let text = format!("{:<width$}", status.to_string());
    match status {
        VmStatus::Running => text.green(),
        VmStatus::Stopped => text.red(),
        _ => text.yellow(),
    }
}

fn print_state(state: &VmState) {
    println!("{} {}", "VM:".bold(), state.name().cyan());
    println!("  Status:  {}", colored_status(state.status, 0));
    println!("  Arch:    {}", state.info.arch);
    println!("  Runtime: {}", state.info.runtime);
    println!("  CPUs:    {}", state.info.cpu_cores);
    println!("  Memory:  {} GiB", state.info.memory_gib);
    println!("  Disk:    {} GiB", state.info.disk_gib);
    if !state.info.address.is_empty() {
        println!("  Address: {}", state.info.address);
    }
    if let Some(error) = &state.last_error {
        println!("  {} {}", "Last error:".yellow(), error);
    }
}

pub async fn status(dockside: &Dockside, vm: &str, json: bool) -> anyhow::Result<()> {
    let state = dockside.get_vm_status(vm).await;
    if json {
        return print_json(&state);
    }
    print_state(&state);
    Ok(())
}

pub async fn list(dockside: &Dockside, json: bool) -> anyhow::Result<()> {
    let instances = dockside.list_vm_instances().await;
    if json {
        return print_json(&instances);
    }

    if instances.is_empty() {
        println!("{}", "No VM profiles found".dimmed());
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "{:<16} {:<12} {:<8} {:<6} {:<10} {:<10} {:<12} {:<16}",
            "PROFILE", "STATUS", "ARCH", "CPUS", "MEMORY", "DISK", "RUNTIME", "ADDRESS"
        )
        .bold()
    );
    println!("{}", "─".repeat(96).dimmed());
    for state in &instances {
        println!(
            "{:<16} {} {:<8} {:<6} {:<10} {:<10} {:<12} {:<16}",
            state.name(),
            colored_status(state.status, 12),
            state.info.arch.to_string(),
            state.info.cpu_cores,
            format!("{}GiB", state.info.memory_gib),
            format!("{}GiB", state.info.disk_gib),
            state.info.runtime.to_string(),
            state.info.address,
        );
    }
    Ok(())
}

/// Bring the controller in line with the real VM before a transition
async fn sync_status(dockside: &Dockside, vm: &str) {
    let state = dockside.get_vm_status(vm).await;
    tracing::debug!("VM '{}' is {} before transition", state.name(), state.status);
}

pub async fn start(
    dockside: &Dockside,
    vm: &str,
    cpu: Option<u32>,
    memory_gib: Option<u32>,
    disk_gib: Option<u32>,
    runtime: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    sync_status(dockside, vm).await;
    let options = StartOptions {
        cpu,
        memory_gib,
        disk_gib,
        runtime: runtime.map(Runtime::from_name),
    };

    if !json {
        println!("{}", "Starting VM...".blue());
    }
    report(&dockside.start_vm(vm, &options).await, json)
}

pub async fn stop(dockside: &Dockside, vm: &str, json: bool) -> anyhow::Result<()> {
    sync_status(dockside, vm).await;
    if !json {
        println!("{}", "Stopping VM...".blue());
    }
    report(&dockside.stop_vm(vm).await, json)
}

pub async fn restart(dockside: &Dockside, vm: &str, json: bool) -> anyhow::Result<()> {
    sync_status(dockside, vm).await;
    if !json {
        println!("{}", "Restarting VM...".blue());
    }
    report(&dockside.restart_vm(vm).await, json)
}

pub async fn delete(dockside: &Dockside, vm: &str, force: bool, json: bool) -> anyhow::Result<()> {
    sync_status(dockside, vm).await;
    report(&dockside.remove_vm(vm, force).await, json)
}

pub async fn refresh(dockside: &Dockside, vm: &str, json: bool) -> anyhow::Result<()> {
    let state = dockside.refresh_all(vm).await;
    if json {
        return print_json(&state);
    }

    print_state(&state);
    if state.is_running() {
        let inventory = dockside.machine(vm).await.reconciler.snapshot().await;
        println!();
        println!(
            "  {} containers, {} images, {} volumes, {} networks",
            inventory.containers.len(),
            inventory.images.len(),
            inventory.volumes.len(),
            inventory.networks.len()
        );
    }
    Ok(())
}
