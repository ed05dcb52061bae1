use super::{print_json, running_machine, short_id};
use colored::Colorize;
use dockside_bridge::{ContainerRecord, ContainerState, Dockside, ResourceUsage};

/// Inventories are empty while the VM is not running
fn empty(json: bool) -> anyhow::Result<()> {
    if json {
        println!("[]");
    }
    Ok(())
}

fn header(line: String, width: usize) {
    println!("{}", line.bold());
    println!("{}", "─".repeat(width).dimmed());
}

pub async fn ps(dockside: &Dockside, vm: &str, all: bool, json: bool) -> anyhow::Result<()> {
    let Some(machine) = running_machine(dockside, vm).await else {
        return empty(json);
    };

    // the status sync fetched every container; filter locally
    let containers: Vec<ContainerRecord> = machine
        .reconciler
        .containers()
        .await
        .into_iter()
        .filter(|c| all || c.state == ContainerState::Running)
        .collect();

    if json {
        return print_json(&containers);
    }

    if containers.is_empty() {
        println!("{}", "No running containers".dimmed());
        return Ok(());
    }

    header(
        format!(
            "{:<14} {:<24} {:<28} {:<24} {:<30}",
            "CONTAINER ID", "NAME", "IMAGE", "STATUS", "PORTS"
        ),
        124,
    );
    for container in &containers {
        let status = format!("{:<24}", container.status);
        let status = if container.status.starts_with("Up") {
            status.green()
        } else {
            status.red()
        };
        println!(
            "{:<14} {:<24} {:<28} {} {:<30}",
            short_id(&container.id),
            container.name,
            container.image,
            status,
            container.ports
        );
    }
    Ok(())
}

pub async fn images(dockside: &Dockside, vm: &str, json: bool) -> anyhow::Result<()> {
    let Some(machine) = running_machine(dockside, vm).await else {
        return empty(json);
    };
    let images = machine.reconciler.images().await;

    if json {
        return print_json(&images);
    }
    if images.is_empty() {
        println!("{}", "No images".dimmed());
        return Ok(());
    }

    header(
        format!(
            "{:<40} {:<20} {:<14} {:<10}",
            "REPOSITORY", "TAG", "IMAGE ID", "SIZE"
        ),
        87,
    );
    for image in &images {
        println!(
            "{:<40} {:<20} {:<14} {:<10}",
            image.repository,
            image.tag,
            short_id(&image.id),
            image.size_human
        );
    }
    Ok(())
}

pub async fn volumes(dockside: &Dockside, vm: &str, json: bool) -> anyhow::Result<()> {
    let Some(machine) = running_machine(dockside, vm).await else {
        return empty(json);
    };
    let volumes = machine.reconciler.volumes().await;

    if json {
        return print_json(&volumes);
    }
    if volumes.is_empty() {
        println!("{}", "No volumes".dimmed());
        return Ok(());
    }

    header(format!("{:<10} {:<40}", "DRIVER", "VOLUME NAME"), 51);
    for volume in &volumes {
        println!("{:<10} {:<40}", volume.driver, volume.name);
    }
    Ok(())
}

pub async fn networks(dockside: &Dockside, vm: &str, json: bool) -> anyhow::Result<()> {
    let Some(machine) = running_machine(dockside, vm).await else {
        return empty(json);
    };
    let networks = machine.reconciler.networks().await;

    if json {
        return print_json(&networks);
    }
    if networks.is_empty() {
        println!("{}", "No networks".dimmed());
        return Ok(());
    }

    header(
        format!(
            "{:<14} {:<30} {:<10} {:<8}",
            "NETWORK ID", "NAME", "DRIVER", "SCOPE"
        ),
        65,
    );
    for network in &networks {
        println!(
            "{:<14} {:<30} {:<10} {:<8}",
            short_id(&network.id),
            network.name,
            network.driver,
            network.scope
        );
    }
    Ok(())
}

/// Always JSON; `docker info` has no stable tabular form
pub async fn info(dockside: &Dockside, vm: &str) -> anyhow::Result<()> {
    if running_machine(dockside, vm).await.is_none() {
        return Ok(());
    }
    match dockside.get_docker_info(vm).await {
        Some(info) => print_json(&info),
        None => anyhow::bail!("Docker engine information is unavailable"),
    }
}

pub async fn df(dockside: &Dockside, vm: &str, json: bool) -> anyhow::Result<()> {
    if running_machine(dockside, vm).await.is_none() {
        return empty(json);
    }
    let usage = dockside.get_disk_usage(vm).await;

    if json {
        return print_json(&usage);
    }

    header(
        format!(
            "{:<16} {:<8} {:<8} {:<12} {:<16}",
            "TYPE", "TOTAL", "ACTIVE", "SIZE", "RECLAIMABLE"
        ),
        64,
    );
    for record in &usage {
        println!(
            "{:<16} {:<8} {:<8} {:<12} {:<16}",
            record.kind, record.total_count, record.active, record.size, record.reclaimable
        );
    }
    Ok(())
}

pub async fn usage(dockside: &Dockside, vm: &str, json: bool) -> anyhow::Result<()> {
    let Some(machine) = running_machine(dockside, vm).await else {
        return if json {
            print_json(&ResourceUsage::default())
        } else {
            Ok(())
        };
    };
    let usage = machine.reconciler.usage().await;

    if json {
        return print_json(&usage);
    }

    println!("{}", "Resource usage".bold());
    println!("  CPU:    {:>6.1}%", usage.cpu_percent);
    println!("  Memory: {:>6.1}%", usage.memory_percent);
    println!(
        "  Disk:   {:>6.1}% {}",
        usage.disk_percent,
        "(configured estimate)".dimmed()
    );
    Ok(())
}
