pub mod inventory;
pub mod resource;
pub mod vm;

use colored::Colorize;
use dockside_bridge::{Dockside, Machine, OperationResult};
use serde::Serialize;
use std::sync::Arc;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print an operation envelope; a failed operation becomes an error for `main`
pub fn report(result: &OperationResult, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(result)?;
    } else if result.succeeded {
        println!("{}", format!("✓ {}", result.message).green());
    }

    if !result.succeeded {
        anyhow::bail!("{}", result.message);
    }
    Ok(())
}

/// Sync the VM status and return its machine when it is running
pub async fn running_machine(dockside: &Dockside, vm: &str) -> Option<Arc<Machine>> {
    let state = dockside.get_vm_status(vm).await;
    if state.is_running() {
        return Some(dockside.machine(vm).await);
    }

    eprintln!(
        "{}",
        format!("VM '{}' is {}", state.name(), state.status).yellow()
    );
    if let Some(error) = &state.last_error {
        eprintln!("  {}", error.dimmed());
    }
    None
}

/// Shorten an ID for table output
pub fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    id.get(..12).unwrap_or(id)
}
