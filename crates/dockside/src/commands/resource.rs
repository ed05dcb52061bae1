use super::print_json;
use dockside_bridge::Dockside;

pub async fn logs(
    dockside: &Dockside,
    vm: &str,
    id: &str,
    tail: Option<u32>,
    json: bool,
) -> anyhow::Result<()> {
    let logs = dockside.get_container_logs(vm, id, tail).await;
    if json {
        print_json(&logs)?;
    } else if logs.succeeded {
        print!("{}", logs.text);
    }

    if !logs.succeeded {
        anyhow::bail!("{}", logs.text.trim());
    }
    Ok(())
}
