//! docker CLI wrapper
//!
//! Every command is pinned to the docker context of the VM it belongs to,
//! so two profiles never read each other's containers.

use dockside_core::{
    Args, CommandOutput, CommandRunner, ContainerRecord, ContainerState, DEFAULT_VM_NAME,
    DiskUsageRecord, ImageRecord, NetworkRecord, Result, VolumeRecord, parse_percent,
    parse_record_stream, parse_single_record,
};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use std::time::Duration;

/// Docker context colima creates for a profile
pub fn context_for_profile(profile: &str) -> String {
    if profile == DEFAULT_VM_NAME {
        "colima".to_string()
    } else {
        format!("colima-{}", profile)
    }
}

/// docker CLI wrapper
#[derive(Clone)]
pub struct DockerCli {
    runner: Arc<dyn CommandRunner>,
    binary: String,
    context: Option<String>,
    query_timeout: Duration,
    operation_timeout: Duration,
}

impl DockerCli {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            binary: "docker".to_string(),
            context: None,
            query_timeout: Duration::from_secs(30),
            operation_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    pub fn with_timeouts(mut self, query: Duration, operation: Duration) -> Self {
        self.query_timeout = query;
        self.operation_timeout = operation;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    async fn run<I, S>(&self, args: I, timeout: Duration) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = Args::default()
            .opt("--context", self.context.as_deref())
            .args(args);
        self.runner.run(&self.binary, args.as_slice(), timeout).await
    }

    async fn query<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let output = self
            .run(args, self.query_timeout)
            .await?
            .into_result(&self.binary)?;
        Ok(output.stdout)
    }

    // ========== Queries ==========

    pub async fn list_containers(&self, all: bool) -> Result<Vec<ContainerRecord>> {
        let args = Args::new(["ps"]).flag("-a", all).args(["--format", "json"]);
        let stdout = self.query(args.into_vec()).await?;
        Ok(parse_record_stream::<RawContainer>(&stdout)
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub async fn list_images(&self) -> Result<Vec<ImageRecord>> {
        let stdout = self.query(["images", "--format", "json"]).await?;
        Ok(parse_record_stream::<RawImage>(&stdout)
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub async fn list_volumes(&self) -> Result<Vec<VolumeRecord>> {
        let stdout = self.query(["volume", "ls", "--format", "json"]).await?;
        Ok(parse_record_stream::<RawVolume>(&stdout)
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub async fn list_networks(&self) -> Result<Vec<NetworkRecord>> {
        let stdout = self.query(["network", "ls", "--format", "json"]).await?;
        Ok(parse_record_stream::<RawNetwork>(&stdout)
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// Per-container CPU and memory percentages (one sample)
    pub async fn stats(&self) -> Result<Vec<ContainerStats>> {
        let stdout = self
            .query(["stats", "--no-stream", "--format", "json"])
            .await?;
        Ok(parse_record_stream::<RawStats>(&stdout)
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// `docker info`; `None` when the output is not JSON
    pub async fn info(&self) -> Result<Option<serde_json::Value>> {
        let stdout = self.query(["info", "--format", "json"]).await?;
        Ok(parse_single_record(&stdout))
    }

    pub async fn disk_usage(&self) -> Result<Vec<DiskUsageRecord>> {
        let stdout = self.query(["system", "df", "--format", "json"]).await?;
        Ok(parse_record_stream::<RawDiskUsage>(&stdout)
            .into_iter()
            .map(Into::into)
            .collect())
    }

    // ========== Container operations ==========

    pub async fn start_container(&self, id: &str) -> Result<CommandOutput> {
        self.run(["start", id], self.operation_timeout).await
    }

    pub async fn stop_container(&self, id: &str) -> Result<CommandOutput> {
        self.run(["stop", id], self.operation_timeout).await
    }

    pub async fn restart_container(&self, id: &str) -> Result<CommandOutput> {
        self.run(["restart", id], self.operation_timeout).await
    }

    pub async fn remove_container(&self, id: &str, force: bool) -> Result<CommandOutput> {
        let args = Args::new(["rm"]).flag("-f", force).arg(id);
        self.run(args.into_vec(), self.operation_timeout).await
    }

    pub async fn logs(&self, id: &str, tail: Option<u32>) -> Result<CommandOutput> {
        let args = Args::new(["logs"]).opt("--tail", tail).arg(id);
        self.run(args.into_vec(), self.query_timeout).await
    }

    // ========== Image operations ==========

    pub async fn pull_image(&self, image: &str) -> Result<CommandOutput> {
        self.run(["pull", image], self.operation_timeout).await
    }

    pub async fn remove_image(&self, id: &str, force: bool) -> Result<CommandOutput> {
        let args = Args::new(["rmi"]).flag("-f", force).arg(id);
        self.run(args.into_vec(), self.operation_timeout).await
    }

    // ========== Volume operations ==========

    pub async fn create_volume(&self, name: &str) -> Result<CommandOutput> {
        self.run(["volume", "create", name], self.operation_timeout)
            .await
    }

    pub async fn remove_volume(&self, name: &str, force: bool) -> Result<CommandOutput> {
        let args = Args::new(["volume", "rm"]).flag("-f", force).arg(name);
        self.run(args.into_vec(), self.operation_timeout).await
    }

    // ========== Network operations ==========

    pub async fn create_network(&self, name: &str, driver: Option<&str>) -> Result<CommandOutput> {
        let args = Args::new(["network", "create"])
            .opt("--driver", driver)
            .arg(name);
        self.run(args.into_vec(), self.operation_timeout).await
    }

    pub async fn remove_network(&self, name: &str) -> Result<CommandOutput> {
        self.run(["network", "rm", name], self.operation_timeout)
            .await
    }
}

/// One `docker stats` sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerStats {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

// docker's `--format json` output. Absent fields decode as empty strings.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawContainer {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "Image")]
    image: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "State")]
    state: ContainerState,
    #[serde(rename = "Ports")]
    ports: String,
    #[serde(rename = "CreatedAt")]
    created_at: String,
}

impl From<RawContainer> for ContainerRecord {
    fn from(raw: RawContainer) -> Self {
        Self {
            id: raw.id,
            name: raw.names,
            image: raw.image,
            status: raw.status,
            state: raw.state,
            ports: raw.ports,
            created_at: raw.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawImage {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Repository")]
    repository: String,
    #[serde(rename = "Tag")]
    tag: String,
    #[serde(rename = "Size")]
    size: String,
    #[serde(rename = "CreatedAt")]
    created_at: String,
}

impl From<RawImage> for ImageRecord {
    fn from(raw: RawImage) -> Self {
        Self {
            id: raw.id,
            repository: raw.repository,
            tag: raw.tag,
            size_human: raw.size,
            created_at: raw.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawVolume {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Driver")]
    driver: String,
    #[serde(rename = "Mountpoint")]
    mountpoint: String,
}

impl From<RawVolume> for VolumeRecord {
    fn from(raw: RawVolume) -> Self {
        Self {
            name: raw.name,
            driver: raw.driver,
            mountpoint: raw.mountpoint,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNetwork {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Driver")]
    driver: String,
    #[serde(rename = "Scope")]
    scope: String,
}

impl From<RawNetwork> for NetworkRecord {
    fn from(raw: RawNetwork) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            driver: raw.driver,
            scope: raw.scope,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStats {
    #[serde(rename = "CPUPerc")]
    cpu_perc: String,
    #[serde(rename = "MemPerc")]
    mem_perc: String,
}

impl From<RawStats> for ContainerStats {
    fn from(raw: RawStats) -> Self {
        Self {
            cpu_percent: parse_percent(&raw.cpu_perc),
            memory_percent: parse_percent(&raw.mem_perc),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDiskUsage {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "TotalCount", deserialize_with = "string_or_number")]
    total_count: String,
    #[serde(rename = "Active", deserialize_with = "string_or_number")]
    active: String,
    #[serde(rename = "Size")]
    size: String,
    #[serde(rename = "Reclaimable")]
    reclaimable: String,
}

impl From<RawDiskUsage> for DiskUsageRecord {
    fn from(raw: RawDiskUsage) -> Self {
        Self {
            kind: raw.kind,
            total_count: raw.total_count,
            active: raw.active,
            size: raw.size,
            reclaimable: raw.reclaimable,
        }
    }
}

/// Older engines print counts as numbers, newer ones as strings
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockside_core::testing::FakeRunner;

    fn docker(runner: &Arc<FakeRunner>) -> DockerCli {
        DockerCli::new(runner.clone())
    }

    #[test]
    fn test_context_for_profile() {
        assert_eq!(context_for_profile(DEFAULT_VM_NAME), "colima");
        assert_eq!(context_for_profile("work"), "colima-work");
    }

    #[tokio::test]
    async fn test_list_containers_decodes_docker_format() {
        let runner = Arc::new(FakeRunner::new());
        runner.on(
            "docker ps -a --format json",
            CommandOutput::success(concat!(
                r#"{"Command":"\"nginx -g…\"","CreatedAt":"2024-05-01 10:00:00 +0900 JST","ID":"a1b2c3","Image":"nginx:alpine","Names":"web","Ports":"0.0.0.0:8080->80/tcp","State":"running","Status":"Up 3 minutes"}"#,
                "\n",
                r#"{"ID":"d4e5f6","Image":"redis:7","Names":"cache","State":"exited","Status":"Exited (0) 1 hour ago"}"#,
                "\n"
            )),
        );

        let containers = docker(&runner).list_containers(true).await.unwrap();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].id, "a1b2c3");
        assert_eq!(containers[0].name, "web");
        assert_eq!(containers[0].state, ContainerState::Running);
        assert_eq!(containers[0].ports, "0.0.0.0:8080->80/tcp");
        assert_eq!(containers[1].state, ContainerState::Exited);
        assert_eq!(containers[1].ports, "");
        assert_eq!(containers[1].created_at, "");
    }

    #[tokio::test]
    async fn test_lowercase_aliases_are_not_guessed() {
        let runner = Arc::new(FakeRunner::new());
        runner.on(
            "docker images",
            CommandOutput::success(r#"{"Id":"sha256:abc","Repository":"nginx","Tag":"alpine","Size":"43MB"}"#),
        );

        let images = docker(&runner).list_images().await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].id, "");
        assert_eq!(images[0].repository, "nginx");
        assert_eq!(images[0].size_human, "43MB");
    }

    #[tokio::test]
    async fn test_context_is_prepended() {
        let runner = Arc::new(FakeRunner::new());
        runner.on("volume ls", CommandOutput::success(""));

        docker(&runner)
            .with_context(Some(context_for_profile("work")))
            .list_volumes()
            .await
            .unwrap();

        assert_eq!(
            runner.calls(),
            vec!["docker --context colima-work volume ls --format json"]
        );
    }

    #[tokio::test]
    async fn test_operation_args() {
        let runner = Arc::new(FakeRunner::new());
        runner.on("docker", CommandOutput::success(""));
        let docker = docker(&runner);

        docker.remove_container("web", true).await.unwrap();
        docker.remove_image("nginx:alpine", false).await.unwrap();
        docker.remove_volume("data", true).await.unwrap();
        docker.create_network("backend", Some("bridge")).await.unwrap();
        docker.create_network("plain", None).await.unwrap();
        docker.logs("web", Some(50)).await.unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                "docker rm -f web",
                "docker rmi nginx:alpine",
                "docker volume rm -f data",
                "docker network create --driver bridge backend",
                "docker network create plain",
                "docker logs --tail 50 web",
            ]
        );
    }

    #[tokio::test]
    async fn test_stats_and_disk_usage() {
        let runner = Arc::new(FakeRunner::new());
        runner.on(
            "docker stats",
            CommandOutput::success(concat!(
                r#"{"CPUPerc":"12.50%","MemPerc":"3.25%","Name":"web"}"#,
                "\n",
                r#"{"CPUPerc":"--","MemPerc":"0.00%","Name":"idle"}"#
            )),
        );
        runner.on(
            "docker system df",
            CommandOutput::success(concat!(
                r#"{"Active":"2","Reclaimable":"1.1GB (40%)","Size":"2.8GB","TotalCount":"5","Type":"Images"}"#,
                "\n",
                r#"{"Active":1,"Reclaimable":"0B","Size":"12kB","TotalCount":3,"Type":"Containers"}"#
            )),
        );
        let docker = docker(&runner);

        let stats = docker.stats().await.unwrap();
        assert_eq!(stats[0].cpu_percent, 12.5);
        assert_eq!(stats[0].memory_percent, 3.25);
        assert_eq!(stats[1].cpu_percent, 0.0);

        let df = docker.disk_usage().await.unwrap();
        assert_eq!(df.len(), 2);
        assert_eq!(df[0].kind, "Images");
        assert_eq!(df[1].total_count, "3");
        assert_eq!(df[1].active, "1");
    }

    #[tokio::test]
    async fn test_query_failure_is_an_error() {
        let runner = Arc::new(FakeRunner::new());
        runner.on(
            "docker network ls",
            CommandOutput::failure(1, "Cannot connect to the Docker daemon"),
        );

        let err = docker(&runner).list_networks().await.unwrap_err();
        assert!(err.to_string().contains("Cannot connect"));
    }
}
