//! colima CLI wrapper
//!
//! Wraps the colima commands used to drive a VM profile.

use dockside_core::{
    Arch, Args, CommandOutput, CommandRunner, Result, Runtime, VmInfo, VmState, VmStatus,
    normalize_gib, parse_record_stream, parse_single_record,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const NOT_RUNNING_MARKER: &str = "not running";

/// colima CLI wrapper
#[derive(Clone)]
pub struct Colima {
    runner: Arc<dyn CommandRunner>,
    binary: String,
    query_timeout: Duration,
    lifecycle_timeout: Duration,
}

impl Colima {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            binary: "colima".to_string(),
            query_timeout: Duration::from_secs(30),
            lifecycle_timeout: Duration::from_secs(900),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_timeouts(mut self, query: Duration, lifecycle: Duration) -> Self {
        self.query_timeout = query;
        self.lifecycle_timeout = lifecycle;
        self
    }

    async fn run(&self, args: Args, timeout: Duration) -> Result<CommandOutput> {
        self.runner.run(&self.binary, args.as_slice(), timeout).await
    }

    /// Query a profile; `None` when it is not running or the output is unusable
    pub async fn status(&self, profile: &str) -> Result<Option<VmInfo>> {
        let output = self
            .run(
                Args::new(["status", "-p", profile, "--json"]),
                self.query_timeout,
            )
            .await?;

        if !output.succeeded()
            || output.stdout.contains(NOT_RUNNING_MARKER)
            || output.stderr.contains(NOT_RUNNING_MARKER)
        {
            return Ok(None);
        }

        Ok(parse_single_record::<ColimaStatus>(&output.stdout).map(|raw| raw.into_info(profile)))
    }

    /// List all profiles
    pub async fn list(&self) -> Result<Vec<VmState>> {
        let output = self
            .run(Args::new(["list", "--json"]), self.query_timeout)
            .await?
            .into_result(&self.binary)?;

        Ok(parse_record_stream::<ColimaInstance>(&output.stdout)
            .into_iter()
            .map(ColimaInstance::into_state)
            .collect())
    }

    /// Start a profile
    pub async fn start(&self, profile: &str, options: &StartOptions) -> Result<CommandOutput> {
        let args = Args::new(["start", "-p", profile])
            .opt("--cpu", options.cpu)
            .opt("--memory", options.memory_gib)
            .opt("--disk", options.disk_gib)
            .opt("--runtime", options.runtime);

        self.run(args, self.lifecycle_timeout)
            .await?
            .into_result(&self.binary)
    }

    /// Stop a profile
    pub async fn stop(&self, profile: &str) -> Result<CommandOutput> {
        self.run(Args::new(["stop", "-p", profile]), self.lifecycle_timeout)
            .await?
            .into_result(&self.binary)
    }

    /// Delete a profile
    pub async fn delete(&self, profile: &str, force: bool) -> Result<CommandOutput> {
        let args = Args::new(["delete", "-p", profile]).flag("--force", force);

        self.run(args, self.lifecycle_timeout)
            .await?
            .into_result(&self.binary)
    }
}

/// Resources requested for `colima start`; unset fields keep colima's defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOptions {
    pub cpu: Option<u32>,
    #[serde(rename = "memoryGiB")]
    pub memory_gib: Option<u32>,
    #[serde(rename = "diskGiB")]
    pub disk_gib: Option<u32>,
    pub runtime: Option<Runtime>,
}

/// Output of `colima status --json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ColimaStatus {
    name: String,
    arch: Option<String>,
    cpu: u32,
    memory: u64,
    disk: u64,
    runtime: String,
    address: String,
}

impl ColimaStatus {
    fn into_info(self, profile: &str) -> VmInfo {
        VmInfo {
            name: if self.name.is_empty() {
                profile.to_string()
            } else {
                self.name
            },
            arch: Arch::from_native(self.arch.as_deref()),
            cpu_cores: self.cpu,
            memory_gib: normalize_gib(self.memory),
            disk_gib: normalize_gib(self.disk),
            runtime: Runtime::from_name(&self.runtime),
            address: self.address,
        }
    }
}

/// One line of `colima list --json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ColimaInstance {
    name: String,
    status: String,
    arch: Option<String>,
    cpus: u32,
    memory: u64,
    disk: u64,
    runtime: String,
    address: String,
}

impl ColimaInstance {
    fn into_state(self) -> VmState {
        let status = if self.status.eq_ignore_ascii_case("running") {
            VmStatus::Running
        } else {
            VmStatus::Stopped
        };

        VmState {
            status,
            info: VmInfo {
                name: self.name,
                arch: Arch::from_native(self.arch.as_deref()),
                cpu_cores: self.cpus,
                memory_gib: normalize_gib(self.memory),
                disk_gib: normalize_gib(self.disk),
                runtime: Runtime::from_name(&self.runtime),
                // colima lists the last known address even for stopped profiles
                address: if status == VmStatus::Running {
                    self.address
                } else {
                    String::new()
                },
            },
            last_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockside_core::testing::FakeRunner;

    const STATUS_JSON: &str = r#"{"display_name":"colima","driver":"QEMU","arch":"aarch64","runtime":"docker","mount_type":"sshfs","address":"192.168.106.2","cpu":4,"memory":8589934592,"disk":64424509440}"#;

    fn colima(runner: &Arc<FakeRunner>) -> Colima {
        Colima::new(runner.clone())
    }

    #[tokio::test]
    async fn test_status_running() {
        let runner = Arc::new(FakeRunner::new());
        runner.on("colima status -p default --json", CommandOutput::success(STATUS_JSON));

        let info = colima(&runner).status("default").await.unwrap().unwrap();
        assert_eq!(info.name, "default");
        assert_eq!(info.arch, Arch::Arm64);
        assert_eq!(info.cpu_cores, 4);
        assert_eq!(info.memory_gib, 8);
        assert_eq!(info.disk_gib, 60);
        assert_eq!(info.runtime, Runtime::Docker);
        assert_eq!(info.address, "192.168.106.2");
    }

    #[tokio::test]
    async fn test_status_sizes_already_in_gib() {
        let runner = Arc::new(FakeRunner::new());
        runner.on(
            "colima status",
            CommandOutput::success(r#"{"arch":"x86_64","cpu":2,"memory":4,"disk":100,"runtime":"containerd"}"#),
        );

        let info = colima(&runner).status("work").await.unwrap().unwrap();
        assert_eq!(info.name, "work");
        assert_eq!(info.arch, Arch::Amd64);
        assert_eq!(info.memory_gib, 4);
        assert_eq!(info.disk_gib, 100);
        assert_eq!(info.runtime, Runtime::Containerd);
    }

    #[tokio::test]
    async fn test_status_not_running() {
        let runner = Arc::new(FakeRunner::new());
        runner.on(
            "colima status",
            CommandOutput::failure(1, "FATA[0000] colima is not running"),
        );
        assert!(colima(&runner).status("default").await.unwrap().is_none());

        // zero exit with the marker on stderr
        let mut out = CommandOutput::success("");
        out.stderr = "colima is not running".to_string();
        runner.on("colima status", out);
        assert!(colima(&runner).status("default").await.unwrap().is_none());

        runner.on("colima status", CommandOutput::success("not json"));
        assert!(colima(&runner).status("default").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_start_args() {
        let runner = Arc::new(FakeRunner::new());
        runner.on("colima start", CommandOutput::success(""));

        let options = StartOptions {
            cpu: Some(4),
            memory_gib: Some(8),
            disk_gib: None,
            runtime: Some(Runtime::Containerd),
        };
        colima(&runner).start("default", &options).await.unwrap();

        assert_eq!(
            runner.calls(),
            vec!["colima start -p default --cpu 4 --memory 8 --runtime containerd"]
        );
    }

    #[tokio::test]
    async fn test_delete_forwards_force() {
        let runner = Arc::new(FakeRunner::new());
        runner.on("colima delete", CommandOutput::success(""));

        let colima = colima(&runner);
        colima.delete("dev", false).await.unwrap();
        colima.delete("dev", true).await.unwrap();

        assert_eq!(
            runner.calls(),
            vec!["colima delete -p dev", "colima delete -p dev --force"]
        );
    }

    #[tokio::test]
    async fn test_list_instances() {
        let runner = Arc::new(FakeRunner::new());
        runner.on(
            "colima list --json",
            CommandOutput::success(concat!(
                r#"{"name":"default","status":"Running","arch":"aarch64","cpus":2,"memory":2147483648,"disk":64424509440,"runtime":"docker","address":"192.168.106.2"}"#,
                "\n",
                "WARN some noise\n",
                r#"{"name":"work","status":"Stopped","arch":"aarch64","cpus":4,"memory":8589934592,"disk":107374182400,"runtime":"containerd","address":"192.168.106.3"}"#,
                "\n"
            )),
        );

        let instances = colima(&runner).list().await.unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].name(), "default");
        assert_eq!(instances[0].status, VmStatus::Running);
        assert_eq!(instances[0].info.memory_gib, 2);
        assert_eq!(instances[1].status, VmStatus::Stopped);
        assert_eq!(instances[1].info.disk_gib, 100);
        assert!(instances[1].info.address.is_empty());
    }

    #[tokio::test]
    async fn test_start_failure_is_an_error() {
        let runner = Arc::new(FakeRunner::new());
        runner.on("colima start", CommandOutput::failure(1, "error starting vm"));

        let err = colima(&runner)
            .start("default", &StartOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.failure_message("start failed"), "error starting vm");
    }
}
