pub mod error;

pub use error::*;

use dockside_core::DEFAULT_VM_NAME;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Dockside settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocksideConfig {
    /// VM manager binary
    pub vm_binary: String,
    /// Container engine binary
    pub engine_binary: String,
    /// VM used when a command does not name one
    pub default_profile: String,
    /// Pass `--context colima[-<profile>]` to every engine command
    pub pin_docker_context: bool,
    pub timeouts: Timeouts,
    /// Pause between the stop and start legs of a VM restart
    pub restart_settle_ms: u64,
    pub log_tail_lines: u32,
    pub usage: UsageConfig,
}

impl Default for DocksideConfig {
    fn default() -> Self {
        Self {
            vm_binary: "colima".to_string(),
            engine_binary: "docker".to_string(),
            default_profile: DEFAULT_VM_NAME.to_string(),
            pin_docker_context: true,
            timeouts: Timeouts::default(),
            restart_settle_ms: 2000,
            log_tail_lines: 100,
            usage: UsageConfig::default(),
        }
    }
}

/// Command timeouts in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Read-only queries (status, list, stats)
    pub query_secs: u64,
    /// Resource operations (pull, rm, create)
    pub operation_secs: u64,
    /// VM start/stop/delete
    pub lifecycle_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            query_secs: 30,
            operation_secs: 300,
            lifecycle_secs: 900,
        }
    }
}

impl Timeouts {
    pub fn query(&self) -> Duration {
        Duration::from_secs(self.query_secs)
    }

    pub fn operation(&self) -> Duration {
        Duration::from_secs(self.operation_secs)
    }

    pub fn lifecycle(&self) -> Duration {
        Duration::from_secs(self.lifecycle_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    /// Reported disk usage; not measured
    pub disk_estimate_percent: f64,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            disk_estimate_percent: 30.0,
        }
    }
}

impl DocksideConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn restart_settle(&self) -> Duration {
        Duration::from_millis(self.restart_settle_ms)
    }

    /// Apply DOCKSIDE_VM_BINARY / DOCKSIDE_ENGINE_BINARY
    pub fn apply_env_overrides(&mut self) {
        if let Ok(bin) = std::env::var("DOCKSIDE_VM_BINARY") {
            if !bin.trim().is_empty() {
                self.vm_binary = bin;
            }
        }
        if let Ok(bin) = std::env::var("DOCKSIDE_ENGINE_BINARY") {
            if !bin.trim().is_empty() {
                self.engine_binary = bin;
            }
        }
    }
}

/// Dockside config directory (~/.config/dockside)
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("dockside"))
}

/// Locate the config file.
///
/// Search order:
/// 1. DOCKSIDE_CONFIG_PATH
/// 2. current directory: dockside.yaml, .dockside.yaml
/// 3. ~/.config/dockside/config.yaml
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var("DOCKSIDE_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            "DOCKSIDE_CONFIG_PATH points to a missing file: {}",
            path.display()
        );
    }

    let current_dir = std::env::current_dir()?;
    for filename in ["dockside.yaml", ".dockside.yaml"] {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    if let Ok(config_dir) = get_config_dir() {
        let global_config = config_dir.join("config.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Load the config, falling back to defaults when no file exists.
pub fn load() -> Result<DocksideConfig> {
    let mut config = match find_config_file() {
        Ok(path) => {
            tracing::debug!("Loading config from {}", path.display());
            DocksideConfig::from_file(&path)?
        }
        Err(ConfigError::ConfigFileNotFound) => {
            tracing::debug!("No config file found, using defaults");
            DocksideConfig::default()
        }
        Err(e) => return Err(e),
    };
    config.apply_env_overrides();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = DocksideConfig::default();
        assert_eq!(config.vm_binary, "colima");
        assert_eq!(config.engine_binary, "docker");
        assert_eq!(config.default_profile, DEFAULT_VM_NAME);
        assert_eq!(config.restart_settle(), Duration::from_millis(2000));
        assert_eq!(config.timeouts.query(), Duration::from_secs(30));
        assert_eq!(config.usage.disk_estimate_percent, 30.0);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = DocksideConfig::from_yaml_str(
            r#"
default_profile: work
restart_settle_ms: 500
timeouts:
  lifecycle_secs: 60
"#,
        )
        .unwrap();

        assert_eq!(config.default_profile, "work");
        assert_eq!(config.restart_settle_ms, 500);
        assert_eq!(config.timeouts.lifecycle_secs, 60);
        assert_eq!(config.timeouts.query_secs, 30);
        assert_eq!(config.vm_binary, "colima");
    }

    #[test]
    fn test_invalid_yaml() {
        let result = DocksideConfig::from_yaml_str("restart_settle_ms: [1, 2]");
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("dockside.yaml"), "log_tail_lines: 20\n").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset("DOCKSIDE_CONFIG_PATH", find_config_file);
        let config = temp_env::with_vars_unset(
            ["DOCKSIDE_CONFIG_PATH", "DOCKSIDE_VM_BINARY", "DOCKSIDE_ENGINE_BINARY"],
            load,
        );

        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with("dockside.yaml"));
        assert_eq!(config.unwrap().log_tail_lines, 20);
    }

    #[test]
    #[serial]
    fn test_visible_file_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("dockside.yaml"), "# visible").unwrap();
        fs::write(temp_dir.path().join(".dockside.yaml"), "# hidden").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = temp_env::with_var_unset("DOCKSIDE_CONFIG_PATH", find_config_file);
        std::env::set_current_dir(original_dir).unwrap();

        let path = result.unwrap();
        assert_eq!(path.file_name().unwrap(), "dockside.yaml");
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "vm_binary: /opt/bin/colima\n").unwrap();

        let found = temp_env::with_var(
            "DOCKSIDE_CONFIG_PATH",
            Some(config_path.to_str().unwrap()),
            find_config_file,
        );
        assert_eq!(found.unwrap(), config_path);

        let config = temp_env::with_vars(
            [
                ("DOCKSIDE_CONFIG_PATH", Some(config_path.to_str().unwrap())),
                ("DOCKSIDE_VM_BINARY", None),
                ("DOCKSIDE_ENGINE_BINARY", Some("/usr/local/bin/docker")),
            ],
            load,
        )
        .unwrap();
        assert_eq!(config.vm_binary, "/opt/bin/colima");
        assert_eq!(config.engine_binary, "/usr/local/bin/docker");
    }

    #[test]
    #[serial]
    fn test_invalid_file_reports_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("broken.yaml");
        fs::write(&config_path, "timeouts: nope\n").unwrap();

        let result = temp_env::with_var(
            "DOCKSIDE_CONFIG_PATH",
            Some(config_path.to_str().unwrap()),
            load,
        );

        match result {
            Err(ConfigError::Invalid { path, .. }) => assert_eq!(path, config_path),
            other => panic!("Expected Invalid error, got {:?}", other),
        }
    }
}
