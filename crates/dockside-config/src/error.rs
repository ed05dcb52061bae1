use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error(
        "Config file not found. Checked:\n\
        - DOCKSIDE_CONFIG_PATH\n\
        - current directory: dockside.yaml, .dockside.yaml\n\
        - ~/.config/dockside/config.yaml"
    )]
    ConfigFileNotFound,

    #[error("Invalid config file {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
