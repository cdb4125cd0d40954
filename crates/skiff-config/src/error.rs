use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Configuration file not found. Looked in:\n\
        - current directory: skiff.local.yaml, .skiff.local.yaml, skiff.yaml, .skiff.yaml\n\
        - ./.skiff/ directory\n\
        - ~/.config/skiff/skiff.yaml\n\
        or set SKIFF_CONFIG_PATH to point at a file"
    )]
    ConfigFileNotFound,

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Could not find GCE Public SSH Key at '{}'", .0.display())]
    SshKeyNotFound(PathBuf),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("YAML parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
