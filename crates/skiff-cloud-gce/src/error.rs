//! GCE provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GceError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration error: {0}")]
    Config(#[from] skiff_config::ConfigError),

    #[error(transparent)]
    Cloud(#[from] skiff_cloud::CloudError),
}

impl GceError {
    /// The core error behind this one, if any
    pub fn cloud_error(&self) -> Option<&skiff_cloud::CloudError> {
        match self {
            GceError::Cloud(e) => Some(e.root_cause()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GceError>;
