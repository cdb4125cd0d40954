//! Cloud provider error types

use std::time::Duration;
use thiserror::Error;

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Unsupported platform for Google Compute Engine: {0}")]
    UnsupportedPlatform(String),

    #[error("Unable to find a single matching image for {platform}, considered {considered} candidates")]
    NoMatchingImage { platform: String, considered: usize },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Exhausted {attempts} attempts after {elapsed:?}; the mutation may still complete remotely")]
    ExhaustedAttempts { attempts: u32, elapsed: Duration },

    #[error("Failed to create {resource}: {source}")]
    CreateFailed {
        resource: String,
        #[source]
        source: Box<CloudError>,
    },

    #[error("Failed to delete {resource} (a disk still attached to an instance cannot be deleted): {source}")]
    DeleteFailed {
        resource: String,
        #[source]
        source: Box<CloudError>,
    },

    #[error("Invalid resource reference: {0}")]
    InvalidResource(String),

    #[error("Polling cancelled")]
    Cancelled,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Whether the poller may retry after this error.
    ///
    /// Network failures, throttling (429) and server errors (5xx) are retried;
    /// everything else aborts the polling loop.
    pub fn is_transient(&self) -> bool {
        match self {
            CloudError::Transport(_) => true,
            CloudError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Unwraps `CreateFailed`/`DeleteFailed` down to the poller's cause.
    pub fn root_cause(&self) -> &CloudError {
        match self {
            CloudError::CreateFailed { source, .. } | CloudError::DeleteFailed { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
