//! Remote resource API seam
//!
//! The drivers never talk HTTP themselves. Everything that reaches the
//! network goes through [`ResourceApi`], and credentials come from an
//! [`Authenticator`]; both are injected per call site so that concurrent
//! operations share no mutable state.

use crate::error::{CloudError, Result};
use crate::poller::OperationStatus;
use crate::resource::{Document, ResourceKind, ResourceRef};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Remote resource API abstraction
///
/// One network call per method. `get` and `delete` report "not found" as
/// `Ok(None)` rather than an error so the delete path can treat absence as
/// its success condition.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// Request creation of a resource; returns the operation document
    async fn insert(&self, resource: &ResourceRef, body: &serde_json::Value) -> Result<Document>;

    /// Fetch a resource document, `None` if it does not exist
    async fn get(&self, resource: &ResourceRef) -> Result<Option<Document>>;

    /// Request deletion; returns the operation document, `None` if already gone
    async fn delete(&self, resource: &ResourceRef) -> Result<Option<Document>>;

    /// Fetch the current state of an in-flight operation
    async fn get_operation(
        &self,
        resource: &ResourceRef,
        operation: &OperationHandle,
    ) -> Result<Document>;

    /// List every resource of a kind in a project (and zone, for zonal kinds)
    async fn list(&self, kind: ResourceKind, project: &str, zone: &str) -> Result<Vec<Document>>;

    /// List the images published by a project
    async fn list_images(&self, project: &str) -> Result<Vec<Document>>;
}

/// Supplies an already-refreshed transport credential
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn bearer_token(&self) -> Result<String>;
}

/// Where an operation lives on the remote side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationScope {
    Zonal(String),
    Global,
}

/// Opaque reference to an in-flight asynchronous mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationHandle {
    pub name: String,
    pub scope: OperationScope,
}

impl OperationHandle {
    /// Extract the handle from an operation document
    ///
    /// The scope comes from the document's `zone` link when present,
    /// otherwise the operation is global.
    pub fn from_document(doc: &Document) -> Result<Self> {
        let name = doc.name().ok_or_else(|| {
            CloudError::OperationFailed("operation document has no name".to_string())
        })?;

        let scope = match doc.str_field("zone") {
            Some(zone) => OperationScope::Zonal(last_segment(zone).to_string()),
            None => OperationScope::Global,
        };

        Ok(Self {
            name: name.to_string(),
            scope,
        })
    }
}

/// Parsed view of an operation document
#[derive(Debug, Clone, PartialEq)]
pub struct OperationState {
    pub status: OperationStatus,
    /// Set when the operation reports that the mutation itself failed
    pub failure: Option<String>,
}

impl OperationState {
    pub fn from_document(doc: &Document) -> Self {
        let status = match doc.str_field("status") {
            Some("DONE") => OperationStatus::Done,
            Some("RUNNING") => OperationStatus::Running,
            _ => OperationStatus::Pending,
        };

        let failure = doc.as_value().get("error").map(|error| {
            let messages: Vec<String> = error
                .get("errors")
                .and_then(|e| e.as_array())
                .map(|errors| {
                    errors
                        .iter()
                        .map(|e| {
                            let code = e.get("code").and_then(|c| c.as_str()).unwrap_or("UNKNOWN");
                            let message = e.get("message").and_then(|m| m.as_str()).unwrap_or("");
                            format!("{}: {}", code, message)
                        })
                        .collect()
                })
                .unwrap_or_default();

            if messages.is_empty() {
                error.to_string()
            } else {
                messages.join("; ")
            }
        });

        Self { status, failure }
    }
}

/// Last path segment of a self link (`.../zones/us-central1-a` -> `us-central1-a`)
pub fn last_segment(link: &str) -> &str {
    link.rsplit('/').next().unwrap_or(link)
}
