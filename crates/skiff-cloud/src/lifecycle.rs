//! Resource lifecycle drivers
//!
//! Disk, instance and firewall share one state machine:
//!
//! ```text
//! Requested ──► Polling ──► Ready   (create: operation DONE, then one final get)
//!                  │  ├───► Gone    (delete: get reports not-found)
//!                  │  └───► Failed
//! ```
//!
//! Only the terminal-condition predicate differs between the two flows.

use crate::api::{OperationHandle, OperationState, ResourceApi};
use crate::error::{CloudError, Result};
use crate::poller::{self, Observation, OperationStatus, PollConfig, PollOutcome};
use crate::resource::{Document, ResourceKind, ResourceRef};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Driver state, reported through tracing at each transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Requested,
    Polling,
    Ready,
    Gone,
    Failed,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Requested => write!(f, "requested"),
            LifecycleState::Polling => write!(f, "polling"),
            LifecycleState::Ready => write!(f, "ready"),
            LifecycleState::Gone => write!(f, "gone"),
            LifecycleState::Failed => write!(f, "failed"),
        }
    }
}

/// Create/delete driver bound to one API client for the duration of a call
///
/// Holds only borrowed collaborators; attempt and elapsed state live inside
/// each call, so one driver may serve concurrent operations.
pub struct LifecycleDriver<'a> {
    api: &'a dyn ResourceApi,
    config: &'a PollConfig,
    cancel: &'a CancellationToken,
}

impl<'a> LifecycleDriver<'a> {
    pub fn new(api: &'a dyn ResourceApi, config: &'a PollConfig, cancel: &'a CancellationToken) -> Self {
        Self {
            api,
            config,
            cancel,
        }
    }

    /// Run a single request under the probe timeout and the cancellation token
    pub async fn bounded<T, Fut>(&self, call: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        poller::bounded(self.config, self.cancel, call).await
    }

    /// Request creation, wait for the operation to finish, return the resource
    pub async fn create(
        &self,
        resource: &ResourceRef,
        body: &serde_json::Value,
        attempts: u32,
    ) -> Result<Document> {
        ensure_managed(resource)?;
        self.create_inner(resource, body, attempts)
            .await
            .map_err(|source| {
                transition(resource, LifecycleState::Failed);
                CloudError::CreateFailed {
                    resource: resource.to_string(),
                    source: Box::new(source),
                }
            })
    }

    async fn create_inner(
        &self,
        resource: &ResourceRef,
        body: &serde_json::Value,
        attempts: u32,
    ) -> Result<Document> {
        let started = Instant::now();
        let operation = self.bounded(self.api.insert(resource, body)).await?;
        transition(resource, LifecycleState::Requested);

        transition(resource, LifecycleState::Polling);
        self.await_operation(resource, &operation, started, attempts).await?;

        match self.bounded(self.api.get(resource)).await? {
            Some(doc) => {
                transition(resource, LifecycleState::Ready);
                Ok(doc)
            }
            None => Err(CloudError::OperationFailed(format!(
                "{} not found after its create operation completed",
                resource
            ))),
        }
    }

    /// Poll the operation described by `operation` until it reports `DONE`
    ///
    /// Also used for mutations outside the create path, such as a metadata
    /// update on an existing instance.
    pub async fn await_operation(
        &self,
        resource: &ResourceRef,
        operation: &Document,
        started: Instant,
        attempts: u32,
    ) -> Result<PollOutcome> {
        let handle = OperationHandle::from_document(operation)?;

        let api = self.api;
        let handle = &handle;
        let outcome = poller::poll(
            self.config,
            self.cancel,
            started,
            attempts,
            move || async move {
                let doc = api.get_operation(resource, handle).await?;
                let state = OperationState::from_document(&doc);
                Ok(Observation {
                    status: state.status,
                    failure: state.failure,
                })
            },
            poller::until_done,
        )
        .await
        .into_result()?;

        debug!(
            "Operation {} finished after {} probes in {:?}",
            handle.name, outcome.attempts_used, outcome.elapsed
        );
        Ok(outcome)
    }

    /// Request deletion and wait until the resource can no longer be found
    ///
    /// A resource that is already absent counts as deleted.
    pub async fn delete(&self, resource: &ResourceRef, attempts: u32) -> Result<()> {
        ensure_managed(resource)?;
        self.delete_inner(resource, attempts)
            .await
            .map_err(|source| {
                transition(resource, LifecycleState::Failed);
                CloudError::DeleteFailed {
                    resource: resource.to_string(),
                    source: Box::new(source),
                }
            })
    }

    async fn delete_inner(&self, resource: &ResourceRef, attempts: u32) -> Result<()> {
        let started = Instant::now();
        if self.bounded(self.api.delete(resource)).await?.is_none() {
            debug!("Delete request for {} reported not found", resource);
            transition(resource, LifecycleState::Gone);
            return Ok(());
        }
        transition(resource, LifecycleState::Requested);
        transition(resource, LifecycleState::Polling);

        let api = self.api;
        poller::poll(
            self.config,
            self.cancel,
            started,
            attempts,
            move || async move {
                let status = match api.get(resource).await? {
                    Some(_) => OperationStatus::Running,
                    None => OperationStatus::NotFound,
                };
                Ok(Observation::new(status))
            },
            poller::until_gone,
        )
        .await
        .into_result()?;

        transition(resource, LifecycleState::Gone);
        Ok(())
    }

    pub async fn create_disk(
        &self,
        disk: &ResourceRef,
        body: &serde_json::Value,
        attempts: u32,
    ) -> Result<Document> {
        ensure_kind(disk, ResourceKind::Disk)?;
        self.create(disk, body, attempts).await
    }

    pub async fn delete_disk(&self, disk: &ResourceRef, attempts: u32) -> Result<()> {
        ensure_kind(disk, ResourceKind::Disk)?;
        self.delete(disk, attempts).await
    }

    pub async fn create_instance(
        &self,
        instance: &ResourceRef,
        body: &serde_json::Value,
        attempts: u32,
    ) -> Result<Document> {
        ensure_kind(instance, ResourceKind::Instance)?;
        self.create(instance, body, attempts).await
    }

    pub async fn delete_instance(&self, instance: &ResourceRef, attempts: u32) -> Result<()> {
        ensure_kind(instance, ResourceKind::Instance)?;
        self.delete(instance, attempts).await
    }

    pub async fn create_firewall(
        &self,
        firewall: &ResourceRef,
        body: &serde_json::Value,
        attempts: u32,
    ) -> Result<Document> {
        ensure_kind(firewall, ResourceKind::Firewall)?;
        self.create(firewall, body, attempts).await
    }

    pub async fn delete_firewall(&self, firewall: &ResourceRef, attempts: u32) -> Result<()> {
        ensure_kind(firewall, ResourceKind::Firewall)?;
        self.delete(firewall, attempts).await
    }
}

fn transition(resource: &ResourceRef, state: LifecycleState) {
    match state {
        LifecycleState::Polling => debug!("{}: {}", resource, state),
        _ => info!("{}: {}", resource, state),
    }
}

fn ensure_managed(resource: &ResourceRef) -> Result<()> {
    if resource.kind().is_managed() {
        Ok(())
    } else {
        Err(CloudError::InvalidResource(format!(
            "{} has no create/delete lifecycle",
            resource.kind()
        )))
    }
}

fn ensure_kind(resource: &ResourceRef, expected: ResourceKind) -> Result<()> {
    if resource.kind() == expected {
        Ok(())
    } else {
        Err(CloudError::InvalidResource(format!(
            "expected {} reference, got {}",
            expected, resource
        )))
    }
}
