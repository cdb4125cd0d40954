use async_trait::async_trait;
use serde_json::{Value, json};
use skiff_cloud::{
    CloudError, Document, OperationHandle, PollConfig, ResourceApi, ResourceKind, ResourceRef,
    Result,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub const PROJECT: &str = "beaker-compute";
pub const ZONE: &str = "us-central1-a";

/// Scripted in-memory `ResourceApi`
///
/// Each method pops its next reply from a queue. Once a queue is drained the
/// method falls back to a steady-state reply: `insert`/`delete` return a fresh
/// operation, `get_operation` reports `RUNNING`, `get` reports the resource as
/// present. After `stall_mutations` every `insert`/`delete` hangs for an hour.
#[derive(Default)]
pub struct ScriptedApi {
    inserts: Mutex<VecDeque<Result<Document>>>,
    deletes: Mutex<VecDeque<Result<Option<Document>>>>,
    gets: Mutex<VecDeque<Result<Option<Document>>>>,
    operations: Mutex<VecDeque<Result<Document>>>,
    images: Mutex<HashMap<String, Vec<Document>>>,
    calls: Mutex<Vec<String>>,
    stall: AtomicBool,
}

#[allow(dead_code)]
impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue operation probe replies by status string (`PENDING`, `RUNNING`, `DONE`)
    pub fn with_operation_statuses(self, statuses: &[&str]) -> Self {
        for status in statuses {
            self.push_operation(Ok(operation_doc(status)));
        }
        self
    }

    pub fn push_operation(&self, reply: Result<Document>) {
        self.operations.lock().unwrap().push_back(reply);
    }

    pub fn push_insert(&self, reply: Result<Document>) {
        self.inserts.lock().unwrap().push_back(reply);
    }

    pub fn push_delete(&self, reply: Result<Option<Document>>) {
        self.deletes.lock().unwrap().push_back(reply);
    }

    pub fn push_get(&self, reply: Result<Option<Document>>) {
        self.gets.lock().unwrap().push_back(reply);
    }

    pub fn stall_mutations(&self) {
        self.stall.store(true, Ordering::SeqCst);
    }

    async fn maybe_stall(&self) {
        if self.stall.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }

    pub fn set_images(&self, project: &str, images: Vec<Value>) {
        self.images.lock().unwrap().insert(
            project.to_string(),
            images.into_iter().map(Document::new).collect(),
        );
    }

    /// Number of calls made to one method (`insert`, `get`, `delete`, `get_operation`, ...)
    pub fn calls(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.split(' ').next() == Some(method))
            .count()
    }

    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, method: &str, target: impl std::fmt::Display) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", method, target));
    }
}

#[async_trait]
impl ResourceApi for ScriptedApi {
    async fn insert(&self, resource: &ResourceRef, _body: &Value) -> Result<Document> {
        self.record("insert", resource.name());
        self.maybe_stall().await;
        self.inserts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(operation_doc("PENDING")))
    }

    async fn get(&self, resource: &ResourceRef) -> Result<Option<Document>> {
        self.record("get", resource.name());
        self.gets
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Some(resource_doc(resource))))
    }

    async fn delete(&self, resource: &ResourceRef) -> Result<Option<Document>> {
        self.record("delete", resource.name());
        self.maybe_stall().await;
        self.deletes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Some(operation_doc("PENDING"))))
    }

    async fn get_operation(
        &self,
        _resource: &ResourceRef,
        operation: &OperationHandle,
    ) -> Result<Document> {
        self.record("get_operation", &operation.name);
        self.operations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(operation_doc("RUNNING")))
    }

    async fn list(&self, kind: ResourceKind, _project: &str, _zone: &str) -> Result<Vec<Document>> {
        self.record("list", kind);
        Ok(Vec::new())
    }

    async fn list_images(&self, project: &str) -> Result<Vec<Document>> {
        self.record("list_images", project);
        Ok(self
            .images
            .lock()
            .unwrap()
            .get(project)
            .cloned()
            .unwrap_or_default())
    }
}

pub fn operation_doc(status: &str) -> Document {
    Document::new(json!({
        "kind": "compute#operation",
        "name": "operation-1591212671680-5a733120ebf2f-c83ae8cc-bbbad0c9",
        "zone": format!("https://www.googleapis.com/compute/v1/projects/{}/zones/{}", PROJECT, ZONE),
        "operationType": "insert",
        "status": status,
    }))
}

#[allow(dead_code)]
pub fn failed_operation_doc(code: &str, message: &str) -> Document {
    let mut doc = operation_doc("DONE").into_value();
    doc["error"] = json!({ "errors": [{ "code": code, "message": message }] });
    Document::new(doc)
}

pub fn resource_doc(resource: &ResourceRef) -> Document {
    Document::new(json!({
        "name": resource.name(),
        "status": "READY",
        "zone": format!("https://www.googleapis.com/compute/v1/projects/{}/zones/{}", PROJECT, ZONE),
    }))
}

#[allow(dead_code)]
pub fn transport_error() -> CloudError {
    CloudError::Transport("connection reset by peer".to_string())
}

pub fn fast_poll() -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(2),
        multiplier: 1.0,
        probe_timeout: Duration::from_secs(5),
    }
}

pub fn resource(kind: ResourceKind, name: &str) -> ResourceRef {
    ResourceRef::new(kind, PROJECT, ZONE, name).unwrap()
}
