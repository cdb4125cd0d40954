//! Compute Engine REST client
//!
//! Implements [`ResourceApi`] over the Compute Engine v1 REST API with a
//! bearer token from an injected [`Authenticator`].

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use skiff_cloud::{
    Authenticator, CloudError, Document, OperationHandle, OperationScope, ResourceApi,
    ResourceKind, ResourceRef, Result,
};
use std::sync::Arc;
use tracing::debug;

pub const COMPUTE_API_BASE: &str = "https://compute.googleapis.com/compute/v1";

/// Compute Engine API client
#[derive(Clone)]
pub struct GceClient {
    http: reqwest::Client,
    base_url: String,
    auth: Arc<dyn Authenticator>,
}

/// Error body returned by Google APIs
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// One page of a list call
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    #[serde(default)]
    items: Vec<Value>,
    next_page_token: Option<String>,
}

impl GceClient {
    pub fn new(auth: Arc<dyn Authenticator>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: COMPUTE_API_BASE.to_string(),
            auth,
        }
    }

    /// Point the client at another endpoint (emulators, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection(kind: ResourceKind) -> &'static str {
        match kind {
            ResourceKind::Disk => "disks",
            ResourceKind::Instance => "instances",
            ResourceKind::Firewall => "firewalls",
            ResourceKind::Network => "networks",
            ResourceKind::MachineType => "machineTypes",
        }
    }

    fn scope_url(&self, project: &str, zone: Option<&str>) -> String {
        match zone {
            Some(zone) => format!("{}/projects/{}/zones/{}", self.base_url, project, zone),
            None => format!("{}/projects/{}/global", self.base_url, project),
        }
    }

    fn collection_url(&self, kind: ResourceKind, project: &str, zone: &str) -> String {
        let zone = kind.is_zonal().then_some(zone);
        format!(
            "{}/{}",
            self.scope_url(project, zone),
            Self::collection(kind)
        )
    }

    fn resource_url(&self, resource: &ResourceRef) -> String {
        format!(
            "{}/{}",
            self.collection_url(resource.kind(), resource.project(), resource.zone()),
            resource.name()
        )
    }

    fn operation_url(&self, project: &str, operation: &OperationHandle) -> String {
        let zone = match &operation.scope {
            OperationScope::Zonal(zone) => Some(zone.as_str()),
            OperationScope::Global => None,
        };
        format!(
            "{}/operations/{}",
            self.scope_url(project, zone),
            operation.name
        )
    }

    /// URL of an instance's `setMetadata` action
    pub fn set_metadata_url(&self, instance: &ResourceRef) -> String {
        format!("{}/setMetadata", self.resource_url(instance))
    }

    /// Issue one request; `Ok(None)` on HTTP 404
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        let token = self.auth.bearer_token().await?;
        debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(token)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CloudError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let text = response
            .text()
            .await
            .map_err(|e| CloudError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_failure(status, &text));
        }

        if text.trim().is_empty() {
            return Ok(Some(Value::Null));
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    async fn list_url(&self, url: &str) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let query: Vec<(&str, &str)> = match &page_token {
                Some(token) => vec![("pageToken", token.as_str())],
                None => Vec::new(),
            };

            let Some(value) = self.send(Method::GET, url, &query, None).await? else {
                return Err(CloudError::Api {
                    status: StatusCode::NOT_FOUND.as_u16(),
                    message: format!("collection not found: {}", url),
                });
            };

            let page: ListPage = serde_json::from_value(value)?;
            documents.extend(page.items.into_iter().map(Document::new));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(documents),
            }
        }
    }
}

/// Map a non-2xx, non-404 response to a core error
fn classify_failure(status: StatusCode, body: &str) -> CloudError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        CloudError::Transport(format!("HTTP {}: {}", status.as_u16(), message))
    } else {
        CloudError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

fn expect_document(value: Option<Value>, what: &str) -> Result<Document> {
    match value {
        Some(value) => Ok(Document::new(value)),
        None => Err(CloudError::Api {
            status: StatusCode::NOT_FOUND.as_u16(),
            message: format!("{} not found", what),
        }),
    }
}

#[async_trait]
impl ResourceApi for GceClient {
    async fn insert(&self, resource: &ResourceRef, body: &Value) -> Result<Document> {
        let url = self.collection_url(resource.kind(), resource.project(), resource.zone());
        let value = self.send(Method::POST, &url, &[], Some(body)).await?;
        expect_document(value, &url)
    }

    async fn get(&self, resource: &ResourceRef) -> Result<Option<Document>> {
        let url = self.resource_url(resource);
        Ok(self
            .send(Method::GET, &url, &[], None)
            .await?
            .map(Document::new))
    }

    async fn delete(&self, resource: &ResourceRef) -> Result<Option<Document>> {
        let url = self.resource_url(resource);
        Ok(self
            .send(Method::DELETE, &url, &[], None)
            .await?
            .map(Document::new))
    }

    async fn get_operation(
        &self,
        resource: &ResourceRef,
        operation: &OperationHandle,
    ) -> Result<Document> {
        let url = self.operation_url(resource.project(), operation);
        let value = self.send(Method::GET, &url, &[], None).await?;
        expect_document(value, &format!("operation {}", operation.name))
    }

    async fn list(&self, kind: ResourceKind, project: &str, zone: &str) -> Result<Vec<Document>> {
        let url = self.collection_url(kind, project, zone);
        self.list_url(&url).await
    }

    async fn list_images(&self, project: &str) -> Result<Vec<Document>> {
        let url = format!("{}/images", self.scope_url(project, None));
        self.list_url(&url).await
    }
}
