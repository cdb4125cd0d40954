//! GCE provider facade
//!
//! Wires settings, the REST client, the lifecycle driver and the image
//! resolver together under resource names.

use crate::auth::StaticToken;
use crate::client::GceClient;
use crate::error::{GceError, Result};
use crate::requests::{DiskRequest, InstanceRequest, firewall_body, metadata_body};
use reqwest::Method;
use skiff_cloud::{
    CancellationToken, CloudError, Document, ImageCandidate, LifecycleDriver, PollConfig,
    ResourceApi, ResourceKind, ResourceRef, classify_platform, resolve_latest_image,
};
use skiff_config::{MetadataItem, Settings};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::info;

/// Google Compute Engine provider
pub struct GceProvider {
    client: GceClient,
    settings: Settings,
    poll: PollConfig,
    cancel: CancellationToken,
}

impl GceProvider {
    pub fn new(settings: Settings, client: GceClient) -> Result<Self> {
        settings.validate()?;
        let poll = settings.poll_config();
        Ok(Self {
            client,
            settings,
            poll,
            cancel: CancellationToken::new(),
        })
    }

    /// Provider using a bearer token from `SKIFF_GCE_ACCESS_TOKEN`
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let token = StaticToken::from_env()?;
        Self::new(settings, GceClient::new(Arc::new(token)))
    }

    /// Share a cancellation token; cancelling it stops every in-flight poll
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn client(&self) -> &GceClient {
        &self.client
    }

    fn driver(&self) -> LifecycleDriver<'_> {
        LifecycleDriver::new(&self.client, &self.poll, &self.cancel)
    }

    fn resource(&self, kind: ResourceKind, name: &str) -> Result<ResourceRef> {
        Ok(ResourceRef::new(
            kind,
            &self.settings.project,
            &self.settings.zone,
            name,
        )?)
    }

    pub fn default_zone_url(&self) -> String {
        self.settings.default_zone_url()
    }

    pub fn default_network_url(&self) -> String {
        self.settings.default_network_url()
    }

    /// Newest non-deprecated public image for a platform token
    ///
    /// Unsupported platforms fail before any request is made.
    pub async fn resolve_latest_image(&self, platform: &str) -> Result<ImageCandidate> {
        let owner = classify_platform(platform)?;
        let documents = self
            .driver()
            .bounded(self.client.list_images(owner.project()))
            .await?;
        let candidates = ImageCandidate::from_documents(documents);
        let image = resolve_latest_image(platform, &candidates)?;
        info!("Resolved {} to {}/{}", platform, owner, image.name);
        Ok(image)
    }

    /// Create a persistent disk, optionally initialized from an image
    pub async fn create_disk(&self, name: &str, image: Option<&ImageCandidate>) -> Result<Document> {
        let disk = self.resource(ResourceKind::Disk, name)?;
        let mut request = DiskRequest::new(name, self.settings.disk_size_gb);
        if let Some(image) = image {
            request = request.with_source_image(image_link(image)?);
        }

        Ok(self
            .driver()
            .create_disk(&disk, &request.to_body(), self.settings.attempts())
            .await?)
    }

    pub async fn delete_disk(&self, name: &str) -> Result<()> {
        let disk = self.resource(ResourceKind::Disk, name)?;
        Ok(self
            .driver()
            .delete_disk(&disk, self.settings.attempts())
            .await?)
    }

    /// Create an instance booting from `boot_disk` (a disk document)
    ///
    /// The instance is tagged with its own name so a firewall rule of the same
    /// name applies to it.
    pub async fn create_instance(&self, name: &str, boot_disk: &Document) -> Result<Document> {
        let instance = self.resource(ResourceKind::Instance, name)?;
        let machine_type = self.get_machine_type().await?;
        let network = self.get_network().await?;

        let request = InstanceRequest {
            name: name.to_string(),
            machine_type: self_link(&machine_type)?,
            boot_disk: self_link(boot_disk)?,
            network: self_link(&network)?,
            tags: vec![name.to_string()],
            metadata: Vec::new(),
        };

        Ok(self
            .driver()
            .create_instance(&instance, &request.to_body(), self.settings.attempts())
            .await?)
    }

    pub async fn delete_instance(&self, name: &str) -> Result<()> {
        let instance = self.resource(ResourceKind::Instance, name)?;
        Ok(self
            .driver()
            .delete_instance(&instance, self.settings.attempts())
            .await?)
    }

    pub async fn create_firewall(&self, name: &str) -> Result<Document> {
        let firewall = self.resource(ResourceKind::Firewall, name)?;
        let body = firewall_body(
            name,
            &self.default_network_url(),
            &self.settings.firewall_ports,
        );

        Ok(self
            .driver()
            .create_firewall(&firewall, &body, self.settings.attempts())
            .await?)
    }

    pub async fn delete_firewall(&self, name: &str) -> Result<()> {
        let firewall = self.resource(ResourceKind::Firewall, name)?;
        Ok(self
            .driver()
            .delete_firewall(&firewall, self.settings.attempts())
            .await?)
    }

    /// The configured network
    pub async fn get_network(&self) -> Result<Document> {
        let network = self.resource(ResourceKind::Network, &self.settings.network)?;
        self.get_required(&network).await
    }

    /// The configured machine type in the configured zone
    pub async fn get_machine_type(&self) -> Result<Document> {
        let machine_type = self.resource(ResourceKind::MachineType, &self.settings.machine_type)?;
        self.get_required(&machine_type).await
    }

    async fn get_required(&self, resource: &ResourceRef) -> Result<Document> {
        self.driver()
            .bounded(self.client.get(resource))
            .await?
            .ok_or_else(|| GceError::InvalidConfig(format!("{} does not exist", resource)))
    }

    pub async fn list_instances(&self) -> Result<Vec<Document>> {
        self.list(ResourceKind::Instance).await
    }

    pub async fn list_disks(&self) -> Result<Vec<Document>> {
        self.list(ResourceKind::Disk).await
    }

    pub async fn list_firewalls(&self) -> Result<Vec<Document>> {
        self.list(ResourceKind::Firewall).await
    }

    async fn list(&self, kind: ResourceKind) -> Result<Vec<Document>> {
        let listing = self
            .client
            .list(kind, &self.settings.project, &self.settings.zone);
        Ok(self.driver().bounded(listing).await?)
    }

    /// Replace an instance's metadata and wait for the zonal operation
    ///
    /// `fingerprint` must be the instance's current metadata fingerprint.
    pub async fn set_instance_metadata(
        &self,
        name: &str,
        fingerprint: &str,
        items: &[MetadataItem],
    ) -> Result<()> {
        let instance = self.resource(ResourceKind::Instance, name)?;
        let started = Instant::now();
        let url = self.client.set_metadata_url(&instance);
        let body = metadata_body(fingerprint, items);

        let operation = self
            .driver()
            .bounded(self.client.send(Method::POST, &url, &[], Some(&body)))
            .await?
            .map(Document::new)
            .ok_or_else(|| CloudError::Api {
                status: 404,
                message: format!("{} not found", instance),
            })?;

        self.driver()
            .await_operation(&instance, &operation, started, self.settings.attempts())
            .await?;
        info!("Updated metadata on {}", instance);
        Ok(())
    }

    /// Metadata items from settings plus the configured SSH public key
    pub fn instance_metadata(&self) -> Result<Vec<MetadataItem>> {
        let public_key = self.settings.read_ssh_public_key()?;
        Ok(self.settings.metadata_items(&public_key))
    }
}

fn self_link(doc: &Document) -> Result<String> {
    doc.self_link().map(str::to_string).ok_or_else(|| {
        GceError::Cloud(CloudError::InvalidResource(format!(
            "{} has no selfLink",
            doc.name().unwrap_or("resource")
        )))
    })
}

fn image_link(image: &ImageCandidate) -> Result<String> {
    match &image.self_link {
        Some(link) => Ok(link.clone()),
        None => Ok(format!(
            "projects/{}/global/images/{}",
            classify_platform(&image.name)?.project(),
            image.name
        )),
    }
}

/// Current metadata fingerprint of an instance document
pub fn metadata_fingerprint(instance: &Document) -> Option<String> {
    instance
        .as_value()
        .get("metadata")
        .and_then(|m| m.get("fingerprint"))
        .and_then(|f| f.as_str())
        .map(str::to_string)
}
