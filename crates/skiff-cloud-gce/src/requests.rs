//! Request bodies for Compute Engine mutations

use serde::Serialize;
use serde_json::{Value, json};
use skiff_config::MetadataItem;

/// Persistent disk insert
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskRequest {
    pub name: String,
    pub size_gb: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_image: Option<String>,
}

impl DiskRequest {
    pub fn new(name: impl Into<String>, size_gb: u64) -> Self {
        Self {
            name: name.into(),
            size_gb: size_gb.to_string(),
            source_image: None,
        }
    }

    pub fn with_source_image(mut self, image_link: impl Into<String>) -> Self {
        self.source_image = Some(image_link.into());
        self
    }

    pub fn to_body(&self) -> Value {
        json!(self)
    }
}

/// Instance insert booting from an existing persistent disk
#[derive(Debug, Clone)]
pub struct InstanceRequest {
    pub name: String,
    pub machine_type: String,
    pub boot_disk: String,
    pub network: String,
    /// Network tags; firewall rules target instances by tag
    pub tags: Vec<String>,
    pub metadata: Vec<MetadataItem>,
}

impl InstanceRequest {
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "name": self.name,
            "machineType": self.machine_type,
            "disks": [{
                "boot": true,
                "autoDelete": false,
                "type": "PERSISTENT",
                "source": self.boot_disk,
            }],
            "networkInterfaces": [{
                "network": self.network,
                "accessConfigs": [{
                    "name": "External NAT",
                    "type": "ONE_TO_ONE_NAT",
                }],
            }],
        });
        if !self.tags.is_empty() {
            body["tags"] = json!({ "items": self.tags });
        }
        if !self.metadata.is_empty() {
            body["metadata"] = json!({ "items": self.metadata });
        }
        body
    }
}

/// Ingress rule opening TCP ports to instances tagged with the rule name
pub fn firewall_body(name: &str, network: &str, tcp_ports: &[u16]) -> Value {
    let ports: Vec<String> = tcp_ports.iter().map(u16::to_string).collect();
    json!({
        "name": name,
        "network": network,
        "direction": "INGRESS",
        "allowed": [{ "IPProtocol": "tcp", "ports": ports }],
        "sourceRanges": ["0.0.0.0/0"],
        "targetTags": [name],
    })
}

/// `instances.setMetadata` body; `fingerprint` must be the instance's current one
pub fn metadata_body(fingerprint: &str, items: &[MetadataItem]) -> Value {
    json!({
        "kind": "compute#metadata",
        "fingerprint": fingerprint,
        "items": items,
    })
}
