//! Resource identity and documents

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};

/// Kind of remote resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Persistent disk
    Disk,
    /// Virtual machine instance
    Instance,
    /// Firewall rule
    Firewall,
    /// VPC network (read-only)
    Network,
    /// Machine type (read-only)
    MachineType,
}

impl ResourceKind {
    /// Kinds that have a create/delete lifecycle
    pub fn is_managed(&self) -> bool {
        matches!(
            self,
            ResourceKind::Disk | ResourceKind::Instance | ResourceKind::Firewall
        )
    }

    /// Kinds whose API collection lives under a zone
    pub fn is_zonal(&self) -> bool {
        matches!(
            self,
            ResourceKind::Disk | ResourceKind::Instance | ResourceKind::MachineType
        )
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Disk => write!(f, "disk"),
            ResourceKind::Instance => write!(f, "instance"),
            ResourceKind::Firewall => write!(f, "firewall"),
            ResourceKind::Network => write!(f, "network"),
            ResourceKind::MachineType => write!(f, "machine-type"),
        }
    }
}

/// Identity of a remote resource: (kind, project, zone, name)
///
/// Built only through [`ResourceRef::new`], which rejects empty fields, so a
/// reference handed to a lifecycle driver is always fully qualified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    kind: ResourceKind,
    project: String,
    zone: String,
    name: String,
}

impl ResourceRef {
    pub fn new(
        kind: ResourceKind,
        project: impl Into<String>,
        zone: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self> {
        let resource = Self {
            kind,
            project: project.into(),
            zone: zone.into(),
            name: name.into(),
        };

        for (field, value) in [
            ("project", &resource.project),
            ("zone", &resource.zone),
            ("name", &resource.name),
        ] {
            if value.trim().is_empty() {
                return Err(CloudError::InvalidResource(format!(
                    "{} reference has an empty {}",
                    kind, field
                )));
            }
        }

        Ok(resource)
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} (project {}, zone {})",
            self.kind, self.name, self.project, self.zone
        )
    }
}

/// A resource-state document returned by the remote API
///
/// Wraps the raw JSON so callers keep every field the API sends.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(pub serde_json::Value);

impl Document {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Get a string field
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    /// Get a field as a specific type
    pub fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn self_link(&self) -> Option<&str> {
        self.str_field("selfLink")
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for Document {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}
