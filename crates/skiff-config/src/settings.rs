//! Settings model, environment overrides and derived values

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use skiff_cloud::PollConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const COMPUTE_V1: &str = "https://www.googleapis.com/compute/v1/projects";

/// Poll timing as written in the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_ms: u64,
    pub max_interval_ms: u64,
    pub multiplier: f64,
    pub probe_timeout_ms: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        let defaults = PollConfig::default();
        Self {
            interval_ms: defaults.interval.as_millis() as u64,
            max_interval_ms: defaults.max_interval.as_millis() as u64,
            multiplier: defaults.multiplier,
            probe_timeout_ms: defaults.probe_timeout.as_millis() as u64,
        }
    }
}

/// Labels attached to every instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSettings {
    pub department: Option<String>,
    pub project: Option<String>,
    pub jenkins_build_url: Option<String>,
}

/// One instance metadata entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataItem {
    pub key: String,
    pub value: String,
}

impl MetadataItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Skiff settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Project that owns every created resource
    pub project: String,
    pub zone: String,
    pub network: String,
    pub machine_type: String,
    pub disk_size_gb: u64,
    /// Overall budget for one create/delete, converted into an attempt count
    pub timeout_secs: u64,
    pub poll: PollSettings,
    pub ssh_public_key: Option<PathBuf>,
    pub metadata: MetadataSettings,
    pub firewall_ports: Vec<u16>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project: String::new(),
            zone: "us-central1-a".to_string(),
            network: "default".to_string(),
            machine_type: "n1-standard-1".to_string(),
            disk_size_gb: 25,
            timeout_secs: 300,
            poll: PollSettings::default(),
            ssh_public_key: None,
            metadata: MetadataSettings::default(),
            firewall_ports: vec![22, 443, 8140, 61613, 8080, 8081],
        }
    }
}

impl Settings {
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        debug!("Loaded settings from {}", path.display());
        Self::from_yaml(&content, path)
    }

    /// Apply `SKIFF_GCE_*` and `SKIFF_TIMEOUT_SECS` on top of file values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        let strings: [(&str, &mut String); 4] = [
            ("SKIFF_GCE_PROJECT", &mut self.project),
            ("SKIFF_GCE_ZONE", &mut self.zone),
            ("SKIFF_GCE_NETWORK", &mut self.network),
            ("SKIFF_GCE_MACHINE_TYPE", &mut self.machine_type),
        ];
        for (key, field) in strings {
            if let Some(value) = env_value(key) {
                debug!("{} overrides configuration", key);
                *field = value;
            }
        }

        if let Some(value) = env_value("SKIFF_GCE_SSH_PUBLIC_KEY") {
            self.ssh_public_key = Some(PathBuf::from(value));
        }

        if let Some(value) = env_value("SKIFF_TIMEOUT_SECS") {
            self.timeout_secs = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "SKIFF_TIMEOUT_SECS".to_string(),
                message: format!("expected a number of seconds, got '{}'", value),
            })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.project.trim().is_empty() {
            return Err(ConfigError::MissingSetting("project"));
        }
        if self.poll.multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                key: "poll.multiplier".to_string(),
                message: "must be at least 1.0".to_string(),
            });
        }
        Ok(())
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll.interval_ms),
            max_interval: Duration::from_millis(self.poll.max_interval_ms),
            multiplier: self.poll.multiplier,
            probe_timeout: Duration::from_millis(self.poll.probe_timeout_ms),
        }
    }

    /// Attempt budget for one create/delete, at least 1
    pub fn attempts(&self) -> u32 {
        self.poll_config()
            .attempts_within(Duration::from_secs(self.timeout_secs))
    }

    pub fn default_zone_url(&self) -> String {
        format!("{}/{}/global/zones/{}", COMPUTE_V1, self.project, self.zone)
    }

    pub fn default_network_url(&self) -> String {
        format!(
            "{}/{}/global/networks/{}",
            COMPUTE_V1, self.project, self.network
        )
    }

    /// Configured public key path, or `~/.ssh/google_compute_engine.pub`
    pub fn ssh_public_key_path(&self) -> Result<PathBuf> {
        match &self.ssh_public_key {
            Some(path) => Ok(path.clone()),
            None => {
                let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
                Ok(home.join(".ssh").join("google_compute_engine.pub"))
            }
        }
    }

    pub fn read_ssh_public_key(&self) -> Result<String> {
        let path = self.ssh_public_key_path()?;
        if !path.is_file() {
            return Err(ConfigError::SshKeyNotFound(path));
        }
        Ok(std::fs::read_to_string(&path)?.trim().to_string())
    }

    /// Instance metadata: configured labels first, then `sshKeys`
    pub fn metadata_items(&self, public_key: &str) -> Vec<MetadataItem> {
        let labels = [
            ("department", &self.metadata.department),
            ("project", &self.metadata.project),
            ("jenkins_build_url", &self.metadata.jenkins_build_url),
        ];

        labels
            .into_iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| MetadataItem::new(key, v.clone())))
            .chain(std::iter::once(MetadataItem::new(
                "sshKeys",
                format!("google_compute:{}", public_key.trim()),
            )))
            .collect()
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
