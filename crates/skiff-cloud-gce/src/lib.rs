//! Google Compute Engine provider for Skiff
//!
//! REST binding for the provider-neutral engine in `skiff-cloud`.
//!
//! # Requirements
//!
//! - `SKIFF_GCE_ACCESS_TOKEN`: OAuth access token with the compute scope
//! - a project in the skiff configuration (or `SKIFF_GCE_PROJECT`)
//!
//! # Example
//!
//! ```ignore
//! use skiff_cloud_gce::GceProvider;
//!
//! let settings = skiff_config::load()?;
//! let provider = GceProvider::from_settings(settings)?;
//!
//! let image = provider.resolve_latest_image("centos-7-x86_64").await?;
//! let disk = provider.create_disk("beaker-tmp-disk", Some(&image)).await?;
//! let instance = provider.create_instance("beaker-tmp-instance", &disk).await?;
//!
//! provider.delete_instance("beaker-tmp-instance").await?;
//! provider.delete_disk("beaker-tmp-disk").await?;
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod provider;
pub mod requests;

pub use auth::StaticToken;
pub use client::{COMPUTE_API_BASE, GceClient};
pub use error::{GceError, Result};
pub use provider::{GceProvider, metadata_fingerprint};
pub use requests::{DiskRequest, InstanceRequest, firewall_body, metadata_body};
