//! Skiff Cloud Core
//!
//! Provider-neutral completion engine for remote infrastructure APIs that
//! perform mutations asynchronously. A create or delete request is turned into
//! a synchronous, deadline-respecting outcome by polling, and a platform token
//! is turned into one concrete base image.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                    skiff CLI                     │
//! │                 (skiff up/down)                  │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                  skiff-cloud                     │
//! │  ┌───────────────┐  ┌────────────────────────┐  │
//! │  │   Lifecycle   │  │     Image Resolver     │  │
//! │  │    Drivers    │  │ (PlatformImagePolicy)  │  │
//! │  └───────┬───────┘  └────────────────────────┘  │
//! │  ┌───────▼───────┐                              │
//! │  │    Poller     │                              │
//! │  └───────┬───────┘                              │
//! │  ┌───────▼──────────────────────────────────┐   │
//! │  │  trait ResourceApi / trait Authenticator │   │
//! │  └──────────────────────────────────────────┘   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │ skiff-cloud-  │
//!           │     gce       │
//!           └───────────────┘
//! ```

pub mod api;
pub mod error;
pub mod image;
pub mod lifecycle;
pub mod poller;
pub mod resource;

// Re-exports
pub use api::{Authenticator, OperationHandle, OperationScope, OperationState, ResourceApi};
pub use error::{CloudError, Result};
pub use image::{
    ImageCandidate, OwnerProject, PlatformImagePolicy, classify_platform, resolve_latest_image,
};
pub use lifecycle::{LifecycleDriver, LifecycleState};
pub use poller::{Observation, OperationStatus, PollConfig, PollOutcome, Verdict, bounded, poll};
pub use resource::{Document, ResourceKind, ResourceRef};
pub use tokio_util::sync::CancellationToken;
