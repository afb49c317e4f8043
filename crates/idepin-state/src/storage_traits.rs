//! Collaborator trait definitions for the reconcile pass
//!
//! These traits define the I/O the core consumes:
//! - `BuildInfoSource`: newest build identifiers per image slot
//! - `VersionResolver`: IDE version baked into an image
//! - `ConfigurationStore`: load/persist the IDE configmap
//! - `DefaultVersionSource`: default IDE version from the workspace defaults
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;

use crate::error::SourceError;
use crate::schema::{Configuration, DefaultVersion, LatestBuildInfo};

/// Result type for collaborator operations
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Source of the newest build identifiers.
#[async_trait]
pub trait BuildInfoSource: Send + Sync {
    /// Fetch the latest identifiers, one per slot.
    async fn fetch_latest(&self) -> SourceResult<LatestBuildInfo>;
}

/// Resolves the IDE version installed in a container image.
///
/// Implementations may return an empty string when the image carries no
/// version; callers treat that as unusable.
#[async_trait]
pub trait VersionResolver: Send + Sync {
    async fn resolve_installed_version(&self, image_reference: &str) -> SourceResult<String>;
}

/// Persistence for the IDE configmap.
///
/// `persist` always receives the full document, never a diff.
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    async fn load(&self) -> SourceResult<Configuration>;

    async fn persist(&self, configuration: &Configuration) -> SourceResult<()>;
}

/// Source of the default IDE version.
#[async_trait]
pub trait DefaultVersionSource: Send + Sync {
    async fn load_default_version(&self) -> SourceResult<DefaultVersion>;
}
