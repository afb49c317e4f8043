//! IDE-Pin State: configmap, workspace defaults and collaborator traits
//!
//! This crate owns everything the reconcile pass reads or writes: the IDE
//! configmap document, the default IDE version, the installer's versions
//! manifest, and the async traits through which the core reaches them.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: Preserving the persisted document exactly, except for the fields
//! the reconcile pass owns.
//!
//! ## Key Components
//!
//! - `Configuration`: The configmap, scoped to one IDE product
//! - `VersionHistory`: Pinned versions, most recent first
//! - `storage_traits`: Collaborator traits consumed by the core
//! - `fakes`: In-memory collaborators for tests

mod error;
pub mod fakes;
mod file_store;
mod schema;
pub mod storage_traits;

pub use error::SourceError;
pub use file_store::{JsonFileConfigurationStore, YamlDefaultVersionSource};
pub use schema::{
    BuildReferenceSet, BuildSlots, Configuration, DefaultVersion, InstallerVersions,
    LatestBuildInfo, SlotSpec, VersionHistory, VersionPinEntry, DEFAULT_MARKER, DEFAULT_PRODUCT,
    DEFAULT_VERSION_KEY,
};
pub use storage_traits::{
    BuildInfoSource, ConfigurationStore, DefaultVersionSource, SourceResult, VersionResolver,
};
