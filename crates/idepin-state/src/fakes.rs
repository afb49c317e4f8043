//! In-memory fakes for collaborator traits (testing only)
//!
//! Provides `MemoryBuildInfoSource`, `StaticVersionResolver`,
//! `MemoryConfigurationStore` and `StaticDefaultVersion` that satisfy the
//! trait contracts without touching disk, network or external commands.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::schema::{Configuration, DefaultVersion, LatestBuildInfo};
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryBuildInfoSource
// ---------------------------------------------------------------------------

/// Returns the same latest build info on every fetch.
#[derive(Debug)]
pub struct MemoryBuildInfoSource {
    latest: LatestBuildInfo,
    fetches: Mutex<usize>,
}

impl MemoryBuildInfoSource {
    pub fn new(latest: LatestBuildInfo) -> Self {
        Self {
            latest,
            fetches: Mutex::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl BuildInfoSource for MemoryBuildInfoSource {
    async fn fetch_latest(&self) -> SourceResult<LatestBuildInfo> {
        *self.fetches.lock().unwrap() += 1;
        Ok(self.latest.clone())
    }
}

// ---------------------------------------------------------------------------
// StaticVersionResolver
// ---------------------------------------------------------------------------

/// Resolves every image to one fixed version and records the requests.
#[derive(Debug)]
pub struct StaticVersionResolver {
    version: String,
    requests: Mutex<Vec<String>>,
}

impl StaticVersionResolver {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Image references passed to `resolve_installed_version`, in call order.
    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl VersionResolver for StaticVersionResolver {
    async fn resolve_installed_version(&self, image_reference: &str) -> SourceResult<String> {
        self.requests
            .lock()
            .unwrap()
            .push(image_reference.to_string());
        Ok(self.version.clone())
    }
}

// ---------------------------------------------------------------------------
// MemoryConfigurationStore
// ---------------------------------------------------------------------------

/// Configuration store that keeps every persisted document.
///
/// `load` returns the most recently persisted document, or the initial one
/// if nothing was persisted yet, so consecutive passes see each other's
/// output.
#[derive(Debug)]
pub struct MemoryConfigurationStore {
    initial: Configuration,
    persisted: Mutex<Vec<Configuration>>,
}

impl MemoryConfigurationStore {
    pub fn new(initial: Configuration) -> Self {
        Self {
            initial,
            persisted: Mutex::new(Vec::new()),
        }
    }

    pub fn persist_count(&self) -> usize {
        self.persisted.lock().unwrap().len()
    }

    pub fn last_persisted(&self) -> Option<Configuration> {
        self.persisted.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ConfigurationStore for MemoryConfigurationStore {
    async fn load(&self) -> SourceResult<Configuration> {
        Ok(self
            .last_persisted()
            .unwrap_or_else(|| self.initial.clone()))
    }

    async fn persist(&self, configuration: &Configuration) -> SourceResult<()> {
        self.persisted.lock().unwrap().push(configuration.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StaticDefaultVersion
// ---------------------------------------------------------------------------

/// Default version source backed by a fixed value.
#[derive(Debug, Clone)]
pub struct StaticDefaultVersion(pub DefaultVersion);

impl StaticDefaultVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(DefaultVersion::new(version))
    }
}

#[async_trait]
impl DefaultVersionSource for StaticDefaultVersion {
    async fn load_default_version(&self) -> SourceResult<DefaultVersion> {
        Ok(self.0.clone())
    }
}
