//! Latest build identifiers from the installer's versions manifest.
//!
//! The manifest can come from a local file, the stdout of a command (for
//! example `docker run --rm <versions-image> cat versions.yaml`), or an
//! HTTP(S) URL.

use std::path::PathBuf;

use async_trait::async_trait;
use idepin_state::{
    BuildInfoSource, BuildSlots, InstallerVersions, LatestBuildInfo, SourceError, SourceResult,
    DEFAULT_MARKER,
};
use tracing::info;

use crate::command::run_capture;

/// Where the versions manifest is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionsOrigin {
    File(PathBuf),
    Command(Vec<String>),
    Url(String),
}

impl std::fmt::Display for VersionsOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionsOrigin::File(path) => write!(f, "file {}", path.display()),
            VersionsOrigin::Command(argv) => write!(f, "command `{}`", argv.join(" ")),
            VersionsOrigin::Url(url) => write!(f, "url {}", url),
        }
    }
}

/// [`BuildInfoSource`] backed by the installer's versions manifest.
pub struct InstallerVersionsSource {
    origin: VersionsOrigin,
    slots: BuildSlots,
    marker: String,
    http_client: reqwest::Client,
}

impl InstallerVersionsSource {
    pub fn new(origin: VersionsOrigin) -> SourceResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("idepin/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(http_err)?;

        Ok(InstallerVersionsSource {
            origin,
            slots: BuildSlots::default(),
            marker: DEFAULT_MARKER.to_string(),
            http_client,
        })
    }

    pub fn with_slots(mut self, slots: BuildSlots) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_marker(mut self, marker: &str) -> Self {
        self.marker = marker.to_string();
        self
    }

    pub fn origin(&self) -> &VersionsOrigin {
        &self.origin
    }

    pub fn slots(&self) -> &BuildSlots {
        &self.slots
    }

    /// Read and parse the manifest.
    pub async fn fetch_versions(&self) -> SourceResult<InstallerVersions> {
        let content = self.fetch_document().await?;
        InstallerVersions::from_yaml_str(&content)
    }

    async fn fetch_document(&self) -> SourceResult<String> {
        match &self.origin {
            VersionsOrigin::File(path) => Ok(tokio::fs::read_to_string(path).await?),
            VersionsOrigin::Command(argv) => run_capture(argv).await,
            VersionsOrigin::Url(url) => {
                let response = self
                    .http_client
                    .get(url)
                    .send()
                    .await
                    .map_err(http_err)?
                    .error_for_status()
                    .map_err(http_err)?;
                response.text().await.map_err(http_err)
            }
        }
    }
}

#[async_trait]
impl BuildInfoSource for InstallerVersionsSource {
    async fn fetch_latest(&self) -> SourceResult<LatestBuildInfo> {
        let versions = self.fetch_versions().await?;
        let latest = versions.latest_build(&self.slots, &self.marker)?;
        info!(
            "Latest installer {} from {}: image={} layers={:?}",
            latest.installer_version.as_deref().unwrap_or("<unknown>"),
            self.origin,
            latest.image,
            latest.auxiliary_layers
        );
        Ok(latest)
    }
}

fn http_err(e: reqwest::Error) -> SourceError {
    SourceError::Http(e.to_string())
}
