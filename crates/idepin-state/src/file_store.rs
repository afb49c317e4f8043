//! File-backed configuration and default-version stores.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::schema::{Configuration, DefaultVersion};
use crate::storage_traits::{ConfigurationStore, DefaultVersionSource, SourceResult};

/// Reads and writes the IDE configmap JSON on disk.
#[derive(Debug, Clone)]
pub struct JsonFileConfigurationStore {
    path: PathBuf,
    product: String,
}

impl JsonFileConfigurationStore {
    pub fn new(path: impl Into<PathBuf>, product: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            product: product.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigurationStore for JsonFileConfigurationStore {
    async fn load(&self) -> SourceResult<Configuration> {
        debug!("Reading configmap {:?}", self.path);
        let content = tokio::fs::read_to_string(&self.path).await?;
        Configuration::from_json_str(&content, self.product.clone())
    }

    async fn persist(&self, configuration: &Configuration) -> SourceResult<()> {
        let rendered = configuration.to_pretty_json()?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        // Atomic write: temp file in the same directory, then rename.
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(rendered.as_bytes())?;
        // The temp file is created 0600; keep the configmap's own mode.
        match tokio::fs::metadata(&self.path).await {
            Ok(existing) => tmp.as_file().set_permissions(existing.permissions())?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!("Wrote configmap {:?} ({} bytes)", self.path, rendered.len());
        Ok(())
    }
}

/// Reads the default IDE version from the workspace defaults YAML.
#[derive(Debug, Clone)]
pub struct YamlDefaultVersionSource {
    path: PathBuf,
    key: String,
}

impl YamlDefaultVersionSource {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }
}

#[async_trait]
impl DefaultVersionSource for YamlDefaultVersionSource {
    async fn load_default_version(&self) -> SourceResult<DefaultVersion> {
        debug!("Reading workspace defaults {:?}", self.path);
        let content = tokio::fs::read_to_string(&self.path).await?;
        DefaultVersion::from_workspace_yaml(&content, &self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::BuildReferenceSet;
    use crate::SourceError;

    const CONFIGMAP: &str = "{\n  \"ideOptions\": {\n    \"options\": {\n      \"code\": {\n        \"image\": \"r/ide/code:commit-a\",\n        \"imageLayers\": [],\n        \"versions\": []\n      }\n    }\n  }\n}\n";

    #[tokio::test]
    async fn test_json_store_roundtrip_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ide-configmap.json");
        std::fs::write(&path, CONFIGMAP).unwrap();

        let store = JsonFileConfigurationStore::new(&path, "code");
        let config = store.load().await.unwrap();
        store.persist(&config).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), CONFIGMAP);
    }

    #[tokio::test]
    async fn test_json_store_persists_updates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ide-configmap.json");
        std::fs::write(&path, CONFIGMAP).unwrap();

        let store = JsonFileConfigurationStore::new(&path, "code");
        let mut config = store.load().await.unwrap();
        config
            .set_references(&BuildReferenceSet {
                image: "r/ide/code:commit-b".to_string(),
                auxiliary_layers: vec![],
            })
            .unwrap();
        store.persist(&config).await.unwrap();

        let reloaded = store.load().await.unwrap();
        assert_eq!(reloaded.references().unwrap().image, "r/ide/code:commit-b");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_json_store_persist_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ide-configmap.json");
        std::fs::write(&path, CONFIGMAP).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = JsonFileConfigurationStore::new(&path, "code");
        let config = store.load().await.unwrap();
        store.persist(&config).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[tokio::test]
    async fn test_json_store_persist_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("ide-configmap.json");
        std::fs::write(&source, CONFIGMAP).unwrap();
        let config = JsonFileConfigurationStore::new(&source, "code")
            .load()
            .await
            .unwrap();

        let target = dir.path().join("copy.json");
        let store = JsonFileConfigurationStore::new(&target, "code");
        store.persist(&config).await.unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), CONFIGMAP);
    }

    #[tokio::test]
    async fn test_json_store_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileConfigurationStore::new(dir.path().join("absent.json"), "code");
        assert!(matches!(store.load().await, Err(SourceError::Io(_))));
    }

    #[tokio::test]
    async fn test_yaml_default_version_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("WORKSPACE.yaml");
        std::fs::write(&path, "defaultArgs:\n  codeVersion: \"1.91.1\"\n").unwrap();

        let source = YamlDefaultVersionSource::new(&path, "codeVersion");
        let version = source.load_default_version().await.unwrap();
        assert_eq!(version.as_str(), "1.91.1");
    }
}
