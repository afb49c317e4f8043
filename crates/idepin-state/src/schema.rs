//! Schema for the IDE configmap, the workspace defaults and the installer's
//! versions manifest.
//!
//! The configmap is kept as a raw JSON document so that every field the
//! reconcile pass does not own is written back exactly as it was read. Typed
//! views (`BuildReferenceSet`, `VersionHistory`) are derived from it on demand.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SourceError;
use crate::storage_traits::SourceResult;

/// Product reconciled when none is configured.
pub const DEFAULT_PRODUCT: &str = "code";

/// Token that precedes the build identifier in an image reference.
pub const DEFAULT_MARKER: &str = "commit-";

/// Key under `defaultArgs` holding the default IDE version.
pub const DEFAULT_VERSION_KEY: &str = "codeVersion";

// ---------------------------------------------------------------------------
// Image references and pin history
// ---------------------------------------------------------------------------

/// Image references currently configured for one IDE product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReferenceSet {
    /// Primary IDE image reference
    pub image: String,
    /// Auxiliary layer references, in slot order
    #[serde(rename = "imageLayers", default)]
    pub auxiliary_layers: Vec<String>,
}

/// Newest known build identifiers, one per slot of a [`BuildReferenceSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestBuildInfo {
    /// Identifier for the primary image
    pub image: String,
    /// Identifiers for the auxiliary layers, in slot order
    pub auxiliary_layers: Vec<String>,
    /// Installer version the identifiers were taken from, if known
    pub installer_version: Option<String>,
}

impl LatestBuildInfo {
    pub fn new(image: impl Into<String>, auxiliary_layers: Vec<String>) -> Self {
        Self {
            image: image.into(),
            auxiliary_layers,
            installer_version: None,
        }
    }
}

/// A resolved IDE version and the exact references that produce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionPinEntry {
    pub version: String,
    pub image: String,
    #[serde(rename = "imageLayers", default)]
    pub auxiliary_layers: Vec<String>,
}

impl VersionPinEntry {
    /// Snapshot `references` under `version`.
    pub fn from_references(version: impl Into<String>, references: &BuildReferenceSet) -> Self {
        Self {
            version: version.into(),
            image: references.image.clone(),
            auxiliary_layers: references.auxiliary_layers.clone(),
        }
    }
}

/// Pinned versions, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionHistory(Vec<VersionPinEntry>);

impl VersionHistory {
    pub fn new(entries: Vec<VersionPinEntry>) -> Self {
        Self(entries)
    }

    /// The currently pinned entry.
    pub fn first(&self) -> Option<&VersionPinEntry> {
        self.0.first()
    }

    pub fn contains_version(&self, version: &str) -> bool {
        self.0.iter().any(|entry| entry.version == version)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VersionPinEntry> {
        self.0.iter()
    }

    pub fn entries(&self) -> &[VersionPinEntry] {
        &self.0
    }

    /// Return a new history with `entry` in front of the existing entries.
    pub fn prepended(&self, entry: VersionPinEntry) -> Self {
        let mut entries = Vec::with_capacity(self.0.len() + 1);
        entries.push(entry);
        entries.extend(self.0.iter().cloned());
        Self(entries)
    }
}

// ---------------------------------------------------------------------------
// Configuration (ide-configmap.json)
// ---------------------------------------------------------------------------

/// The persisted IDE configmap, scoped to the product being reconciled.
///
/// The product lives at `ideOptions.options.<product>` and owns the `image`,
/// `imageLayers` and `versions` fields. Nothing else in the document is
/// touched.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    document: Value,
    product: String,
}

impl Configuration {
    /// Wrap a parsed document, validating that the product entry is usable.
    pub fn from_document(document: Value, product: impl Into<String>) -> SourceResult<Self> {
        let configuration = Self {
            document,
            product: product.into(),
        };
        configuration.references()?;
        configuration.history()?;
        Ok(configuration)
    }

    pub fn from_json_str(content: &str, product: impl Into<String>) -> SourceResult<Self> {
        let document: Value = serde_json::from_str(content)?;
        Self::from_document(document, product)
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    fn product_path(&self) -> String {
        format!("ideOptions.options.{}", self.product)
    }

    fn product_entry(&self) -> SourceResult<&Map<String, Value>> {
        self.document
            .get("ideOptions")
            .and_then(|v| v.get("options"))
            .and_then(|v| v.get(&self.product))
            .and_then(Value::as_object)
            .ok_or_else(|| SourceError::MissingField {
                path: self.product_path(),
            })
    }

    fn product_entry_mut(&mut self) -> SourceResult<&mut Map<String, Value>> {
        let path = self.product_path();
        self.document
            .get_mut("ideOptions")
            .and_then(|v| v.get_mut("options"))
            .and_then(|v| v.get_mut(&self.product))
            .and_then(Value::as_object_mut)
            .ok_or(SourceError::MissingField { path })
    }

    /// Image references currently configured for the product.
    pub fn references(&self) -> SourceResult<BuildReferenceSet> {
        let entry = self.product_entry()?;
        let image = entry
            .get("image")
            .and_then(Value::as_str)
            .ok_or_else(|| SourceError::MissingField {
                path: format!("{}.image", self.product_path()),
            })?
            .to_string();
        let auxiliary_layers = match entry.get("imageLayers") {
            None | Some(Value::Null) => Vec::new(),
            Some(layers) => serde_json::from_value(layers.clone())?,
        };
        Ok(BuildReferenceSet {
            image,
            auxiliary_layers,
        })
    }

    /// Pinned versions for the product; absent `versions` reads as empty.
    pub fn history(&self) -> SourceResult<VersionHistory> {
        match self.product_entry()?.get("versions") {
            None | Some(Value::Null) => Ok(VersionHistory::default()),
            Some(versions) => Ok(serde_json::from_value(versions.clone())?),
        }
    }

    /// Overwrite `image` and `imageLayers` in place, keeping key order.
    pub fn set_references(&mut self, references: &BuildReferenceSet) -> SourceResult<()> {
        let entry = self.product_entry_mut()?;
        entry.insert(
            "image".to_string(),
            Value::String(references.image.clone()),
        );
        if entry.contains_key("imageLayers") || !references.auxiliary_layers.is_empty() {
            let layers = references
                .auxiliary_layers
                .iter()
                .cloned()
                .map(Value::String)
                .collect();
            entry.insert("imageLayers".to_string(), Value::Array(layers));
        }
        Ok(())
    }

    /// Insert `entry` at the front of `versions`.
    ///
    /// Existing entries are left as raw JSON, including fields unknown to
    /// [`VersionPinEntry`].
    pub fn prepend_pin(&mut self, entry: &VersionPinEntry) -> SourceResult<()> {
        let value = serde_json::to_value(entry)?;
        let path = format!("{}.versions", self.product_path());
        let product = self.product_entry_mut()?;
        let versions = product
            .entry("versions".to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if versions.is_null() {
            *versions = Value::Array(Vec::new());
        }
        match versions.as_array_mut() {
            Some(items) => {
                items.insert(0, value);
                Ok(())
            }
            None => Err(SourceError::InvalidDocument(format!(
                "{} is not an array",
                path
            ))),
        }
    }

    /// Render as 2-space indented JSON with a trailing newline.
    pub fn to_pretty_json(&self) -> SourceResult<String> {
        let mut rendered = serde_json::to_string_pretty(&self.document)?;
        rendered.push('\n');
        Ok(rendered)
    }
}

// ---------------------------------------------------------------------------
// Default version (WORKSPACE.yaml)
// ---------------------------------------------------------------------------

/// Version IDE provisioning falls back to when no pin is requested.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefaultVersion(String);

impl DefaultVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read `defaultArgs.<key>` from the workspace defaults document.
    pub fn from_workspace_yaml(content: &str, key: &str) -> SourceResult<Self> {
        let document: serde_yaml::Value = serde_yaml::from_str(content)?;
        let value = document
            .get("defaultArgs")
            .and_then(|args| args.get(key))
            .ok_or_else(|| SourceError::MissingField {
                path: format!("defaultArgs.{}", key),
            })?;
        match value {
            serde_yaml::Value::String(s) => Ok(Self(s.clone())),
            // `1.90` parses as a float and would come back as `1.9`
            serde_yaml::Value::Number(n) => Err(SourceError::InvalidDocument(format!(
                "defaultArgs.{} is the number {}, quote it to keep the exact version",
                key, n
            ))),
            other => Err(SourceError::InvalidDocument(format!(
                "defaultArgs.{} is not a string: {:?}",
                key, other
            ))),
        }
    }
}

impl std::fmt::Display for DefaultVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Installer versions (versions.yaml)
// ---------------------------------------------------------------------------

/// One build slot: a human name and the installer component that feeds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpec {
    pub name: String,
    pub component: String,
}

impl SlotSpec {
    pub fn new(name: &str, component: &str) -> Self {
        Self {
            name: name.to_string(),
            component: component.to_string(),
        }
    }
}

/// Maps the primary image and each auxiliary layer to installer components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSlots {
    pub image: SlotSpec,
    pub layers: Vec<SlotSpec>,
}

impl BuildSlots {
    /// Slots of the browser-based code IDE.
    pub fn code() -> Self {
        Self {
            image: SlotSpec::new("image", "codeImage"),
            layers: vec![
                SlotSpec::new("webExtension", "codeWebExtensionImage"),
                SlotSpec::new("codeHelper", "codeHelperImage"),
            ],
        }
    }

    /// Human name of auxiliary layer `index`, falling back to `layer<index>`.
    pub fn layer_name(&self, index: usize) -> String {
        self.layers
            .get(index)
            .map(|slot| slot.name.clone())
            .unwrap_or_else(|| format!("layer{}", index))
    }
}

impl Default for BuildSlots {
    fn default() -> Self {
        Self::code()
    }
}

/// The installer's versions manifest.
///
/// Only `version` and `components.workspace.<component>.version` are read;
/// the rest of the manifest varies between installer releases and is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallerVersions {
    document: serde_yaml::Value,
}

impl InstallerVersions {
    pub fn from_yaml_str(content: &str) -> SourceResult<Self> {
        let document: serde_yaml::Value = serde_yaml::from_str(content)?;
        if !document.is_mapping() {
            return Err(SourceError::InvalidDocument(
                "installer versions must be a mapping".to_string(),
            ));
        }
        Ok(Self { document })
    }

    /// Installer release these versions belong to.
    pub fn version(&self) -> Option<&str> {
        self.document.get("version").and_then(|v| v.as_str())
    }

    pub fn component_version(&self, component: &str) -> SourceResult<&str> {
        self.document
            .get("components")
            .and_then(|c| c.get("workspace"))
            .and_then(|w| w.get(component))
            .and_then(|c| c.get("version"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| SourceError::MissingComponent {
                component: component.to_string(),
            })
    }

    /// Extract bare build identifiers for every slot.
    ///
    /// A leading `marker` is stripped so identifiers can be substituted after
    /// the marker in an image reference.
    pub fn latest_build(&self, slots: &BuildSlots, marker: &str) -> SourceResult<LatestBuildInfo> {
        let bare = |component: &str| -> SourceResult<String> {
            let version = self.component_version(component)?;
            Ok(version.strip_prefix(marker).unwrap_or(version).to_string())
        };
        let image = bare(&slots.image.component)?;
        let auxiliary_layers = slots
            .layers
            .iter()
            .map(|slot| bare(&slot.component))
            .collect::<SourceResult<Vec<_>>>()?;
        Ok(LatestBuildInfo {
            image,
            auxiliary_layers,
            installer_version: self.version().map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIGMAP: &str = r#"{
  "supervisorImage": "{{.Repository}}/supervisor:commit-111",
  "ideOptions": {
    "options": {
      "code": {
        "orderKey": "00",
        "title": "VS Code",
        "type": "browser",
        "image": "{{.Repository}}/ide/code:commit-aaa",
        "imageLayers": [
          "{{.Repository}}/ide/code-web-extension:commit-bbb",
          "{{.Repository}}/ide/code-codehelper:commit-ccc"
        ],
        "versions": [
          {
            "version": "1.89.0",
            "image": "{{.Repository}}/ide/code:commit-old",
            "imageLayers": [],
            "note": "kept"
          }
        ]
      }
    },
    "defaultIde": "code"
  }
}
"#;

    #[test]
    fn test_configuration_reads_references_and_history() {
        let config = Configuration::from_json_str(CONFIGMAP, "code").unwrap();
        let refs = config.references().unwrap();
        assert_eq!(refs.image, "{{.Repository}}/ide/code:commit-aaa");
        assert_eq!(refs.auxiliary_layers.len(), 2);

        let history = config.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.first().unwrap().version, "1.89.0");
    }

    #[test]
    fn test_configuration_unchanged_renders_identically() {
        let config = Configuration::from_json_str(CONFIGMAP, "code").unwrap();
        assert_eq!(config.to_pretty_json().unwrap(), CONFIGMAP);
    }

    #[test]
    fn test_set_references_keeps_key_order() {
        let mut config = Configuration::from_json_str(CONFIGMAP, "code").unwrap();
        let refs = BuildReferenceSet {
            image: "{{.Repository}}/ide/code:commit-new".to_string(),
            auxiliary_layers: vec!["l0".to_string(), "l1".to_string()],
        };
        config.set_references(&refs).unwrap();

        let rendered = config.to_pretty_json().unwrap();
        let expected = CONFIGMAP
            .replace("code:commit-aaa", "code:commit-new")
            .replace("{{.Repository}}/ide/code-web-extension:commit-bbb", "l0")
            .replace("{{.Repository}}/ide/code-codehelper:commit-ccc", "l1");
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_prepend_pin_preserves_unknown_fields() {
        let mut config = Configuration::from_json_str(CONFIGMAP, "code").unwrap();
        let entry = VersionPinEntry {
            version: "1.90.0".to_string(),
            image: "img".to_string(),
            auxiliary_layers: vec![],
        };
        config.prepend_pin(&entry).unwrap();

        let versions = &config.document()["ideOptions"]["options"]["code"]["versions"];
        assert_eq!(versions[0]["version"], "1.90.0");
        assert_eq!(versions[1]["version"], "1.89.0");
        assert_eq!(versions[1]["note"], "kept");
    }

    #[test]
    fn test_prepend_pin_creates_missing_versions() {
        let doc = serde_json::json!({
            "ideOptions": { "options": { "code": { "image": "img:commit-a" } } }
        });
        let mut config = Configuration::from_document(doc, "code").unwrap();
        assert!(config.history().unwrap().is_empty());

        let refs = config.references().unwrap();
        config
            .prepend_pin(&VersionPinEntry::from_references("1.0", &refs))
            .unwrap();
        assert_eq!(config.history().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_product_is_rejected() {
        let err = Configuration::from_json_str(CONFIGMAP, "intellij").unwrap_err();
        match err {
            SourceError::MissingField { path } => {
                assert_eq!(path, "ideOptions.options.intellij")
            }
            other => panic!("Expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_history_prepended_leaves_original() {
        let history = VersionHistory::new(vec![VersionPinEntry {
            version: "1.0".to_string(),
            image: "a".to_string(),
            auxiliary_layers: vec![],
        }]);
        let next = history.prepended(VersionPinEntry {
            version: "1.1".to_string(),
            image: "b".to_string(),
            auxiliary_layers: vec![],
        });

        assert_eq!(history.len(), 1);
        assert_eq!(next.len(), 2);
        assert_eq!(next.entries()[0].version, "1.1");
        assert_eq!(next.entries()[1], history.entries()[0]);
        assert!(next.contains_version("1.0"));
    }

    #[test]
    fn test_default_version_from_workspace_yaml() {
        let yaml = "defaultArgs:\n  codeVersion: 1.90.2\n  codeCommit: abc\n";
        let version = DefaultVersion::from_workspace_yaml(yaml, "codeVersion").unwrap();
        assert_eq!(version.as_str(), "1.90.2");
    }

    #[test]
    fn test_default_version_unquoted_number_is_rejected() {
        for raw in ["1.90", "1.100", "2"] {
            let yaml = format!("defaultArgs:\n  codeVersion: {}\n", raw);
            let err = DefaultVersion::from_workspace_yaml(&yaml, "codeVersion").unwrap_err();
            assert!(matches!(err, SourceError::InvalidDocument(_)));
            assert!(err.to_string().contains("quote"));
        }

        let quoted = "defaultArgs:\n  codeVersion: \"1.90\"\n";
        let version = DefaultVersion::from_workspace_yaml(quoted, "codeVersion").unwrap();
        assert_eq!(version.as_str(), "1.90");
    }

    #[test]
    fn test_default_version_missing_key() {
        let yaml = "defaultArgs:\n  other: x\n";
        let err = DefaultVersion::from_workspace_yaml(yaml, "codeVersion").unwrap_err();
        assert!(err.to_string().contains("defaultArgs.codeVersion"));
    }

    #[test]
    fn test_installer_versions_latest_build_strips_marker() {
        let yaml = r#"
version: main-gha.123
components:
  workspace:
    codeImage:
      version: commit-aaa111
    codeWebExtensionImage:
      version: commit-bbb222
    codeHelperImage:
      version: ccc333
    desktopIdeImages:
      goland:
        version: commit-zzz
"#;
        let versions = InstallerVersions::from_yaml_str(yaml).unwrap();
        let latest = versions.latest_build(&BuildSlots::code(), "commit-").unwrap();

        assert_eq!(latest.image, "aaa111");
        assert_eq!(latest.auxiliary_layers, vec!["bbb222", "ccc333"]);
        assert_eq!(latest.installer_version.as_deref(), Some("main-gha.123"));
    }

    #[test]
    fn test_installer_versions_missing_component() {
        let yaml = "components:\n  workspace:\n    codeImage:\n      version: commit-a\n";
        let versions = InstallerVersions::from_yaml_str(yaml).unwrap();
        let err = versions
            .latest_build(&BuildSlots::code(), "commit-")
            .unwrap_err();
        match err {
            SourceError::MissingComponent { component } => {
                assert_eq!(component, "codeWebExtensionImage")
            }
            other => panic!("Expected MissingComponent, got {:?}", other),
        }
    }
}
