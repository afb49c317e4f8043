//! IDE version resolution by image label.
//!
//! The inspection command prints the image config JSON; the IDE version is
//! the value of a well-known label in `config.Labels`.

use async_trait::async_trait;
use idepin_state::{SourceResult, VersionResolver};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::command::{run_capture, split_command};

/// Command that prints an image's config JSON; the reference is appended.
pub const DEFAULT_INSPECT_COMMAND: &str = "oci-tool fetch image";

/// Registry repository substituted for [`REPOSITORY_PLACEHOLDER`].
pub const DEFAULT_REPOSITORY: &str = "eu.gcr.io/gitpod-core-dev/build";

/// Label carrying the installed IDE version.
pub const DEFAULT_VERSION_LABEL: &str = "io.gitpod.ide.version";

/// Template placeholder used by configmap image references.
pub const REPOSITORY_PLACEHOLDER: &str = "{{.Repository}}";

/// Image inspection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectConfig {
    /// Program and leading arguments of the inspection command
    pub command: Vec<String>,
    /// Repository substituted for the placeholder
    pub repository: String,
    /// Label holding the IDE version
    pub label: String,
}

impl Default for InspectConfig {
    fn default() -> Self {
        InspectConfig {
            command: split_command(DEFAULT_INSPECT_COMMAND),
            repository: DEFAULT_REPOSITORY.to_string(),
            label: DEFAULT_VERSION_LABEL.to_string(),
        }
    }
}

impl InspectConfig {
    /// Create config for a specific inspection command line
    pub fn new(command: &str) -> Self {
        InspectConfig {
            command: split_command(command),
            ..Self::default()
        }
    }

    pub fn with_repository(mut self, repository: &str) -> Self {
        self.repository = repository.trim_end_matches('/').to_string();
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }
}

/// Resolves installed IDE versions by reading an image label.
pub struct LabelVersionResolver {
    config: InspectConfig,
}

impl LabelVersionResolver {
    pub fn new(config: InspectConfig) -> Self {
        LabelVersionResolver { config }
    }

    pub fn config(&self) -> &InspectConfig {
        &self.config
    }

    /// Replace the repository placeholder; other references pass through.
    pub fn expand_reference(&self, reference: &str) -> String {
        reference.replace(REPOSITORY_PLACEHOLDER, &self.config.repository)
    }
}

#[async_trait]
impl VersionResolver for LabelVersionResolver {
    async fn resolve_installed_version(&self, image_reference: &str) -> SourceResult<String> {
        let reference = self.expand_reference(image_reference);
        let mut argv = self.config.command.clone();
        argv.push(reference.clone());

        let stdout = run_capture(&argv).await?;
        let version = parse_version_label(&stdout, &self.config.label)?;
        if version.is_empty() {
            warn!("Image {} has no {} label", reference, self.config.label);
        } else {
            info!("Image {} carries IDE version {}", reference, version);
        }
        Ok(version)
    }
}

/// Extract `config.Labels[label]` from image config JSON, trimmed.
///
/// A missing label yields an empty string.
pub fn parse_version_label(config_json: &str, label: &str) -> SourceResult<String> {
    let config: Value = serde_json::from_str(config_json.trim())?;
    Ok(config
        .get("config")
        .and_then(|c| c.get("Labels"))
        .and_then(|labels| labels.get(label))
        .and_then(Value::as_str)
        .map(|v| v.trim().to_string())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use idepin_state::SourceError;

    #[test]
    fn test_inspect_config_default() {
        let config = InspectConfig::default();
        assert_eq!(config.command, vec!["oci-tool", "fetch", "image"]);
        assert_eq!(config.label, DEFAULT_VERSION_LABEL);
    }

    #[test]
    fn test_with_repository_trims_slash() {
        let config = InspectConfig::default().with_repository("registry.example.com/build/");
        assert_eq!(config.repository, "registry.example.com/build");
    }

    #[test]
    fn test_expand_reference() {
        let resolver = LabelVersionResolver::new(
            InspectConfig::default().with_repository("registry.example.com/build"),
        );
        assert_eq!(
            resolver.expand_reference("{{.Repository}}/ide/code:commit-abc"),
            "registry.example.com/build/ide/code:commit-abc"
        );
        assert_eq!(
            resolver.expand_reference("docker.io/ide/code:latest"),
            "docker.io/ide/code:latest"
        );
    }

    #[test]
    fn test_parse_version_label() {
        let json = r#"{"architecture":"amd64","config":{"Labels":{"io.gitpod.ide.version":" 1.90.0\n"}}}"#;
        assert_eq!(
            parse_version_label(json, DEFAULT_VERSION_LABEL).unwrap(),
            "1.90.0"
        );
    }

    #[test]
    fn test_parse_version_label_missing() {
        let json = r#"{"config":{"Labels":{}}}"#;
        assert_eq!(parse_version_label(json, DEFAULT_VERSION_LABEL).unwrap(), "");
        assert_eq!(parse_version_label("{}", DEFAULT_VERSION_LABEL).unwrap(), "");
    }

    #[test]
    fn test_parse_version_label_invalid_json() {
        let err = parse_version_label("not json", DEFAULT_VERSION_LABEL).unwrap_err();
        assert!(matches!(err, SourceError::Json(_)));
    }

    #[tokio::test]
    async fn test_resolver_runs_command_with_expanded_reference() {
        let config = InspectConfig {
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                r#"echo '{"config":{"Labels":{"io.gitpod.ide.version":"'$1'"}}}'"#.to_string(),
                "inspect".to_string(),
            ],
            repository: "registry.example.com/build".to_string(),
            label: DEFAULT_VERSION_LABEL.to_string(),
        };
        let resolver = LabelVersionResolver::new(config);

        let version = resolver
            .resolve_installed_version("{{.Repository}}/ide/code:commit-abc")
            .await
            .unwrap();
        assert_eq!(version, "registry.example.com/build/ide/code:commit-abc");
    }

    #[tokio::test]
    async fn test_resolver_command_failure() {
        let resolver = LabelVersionResolver::new(InspectConfig::new("false"));
        let err = resolver
            .resolve_installed_version("ide/code:commit-abc")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::CommandFailed(_)));
    }
}
