//! Error types for idepin-state

use thiserror::Error;

/// Errors raised while loading, fetching or persisting reconcile inputs
#[derive(Error, Debug)]
pub enum SourceError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A field the reconcile pass depends on is absent
    #[error("missing field: {path}")]
    MissingField { path: String },

    /// Installer versions do not list the requested component
    #[error("installer versions have no component '{component}'")]
    MissingComponent { component: String },

    /// External command failed or could not be spawned
    #[error("command failed: {0}")]
    CommandFailed(String),

    /// HTTP error (installer versions fetched by URL)
    #[error("HTTP error: {0}")]
    Http(String),

    /// The document parsed but has the wrong shape
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_display() {
        let err = SourceError::MissingField {
            path: "/ideOptions/options/code".to_string(),
        };
        assert!(err.to_string().contains("/ideOptions/options/code"));
    }

    #[test]
    fn test_missing_component_display() {
        let err = SourceError::MissingComponent {
            component: "codeHelperImage".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "installer versions have no component 'codeHelperImage'"
        );
    }
}
