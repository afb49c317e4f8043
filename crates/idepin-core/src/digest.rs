//! Content digests of rendered configmap documents.

use idepin_state::Configuration;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// SHA-256 hex digest of a configmap exactly as it would be written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentDigest(String);

impl DocumentDigest {
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        DocumentDigest(hex::encode(hasher.finalize()))
    }

    /// Digest of the rendered document.
    pub fn of(configuration: &Configuration) -> Result<Self> {
        let rendered = configuration.to_pretty_json()?;
        Ok(Self::from_bytes(rendered.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for DocumentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
