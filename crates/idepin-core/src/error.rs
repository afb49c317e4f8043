//! Error taxonomy for the reconcile pass.

use idepin_state::SourceError;

/// Reconcile errors.
///
/// Only `EmptyResolvedVersion` originates in the core. Skips (reference
/// already current, version already pinned, default-version match) are
/// reported as values, not errors.
#[derive(Debug, thiserror::Error)]
pub enum PinError {
    #[error("installed IDE version of {image} can't be empty")]
    EmptyResolvedVersion { image: String },

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Result type for reconcile operations.
pub type Result<T> = std::result::Result<T, PinError>;
