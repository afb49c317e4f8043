//! IDE-Pin Core Library
//!
//! Reconciles the IDE configmap against the latest build: rewrites the
//! default image references and records the installed IDE version in the
//! pin history when it is neither the default nor already pinned.

pub mod compare;
pub mod digest;
pub mod error;
pub mod obs;
pub mod pin;
pub mod reconcile;
pub mod telemetry;
pub mod update;

pub use compare::{compare_builds, ChangeMap};
pub use digest::DocumentDigest;
pub use error::{PinError, Result};
pub use pin::{decide_pin, PinDecision, PinOutcome};
pub use reconcile::{
    apply_resolved_version, prepare_update, reconcile, run_reconcile_pass, PassOptions,
    PreparedUpdate, ReconcileInputs, ReconcileOutcome, ReconcilePass,
};
pub use telemetry::init_tracing;
pub use update::{replace_build_id, split_reference, update_references};

pub use idepin_state::{
    BuildReferenceSet, BuildSlots, Configuration, DefaultVersion, LatestBuildInfo, VersionHistory,
    VersionPinEntry,
};

/// idepin version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
