//! The reconcile pass.
//!
//! Points the product's default image references at the latest build and
//! pins the version that build installs:
//!
//! 1. compare configured references with the latest identifiers (logged only)
//! 2. rewrite the primary image and every auxiliary layer
//! 3. resolve the IDE version installed by the new primary image
//! 4. decide on the pin history
//! 5. assemble the updated configuration from a copy of the input
//!
//! [`run_reconcile_pass`] wraps this with loading and a single persist. A
//! failure anywhere before the persist leaves the stored document untouched.

use idepin_state::{
    BuildInfoSource, BuildReferenceSet, BuildSlots, Configuration, ConfigurationStore,
    DefaultVersion, DefaultVersionSource, LatestBuildInfo, VersionResolver, DEFAULT_MARKER,
};
use tracing::Instrument;

use crate::compare::{compare_builds, ChangeMap};
use crate::digest::DocumentDigest;
use crate::error::{PinError, Result};
use crate::obs;
use crate::pin::{decide_pin, PinOutcome};
use crate::update::update_references;

/// Inputs for one reconcile step, already loaded.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileInputs<'a> {
    pub configuration: &'a Configuration,
    pub latest: &'a LatestBuildInfo,
    pub default_version: &'a DefaultVersion,
    pub marker: &'a str,
    pub slots: &'a BuildSlots,
}

/// References rewritten to the latest build, before version resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedUpdate {
    pub changes: ChangeMap,
    pub references: BuildReferenceSet,
}

/// Everything a reconcile produced.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// The reassembled document to persist.
    pub configuration: Configuration,
    /// The default version, returned for the caller to act on.
    pub default_version: DefaultVersion,
    /// IDE version installed by the new primary image.
    pub resolved_version: String,
    pub changes: ChangeMap,
    pub pin: PinOutcome,
    pub before_digest: DocumentDigest,
    pub after_digest: DocumentDigest,
}

impl ReconcileOutcome {
    /// Whether the persisted document differs from the loaded one.
    pub fn document_changed(&self) -> bool {
        self.before_digest != self.after_digest
    }
}

/// Compare and rewrite the configured references.
///
/// References are rewritten whether or not the comparison flags them.
pub fn prepare_update(
    configuration: &Configuration,
    latest: &LatestBuildInfo,
    marker: &str,
) -> Result<PreparedUpdate> {
    let current = configuration.references()?;
    Ok(PreparedUpdate {
        changes: compare_builds(&current, latest),
        references: update_references(&current, latest, marker),
    })
}

/// Finish a reconcile once the installed version of the new image is known.
///
/// The input configuration is copied, never modified.
pub fn apply_resolved_version(
    configuration: &Configuration,
    prepared: PreparedUpdate,
    resolved_version: &str,
    default_version: &DefaultVersion,
) -> Result<ReconcileOutcome> {
    let history = configuration.history()?;
    let decision = decide_pin(
        &history,
        resolved_version,
        default_version,
        &prepared.references,
    )?;
    obs::emit_pin_decided(resolved_version, decision.outcome);

    let mut updated = configuration.clone();
    updated.set_references(&prepared.references)?;
    if let Some(entry) = decision.new_entry() {
        updated.prepend_pin(entry)?;
    }

    Ok(ReconcileOutcome {
        before_digest: DocumentDigest::of(configuration)?,
        after_digest: DocumentDigest::of(&updated)?,
        configuration: updated,
        default_version: default_version.clone(),
        resolved_version: resolved_version.to_string(),
        changes: prepared.changes,
        pin: decision.outcome,
    })
}

/// Reconcile already-loaded inputs, resolving the new image's version
/// through `resolver`.
pub async fn reconcile(
    inputs: ReconcileInputs<'_>,
    resolver: &dyn VersionResolver,
) -> Result<ReconcileOutcome> {
    obs::emit_pass_started(
        inputs.configuration.product(),
        inputs.latest.installer_version.as_deref(),
    );

    let prepared = prepare_update(inputs.configuration, inputs.latest, inputs.marker)?;
    for (slot, changed) in prepared.changes.named(inputs.slots) {
        obs::emit_slot_compared(&slot, changed);
    }

    let resolved = resolver
        .resolve_installed_version(&prepared.references.image)
        .await?;
    obs::emit_version_resolved(&prepared.references.image, &resolved);

    apply_resolved_version(
        inputs.configuration,
        prepared,
        &resolved,
        inputs.default_version,
    )
}

/// Collaborators of a full pass.
#[derive(Clone, Copy)]
pub struct ReconcilePass<'a> {
    pub builds: &'a dyn BuildInfoSource,
    pub resolver: &'a dyn VersionResolver,
    pub store: &'a dyn ConfigurationStore,
    pub defaults: &'a dyn DefaultVersionSource,
}

/// Options for a full pass.
#[derive(Debug, Clone)]
pub struct PassOptions {
    /// Token preceding the build identifier in image references
    pub marker: String,
    /// Slot names used in logs
    pub slots: BuildSlots,
    /// Reconcile without persisting
    pub dry_run: bool,
}

impl Default for PassOptions {
    fn default() -> Self {
        PassOptions {
            marker: DEFAULT_MARKER.to_string(),
            slots: BuildSlots::default(),
            dry_run: false,
        }
    }
}

/// Load, reconcile and persist once.
///
/// Nothing is persisted when any step fails or `dry_run` is set.
pub async fn run_reconcile_pass(
    pass: ReconcilePass<'_>,
    options: &PassOptions,
) -> Result<ReconcileOutcome> {
    let configuration = pass.store.load().await?;
    let default_version = pass.defaults.load_default_version().await?;
    let span = obs::pass_span(configuration.product());

    async {
        let latest = pass.builds.fetch_latest().await?;
        let inputs = ReconcileInputs {
            configuration: &configuration,
            latest: &latest,
            default_version: &default_version,
            marker: &options.marker,
            slots: &options.slots,
        };
        let outcome = reconcile(inputs, pass.resolver).await?;

        if options.dry_run {
            obs::emit_dry_run(&outcome.after_digest, outcome.document_changed());
        } else {
            pass.store.persist(&outcome.configuration).await?;
            obs::emit_persisted(&outcome.after_digest, outcome.document_changed());
        }
        Ok::<_, PinError>(outcome)
    }
    .instrument(span)
    .await
}
