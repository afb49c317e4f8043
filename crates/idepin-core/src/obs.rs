//! Structured observability hooks for the reconcile pass.
//!
//! This module provides:
//! - A product-scoped tracing span for instrumenting a pass
//! - Emission functions for the pass milestones: start, slot comparison,
//!   version resolution, pin decision, persistence

use tracing::{info, warn};

use crate::digest::DocumentDigest;
use crate::pin::PinOutcome;

/// Span tagging every event of one pass with the product it reconciles.
///
/// Attach with `tracing::Instrument`; do not hold it entered across awaits.
pub fn pass_span(product: &str) -> tracing::Span {
    tracing::info_span!("idepin.pass", product = %product)
}

/// Emit event: pass started against the given installer version.
pub fn emit_pass_started(product: &str, installer_version: Option<&str>) {
    info!(
        event = "pass.started",
        product = %product,
        installer_version = installer_version.unwrap_or("<unknown>"),
    );
}

/// Emit event: per-slot comparison result.
pub fn emit_slot_compared(slot: &str, changed: bool) {
    info!(event = "slot.compared", slot = %slot, changed = changed);
}

/// Emit event: installed IDE version resolved for the new primary image.
pub fn emit_version_resolved(image: &str, version: &str) {
    info!(event = "version.resolved", image = %image, version = %version);
}

/// Emit event: pin history decision.
pub fn emit_pin_decided(version: &str, outcome: PinOutcome) {
    match outcome.skipped_reason() {
        Some(reason) => info!(
            event = "pin.skipped",
            version = %version,
            outcome = %outcome,
            reason = reason,
        ),
        None => info!(event = "pin.prepended", version = %version),
    }
}

/// Emit event: configuration handed to the store.
pub fn emit_persisted(digest: &DocumentDigest, changed: bool) {
    info!(
        event = "config.persisted",
        digest = %digest.short(),
        changed = changed,
    );
}

/// Emit event: dry run, nothing persisted.
pub fn emit_dry_run(digest: &DocumentDigest, changed: bool) {
    warn!(
        event = "config.dry_run",
        digest = %digest.short(),
        changed = changed,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_span_create() {
        let _span = pass_span("code").entered();
        emit_pin_decided("1.90.0", PinOutcome::SkippedAlreadyPinned);
    }
}
