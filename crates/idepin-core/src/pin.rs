//! Version pin history decisions.
//!
//! Decides whether the version installed by the newly referenced image gets
//! a pin entry, so workspaces that request it keep resolving to these exact
//! images after the references move on.

use idepin_state::{BuildReferenceSet, DefaultVersion, VersionHistory, VersionPinEntry};
use serde::{Deserialize, Serialize};

use crate::error::{PinError, Result};

/// What happened to the pin history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinOutcome {
    /// A new entry was put in front of the history.
    Prepended,
    /// The resolved version is the default version; the default-version
    /// pathway serves it, so it is not pinned.
    SkippedDefaultVersion,
    /// The newest entry already pins the resolved version.
    SkippedAlreadyPinned,
    /// An older entry already pins the resolved version.
    SkippedAlreadyRecorded,
}

impl PinOutcome {
    pub fn is_prepended(&self) -> bool {
        matches!(self, PinOutcome::Prepended)
    }

    pub fn skipped_reason(&self) -> Option<&'static str> {
        match self {
            PinOutcome::Prepended => None,
            PinOutcome::SkippedDefaultVersion => {
                Some("resolved version equals the default version")
            }
            PinOutcome::SkippedAlreadyPinned => Some("resolved version is already the newest pin"),
            PinOutcome::SkippedAlreadyRecorded => {
                Some("resolved version is already recorded in the pin history")
            }
        }
    }
}

impl std::fmt::Display for PinOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PinOutcome::Prepended => "prepended",
            PinOutcome::SkippedDefaultVersion => "skipped_default_version",
            PinOutcome::SkippedAlreadyPinned => "skipped_already_pinned",
            PinOutcome::SkippedAlreadyRecorded => "skipped_already_recorded",
        };
        write!(f, "{}", s)
    }
}

/// Resulting history and how it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinDecision {
    pub history: VersionHistory,
    pub outcome: PinOutcome,
}

impl PinDecision {
    pub fn skipped_reason(&self) -> Option<&'static str> {
        self.outcome.skipped_reason()
    }

    /// The entry added by this decision, if any.
    pub fn new_entry(&self) -> Option<&VersionPinEntry> {
        if self.outcome.is_prepended() {
            self.history.first()
        } else {
            None
        }
    }
}

/// Decide whether `resolved_version` gets pinned to `new_references`.
///
/// Checks, in order:
/// 1. `resolved_version` is blank: [`PinError::EmptyResolvedVersion`].
/// 2. It equals the default version: history unchanged.
/// 3. The newest entry already pins it: history unchanged.
/// 4. An older entry already pins it: history unchanged.
/// 5. Otherwise a new entry is prepended; existing entries keep their order.
pub fn decide_pin(
    history: &VersionHistory,
    resolved_version: &str,
    default_version: &DefaultVersion,
    new_references: &BuildReferenceSet,
) -> Result<PinDecision> {
    if resolved_version.trim().is_empty() {
        return Err(PinError::EmptyResolvedVersion {
            image: new_references.image.clone(),
        });
    }

    let unchanged = |outcome| PinDecision {
        history: history.clone(),
        outcome,
    };

    if resolved_version == default_version.as_str() {
        return Ok(unchanged(PinOutcome::SkippedDefaultVersion));
    }
    if history
        .first()
        .is_some_and(|entry| entry.version == resolved_version)
    {
        return Ok(unchanged(PinOutcome::SkippedAlreadyPinned));
    }
    if history.contains_version(resolved_version) {
        return Ok(unchanged(PinOutcome::SkippedAlreadyRecorded));
    }

    let entry = VersionPinEntry::from_references(resolved_version, new_references);
    Ok(PinDecision {
        history: history.prepended(entry),
        outcome: PinOutcome::Prepended,
    })
}
