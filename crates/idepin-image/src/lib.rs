//! IDE-Pin Image: installer versions and image inspection
//!
//! This crate provides the concrete collaborators of the reconcile pass.
//! It reads the installer's versions manifest to learn the latest build
//! identifiers and inspects container images to find the IDE version they
//! install.
//!
//! ## Layer 1 - External Tooling
//!
//! Focus: Turning external commands and HTTP responses into typed inputs.

pub mod command;
pub mod inspect;
pub mod installer;

pub use command::{is_command_available, run_capture, split_command};
pub use inspect::{
    parse_version_label, InspectConfig, LabelVersionResolver, DEFAULT_INSPECT_COMMAND,
    DEFAULT_REPOSITORY, DEFAULT_VERSION_LABEL, REPOSITORY_PLACEHOLDER,
};
pub use installer::{InstallerVersionsSource, VersionsOrigin};
