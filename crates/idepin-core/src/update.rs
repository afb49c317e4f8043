//! Build identifier substitution in image references.
//!
//! A reference is tokenized at the first occurrence of the marker: the text
//! before it is kept, everything after it is the build identifier and is
//! replaced wholesale.

use idepin_state::{BuildReferenceSet, LatestBuildInfo};

/// Split `reference` at the first `marker` into (prefix, build identifier).
///
/// Returns `None` when the marker is empty or absent.
pub fn split_reference<'a>(reference: &'a str, marker: &str) -> Option<(&'a str, &'a str)> {
    if marker.is_empty() {
        return None;
    }
    reference.split_once(marker)
}

/// Substitute the build identifier of `reference`.
///
/// References without the marker are returned unchanged.
pub fn replace_build_id(reference: &str, marker: &str, identifier: &str) -> String {
    match split_reference(reference, marker) {
        Some((prefix, _)) => format!("{prefix}{marker}{identifier}"),
        None => reference.to_string(),
    }
}

/// Rewrite the primary image and every auxiliary layer in one step.
///
/// Layer `i` takes `latest.auxiliary_layers[i]`; a layer without a
/// corresponding identifier is kept as is.
pub fn update_references(
    current: &BuildReferenceSet,
    latest: &LatestBuildInfo,
    marker: &str,
) -> BuildReferenceSet {
    BuildReferenceSet {
        image: replace_build_id(&current.image, marker, &latest.image),
        auxiliary_layers: current
            .auxiliary_layers
            .iter()
            .enumerate()
            .map(|(i, layer)| match latest.auxiliary_layers.get(i) {
                Some(identifier) => replace_build_id(layer, marker, identifier),
                None => layer.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "commit-";

    #[test]
    fn test_replace_build_id() {
        assert_eq!(
            replace_build_id("foo/bar:commit-abc123", MARKER, "def456"),
            "foo/bar:commit-def456"
        );
    }

    #[test]
    fn test_no_marker_passthrough() {
        assert_eq!(
            replace_build_id("foo/bar:latest", MARKER, "def456"),
            "foo/bar:latest"
        );
    }

    #[test]
    fn test_everything_after_marker_is_replaced() {
        assert_eq!(
            replace_build_id("r/ide/code:commit-abc-extra/suffix", MARKER, "new"),
            "r/ide/code:commit-new"
        );
    }

    #[test]
    fn test_first_marker_wins() {
        assert_eq!(
            replace_build_id("r/commit-tools:commit-abc", MARKER, "new"),
            "r/commit-new"
        );
    }

    #[test]
    fn test_empty_marker_passthrough() {
        assert_eq!(replace_build_id("r/code:abc", "", "new"), "r/code:abc");
    }

    #[test]
    fn test_split_reference() {
        assert_eq!(
            split_reference("{{.Repository}}/ide/code:commit-abc", MARKER),
            Some(("{{.Repository}}/ide/code:", "abc"))
        );
        assert_eq!(split_reference("r/code:latest", MARKER), None);
    }

    #[test]
    fn test_update_references_all_slots() {
        let current = BuildReferenceSet {
            image: "r/ide/code:commit-a".to_string(),
            auxiliary_layers: vec![
                "r/ide/code-web-extension:commit-b".to_string(),
                "r/ide/code-codehelper:commit-c".to_string(),
            ],
        };
        let latest = LatestBuildInfo::new("x", vec!["y".to_string(), "z".to_string()]);

        let updated = update_references(&current, &latest, MARKER);
        assert_eq!(updated.image, "r/ide/code:commit-x");
        assert_eq!(
            updated.auxiliary_layers,
            vec![
                "r/ide/code-web-extension:commit-y",
                "r/ide/code-codehelper:commit-z"
            ]
        );
    }

    #[test]
    fn test_update_references_layer_without_identifier_kept() {
        let current = BuildReferenceSet {
            image: "r/ide/code:commit-a".to_string(),
            auxiliary_layers: vec!["r/web:commit-b".to_string(), "r/helper:commit-c".to_string()],
        };
        let latest = LatestBuildInfo::new("x", vec!["y".to_string()]);

        let updated = update_references(&current, &latest, MARKER);
        assert_eq!(updated.auxiliary_layers, vec!["r/web:commit-y", "r/helper:commit-c"]);
    }
}
