//! Comparison of configured image references with the latest build.

use idepin_state::{BuildReferenceSet, BuildSlots, LatestBuildInfo};
use serde::{Deserialize, Serialize};

/// Per-slot staleness. `true` means the configured reference does not
/// contain the latest identifier and needs rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMap {
    pub image: bool,
    pub auxiliary_layers: Vec<bool>,
}

impl ChangeMap {
    pub fn any_changed(&self) -> bool {
        self.image || self.auxiliary_layers.iter().any(|changed| *changed)
    }

    /// Pair every slot with its human name, primary image first.
    pub fn named(&self, slots: &BuildSlots) -> Vec<(String, bool)> {
        let mut named = Vec::with_capacity(self.auxiliary_layers.len() + 1);
        named.push((slots.image.name.clone(), self.image));
        for (index, changed) in self.auxiliary_layers.iter().enumerate() {
            named.push((slots.layer_name(index), *changed));
        }
        named
    }
}

/// Report which slots of `current` lag behind `latest`.
///
/// A slot is stale when its reference does not contain the latest
/// identifier as a substring. Slots missing on either side count as
/// unchanged.
pub fn compare_builds(current: &BuildReferenceSet, latest: &LatestBuildInfo) -> ChangeMap {
    let layer_count = current
        .auxiliary_layers
        .len()
        .max(latest.auxiliary_layers.len());

    ChangeMap {
        image: is_stale(Some(&current.image), Some(&latest.image)),
        auxiliary_layers: (0..layer_count)
            .map(|i| {
                is_stale(
                    current.auxiliary_layers.get(i),
                    latest.auxiliary_layers.get(i),
                )
            })
            .collect(),
    }
}

fn is_stale(reference: Option<&String>, identifier: Option<&String>) -> bool {
    match (reference, identifier) {
        (Some(reference), Some(identifier)) => !reference.contains(identifier.as_str()),
        _ => false,
    }
}
