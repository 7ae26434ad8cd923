pub mod resolver;

use crate::cluster::ContainerSummary;
use std::collections::BTreeMap;

/// Containers keyed by the distinct image reference they run.
pub type ImageGroups = BTreeMap<String, Vec<ContainerSummary>>;

/// Groups the cluster view by image reference. Container order within a
/// group preserves discovery order so downstream summaries stay
/// deterministic.
pub fn group_by_image(containers: &[ContainerSummary]) -> ImageGroups {
    let mut groups = ImageGroups::new();
    for container in containers {
        groups
            .entry(container.image.clone())
            .or_default()
            .push(container.clone());
    }
    groups
}
