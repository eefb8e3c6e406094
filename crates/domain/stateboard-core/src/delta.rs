//! Delta detection between a remote version listing and locally known ids.

use std::collections::HashSet;

use crate::{is_current_version, VersionDescriptor, VersionId};

/// Version ids already persisted locally, built once per cycle.
pub type KnownVersionIndex = HashSet<VersionId>;

pub fn build_index<I>(ids: I) -> KnownVersionIndex
where
    I: IntoIterator<Item = VersionId>,
{
    ids.into_iter().filter(|v| !is_current_version(v)).collect()
}

/// Keep only descriptors that belong to `key`.
///
/// Version listings are prefix queries, so asking for `a.tfstate` also
/// returns `a.tfstate.backup`.
pub fn for_key(key: &str, descriptors: Vec<VersionDescriptor>) -> Vec<VersionDescriptor> {
    descriptors.into_iter().filter(|d| d.key == key).collect()
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct VersionDelta {
    pub missing: Vec<VersionDescriptor>,
    pub known: Vec<VersionDescriptor>,
}

/// Split a listing for one key into versions to fetch and versions to skip.
///
/// Sentinel entries and duplicates inside the listing are dropped.
pub fn missing_versions(
    descriptors: Vec<VersionDescriptor>,
    known: &KnownVersionIndex,
) -> VersionDelta {
    let mut delta = VersionDelta::default();
    let mut seen = HashSet::new();

    for d in descriptors {
        if is_current_version(&d.version_id) || !seen.insert(d.version_id.clone()) {
            continue;
        }
        if known.contains(&d.version_id) {
            delta.known.push(d);
        } else {
            delta.missing.push(d);
        }
    }

    delta
}
