//! Grouping of related changes by functional area

use crate::{ClassifiedChange, PathSegment, ROOT_PATH};
use std::collections::BTreeMap;
use tracing::debug;

/// Group name for OS-family paths
pub const OPERATING_SYSTEM_GROUP: &str = "operating_system";

/// Group key for a change path.
///
/// Only field segments count; array positions are skipped. `facts.*`
/// paths group by their second field, other paths by their first. OS,
/// hardware and network families collapse into one group each; features
/// become `features_<name>`. A path with no field segment groups under
/// [`ROOT_PATH`].
pub fn group_key(path: &[PathSegment]) -> String {
    let fields: Vec<&str> = path.iter().filter_map(PathSegment::as_field).collect();
    let Some(&first) = fields.first() else {
        return ROOT_PATH.to_string();
    };

    if first == "facts" && fields.len() > 1 {
        return match fields[1] {
            "modules" => "modules".to_string(),
            "cluster" => "cluster".to_string(),
            "nodes" => "nodes".to_string(),
            "distro" => OPERATING_SYSTEM_GROUP.to_string(),
            "processors" | "memory" | "product" | "virtual" | "pci" => "hardware".to_string(),
            "network" => "network".to_string(),
            "features" => match fields.get(2) {
                Some(feature) => format!("features_{}", feature),
                None => "features".to_string(),
            },
            other => other.to_string(),
        };
    }

    match first {
        "os" | "kernel" | "kernelrelease" => OPERATING_SYSTEM_GROUP.to_string(),
        "dmi" | "processors" | "memory" | "mountpoints" => "hardware".to_string(),
        "networking" | "public_ip" | "arp_macs" => "network".to_string(),
        "features" => match fields.get(1) {
            Some(feature) => format!("features_{}", feature),
            None => "features".to_string(),
        },
        "esmithdb" => match fields.get(1) {
            Some(section) => format!("configuration_{}", section),
            None => "configuration".to_string(),
        },
        "rpms" => "packages".to_string(),
        other => other.to_string(),
    }
}

/// Partition changes by [`group_key`]. Every change lands in exactly one group.
pub fn group_related_changes(changes: &[ClassifiedChange]) -> BTreeMap<String, Vec<ClassifiedChange>> {
    let mut groups: BTreeMap<String, Vec<ClassifiedChange>> = BTreeMap::new();
    for change in changes {
        groups
            .entry(group_key(&change.change.path))
            .or_default()
            .push(change.clone());
    }

    debug!(
        total_diffs = changes.len(),
        groups_created = groups.len(),
        "grouped related changes"
    );
    groups
}
