use super::types::{ApiGroup, Resource, normalize_group};

use dashmap::DashMap;
use std::sync::Arc;

/// Registry of mounted API groups and their resources.
///
/// Backed by a `DashMap`, so registration may race with discovery reads
/// without external locking. Reads never mutate the map.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    groups: DashMap<String, ApiGroup>,
}

impl ServiceRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Adds `resource` to `group`, creating the group on first use.
    ///
    /// Registering under an existing group appends; it never replaces.
    pub fn add_resource(&self, group: &str, resource: Resource) {
        let name = normalize_group(group);
        tracing::debug!(
            "Registry: {} {} ({}) -> group '{}'",
            resource.method,
            resource.path,
            resource.name,
            name
        );
        self.groups
            .entry(name.clone())
            .or_insert_with(|| ApiGroup::new(name))
            .resources
            .push(resource);
    }

    /// Returns the names of all registered groups, sorted for stable output.
    pub fn list_groups(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .groups
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Returns a snapshot of `group`, or `None` if it was never registered.
    ///
    /// `group` is normalized the same way as on registration, so `"/v0/"`
    /// and `"v0"` address the same group.
    pub fn list_resources(&self, group: &str) -> Option<ApiGroup> {
        self.groups
            .get(&normalize_group(group))
            .map(|entry| entry.value().clone())
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(&normalize_group(group))
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}
