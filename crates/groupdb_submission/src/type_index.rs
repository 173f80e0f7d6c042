//! Component type → groups index.
//!
//! Answers "which groups hold at least one component of type T" without
//! scanning every group. It stores group ids only; the containers themselves
//! are resolved through the database, so there is a single owner of storage.

use std::collections::{BTreeSet, HashMap};

use groupdb_component::{ComponentTypeId, GroupId};

/// For every component type, the set of groups holding a non-empty container
/// of that type.
#[derive(Debug, Default)]
pub struct TypeIndex {
    groups_by_type: HashMap<ComponentTypeId, BTreeSet<GroupId>>,
}

impl TypeIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `group` holds components of `type_id`.
    pub fn insert(&mut self, type_id: ComponentTypeId, group: GroupId) {
        self.groups_by_type.entry(type_id).or_default().insert(group);
    }

    /// Forget `group` for `type_id`. Types left without groups are dropped.
    pub fn remove(&mut self, type_id: ComponentTypeId, group: GroupId) {
        if let Some(groups) = self.groups_by_type.get_mut(&type_id) {
            groups.remove(&group);
            if groups.is_empty() {
                self.groups_by_type.remove(&type_id);
            }
        }
    }

    /// Returns `true` if `group` is recorded for `type_id`.
    #[must_use]
    pub fn contains(&self, type_id: ComponentTypeId, group: GroupId) -> bool {
        self.groups_by_type
            .get(&type_id)
            .is_some_and(|groups| groups.contains(&group))
    }

    /// Groups holding `type_id`, in ascending order.
    pub fn groups(&self, type_id: ComponentTypeId) -> impl Iterator<Item = GroupId> + '_ {
        self.groups_by_type
            .get(&type_id)
            .into_iter()
            .flat_map(|groups| groups.iter().copied())
    }

    /// Returns `true` if `group` appears under any type.
    #[must_use]
    pub fn mentions_group(&self, group: GroupId) -> bool {
        self.groups_by_type.values().any(|groups| groups.contains(&group))
    }

    /// Number of component types with at least one group.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.groups_by_type.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEALTH: ComponentTypeId = ComponentTypeId::from_name("Health");
    const SPEED: ComponentTypeId = ComponentTypeId::from_name("Speed");

    #[test]
    fn test_insert_and_query() {
        let mut index = TypeIndex::new();
        index.insert(HEALTH, GroupId(3));
        index.insert(HEALTH, GroupId(1));
        index.insert(SPEED, GroupId(1));
        assert_eq!(index.groups(HEALTH).collect::<Vec<_>>(), vec![GroupId(1), GroupId(3)]);
        assert!(index.contains(SPEED, GroupId(1)));
        assert!(!index.contains(SPEED, GroupId(3)));
        assert_eq!(index.type_count(), 2);
    }

    #[test]
    fn test_remove_last_group_drops_type() {
        let mut index = TypeIndex::new();
        index.insert(HEALTH, GroupId(1));
        index.remove(HEALTH, GroupId(1));
        assert_eq!(index.type_count(), 0);
        assert_eq!(index.groups(HEALTH).count(), 0);
        assert!(!index.mentions_group(GroupId(1)));
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut index = TypeIndex::new();
        index.remove(SPEED, GroupId(9));
        assert_eq!(index.type_count(), 0);
    }
}
