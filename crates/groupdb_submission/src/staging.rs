//! Staging area for entities built during a tick.
//!
//! New entities never go straight into the database. They are staged in a
//! [`StagedBatch`] (group → component type → id-indexed container) and merged
//! by the next submission pass. Two batches form a double buffer: writers
//! always target the current side, and the driver swaps sides before merging
//! so that entities built by engine callbacks during the merge land in the
//! fresh current side instead of the batch being iterated.

use std::any::Any;
use std::collections::BTreeMap;

use groupdb_component::{ComponentTypeId, ContainerError, Egid, GroupId, TypeSafeContainer};

/// Per-group, per-type containers of not-yet-committed components.
///
/// Containers are kept across [`StagedBatch::clear`] so repeated passes reuse
/// their allocations; empty ones are skipped by readers.
#[derive(Default)]
pub struct StagedBatch {
    groups: BTreeMap<GroupId, BTreeMap<ComponentTypeId, Box<dyn TypeSafeContainer>>>,
    /// Entities built since the last clear. One entity counts once, whatever
    /// its number of components.
    entity_count: usize,
}

impl StagedBatch {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities staged since the last clear.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entity_count
    }

    /// Returns `true` if no entity is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entity_count == 0
    }

    /// Number of staged components across all groups and types.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.containers().map(|(_, c)| c.len()).sum()
    }

    /// Returns `true` if a component of `type_id` is staged for `egid`.
    #[must_use]
    pub fn contains(&self, egid: Egid, type_id: ComponentTypeId) -> bool {
        self.groups
            .get(&egid.group)
            .and_then(|types| types.get(&type_id))
            .is_some_and(|c| c.contains(egid.entity))
    }

    /// The staged container for (`group`, `type_id`), possibly empty.
    pub(crate) fn container(&self, group: GroupId, type_id: ComponentTypeId) -> Option<&dyn TypeSafeContainer> {
        self.groups.get(&group)?.get(&type_id).map(|c| c.as_ref())
    }

    /// Iterate over non-empty staged containers in group, then type order.
    pub fn containers(&self) -> impl Iterator<Item = (GroupId, &dyn TypeSafeContainer)> {
        self.groups.iter().flat_map(|(&group, types)| {
            types
                .values()
                .filter(|c| !c.is_empty())
                .map(move |c| (group, c.as_ref()))
        })
    }

    /// Iterate mutably over every staged container, empty ones included.
    pub(crate) fn containers_mut(
        &mut self,
    ) -> impl Iterator<Item = (GroupId, ComponentTypeId, &mut Box<dyn TypeSafeContainer>)> {
        self.groups.iter_mut().flat_map(|(&group, types)| {
            types
                .iter_mut()
                .map(move |(&type_id, container)| (group, type_id, container))
        })
    }

    /// Stage one type-erased component, creating the group's container for
    /// the type with `make_container` on first use.
    pub(crate) fn stage_boxed(
        &mut self,
        egid: Egid,
        type_id: ComponentTypeId,
        value: Box<dyn Any>,
        make_container: fn() -> Box<dyn TypeSafeContainer>,
    ) -> Result<(), ContainerError> {
        self.groups
            .entry(egid.group)
            .or_default()
            .entry(type_id)
            .or_insert_with(make_container)
            .insert_boxed(egid.entity, value)
    }

    /// Count one more fully staged entity.
    pub(crate) fn mark_entity_built(&mut self) {
        self.entity_count += 1;
    }

    /// Empty every container without releasing its storage.
    pub fn clear(&mut self) {
        for types in self.groups.values_mut() {
            for container in types.values_mut() {
                container.clear();
            }
        }
        self.entity_count = 0;
    }
}

impl std::fmt::Debug for StagedBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedBatch")
            .field("entity_count", &self.entity_count)
            .field("component_count", &self.component_count())
            .field("groups", &self.groups.len())
            .finish()
    }
}

/// The two staging sides. Exactly one is writable ("current") at a time.
#[derive(Debug, Default)]
pub struct DoubleBufferedEntities {
    buffers: [StagedBatch; 2],
    current: usize,
}

impl DoubleBufferedEntities {
    /// Create an empty double buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The side new entities are written to.
    #[must_use]
    pub fn current(&self) -> &StagedBatch {
        &self.buffers[self.current]
    }

    /// The side new entities are written to, mutably.
    pub fn current_mut(&mut self) -> &mut StagedBatch {
        &mut self.buffers[self.current]
    }

    /// The side that was current before the last [`swap`](Self::swap).
    #[must_use]
    pub fn other(&self) -> &StagedBatch {
        &self.buffers[self.current ^ 1]
    }

    /// Exchange the sides: everything staged so far becomes `other`, and the
    /// (previously cleared) other side becomes current.
    pub fn swap(&mut self) {
        self.current ^= 1;
    }

    /// Empty the non-current side, keeping its allocations.
    pub fn clear_other(&mut self) {
        self.buffers[self.current ^ 1].clear();
    }

    /// Borrow both sides at once as `(other, current)`.
    pub fn split_mut(&mut self) -> (&mut StagedBatch, &mut StagedBatch) {
        let (first, second) = self.buffers.split_at_mut(1);
        if self.current == 0 {
            (&mut second[0], &mut first[0])
        } else {
            (&mut first[0], &mut second[0])
        }
    }
}

#[cfg(test)]
mod tests {
    use groupdb_component::{Component, EntityId, IndexedContainer};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Health(u32);
    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    fn health_container() -> Box<dyn TypeSafeContainer> {
        Box::new(IndexedContainer::<Health>::new())
    }

    fn stage(batch: &mut StagedBatch, entity: u32, group: u32) {
        batch
            .stage_boxed(
                Egid::new(entity, group),
                Health::component_type_id(),
                Box::new(Health(entity)),
                health_container,
            )
            .unwrap();
        batch.mark_entity_built();
    }

    #[test]
    fn test_stages_coalesce_per_group_and_type() {
        let mut batch = StagedBatch::new();
        stage(&mut batch, 1, 7);
        stage(&mut batch, 2, 7);
        stage(&mut batch, 1, 8);
        assert_eq!(batch.entity_count(), 3);
        let containers: Vec<_> = batch.containers().map(|(g, c)| (g, c.len())).collect();
        assert_eq!(containers, vec![(GroupId(7), 2), (GroupId(8), 1)]);
        assert!(batch.contains(Egid::new(2, 7), Health::component_type_id()));
        assert!(!batch.contains(Egid::new(2, 8), Health::component_type_id()));
    }

    #[test]
    fn test_clear_keeps_containers_but_hides_them() {
        let mut batch = StagedBatch::new();
        stage(&mut batch, 1, 7);
        batch.clear();
        assert!(batch.is_empty());
        assert_eq!(batch.containers().count(), 0);
        assert_eq!(batch.containers_mut().count(), 1);
    }

    #[test]
    fn test_swap_exposes_previous_side() {
        let mut buffers = DoubleBufferedEntities::new();
        stage(buffers.current_mut(), 1, 7);
        buffers.swap();
        assert!(buffers.current().is_empty());
        assert_eq!(buffers.other().entity_count(), 1);

        stage(buffers.current_mut(), 2, 7);
        let (other, current) = buffers.split_mut();
        assert!(other.contains(Egid::new(1, 7), Health::component_type_id()));
        assert!(current.contains(Egid::new(2, 7), Health::component_type_id()));

        buffers.clear_other();
        assert!(buffers.other().is_empty());
        assert_eq!(buffers.current().entity_count(), 1);
    }

    #[test]
    fn test_split_mut_after_even_swaps() {
        let mut buffers = DoubleBufferedEntities::new();
        buffers.swap();
        buffers.swap();
        stage(buffers.current_mut(), 5, 1);
        let (other, current) = buffers.split_mut();
        assert!(other.is_empty());
        assert_eq!(current.entity_count(), 1);
    }

    #[test]
    fn test_duplicate_stage_is_rejected() {
        let mut batch = StagedBatch::new();
        stage(&mut batch, 1, 7);
        let err = batch
            .stage_boxed(
                Egid::new(1, 7),
                Health::component_type_id(),
                Box::new(Health(9)),
                health_container,
            )
            .unwrap_err();
        assert_eq!(
            err,
            ContainerError::DuplicateEntity {
                entity: EntityId(1),
                component: "Health"
            }
        );
    }
}
