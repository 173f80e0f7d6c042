//! The committed, group-indexed component database.
//!
//! Storage is partitioned by group first, then by component type; each leaf
//! is an id-indexed container. Alongside it lives the [`TypeIndex`], and every
//! mutation below updates both so that a (type, group) pair is indexed if and
//! only if the group holds a non-empty container of that type.
//!
//! Every component type id maps to one concrete container type for the life
//! of the database. A staged container of a different Rust type that happens
//! to share the component name is rejected before anything merges.
//!
//! Collaborators only read from here. Mutation happens through a submission
//! pass, which applies queued operations and merges staged batches.

use std::any::TypeId;
use std::collections::HashMap;

use groupdb_component::{
    Component, ComponentTypeId, ContainerError, Egid, EntityDescriptor, EntityId, GroupId,
    IndexedContainer, TypeSafeContainer,
};
use tracing::debug;

use crate::error::{OperationError, SubmissionError};
use crate::operation::Operation;
use crate::staging::StagedBatch;
use crate::type_index::TypeIndex;

type GroupContainers = HashMap<ComponentTypeId, Box<dyn TypeSafeContainer>>;

/// Concrete container type and component name claimed by a component type id.
type ContainerKind = (TypeId, &'static str);

/// A (group, type) container that received entities during a merge, with
/// the ids it received.
#[derive(Debug, Clone)]
pub(crate) struct MergedContainer {
    pub group: GroupId,
    pub type_id: ComponentTypeId,
    pub ids: Vec<EntityId>,
}

/// Group → component type → id-indexed container, plus the type index.
#[derive(Default)]
pub struct EntityDatabase {
    groups: HashMap<GroupId, GroupContainers>,
    type_index: TypeIndex,
    kinds: HashMap<ComponentTypeId, ContainerKind>,
}

impl EntityDatabase {
    /// Create an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Queries --

    /// All components of type `T` in `group`.
    #[must_use]
    pub fn entities<T: Component>(&self, group: GroupId) -> Option<&IndexedContainer<T>> {
        self.container(group, T::component_type_id())?.downcast_ref::<T>()
    }

    /// The `T` component of one entity.
    #[must_use]
    pub fn entity<T: Component>(&self, egid: Egid) -> Option<&T> {
        self.entities::<T>(egid.group)?.get(egid.entity)
    }

    /// Returns `true` if the entity has a committed `T` component.
    #[must_use]
    pub fn exists<T: Component>(&self, egid: Egid) -> bool {
        self.entity::<T>(egid).is_some()
    }

    /// Number of `T` components in `group`.
    #[must_use]
    pub fn count<T: Component>(&self, group: GroupId) -> usize {
        self.container(group, T::component_type_id())
            .map_or(0, |c| c.len())
    }

    /// Every group holding `T` components, with its container, via the type
    /// index.
    pub fn groups_with<T: Component>(
        &self,
    ) -> impl Iterator<Item = (GroupId, &IndexedContainer<T>)> + '_ {
        self.type_index
            .groups(T::component_type_id())
            .filter_map(move |group| self.entities::<T>(group).map(|c| (group, c)))
    }

    /// Groups holding components of `type_id`, in ascending order.
    pub fn groups_with_type(&self, type_id: ComponentTypeId) -> impl Iterator<Item = GroupId> + '_ {
        self.type_index.groups(type_id)
    }

    /// The type-erased container for (`group`, `type_id`).
    #[must_use]
    pub fn container(&self, group: GroupId, type_id: ComponentTypeId) -> Option<&dyn TypeSafeContainer> {
        self.groups.get(&group)?.get(&type_id).map(|c| c.as_ref())
    }

    /// Returns `true` if the group exists (it may hold only empty containers).
    #[must_use]
    pub fn has_group(&self, group: GroupId) -> bool {
        self.groups.contains_key(&group)
    }

    /// Number of groups, including ones whose containers are all empty.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Ids of all groups, in no particular order.
    pub fn group_ids(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.groups.keys().copied()
    }

    /// Number of containers in `group`.
    #[must_use]
    pub fn container_count(&self, group: GroupId) -> usize {
        self.groups.get(&group).map_or(0, HashMap::len)
    }

    /// The type index.
    #[must_use]
    pub fn type_index(&self) -> &TypeIndex {
        &self.type_index
    }

    /// Returns `false` if another Rust type has already been merged under
    /// `T`'s component type id.
    #[must_use]
    pub fn accepts<T: Component>(&self) -> bool {
        self.kinds
            .get(&T::component_type_id())
            .is_none_or(|&(kind, _)| kind == TypeId::of::<IndexedContainer<T>>())
    }

    // -- Operations --

    /// Apply one structural operation. Validation runs before any mutation,
    /// so a failed operation leaves the database unchanged.
    pub(crate) fn apply(&mut self, operation: &Operation) -> Result<(), OperationError> {
        match operation {
            Operation::Swap {
                descriptor,
                entity,
                from,
                to,
            } => self.swap_entity(descriptor, *entity, *from, *to),
            Operation::Remove { descriptor, egid } => self.remove_entity(descriptor, *egid),
            Operation::RemoveGroup { group } => self.remove_group(*group),
        }
    }

    fn swap_entity(
        &mut self,
        descriptor: &EntityDescriptor,
        entity: EntityId,
        from: GroupId,
        to: GroupId,
    ) -> Result<(), OperationError> {
        self.check_present(descriptor, Egid { entity, group: from })?;
        if from == to {
            return Ok(());
        }
        if let Some(destination) = self.groups.get(&to) {
            for type_id in descriptor.iter() {
                let Some(container) = destination.get(&type_id) else {
                    continue;
                };
                if container.contains(entity) {
                    return Err(OperationError::DestinationOccupied {
                        egid: Egid { entity, group: to },
                        component: container.component_name(),
                    });
                }
                if let Some(source) = self.container(from, type_id)
                    && source.as_any().type_id() != container.as_any().type_id()
                {
                    return Err(ContainerError::ContainerMismatch {
                        expected: container.component_name(),
                        found: source.component_name(),
                    }
                    .into());
                }
            }
        }

        for type_id in descriptor.iter() {
            let source = self
                .groups
                .get_mut(&from)
                .and_then(|types| types.get_mut(&type_id))
                .ok_or(OperationError::EntityNotFound {
                    egid: Egid { entity, group: from },
                    component: type_id,
                })?;
            let value = source.take_boxed(entity).ok_or(OperationError::EntityNotFound {
                egid: Egid { entity, group: from },
                component: type_id,
            })?;
            let template = source.create_empty();
            if source.is_empty() {
                self.type_index.remove(type_id, from);
            }

            self.groups
                .entry(to)
                .or_default()
                .entry(type_id)
                .or_insert(template)
                .insert_boxed(entity, value)?;
            self.type_index.insert(type_id, to);
        }

        debug!(entity = entity.raw(), %from, %to, types = descriptor.len(), "swapped entity");
        Ok(())
    }

    fn remove_entity(&mut self, descriptor: &EntityDescriptor, egid: Egid) -> Result<(), OperationError> {
        self.check_present(descriptor, egid)?;

        for type_id in descriptor.iter() {
            let container = self
                .groups
                .get_mut(&egid.group)
                .and_then(|types| types.get_mut(&type_id))
                .ok_or(OperationError::EntityNotFound {
                    egid,
                    component: type_id,
                })?;
            container.remove_entity(egid.entity);
            if container.is_empty() {
                self.type_index.remove(type_id, egid.group);
            }
        }

        debug!(%egid, types = descriptor.len(), "removed entity");
        Ok(())
    }

    fn remove_group(&mut self, group: GroupId) -> Result<(), OperationError> {
        let containers = self
            .groups
            .remove(&group)
            .ok_or(OperationError::GroupNotFound { group })?;
        for type_id in containers.keys() {
            self.type_index.remove(*type_id, group);
        }

        debug!(%group, containers = containers.len(), "removed group");
        Ok(())
    }

    /// Every descriptor type must hold the entity.
    fn check_present(&self, descriptor: &EntityDescriptor, egid: Egid) -> Result<(), OperationError> {
        if descriptor.is_empty() {
            return Err(OperationError::EmptyDescriptor);
        }
        let types = self
            .groups
            .get(&egid.group)
            .ok_or(OperationError::GroupNotFound { group: egid.group })?;
        for type_id in descriptor.iter() {
            if !types.get(&type_id).is_some_and(|c| c.contains(egid.entity)) {
                return Err(OperationError::EntityNotFound {
                    egid,
                    component: type_id,
                });
            }
        }
        Ok(())
    }

    // -- Merge --

    /// Move every staged component of `batch` into the database.
    ///
    /// The whole batch is checked before anything moves: no staged id may
    /// already be committed, and every container must be of the concrete
    /// type its component type id is bound to. On success `batch` is left
    /// empty (allocations kept) and the touched containers are returned in
    /// merge order.
    pub(crate) fn merge_batch(
        &mut self,
        batch: &mut StagedBatch,
    ) -> Result<Vec<MergedContainer>, SubmissionError> {
        let mut claimed: HashMap<ComponentTypeId, ContainerKind> = HashMap::new();
        for (group, staged) in batch.containers() {
            let type_id = staged.component_type();
            let kind = (staged.as_any().type_id(), staged.component_name());
            match self.kinds.get(&type_id).or_else(|| claimed.get(&type_id)) {
                Some(&(owner, expected)) if owner != kind.0 => {
                    return Err(ContainerError::ContainerMismatch {
                        expected,
                        found: kind.1,
                    }
                    .into());
                }
                Some(_) => {}
                None => {
                    claimed.insert(type_id, kind);
                }
            }

            let Some(committed) = self.container(group, type_id) else {
                continue;
            };
            if let Some(&clash) = staged.entity_ids().iter().find(|&&id| committed.contains(id)) {
                return Err(SubmissionError::DuplicateEntity {
                    egid: Egid { entity: clash, group },
                    component: staged.component_name(),
                });
            }
        }
        self.kinds.extend(claimed);

        let mut merged = Vec::new();
        for (group, type_id, staged) in batch.containers_mut() {
            if staged.is_empty() {
                continue;
            }
            let ids = staged.entity_ids().to_vec();
            let container = self
                .groups
                .entry(group)
                .or_default()
                .entry(type_id)
                .or_insert_with(|| staged.create_empty());
            container.fill_from(&mut **staged)?;
            self.type_index.insert(type_id, group);
            merged.push(MergedContainer { group, type_id, ids });
        }
        Ok(merged)
    }
}

impl std::fmt::Debug for EntityDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityDatabase")
            .field("groups", &self.groups.len())
            .field("indexed_types", &self.type_index.type_count())
            .finish()
    }
}
