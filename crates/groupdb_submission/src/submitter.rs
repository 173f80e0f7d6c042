//! The builder interface: how collaborators request changes.
//!
//! A [`Submitter`] borrows the writable staging side and the operation log.
//! It is handed out by [`EntitiesRoot::submitter`](crate::EntitiesRoot::submitter)
//! between passes and by [`EngineContext::submitter`](crate::EngineContext::submitter)
//! during notifications. Nothing it does touches committed data.

use std::any::Any;
use std::collections::BTreeSet;

use groupdb_component::{
    Component, ComponentTypeId, ContainerError, Egid, EntityDescriptor, EntityId, GroupId, IndexedContainer,
    TypeSafeContainer,
};

use crate::error::BuildError;
use crate::operation::{Operation, OperationLog};
use crate::staging::StagedBatch;

/// Factory for an empty container of `T`, used when a (group, type) pair is
/// staged for the first time.
pub(crate) fn empty_container<T: Component>() -> Box<dyn TypeSafeContainer> {
    Box::new(IndexedContainer::<T>::new())
}

/// Stages new entities and enqueues structural operations.
#[derive(Debug)]
pub struct Submitter<'a> {
    staging: &'a mut StagedBatch,
    operations: &'a mut OperationLog,
}

impl<'a> Submitter<'a> {
    pub(crate) fn new(staging: &'a mut StagedBatch, operations: &'a mut OperationLog) -> Self {
        Self {
            staging,
            operations,
        }
    }

    /// Start building a new entity at `egid`. Nothing is staged until
    /// [`EntityBuilder::build`] succeeds.
    pub fn build_entity(&mut self, egid: Egid) -> EntityBuilder<'_> {
        EntityBuilder {
            staging: &mut *self.staging,
            egid,
            components: Vec::new(),
        }
    }

    /// Stage a single-component entity.
    ///
    /// # Errors
    ///
    /// See [`EntityBuilder::build`].
    pub fn stage_new_entity<T: Component>(&mut self, egid: Egid, component: T) -> Result<Egid, BuildError> {
        self.build_entity(egid).with(component).build()
    }

    /// Request moving an entity from `from` to `to`, keeping its id.
    #[track_caller]
    pub fn enqueue_swap(&mut self, descriptor: EntityDescriptor, entity: EntityId, from: GroupId, to: GroupId) {
        self.operations.enqueue(Operation::Swap {
            descriptor,
            entity,
            from,
            to,
        });
    }

    /// Request deleting an entity's components.
    #[track_caller]
    pub fn enqueue_remove(&mut self, descriptor: EntityDescriptor, egid: Egid) {
        self.operations.enqueue(Operation::Remove { descriptor, egid });
    }

    /// Request deleting a whole group.
    #[track_caller]
    pub fn enqueue_remove_group(&mut self, group: GroupId) {
        self.operations.enqueue(Operation::RemoveGroup { group });
    }

    /// Entities staged on the writable side so far.
    #[must_use]
    pub fn staged_entities(&self) -> usize {
        self.staging.entity_count()
    }

    /// Operations waiting for the next pass.
    #[must_use]
    pub fn pending_operations(&self) -> usize {
        self.operations.len()
    }
}

struct PendingComponent {
    type_id: ComponentTypeId,
    name: &'static str,
    container_type: std::any::TypeId,
    value: Box<dyn Any>,
    make_container: fn() -> Box<dyn TypeSafeContainer>,
}

/// Collects the components of one new entity.
pub struct EntityBuilder<'s> {
    staging: &'s mut StagedBatch,
    egid: Egid,
    components: Vec<PendingComponent>,
}

impl EntityBuilder<'_> {
    /// Add a component.
    #[must_use]
    pub fn with<T: Component>(mut self, component: T) -> Self {
        self.components.push(PendingComponent {
            type_id: T::component_type_id(),
            name: T::type_name(),
            container_type: std::any::TypeId::of::<IndexedContainer<T>>(),
            value: Box::new(component),
            make_container: empty_container::<T>,
        });
        self
    }

    /// The component types added so far.
    #[must_use]
    pub fn descriptor(&self) -> EntityDescriptor {
        self.components.iter().map(|c| c.type_id).collect()
    }

    /// Validate and stage the entity, returning its address.
    ///
    /// # Errors
    ///
    /// - [`BuildError::Empty`] if no component was added.
    /// - [`BuildError::DuplicateComponent`] if a type was added twice.
    /// - [`BuildError::AlreadyStaged`] if the entity was already staged.
    /// - [`BuildError::Container`] if a component's name is shared with a
    ///   different type already staged in the group.
    ///
    /// Nothing is staged on error.
    pub fn build(self) -> Result<Egid, BuildError> {
        let egid = self.egid;
        if self.components.is_empty() {
            return Err(BuildError::Empty { egid });
        }

        let mut seen = BTreeSet::new();
        for component in &self.components {
            if !seen.insert(component.type_id) {
                return Err(BuildError::DuplicateComponent {
                    egid,
                    component: component.name,
                });
            }
            if self.staging.contains(egid, component.type_id) {
                return Err(BuildError::AlreadyStaged {
                    egid,
                    component: component.name,
                });
            }
            if let Some(existing) = self.staging.container(egid.group, component.type_id)
                && existing.as_any().type_id() != component.container_type
            {
                return Err(BuildError::Container(ContainerError::ContainerMismatch {
                    expected: existing.component_name(),
                    found: component.name,
                }));
            }
        }

        for component in self.components {
            self.staging
                .stage_boxed(egid, component.type_id, component.value, component.make_container)?;
        }
        self.staging.mark_entity_built();
        Ok(egid)
    }
}
