//! Entity descriptors.
//!
//! A descriptor is the set of component types an entity was built with. Swap
//! and remove operations carry one so the database knows which per-type
//! containers of a group hold the entity, without scanning every container.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentTypeId};

/// The sorted set of component types that make up an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityDescriptor {
    component_types: BTreeSet<ComponentTypeId>,
}

impl EntityDescriptor {
    /// Create an empty descriptor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            component_types: BTreeSet::new(),
        }
    }

    /// Add component type `T` to the descriptor.
    #[must_use]
    pub fn with<T: Component>(mut self) -> Self {
        self.component_types.insert(T::component_type_id());
        self
    }

    /// Add a component type by id.
    #[must_use]
    pub fn with_type(mut self, type_id: ComponentTypeId) -> Self {
        self.component_types.insert(type_id);
        self
    }

    /// Returns `true` if the descriptor contains the given component type.
    #[must_use]
    pub fn contains(&self, type_id: ComponentTypeId) -> bool {
        self.component_types.contains(&type_id)
    }

    /// Iterate over the component types in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentTypeId> + '_ {
        self.component_types.iter().copied()
    }

    /// Number of component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.component_types.len()
    }

    /// Returns `true` if the descriptor names no component types.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.component_types.is_empty()
    }
}

impl FromIterator<ComponentTypeId> for EntityDescriptor {
    fn from_iter<I: IntoIterator<Item = ComponentTypeId>>(iter: I) -> Self {
        Self {
            component_types: iter.into_iter().collect(),
        }
    }
}
