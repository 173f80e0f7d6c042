//! Id-indexed component containers.
//!
//! An [`IndexedContainer<T>`] holds every `T` of one group. Values are stored
//! densely so "all components of type T in group G" is a slice, and a side
//! index maps each [`EntityId`] to its slot so "component of type T for
//! entity E" is a single lookup. Removal is a swap-remove that patches the
//! index of the moved element.
//!
//! The database stores containers of many component types side by side, so it
//! works with them through the object-safe [`TypeSafeContainer`] trait and
//! only downcasts back to `IndexedContainer<T>` when a typed caller asks.

use std::any::Any;
use std::collections::HashMap;

use crate::component::{Component, ComponentTypeId};
use crate::entity::EntityId;
use crate::error::ContainerError;

/// Dense storage of one component type, indexed by entity id.
#[derive(Debug, Clone)]
pub struct IndexedContainer<T> {
    /// `ids[i]` owns `values[i]`.
    ids: Vec<EntityId>,
    values: Vec<T>,
    /// Entity id to slot in `ids`/`values`.
    slots: HashMap<EntityId, usize>,
}

impl<T> Default for IndexedContainer<T> {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            values: Vec::new(),
            slots: HashMap::new(),
        }
    }
}

impl<T: Component> IndexedContainer<T> {
    /// Create an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of components stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the container holds no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns `true` if a component exists for `id`.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Insert a component for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::DuplicateEntity`] if `id` is already present;
    /// the existing value is left untouched.
    pub fn insert(&mut self, id: EntityId, value: T) -> Result<(), ContainerError> {
        if self.slots.contains_key(&id) {
            return Err(ContainerError::DuplicateEntity {
                entity: id,
                component: T::type_name(),
            });
        }
        self.slots.insert(id, self.values.len());
        self.ids.push(id);
        self.values.push(value);
        Ok(())
    }

    /// Get the component for `id`.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.slots.get(&id).map(|&slot| &self.values[slot])
    }

    /// Get the component for `id` mutably.
    #[must_use]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        match self.slots.get(&id) {
            Some(&slot) => Some(&mut self.values[slot]),
            None => None,
        }
    }

    /// Remove and return the component for `id`.
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        let slot = self.slots.remove(&id)?;
        self.ids.swap_remove(slot);
        let value = self.values.swap_remove(slot);
        // The former last element now lives in `slot`.
        if let Some(&moved) = self.ids.get(slot) {
            self.slots.insert(moved, slot);
        }
        Some(value)
    }

    /// Entity ids in storage order.
    #[must_use]
    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    /// Components in storage order, parallel to [`IndexedContainer::ids`].
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Components in storage order, mutably.
    #[must_use]
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Iterate over `(id, component)` pairs in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.ids.iter().copied().zip(self.values.iter())
    }

    /// Remove everything, keeping the allocations.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.values.clear();
        self.slots.clear();
    }

    /// Move every entry of `source` into `self`, leaving `source` empty but
    /// with its allocations intact.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::DuplicateEntity`] if any id of `source` is
    /// already present. The check runs before anything moves, so on error
    /// both containers are unchanged.
    pub fn fill(&mut self, source: &mut IndexedContainer<T>) -> Result<usize, ContainerError> {
        if let Some(&clash) = source.ids.iter().find(|id| self.slots.contains_key(id)) {
            return Err(ContainerError::DuplicateEntity {
                entity: clash,
                component: T::type_name(),
            });
        }

        let moved = source.len();
        self.ids.reserve(moved);
        self.values.reserve(moved);
        for (id, value) in source.ids.drain(..).zip(source.values.drain(..)) {
            self.slots.insert(id, self.values.len());
            self.ids.push(id);
            self.values.push(value);
        }
        source.slots.clear();
        Ok(moved)
    }
}

/// The capability set the database needs from a container without knowing
/// its component type.
pub trait TypeSafeContainer: Any {
    /// Component type stored in this container.
    fn component_type(&self) -> ComponentTypeId;

    /// Name of the stored component type.
    fn component_name(&self) -> &'static str;

    /// Number of components stored.
    fn len(&self) -> usize;

    /// Returns `true` if no components are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if a component exists for `id`.
    fn contains(&self, id: EntityId) -> bool;

    /// Entity ids in storage order.
    fn entity_ids(&self) -> &[EntityId];

    /// Create an empty container of the same concrete type.
    fn create_empty(&self) -> Box<dyn TypeSafeContainer>;

    /// Move every entry of `source` into this container.
    ///
    /// # Errors
    ///
    /// Fails without moving anything if `source` stores another component
    /// type or shares an entity id with this container.
    fn fill_from(&mut self, source: &mut dyn TypeSafeContainer) -> Result<usize, ContainerError>;

    /// Remove the component for `id`, returning it type-erased.
    fn take_boxed(&mut self, id: EntityId) -> Option<Box<dyn Any>>;

    /// Insert a type-erased component for `id`.
    ///
    /// # Errors
    ///
    /// Fails if the value is of the wrong type or `id` is already present.
    fn insert_boxed(&mut self, id: EntityId, value: Box<dyn Any>) -> Result<(), ContainerError>;

    /// Remove the component for `id`. Returns `true` if it existed.
    fn remove_entity(&mut self, id: EntityId) -> bool;

    /// Remove everything, keeping the allocations.
    fn clear(&mut self);

    /// Upcast for downcasting to the concrete container.
    fn as_any(&self) -> &dyn Any;

    /// Upcast for downcasting to the concrete container, mutably.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> TypeSafeContainer for IndexedContainer<T> {
    fn component_type(&self) -> ComponentTypeId {
        T::component_type_id()
    }

    fn component_name(&self) -> &'static str {
        T::type_name()
    }

    fn len(&self) -> usize {
        IndexedContainer::len(self)
    }

    fn contains(&self, id: EntityId) -> bool {
        IndexedContainer::contains(self, id)
    }

    fn entity_ids(&self) -> &[EntityId] {
        self.ids()
    }

    fn create_empty(&self) -> Box<dyn TypeSafeContainer> {
        Box::new(IndexedContainer::<T>::new())
    }

    fn fill_from(&mut self, source: &mut dyn TypeSafeContainer) -> Result<usize, ContainerError> {
        let found = source.component_name();
        let source = source
            .as_any_mut()
            .downcast_mut::<IndexedContainer<T>>()
            .ok_or(ContainerError::ContainerMismatch {
                expected: T::type_name(),
                found,
            })?;
        self.fill(source)
    }

    fn take_boxed(&mut self, id: EntityId) -> Option<Box<dyn Any>> {
        self.remove(id).map(|value| Box::new(value) as Box<dyn Any>)
    }

    fn insert_boxed(&mut self, id: EntityId, value: Box<dyn Any>) -> Result<(), ContainerError> {
        let value = value.downcast::<T>().map_err(|_| ContainerError::TypeMismatch {
            expected: T::type_name(),
        })?;
        self.insert(id, *value)
    }

    fn remove_entity(&mut self, id: EntityId) -> bool {
        self.remove(id).is_some()
    }

    fn clear(&mut self) {
        IndexedContainer::clear(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl dyn TypeSafeContainer + '_ {
    /// Downcast to the concrete container for component type `T`.
    #[must_use]
    pub fn downcast_ref<T: Component>(&self) -> Option<&IndexedContainer<T>> {
        self.as_any().downcast_ref::<IndexedContainer<T>>()
    }

    /// Downcast to the concrete container for component type `T`, mutably.
    #[must_use]
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut IndexedContainer<T>> {
        self.as_any_mut().downcast_mut::<IndexedContainer<T>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Health(u32);
    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Speed(f32);
    impl Component for Speed {
        fn type_name() -> &'static str {
            "Speed"
        }
    }

    fn filled(ids: &[u32]) -> IndexedContainer<Health> {
        let mut c = IndexedContainer::new();
        for &id in ids {
            c.insert(EntityId(id), Health(id * 10)).unwrap();
        }
        c
    }

    #[test]
    fn test_insert_and_get() {
        let c = filled(&[1, 5]);
        assert_eq!(c.len(), 2);
        assert_eq!(c.get(EntityId(5)), Some(&Health(50)));
        assert_eq!(c.get(EntityId(2)), None);
    }

    #[test]
    fn test_duplicate_insert_is_rejected() {
        let mut c = filled(&[1]);
        let err = c.insert(EntityId(1), Health(99)).unwrap_err();
        assert_eq!(
            err,
            ContainerError::DuplicateEntity {
                entity: EntityId(1),
                component: "Health"
            }
        );
        assert_eq!(c.get(EntityId(1)), Some(&Health(10)));
    }

    #[test]
    fn test_remove_patches_moved_slot() {
        let mut c = filled(&[1, 2, 3]);
        assert_eq!(c.remove(EntityId(1)), Some(Health(10)));
        // 3 was swapped into the freed slot and must still be addressable.
        assert_eq!(c.get(EntityId(3)), Some(&Health(30)));
        assert_eq!(c.get(EntityId(2)), Some(&Health(20)));
        assert_eq!(c.len(), 2);
        assert_eq!(c.remove(EntityId(1)), None);
    }

    #[test]
    fn test_remove_last() {
        let mut c = filled(&[4]);
        assert_eq!(c.remove(EntityId(4)), Some(Health(40)));
        assert!(c.is_empty());
    }

    #[test]
    fn test_fill_moves_and_empties_source() {
        let mut db = filled(&[1]);
        let mut staged = filled(&[2, 3]);
        assert_eq!(db.fill(&mut staged).unwrap(), 2);
        assert_eq!(db.len(), 3);
        assert!(staged.is_empty());
        assert_eq!(db.get(EntityId(3)), Some(&Health(30)));
    }

    #[test]
    fn test_fill_with_clash_changes_nothing() {
        let mut db = filled(&[1, 2]);
        let mut staged = filled(&[3, 2]);
        assert!(db.fill(&mut staged).is_err());
        assert_eq!(db.len(), 2);
        assert_eq!(staged.len(), 2);
        assert!(!db.contains(EntityId(3)));
    }

    #[test]
    fn test_type_erased_fill_rejects_other_type() {
        let mut health: Box<dyn TypeSafeContainer> = Box::new(filled(&[1]));
        let mut speed = IndexedContainer::<Speed>::new();
        speed.insert(EntityId(2), Speed(1.0)).unwrap();
        let err = health.fill_from(&mut speed).unwrap_err();
        assert_eq!(
            err,
            ContainerError::ContainerMismatch {
                expected: "Health",
                found: "Speed"
            }
        );
    }

    #[test]
    fn test_create_empty_has_same_type() {
        let health: Box<dyn TypeSafeContainer> = Box::new(filled(&[1]));
        let empty = health.create_empty();
        assert!(empty.is_empty());
        assert_eq!(empty.component_type(), Health::component_type_id());
        assert!(empty.downcast_ref::<Health>().is_some());
        assert!(empty.downcast_ref::<Speed>().is_none());
    }

    #[test]
    fn test_boxed_move_between_containers() {
        let mut from: Box<dyn TypeSafeContainer> = Box::new(filled(&[7]));
        let mut to = from.create_empty();
        let value = from.take_boxed(EntityId(7)).unwrap();
        to.insert_boxed(EntityId(7), value).unwrap();
        assert!(!from.contains(EntityId(7)));
        assert_eq!(
            to.downcast_ref::<Health>().unwrap().get(EntityId(7)),
            Some(&Health(70))
        );
    }

    #[test]
    fn test_insert_boxed_wrong_type() {
        let mut c: Box<dyn TypeSafeContainer> = Box::new(filled(&[]));
        let err = c.insert_boxed(EntityId(1), Box::new(Speed(2.0))).unwrap_err();
        assert_eq!(err, ContainerError::TypeMismatch { expected: "Health" });
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut c = filled(&[1, 2, 3]);
        let capacity = c.values().len();
        c.clear();
        assert!(c.is_empty());
        assert!(c.values.capacity() >= capacity);
    }
}
