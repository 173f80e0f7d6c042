//! Engines: consumers notified of newly committed components.
//!
//! An engine implements [`ReactOnAdd<T>`] for every component type it cares
//! about and is registered once per type with the [`EngineRegistry`]. After a
//! staged batch is fully merged, each merged component is handed to every
//! engine registered for its type, in registration order.
//!
//! Inside a notification the engine sees the committed database (already
//! holding the whole batch) and a [`Submitter`] through which it may stage
//! further entities or enqueue operations. Those land in the next loop
//! iteration or the next pass respectively.

use std::any::Any;
use std::collections::HashMap;

use groupdb_component::{
    Component, ComponentTypeId, ContainerError, Egid, EntityId, GroupId, TypeSafeContainer,
};

use crate::database::EntityDatabase;
use crate::error::RegistryError;
use crate::staging::StagedBatch;
use crate::submitter::Submitter;

/// Reaction to components of type `T` being committed.
pub trait ReactOnAdd<T: Component>: 'static {
    /// Called once per committed `T` component, after its whole batch merged.
    fn add(&mut self, egid: Egid, component: &T, ctx: &mut EngineContext<'_>);

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// What an engine can reach while being notified.
pub struct EngineContext<'a> {
    database: &'a EntityDatabase,
    submitter: Submitter<'a>,
    generation: u32,
}

impl<'a> EngineContext<'a> {
    pub(crate) fn new(database: &'a EntityDatabase, submitter: Submitter<'a>, generation: u32) -> Self {
        Self {
            database,
            submitter,
            generation,
        }
    }

    /// The committed database, read-only.
    #[must_use]
    pub fn database(&self) -> &EntityDatabase {
        self.database
    }

    /// Stage entities or enqueue operations from inside the callback.
    pub fn submitter(&mut self) -> &mut Submitter<'a> {
        &mut self.submitter
    }

    /// Loop iteration of the current pass: 0 for entities staged before the
    /// pass, n for entities staged by callbacks of iteration n - 1.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Engines of one component type behind a type-erased face.
trait ErasedEngines {
    fn len(&self) -> usize;

    /// Returns `true` if `container` holds the component type these engines
    /// were registered for.
    fn accepts(&self, container: &dyn TypeSafeContainer) -> bool;

    /// Notify every engine about each of `ids`, read from `container`.
    /// Returns the number of `add` calls made.
    fn notify_added(
        &mut self,
        container: &dyn TypeSafeContainer,
        group: GroupId,
        ids: &[EntityId],
        ctx: &mut EngineContext<'_>,
    ) -> Result<usize, ContainerError>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct TypedEngines<T: Component> {
    engines: Vec<Box<dyn ReactOnAdd<T>>>,
}

impl<T: Component> ErasedEngines for TypedEngines<T> {
    fn len(&self) -> usize {
        self.engines.len()
    }

    fn accepts(&self, container: &dyn TypeSafeContainer) -> bool {
        container.downcast_ref::<T>().is_some()
    }

    fn notify_added(
        &mut self,
        container: &dyn TypeSafeContainer,
        group: GroupId,
        ids: &[EntityId],
        ctx: &mut EngineContext<'_>,
    ) -> Result<usize, ContainerError> {
        let container = container
            .downcast_ref::<T>()
            .ok_or(ContainerError::ContainerMismatch {
                expected: T::type_name(),
                found: container.component_name(),
            })?;

        let mut calls = 0;
        for &id in ids {
            let Some(component) = container.get(id) else {
                continue;
            };
            let egid = Egid { entity: id, group };
            for engine in &mut self.engines {
                engine.add(egid, component, ctx);
                calls += 1;
            }
        }
        Ok(calls)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Engines keyed by the component type they react to.
#[derive(Default)]
pub struct EngineRegistry {
    by_type: HashMap<ComponentTypeId, Box<dyn ErasedEngines>>,
}

impl EngineRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `engine` for component type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TypeNameCollision`] if another Rust type with
    /// the same component type name already has engines registered.
    pub fn register<T, E>(&mut self, engine: E) -> Result<(), RegistryError>
    where
        T: Component,
        E: ReactOnAdd<T>,
    {
        let entry = self
            .by_type
            .entry(T::component_type_id())
            .or_insert_with(|| Box::new(TypedEngines::<T> { engines: Vec::new() }));
        let typed = entry
            .as_any_mut()
            .downcast_mut::<TypedEngines<T>>()
            .ok_or(RegistryError::TypeNameCollision {
                name: T::type_name(),
            })?;
        typed.engines.push(Box::new(engine));
        Ok(())
    }

    /// Number of engines registered for `type_id`.
    #[must_use]
    pub fn engine_count(&self, type_id: ComponentTypeId) -> usize {
        self.by_type.get(&type_id).map_or(0, |engines| engines.len())
    }

    /// Number of engines across all types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_type.values().map(|engines| engines.len()).sum()
    }

    /// Returns `true` if no engine is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that every container of `batch` can be handed to the engines
    /// registered under its component type id.
    pub(crate) fn check_batch(&self, batch: &StagedBatch) -> Result<(), ContainerError> {
        for (_, staged) in batch.containers() {
            if let Some(engines) = self.by_type.get(&staged.component_type())
                && !engines.accepts(staged)
            {
                return Err(ContainerError::ContainerMismatch {
                    expected: staged.component_name(),
                    found: staged.component_name(),
                });
            }
        }
        Ok(())
    }

    /// Notify the engines of `container`'s type about `ids`.
    pub(crate) fn notify_added(
        &mut self,
        container: &dyn TypeSafeContainer,
        group: GroupId,
        ids: &[EntityId],
        ctx: &mut EngineContext<'_>,
    ) -> Result<usize, ContainerError> {
        match self.by_type.get_mut(&container.component_type()) {
            Some(engines) => engines.notify_added(container, group, ids, ctx),
            None => Ok(0),
        }
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("types", &self.by_type.len())
            .field("engines", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use groupdb_component::IndexedContainer;

    use super::*;
    use crate::operation::OperationLog;
    use crate::submitter::empty_container;

    #[derive(Debug, PartialEq)]
    struct Health(u32);
    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    mod shadow {
        use groupdb_component::Component;

        /// Same component name as the outer `Health`, different type.
        pub struct Health;
        impl Component for Health {
            fn type_name() -> &'static str {
                "Health"
            }
        }
    }

    struct Recorder {
        tag: &'static str,
        seen: Rc<RefCell<Vec<(&'static str, Egid, u32)>>>,
    }

    impl ReactOnAdd<Health> for Recorder {
        fn add(&mut self, egid: Egid, component: &Health, _ctx: &mut EngineContext<'_>) {
            self.seen.borrow_mut().push((self.tag, egid, component.0));
        }
    }

    struct Ignore;
    impl ReactOnAdd<shadow::Health> for Ignore {
        fn add(&mut self, _: Egid, _: &shadow::Health, _: &mut EngineContext<'_>) {}
    }

    #[test]
    fn test_engines_notified_in_registration_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut registry = EngineRegistry::new();
        for tag in ["first", "second"] {
            registry
                .register::<Health, _>(Recorder {
                    tag,
                    seen: Rc::clone(&seen),
                })
                .unwrap();
        }
        assert_eq!(registry.engine_count(Health::component_type_id()), 2);

        let mut container = IndexedContainer::new();
        container.insert(EntityId(1), Health(10)).unwrap();
        container.insert(EntityId(2), Health(20)).unwrap();

        let database = EntityDatabase::new();
        let mut staging = StagedBatch::new();
        let mut operations = OperationLog::new();
        let mut ctx = EngineContext::new(&database, Submitter::new(&mut staging, &mut operations), 0);
        let calls = registry
            .notify_added(&container, GroupId(4), &[EntityId(2), EntityId(1)], &mut ctx)
            .unwrap();

        assert_eq!(calls, 4);
        assert_eq!(
            *seen.borrow(),
            vec![
                ("first", Egid::new(2, 4), 20),
                ("second", Egid::new(2, 4), 20),
                ("first", Egid::new(1, 4), 10),
                ("second", Egid::new(1, 4), 10),
            ]
        );
    }

    #[test]
    fn test_unregistered_type_is_not_notified() {
        let mut registry = EngineRegistry::new();
        let mut container = IndexedContainer::new();
        container.insert(EntityId(1), Health(10)).unwrap();

        let database = EntityDatabase::new();
        let mut staging = StagedBatch::new();
        let mut operations = OperationLog::new();
        let mut ctx = EngineContext::new(&database, Submitter::new(&mut staging, &mut operations), 0);
        let calls = registry
            .notify_added(&container, GroupId(1), &[EntityId(1)], &mut ctx)
            .unwrap();
        assert_eq!(calls, 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_type_name_collision_is_rejected() {
        let mut registry = EngineRegistry::new();
        registry
            .register::<Health, _>(Recorder {
                tag: "health",
                seen: Rc::default(),
            })
            .unwrap();
        let err = registry.register::<shadow::Health, _>(Ignore).unwrap_err();
        assert_eq!(err, RegistryError::TypeNameCollision { name: "Health" });
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_batch_with_same_name_type_is_refused() {
        let mut registry = EngineRegistry::new();
        registry
            .register::<Health, _>(Recorder {
                tag: "health",
                seen: Rc::default(),
            })
            .unwrap();

        let mut batch = StagedBatch::new();
        batch
            .stage_boxed(
                Egid::new(1, 1),
                shadow::Health::component_type_id(),
                Box::new(shadow::Health),
                empty_container::<shadow::Health>,
            )
            .unwrap();
        assert!(matches!(
            registry.check_batch(&batch),
            Err(ContainerError::ContainerMismatch { .. })
        ));

        let mut batch = StagedBatch::new();
        batch
            .stage_boxed(Egid::new(1, 1), Health::component_type_id(), Box::new(Health(1)), empty_container::<Health>)
            .unwrap();
        assert!(registry.check_batch(&batch).is_ok());
    }
}
