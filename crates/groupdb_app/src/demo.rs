//! Demo workload driven by the tick loop.
//!
//! Every tick the [`Spawner`] builds one moving entity in [`ACTIVE`] and,
//! on fixed cadences, parks old entities in [`DORMANT`], deletes parked ones
//! and clears the [`DEBRIS`] group. The [`DebrisEmitter`] engine reacts to
//! every new [`Lifetime`] by building a debris entity, so each pass runs one
//! re-entrant generation.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use groupdb_component::{Component, Egid, EntityDescriptor, EntityId, EntityIdAllocator, GroupId};
use groupdb_submission::{BuildError, EngineContext, EntitiesRoot, ReactOnAdd, RegistryError};
use tracing::warn;

/// Group of newly spawned, moving entities.
pub const ACTIVE: GroupId = GroupId(1);
/// Group of parked entities.
pub const DORMANT: GroupId = GroupId(2);
/// Group of debris built by engines.
pub const DEBRIS: GroupId = GroupId(3);

/// Park the oldest active entity every this many ticks.
pub const SWAP_EVERY: u64 = 4;
/// Delete the oldest parked entity every this many ticks.
pub const REMOVE_EVERY: u64 = 6;
/// Clear the debris group every this many ticks.
pub const CLEAR_DEBRIS_EVERY: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Component for Position {
    fn type_name() -> &'static str {
        "Position"
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

impl Component for Velocity {
    fn type_name() -> &'static str {
        "Velocity"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifetime {
    pub ticks: u32,
}

impl Component for Lifetime {
    fn type_name() -> &'static str {
        "Lifetime"
    }
}

/// Components every spawned entity is built with.
#[must_use]
pub fn mover_descriptor() -> EntityDescriptor {
    EntityDescriptor::new()
        .with::<Position>()
        .with::<Velocity>()
        .with::<Lifetime>()
}

/// Builds movers and requests swaps and removals.
#[derive(Debug, Default)]
pub struct Spawner {
    ids: EntityIdAllocator,
    active: VecDeque<EntityId>,
    dormant: VecDeque<EntityId>,
}

impl Spawner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage this tick's work.
    ///
    /// # Errors
    ///
    /// Returns the [`BuildError`] if the new mover could not be staged.
    pub fn tick(&mut self, tick_id: u64, root: &mut EntitiesRoot) -> Result<(), BuildError> {
        // Only entities that are already committed can be moved or removed.
        let park = (tick_id % SWAP_EVERY == 0)
            .then(|| self.active.front().copied())
            .flatten()
            .filter(|&id| root.database().exists::<Position>(Egid { entity: id, group: ACTIVE }));
        let delete = (tick_id % REMOVE_EVERY == 0)
            .then(|| self.dormant.front().copied())
            .flatten()
            .filter(|&id| root.database().exists::<Position>(Egid { entity: id, group: DORMANT }));
        let clear_debris = tick_id % CLEAR_DEBRIS_EVERY == 0 && root.database().has_group(DEBRIS);

        let mut submitter = root.submitter();

        let id = self.ids.allocate();
        submitter
            .build_entity(Egid { entity: id, group: ACTIVE })
            .with(Position {
                x: id.raw() as f32,
                y: 0.0,
            })
            .with(Velocity { dx: 1.0, dy: 0.5 })
            .with(Lifetime { ticks: 3 })
            .build()?;
        self.active.push_back(id);

        if let Some(id) = park {
            self.active.pop_front();
            submitter.enqueue_swap(mover_descriptor(), id, ACTIVE, DORMANT);
            self.dormant.push_back(id);
        }
        if let Some(id) = delete {
            self.dormant.pop_front();
            submitter.enqueue_remove(mover_descriptor(), Egid { entity: id, group: DORMANT });
        }
        if clear_debris {
            submitter.enqueue_remove_group(DEBRIS);
        }
        Ok(())
    }
}

/// Builds a debris entity behind every new mover.
#[derive(Debug, Default)]
pub struct DebrisEmitter {
    ids: EntityIdAllocator,
}

impl ReactOnAdd<Lifetime> for DebrisEmitter {
    fn add(&mut self, egid: Egid, lifetime: &Lifetime, ctx: &mut EngineContext<'_>) {
        if lifetime.ticks == 0 {
            return;
        }
        let db = ctx.database();
        let (Some(&position), Some(&velocity)) = (db.entity::<Position>(egid), db.entity::<Velocity>(egid))
        else {
            return;
        };
        // Debris is left one step behind the mover.
        let trail = Position {
            x: position.x - velocity.dx,
            y: position.y - velocity.dy,
        };
        let debris = Egid {
            entity: self.ids.allocate(),
            group: DEBRIS,
        };
        if let Err(err) = ctx.submitter().stage_new_entity(debris, trail) {
            warn!(%egid, %err, "could not emit debris");
        }
    }
}

/// Counts committed positions.
#[derive(Debug, Default, Clone)]
pub struct Census {
    positions: Rc<Cell<u64>>,
}

impl Census {
    /// Positions seen so far.
    #[must_use]
    pub fn positions(&self) -> u64 {
        self.positions.get()
    }
}

impl ReactOnAdd<Position> for Census {
    fn add(&mut self, _egid: Egid, _position: &Position, _ctx: &mut EngineContext<'_>) {
        self.positions.set(self.positions.get() + 1);
    }
}

/// Register the demo engines. Returns a handle on the census counter.
///
/// # Errors
///
/// Returns [`RegistryError`] if a component name is already taken.
pub fn register_engines(root: &mut EntitiesRoot) -> Result<Census, RegistryError> {
    let census = Census::default();
    root.register_engine::<Lifetime, _>(DebrisEmitter::default())?;
    root.register_engine::<Position, _>(census.clone())?;
    Ok(census)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mover_and_debris_land_in_one_pass() {
        let mut root = EntitiesRoot::default();
        let census = register_engines(&mut root).unwrap();
        let mut spawner = Spawner::new();

        spawner.tick(1, &mut root).unwrap();
        let report = root.submit_entities().unwrap();

        assert_eq!(report.iterations, 2);
        assert_eq!(report.entities_added, 2);
        assert_eq!(census.positions(), 2);
        let db = root.database();
        assert_eq!(db.count::<Velocity>(ACTIVE), 1);
        assert_eq!(
            db.entity::<Position>(Egid::new(0, DEBRIS.raw())),
            Some(&Position { x: -1.0, y: -0.5 })
        );
    }

    #[test]
    fn test_uncommitted_movers_are_not_parked() {
        let mut root = EntitiesRoot::default();
        let mut spawner = Spawner::new();

        // Nothing has been submitted, so the first mover is only staged.
        spawner.tick(1, &mut root).unwrap();
        spawner.tick(SWAP_EVERY, &mut root).unwrap();
        assert_eq!(root.pending_operations(), 0);

        root.submit_entities().unwrap();
        spawner.tick(2 * SWAP_EVERY, &mut root).unwrap();
        assert_eq!(root.pending_operations(), 1);
        root.submit_entities().unwrap();
        assert!(root.database().exists::<Lifetime>(Egid::new(0, DORMANT.raw())));
    }
}
