//! Entity and group identifiers.
//!
//! An entity is addressed by an [`Egid`]: an [`EntityId`] that is unique only
//! inside its group, paired with the [`GroupId`] of that group. The database
//! is partitioned by group first, which is why the entity id alone never
//! identifies a component.

use serde::{Deserialize, Serialize};

/// An entity identifier, unique within a single group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Returns the raw identifier.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A group identifier. Groups partition the database; entities move between
/// them through swap operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u32);

impl GroupId {
    /// Returns the raw identifier.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "group {}", self.0)
    }
}

/// The full address of an entity: its id plus the group it lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Egid {
    /// Entity id, unique within `group`.
    pub entity: EntityId,
    /// The group the entity belongs to.
    pub group: GroupId,
}

impl Egid {
    /// Create an address from raw parts.
    #[must_use]
    pub const fn new(entity: u32, group: u32) -> Self {
        Self {
            entity: EntityId(entity),
            group: GroupId(group),
        }
    }

    /// The same entity id in another group, as produced by a swap.
    #[must_use]
    pub const fn in_group(self, group: GroupId) -> Self {
        Self {
            entity: self.entity,
            group,
        }
    }
}

impl std::fmt::Display for Egid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Egid({}, {})", self.entity, self.group)
    }
}

/// Hands out increasing entity ids, starting at 0. Ids are never reused.
#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next_id: u32,
}

impl EntityIdAllocator {
    /// Creates a new allocator starting at id 0.
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Allocates a fresh entity id.
    pub fn allocate(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        EntityId(id)
    }

    /// Returns the number of ids allocated so far.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.next_id
    }
}
