//! Core [`Component`] trait and its type identity.
//!
//! Every piece of data stored in the group database must implement
//! [`Component`]. Components are plain data records; the database never looks
//! inside them, it only moves them between id-indexed containers.
//!
//! A component type is keyed by a hash of its declared name rather than
//! `std::any::TypeId`, so ids are stable across builds and readable in logs.

use serde::{Deserialize, Serialize};

/// Stable key of a component type: FNV-1a 64 over the UTF-8 bytes of
/// [`Component::type_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentTypeId(pub u64);

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

impl ComponentTypeId {
    /// Hash `name` into a type id. Usable in `const` items, e.g. for
    /// well-known type ids in tests.
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = FNV_OFFSET;
        let mut at = 0;
        while at < bytes.len() {
            hash = (hash ^ bytes[at] as u64).wrapping_mul(FNV_PRIME);
            at += 1;
        }
        Self(hash)
    }

    /// Compute the [`ComponentTypeId`] for a Rust component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self::from_name(T::type_name())
    }
}

impl std::fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// A plain data record stored per entity in a group.
///
/// ```rust
/// use groupdb_component::Component;
///
/// struct Armor(u32);
///
/// impl Component for Armor {
///     fn type_name() -> &'static str { "Armor" }
/// }
/// ```
pub trait Component: Send + Sync + 'static {
    /// A human-readable name for this component type. Must be unique among
    /// the component types used with one database.
    fn type_name() -> &'static str;

    /// Returns the [`ComponentTypeId`] for this component.
    fn component_type_id() -> ComponentTypeId {
        ComponentTypeId::from_name(Self::type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Health;

    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    struct Velocity;

    impl Component for Velocity {
        fn type_name() -> &'static str {
            "Velocity"
        }
    }

    #[test]
    fn test_component_type_id_matches_from_name() {
        assert_eq!(
            Health::component_type_id(),
            ComponentTypeId::from_name("Health")
        );
        assert_eq!(ComponentTypeId::of::<Health>(), Health::component_type_id());
    }

    #[test]
    fn test_component_type_id_differs_between_types() {
        assert_ne!(Health::component_type_id(), Velocity::component_type_id());
    }

    #[test]
    fn test_fnv1a_known_vectors() {
        // FNV-1a 64-bit of the empty string is the offset basis itself.
        assert_eq!(
            ComponentTypeId::from_name(""),
            ComponentTypeId(0xcbf2_9ce4_8422_2325)
        );
        assert_eq!(
            ComponentTypeId::from_name("a"),
            ComponentTypeId(0xaf63_dc4c_8601_ec8c)
        );
    }

    #[test]
    fn test_display_is_hex() {
        assert_eq!(
            ComponentTypeId(0xff).to_string(),
            "0x00000000000000ff"
        );
    }
}
