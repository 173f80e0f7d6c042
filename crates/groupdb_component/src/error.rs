//! Container-level error types.

use crate::entity::EntityId;

/// Errors raised by id-indexed component containers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContainerError {
    /// The container already holds a component for this entity id.
    #[error("entity {entity} already has a `{component}` component")]
    DuplicateEntity {
        /// The clashing entity id.
        entity: EntityId,
        /// Name of the component type.
        component: &'static str,
    },

    /// A type-erased value did not hold the container's component type.
    #[error("value is not a `{expected}` component")]
    TypeMismatch {
        /// Name of the component type the container stores.
        expected: &'static str,
    },

    /// Two containers of different component types were combined.
    #[error("cannot fill a `{expected}` container from a `{found}` container")]
    ContainerMismatch {
        /// Component type of the destination container.
        expected: &'static str,
        /// Component type of the source container.
        found: &'static str,
    },
}
