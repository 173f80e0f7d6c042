//! Error types for building entities, applying operations and running a
//! submission pass.

use std::panic::Location;

use groupdb_component::{ComponentTypeId, ContainerError, Egid, GroupId};

use crate::operation::Operation;

/// Errors raised while staging a new entity. Nothing is staged on error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// The entity was built without components.
    #[error("{egid} was built without components")]
    Empty {
        /// The entity being built.
        egid: Egid,
    },

    /// The same component type was added twice to one entity.
    #[error("{egid} was given two `{component}` components")]
    DuplicateComponent {
        /// The entity being built.
        egid: Egid,
        /// Name of the repeated component type.
        component: &'static str,
    },

    /// The entity was already built earlier in this tick.
    #[error("{egid} already has a staged `{component}` component")]
    AlreadyStaged {
        /// The entity being built.
        egid: Egid,
        /// Name of the clashing component type.
        component: &'static str,
    },

    /// Container-level failure (e.g. two component types sharing a name).
    #[error(transparent)]
    Container(#[from] ContainerError),
}

/// Validation failures of a single structural operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    /// The referenced group does not exist in the database.
    #[error("{group} does not exist")]
    GroupNotFound {
        /// The missing group.
        group: GroupId,
    },

    /// The entity has no component of a type named by the descriptor.
    #[error("{egid} has no component of type {component}")]
    EntityNotFound {
        /// The entity looked up.
        egid: Egid,
        /// The missing component type.
        component: ComponentTypeId,
    },

    /// A swap destination already holds a component for the entity id.
    #[error("{egid} already has a `{component}` component")]
    DestinationOccupied {
        /// The entity address in the destination group.
        egid: Egid,
        /// Name of the clashing component type.
        component: &'static str,
    },

    /// The operation names no component types.
    #[error("operation carries an empty entity descriptor")]
    EmptyDescriptor,

    /// Container-level failure while moving data.
    #[error(transparent)]
    Container(#[from] ContainerError),
}

/// A failed operation with its diagnostic context.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{operation} (requested at {trace}) failed: {error}")]
pub struct OperationFailure {
    /// The operation that failed.
    pub operation: Operation,
    /// Where the operation was requested.
    pub trace: &'static Location<'static>,
    /// Why it failed.
    #[source]
    pub error: OperationError,
}

/// Errors raised when registering engines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Two distinct Rust types share a component type name.
    #[error("component type name `{name}` is used by more than one type")]
    TypeNameCollision {
        /// The shared name.
        name: &'static str,
    },
}

/// Errors that abort a submission pass.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubmissionError {
    /// Engine callbacks kept building entities past the re-entrancy limit.
    #[error(
        "possible infinite loop: re-entrant generation {generation} exceeded the limit of \
         {limit} ({pending} entities still staged); avoid building entities inside engine \
         `add` callbacks"
    )]
    ReentrancyLimit {
        /// The configured limit.
        limit: u32,
        /// The generation that exceeded it. It was merged and notified.
        generation: u32,
        /// Entities staged by that generation, left for the next pass.
        pending: usize,
    },

    /// A staged entity already exists in the database.
    #[error("cannot merge {egid}: it already has a committed `{component}` component")]
    DuplicateEntity {
        /// The clashing entity.
        egid: Egid,
        /// Name of the clashing component type.
        component: &'static str,
    },

    /// An operation failed and the policy is to halt.
    #[error(transparent)]
    Operation(#[from] OperationFailure),

    /// Container-level failure while merging.
    #[error(transparent)]
    Container(#[from] ContainerError),
}
