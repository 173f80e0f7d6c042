//! # groupdb_submission
//!
//! Deferred entity submission for a group-partitioned entity database.
//!
//! Collaborators never write committed data directly. They stage new
//! entities and enqueue structural operations through a [`Submitter`], and a
//! submission pass on [`EntitiesRoot`] applies them:
//!
//! - [`OperationLog`]: FIFO swaps, removals and group removals, applied
//!   first against the previously committed state.
//! - [`DoubleBufferedEntities`]: two [`StagedBatch`]es so engines can stage
//!   entities while the previous batch is being merged.
//! - [`EntityDatabase`]: group → component type → container, kept in sync
//!   with the [`TypeIndex`].
//! - [`EngineRegistry`]: [`ReactOnAdd`] engines notified after each batch is
//!   fully merged.

pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod operation;
pub mod report;
pub mod root;
pub mod staging;
pub mod submitter;
pub mod type_index;

pub use config::{
    ConfigError, DEFAULT_REENTRANCY_LIMIT, MAX_REENTRANCY_LIMIT, OperationErrorPolicy,
    SubmissionConfig,
};
pub use database::EntityDatabase;
pub use engine::{EngineContext, EngineRegistry, ReactOnAdd};
pub use error::{BuildError, OperationError, OperationFailure, RegistryError, SubmissionError};
pub use operation::{Operation, OperationLog, PendingOperation};
pub use report::SubmissionReport;
pub use root::EntitiesRoot;
pub use staging::{DoubleBufferedEntities, StagedBatch};
pub use submitter::{EntityBuilder, Submitter};
pub use type_index::TypeIndex;
