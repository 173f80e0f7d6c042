//! # groupdb_component
//!
//! The data primitives of the group database: what a component is, how an
//! entity is addressed, and how components of one type are stored per group.
//!
//! This crate provides:
//!
//! - [`Component`] trait and its stable [`ComponentTypeId`].
//! - [`EntityId`], [`GroupId`] and the combined [`Egid`] address.
//! - [`EntityDescriptor`]: the component type set of an entity.
//! - [`IndexedContainer`]: id-indexed dense storage for one component type.
//! - [`TypeSafeContainer`]: the type-erased capability set over containers.

pub mod component;
pub mod container;
pub mod descriptor;
pub mod entity;
pub mod error;

pub use component::{Component, ComponentTypeId};
pub use container::{IndexedContainer, TypeSafeContainer};
pub use descriptor::EntityDescriptor;
pub use entity::{Egid, EntityId, EntityIdAllocator, GroupId};
pub use error::ContainerError;
