//! # ndforge-container - Typed Memory Containers
//!
//! Binds a concrete [`ndforge_types::TypeDescriptor`] to a byte region with
//! derived byte strides, and classifies the resulting memory layout.
//!
//! ## Ownership
//!
//! - [`Container::from_value`] and [`Container::zeros`] allocate an owned,
//!   16-byte aligned region that is freed with the container
//! - [`Container::from_buffer`] and [`Container::from_buffer_at`] borrow
//!   caller memory for the container's lifetime and never free it
//!
//! ## Layout
//!
//! [`Container::contiguity`] is recomputed from shape and strides on every
//! call. [`check`] compares it against a [`LayoutRequirement`] and produces
//! a [`LayoutError`] naming the offending argument.

mod codec;
pub mod container;
pub mod error;
pub mod layout;
pub mod storage;
pub mod value;

pub use container::Container;
pub use error::{ContainerError, Result};
pub use layout::{check, contiguity_of, Contiguity, LayoutError, LayoutRequirement};
pub use storage::{OwnedBuffer, Region, OWNED_ALIGNMENT};
pub use value::Value;
