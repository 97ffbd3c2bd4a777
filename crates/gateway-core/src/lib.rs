//! # Gateway Core
//!
//! Entity model shared by the gateway administration services and the
//! authorization kernel.
//!
//! This crate provides:
//! - Type-safe identifiers (newtype pattern)
//! - Entity types, operations and the `Entity` contract
//! - Lightweight entity headers and the folder hierarchy
//! - The entity lookup collaborator and its error taxonomy

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod entity;
pub mod header;
pub mod folder;
pub mod user;
pub mod resolver;

pub use error::{ErrorCode, LookupError, LookupResult};
pub use id::*;
pub use entity::*;
pub use header::EntityHeader;
pub use folder::Folder;
pub use user::{User, UserKey};
pub use resolver::{EntityResolver, InMemoryEntityStore};
