//! Rowbind - declarative SQL mapping-metadata compiler
//!
//! Rowbind compiles declarative mapping-interface descriptors into an
//! immutable, queryable registry of statement definitions, result-assembly
//! trees, parameter maps, and cache declarations. It never executes SQL;
//! the execution engine consumes the registered metadata through the trait
//! seams in [`rowbind_core`].
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use rowbind::{InterfaceBuilder, InterfaceDescriptor, Registry};
//!
//! // Describe a mapping interface
//! let descriptor: InterfaceDescriptor = serde_json::from_str(document)?;
//!
//! // Compile it into a shared registry
//! let registry = Arc::new(Registry::new());
//! Arc::new(InterfaceBuilder::new(registry.clone(), descriptor)).parse()?;
//!
//! // Look up the registered metadata
//! let statement = registry.statement("app.UserMapper.findUser");
//! ```
//!
//! # Architecture
//!
//! The workspace splits into three crates: `rowbind-core` holds the
//! immutable data model and collaborator traits, `rowbind-registry` the
//! shared registry with its deferred-resolution queue, and
//! `rowbind-builder` the descriptor parser that populates it.

// Re-export the public API of the three member crates
pub use rowbind_builder::*;
pub use rowbind_core::*;
pub use rowbind_registry::*;
