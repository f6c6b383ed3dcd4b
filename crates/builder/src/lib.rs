//! Descriptor compilation: from declarative mapping interfaces to
//! registered statement metadata
//!
//! The [`InterfaceBuilder`] front end walks an [`InterfaceDescriptor`] and
//! drives the namespace-scoped [`MappingAssistant`], which builds the
//! immutable entities and registers them. Unresolvable cross-references
//! park [`resolver`] entries on the registry's pending queue instead of
//! failing the build.

#![warn(missing_docs)]

pub mod assistant;
pub mod descriptor;
pub mod parser;
pub mod resolver;

pub use assistant::{KeyConfig, MappingAssistant, MappingDecl, StatementOptions};
pub use descriptor::{
    CacheMarker, CacheRefMarker, CaseMarker, CtorArgMarker, DiscriminatorMarker,
    InterfaceDescriptor, KeyMarker, MethodDescriptor, NestedObject, OptionsMarker,
    PropertyMarker, StatementMarker,
};
pub use parser::InterfaceBuilder;
pub use resolver::{CacheRefResolver, MethodResolver};
