//! # Rowbind Core
//!
//! The immutable data model of the mapping-metadata compiler: statement
//! definitions, result-assembly trees, parameter maps, cache declarations,
//! the placeholder substitutor, and the trait seams for the external
//! execution stack (SQL sources, type handlers, descriptor loading).
//!
//! Nothing here is stateful; the shared registry lives in
//! `rowbind-registry` and the descriptor parsing in `rowbind-builder`.

#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod mapping;
pub mod source;
pub mod statement;
pub mod text;
pub mod types;

pub use cache::{CacheBuilder, CacheConfig, CacheKind, EvictionPolicy};
pub use error::{BuildError, Incomplete, Result};
pub use mapping::{
    Discriminator, ParameterMap, ParameterMapping, ParameterMode, ResultFlags, ResultMap,
    ResultMapBuilder, ResultMapping, ResultMappingBuilder,
};
pub use source::{
    DefaultTypeHandlers, DescriptorLoader, NoCompanion, NoPropertyInfo, PropertyTypeTable,
    ProviderRef, ProviderSqlSource, SqlSource, SqlSourceFactory, StaticSqlSource,
    TextSourceFactory, TypeHandlerRef, TypeHandlerResolver, TypePropertyProbe,
};
pub use statement::{
    KeyStrategy, StatementBuilder, StatementDefinition, SELECT_KEY_SUFFIX,
};
pub use text::{resolve_placeholders, Properties, TokenSubstitutor};
pub use types::{
    derive_effective_type, CommandKind, ExecutionMode, FetchTiming, FlushPolicy, ResultSetShape,
    ReturnShape, StorageType, TypeBindings, TypeRef, ValueType,
};
