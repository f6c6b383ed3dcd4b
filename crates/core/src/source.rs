//! Collaborator seams for the external execution stack
//!
//! The compiler registers metadata; it never runs SQL, converts column
//! values, or loads descriptor documents itself. Each of those concerns is a
//! trait here, with the smallest default implementation the build phase and
//! tests need.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{StorageType, ValueType};

/// An executable SQL source, resolved per invocation by the execution engine
///
/// Opaque to the compiler: only identity/description is observable here.
pub trait SqlSource: fmt::Debug + Send + Sync {
    /// Human-readable description of the source (raw SQL or provider id)
    fn describe(&self) -> &str;
}

/// SQL built from inline text fragments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticSqlSource {
    sql: String,
}

impl StaticSqlSource {
    /// Join fragments with single spaces and trim the result
    pub fn from_fragments(fragments: &[String]) -> Self {
        Self {
            sql: fragments.join(" ").trim().to_string(),
        }
    }

    /// The joined SQL text
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl SqlSource for StaticSqlSource {
    fn describe(&self) -> &str {
        &self.sql
    }
}

/// Opaque reference to an external SQL provider callable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRef {
    /// Provider type name
    pub type_name: String,
    /// Provider method name, empty to let the provider pick
    pub method: String,
}

/// SQL resolved through a provider callable at invocation time
#[derive(Debug, Clone)]
pub struct ProviderSqlSource {
    provider: ProviderRef,
    description: String,
}

impl ProviderSqlSource {
    /// Wrap a provider reference with its declaring context
    pub fn new(provider: ProviderRef, interface: &str, method: &str) -> Self {
        let description = format!(
            "provider {}#{} (for {interface}.{method})",
            provider.type_name, provider.method
        );
        Self {
            provider,
            description,
        }
    }

    /// The wrapped provider reference
    pub fn provider(&self) -> &ProviderRef {
        &self.provider
    }
}

impl SqlSource for ProviderSqlSource {
    fn describe(&self) -> &str {
        &self.description
    }
}

/// Builds [`SqlSource`] values from declarative markers
///
/// The language-driver seam: how raw text or a provider reference becomes an
/// executable source is the execution engine's business.
pub trait SqlSourceFactory: Send + Sync {
    /// Build a source from inline SQL fragments
    fn from_text(&self, fragments: &[String], parameter_type: &ValueType) -> Arc<dyn SqlSource>;

    /// Build a source from a provider reference, with the declaring
    /// interface/method for context
    fn from_provider(
        &self,
        provider: &ProviderRef,
        interface: &str,
        method: &str,
    ) -> Arc<dyn SqlSource>;
}

/// Default factory: static text, opaque providers
#[derive(Debug, Default, Clone)]
pub struct TextSourceFactory;

impl SqlSourceFactory for TextSourceFactory {
    fn from_text(&self, fragments: &[String], _parameter_type: &ValueType) -> Arc<dyn SqlSource> {
        Arc::new(StaticSqlSource::from_fragments(fragments))
    }

    fn from_provider(
        &self,
        provider: &ProviderRef,
        interface: &str,
        method: &str,
    ) -> Arc<dyn SqlSource> {
        Arc::new(ProviderSqlSource::new(provider.clone(), interface, method))
    }
}

/// Handle naming a converter in the external type-handler registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeHandlerRef(Arc<str>);

impl TypeHandlerRef {
    /// Handle with an explicit name
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// The fallback handler for opaque value types
    pub fn unknown() -> Self {
        Self::named("unknown")
    }

    /// The handler name
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Resolves a type-handler for a value/storage type pair
pub trait TypeHandlerResolver: Send + Sync {
    /// Pick the handler for `value_type` (+ optional storage type), honoring
    /// an explicit per-mapping override first
    fn resolve(
        &self,
        value_type: &ValueType,
        storage_type: Option<StorageType>,
        explicit: Option<&str>,
    ) -> TypeHandlerRef;
}

/// Name-by-type resolution with an `unknown` fallback
#[derive(Debug, Default, Clone)]
pub struct DefaultTypeHandlers;

impl TypeHandlerResolver for DefaultTypeHandlers {
    fn resolve(
        &self,
        value_type: &ValueType,
        _storage_type: Option<StorageType>,
        explicit: Option<&str>,
    ) -> TypeHandlerRef {
        if let Some(name) = explicit {
            return TypeHandlerRef::named(name.to_string());
        }
        if value_type.is_object() {
            return TypeHandlerRef::unknown();
        }
        TypeHandlerRef::named(value_type.simple_name().to_string())
    }
}

/// Probes a target type for the natural type of one of its properties
///
/// Stands in for reflective property introspection when a mapping declares
/// no explicit value type.
pub trait TypePropertyProbe: Send + Sync {
    /// The declared type of `property` on `target`, if known
    fn property_type(&self, target: &ValueType, property: &str) -> Option<ValueType>;
}

/// A probe with no type information; every inference falls back to `Object`
#[derive(Debug, Default, Clone)]
pub struct NoPropertyInfo;

impl TypePropertyProbe for NoPropertyInfo {
    fn property_type(&self, _target: &ValueType, _property: &str) -> Option<ValueType> {
        None
    }
}

/// Table-driven probe: explicit `(target, property) -> type` entries
#[derive(Debug, Default, Clone)]
pub struct PropertyTypeTable {
    entries: std::collections::HashMap<(ValueType, String), ValueType>,
}

impl PropertyTypeTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a property's type on a target type
    pub fn declare(
        &mut self,
        target: ValueType,
        property: impl Into<String>,
        property_type: ValueType,
    ) {
        self.entries.insert((target, property.into()), property_type);
    }
}

impl TypePropertyProbe for PropertyTypeTable {
    fn property_type(&self, target: &ValueType, property: &str) -> Option<ValueType> {
        self.entries
            .get(&(target.clone(), property.to_string()))
            .cloned()
    }
}

/// Loads the companion descriptor document for a mapping interface
///
/// Delegated entirely: the raw document parser is an external collaborator.
/// Implementations typically hold the registry they populate.
pub trait DescriptorLoader: Send + Sync {
    /// Load the companion document for `interface_name`, if one exists
    fn load_companion(&self, interface_name: &str) -> Result<()>;
}

/// Loader for interfaces with no companion documents
#[derive(Debug, Default, Clone)]
pub struct NoCompanion;

impl DescriptorLoader for NoCompanion {
    fn load_companion(&self, _interface_name: &str) -> Result<()> {
        Ok(())
    }
}
