//! Deferred entries retrying unresolved cross-references

use std::sync::Arc;

use rowbind_core::Result;
use rowbind_registry::Deferred;

use crate::assistant::MappingAssistant;
use crate::descriptor::MethodDescriptor;
use crate::parser::InterfaceBuilder;

/// Re-runs a whole method compilation once its missing reference may exist
pub struct MethodResolver {
    builder: Arc<InterfaceBuilder>,
    method: MethodDescriptor,
}

impl MethodResolver {
    /// Park `method` for retry through `builder`
    pub fn new(builder: Arc<InterfaceBuilder>, method: MethodDescriptor) -> Self {
        Self { builder, method }
    }
}

impl Deferred for MethodResolver {
    fn describe(&self) -> String {
        format!("{}.{}", self.builder.descriptor().name, self.method.name)
    }

    fn resolve(&self) -> Result<()> {
        self.builder.parse_statement(&self.method)
    }
}

/// Retries a cache reference whose target namespace had no cache yet
pub struct CacheRefResolver {
    assistant: Arc<MappingAssistant>,
    namespace: String,
}

impl CacheRefResolver {
    /// Park a reference to `namespace` for retry through `assistant`
    pub fn new(assistant: Arc<MappingAssistant>, namespace: String) -> Self {
        Self {
            assistant,
            namespace,
        }
    }
}

impl Deferred for CacheRefResolver {
    fn describe(&self) -> String {
        format!("cache-ref -> {}", self.namespace)
    }

    fn resolve(&self) -> Result<()> {
        self.assistant.use_cache_ref(&self.namespace).map(|_| ())
    }
}
