//! Shared metadata registry
//!
//! The [`Registry`] owns every entity the compiler produces: statement
//! definitions, result maps, parameter maps, cache declarations, and key
//! strategies, all keyed by namespace-qualified id. Entities are immutable
//! once registered and shared behind `Arc`, so concurrent readers need no
//! further synchronization; the maps themselves are RwLock-guarded against
//! concurrent initializers.
//!
//! The registry also carries the loaded-resource set (the idempotent
//! re-parse guard) and the deferred-resolution queue.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use rowbind_core::{
    BuildError, CacheConfig, KeyStrategy, ParameterMap, Result, ResultMap, StatementDefinition,
};

use crate::pending::PendingQueue;
use crate::settings::Settings;

/// The shared registry of compiled mapping metadata
#[derive(Debug, Default)]
pub struct Registry {
    settings: Settings,
    statements: RwLock<HashMap<String, Arc<StatementDefinition>>>,
    result_maps: RwLock<HashMap<String, Arc<ResultMap>>>,
    parameter_maps: RwLock<HashMap<String, Arc<ParameterMap>>>,
    caches: RwLock<HashMap<String, Arc<CacheConfig>>>,
    // referencing namespace -> referenced namespace
    cache_refs: RwLock<HashMap<String, String>>,
    key_strategies: RwLock<HashMap<String, Arc<KeyStrategy>>>,
    loaded_resources: RwLock<HashSet<String>>,
    pending: PendingQueue,
}

impl Registry {
    /// A registry with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with explicit settings
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Global build settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The deferred-resolution queue
    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }

    // ==================== statements ====================

    /// Register a statement definition; duplicate ids are fatal
    pub fn add_statement(&self, statement: StatementDefinition) -> Result<Arc<StatementDefinition>> {
        let mut statements = self.statements.write();
        if statements.contains_key(statement.id()) {
            return Err(BuildError::DuplicateEntry {
                kind: "statement",
                id: statement.id().to_string(),
            });
        }
        debug!(id = statement.id(), command = ?statement.command(), "registered statement");
        let statement = Arc::new(statement);
        statements.insert(statement.id().to_string(), statement.clone());
        Ok(statement)
    }

    /// Look up a statement by qualified id
    pub fn statement(&self, id: &str) -> Option<Arc<StatementDefinition>> {
        self.statements.read().get(id).cloned()
    }

    /// True when a statement with `id` is registered
    pub fn has_statement(&self, id: &str) -> bool {
        self.statements.read().contains_key(id)
    }

    // ==================== result maps ====================

    /// Register a result map; duplicate ids are fatal
    pub fn add_result_map(&self, map: ResultMap) -> Result<Arc<ResultMap>> {
        let mut maps = self.result_maps.write();
        if maps.contains_key(map.id()) {
            return Err(BuildError::DuplicateEntry {
                kind: "result map",
                id: map.id().to_string(),
            });
        }
        debug!(id = map.id(), "registered result map");
        let map = Arc::new(map);
        maps.insert(map.id().to_string(), map.clone());
        Ok(map)
    }

    /// Look up a result map by qualified id
    pub fn result_map(&self, id: &str) -> Option<Arc<ResultMap>> {
        self.result_maps.read().get(id).cloned()
    }

    /// True when a result map with `id` is registered
    pub fn has_result_map(&self, id: &str) -> bool {
        self.result_maps.read().contains_key(id)
    }

    // ==================== parameter maps ====================

    /// Register a parameter map; duplicate ids are fatal
    pub fn add_parameter_map(&self, map: ParameterMap) -> Result<Arc<ParameterMap>> {
        let mut maps = self.parameter_maps.write();
        if maps.contains_key(map.id()) {
            return Err(BuildError::DuplicateEntry {
                kind: "parameter map",
                id: map.id().to_string(),
            });
        }
        let map = Arc::new(map);
        maps.insert(map.id().to_string(), map.clone());
        Ok(map)
    }

    /// Look up a parameter map by qualified id
    pub fn parameter_map(&self, id: &str) -> Option<Arc<ParameterMap>> {
        self.parameter_maps.read().get(id).cloned()
    }

    // ==================== caches ====================

    /// Register a namespace cache declaration
    pub fn add_cache(&self, cache: CacheConfig) -> Arc<CacheConfig> {
        debug!(namespace = cache.id(), "registered cache");
        let cache = Arc::new(cache);
        self.caches
            .write()
            .insert(cache.id().to_string(), cache.clone());
        cache
    }

    /// The cache declared by `namespace`, if any
    pub fn cache(&self, namespace: &str) -> Option<Arc<CacheConfig>> {
        self.caches.read().get(namespace).cloned()
    }

    /// Record that `from` shares the cache of `to`
    pub fn add_cache_ref(&self, from: impl Into<String>, to: impl Into<String>) {
        self.cache_refs.write().insert(from.into(), to.into());
    }

    /// The namespace whose cache `from` shares, if a cache-ref was recorded
    pub fn cache_ref_target(&self, from: &str) -> Option<String> {
        self.cache_refs.read().get(from).cloned()
    }

    // ==================== key strategies ====================

    /// Record the key strategy owned by a statement id
    pub fn add_key_strategy(&self, id: impl Into<String>, strategy: KeyStrategy) {
        self.key_strategies.write().insert(id.into(), Arc::new(strategy));
    }

    /// The key strategy recorded for `id`, if any
    pub fn key_strategy(&self, id: &str) -> Option<Arc<KeyStrategy>> {
        self.key_strategies.read().get(id).cloned()
    }

    // ==================== resources ====================

    /// Mark a canonical resource identity as loaded
    pub fn mark_resource_loaded(&self, resource: impl Into<String>) {
        self.loaded_resources.write().insert(resource.into());
    }

    /// True when the resource was already parsed
    pub fn is_resource_loaded(&self, resource: &str) -> bool {
        self.loaded_resources.read().contains(resource)
    }
}
