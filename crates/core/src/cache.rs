//! Cache registration model
//!
//! Only the *registration* side of caching lives here: a namespace declares
//! a cache (or references another namespace's cache) and statements record
//! whether they use or flush it. The cache implementation itself is an
//! external collaborator.

use serde::{Deserialize, Serialize};

use crate::text::Properties;

/// Cache implementation kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheKind {
    /// Plain keep-everything cache (the default implementation)
    #[default]
    Perpetual,
    /// Named custom implementation resolved by the cache collaborator
    Custom(String),
}

/// Eviction policy decorating the base cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvictionPolicy {
    /// Least-recently-used (the default decorator)
    #[default]
    Lru,
    /// First-in-first-out
    Fifo,
    /// Soft references
    Soft,
    /// Weak references
    Weak,
    /// Named custom policy
    Custom(String),
}

/// Immutable cache declaration for one namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    id: String,
    kind: CacheKind,
    eviction: EvictionPolicy,
    flush_interval_ms: Option<u64>,
    size: Option<usize>,
    read_write: bool,
    blocking: bool,
    properties: Properties,
}

impl CacheConfig {
    /// The owning namespace
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Implementation kind
    pub fn kind(&self) -> &CacheKind {
        &self.kind
    }

    /// Eviction policy
    pub fn eviction(&self) -> &EvictionPolicy {
        &self.eviction
    }

    /// Periodic flush interval in milliseconds, if bounded
    pub fn flush_interval_ms(&self) -> Option<u64> {
        self.flush_interval_ms
    }

    /// Entry count bound, if bounded
    pub fn size(&self) -> Option<usize> {
        self.size
    }

    /// Copy-on-read isolation between callers
    pub fn read_write(&self) -> bool {
        self.read_write
    }

    /// Block concurrent loads of the same key
    pub fn blocking(&self) -> bool {
        self.blocking
    }

    /// Free-form implementation properties
    pub fn properties(&self) -> &Properties {
        &self.properties
    }
}

/// Builder for [`CacheConfig`], keyed by the declaring namespace
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    config: CacheConfig,
}

impl CacheBuilder {
    /// A cache declaration for `namespace` with default kind and policy
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            config: CacheConfig {
                id: namespace.into(),
                kind: CacheKind::default(),
                eviction: EvictionPolicy::default(),
                flush_interval_ms: None,
                size: None,
                read_write: true,
                blocking: false,
                properties: Properties::new(),
            },
        }
    }

    /// Implementation kind
    pub fn kind(mut self, kind: CacheKind) -> Self {
        self.config.kind = kind;
        self
    }

    /// Eviction policy
    pub fn eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.config.eviction = eviction;
        self
    }

    /// Periodic flush interval
    pub fn flush_interval_ms(mut self, interval: Option<u64>) -> Self {
        self.config.flush_interval_ms = interval;
        self
    }

    /// Entry count bound
    pub fn size(mut self, size: Option<usize>) -> Self {
        self.config.size = size;
        self
    }

    /// Read/write isolation
    pub fn read_write(mut self, read_write: bool) -> Self {
        self.config.read_write = read_write;
        self
    }

    /// Blocking loads
    pub fn blocking(mut self, blocking: bool) -> Self {
        self.config.blocking = blocking;
        self
    }

    /// Free-form properties
    pub fn properties(mut self, properties: Properties) -> Self {
        self.config.properties = properties;
        self
    }

    /// Freeze the declaration
    pub fn build(self) -> CacheConfig {
        self.config
    }
}
