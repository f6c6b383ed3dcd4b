//! Executable statement definitions
//!
//! A [`StatementDefinition`] is the registry's unit of execution metadata:
//! one namespace-qualified id bound to a SQL source, a command kind, the
//! result maps assembling its rows, caching flags, and a key-generation
//! strategy. Definitions are immutable once built; the registry owns them
//! behind `Arc`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::mapping::{ParameterMap, ResultMap};
use crate::source::SqlSource;
use crate::types::{CommandKind, ExecutionMode, ResultSetShape, ValueType};

/// Id suffix of the synthetic statement owned by an auxiliary-select key
/// strategy
pub const SELECT_KEY_SUFFIX: &str = "!selectKey";

/// Policy for obtaining a database-generated key around a mutating statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyStrategy {
    /// No key generation
    None,
    /// Retrieve driver-generated keys after the insert
    PostRetrieval,
    /// Run a synthetic SELECT statement before or after the primary one
    AuxiliarySelect {
        /// Qualified id of the owned synthetic statement
        statement_id: String,
        /// Execute before the primary statement instead of after
        before: bool,
    },
}

impl KeyStrategy {
    /// True unless this is the no-op strategy
    pub fn is_active(&self) -> bool {
        !matches!(self, KeyStrategy::None)
    }
}

/// One registered, executable statement
#[derive(Debug, Clone)]
pub struct StatementDefinition {
    id: String,
    resource: String,
    sql: Arc<dyn SqlSource>,
    command: CommandKind,
    execution_mode: ExecutionMode,
    fetch_size: Option<u32>,
    timeout_ms: Option<u64>,
    parameter_type: ValueType,
    parameter_map: Option<ParameterMap>,
    result_maps: Vec<Arc<ResultMap>>,
    result_set_shape: ResultSetShape,
    flush_cache: bool,
    use_cache: bool,
    cache: Option<Arc<CacheConfig>>,
    key_strategy: KeyStrategy,
    key_property: Option<String>,
    key_column: Option<String>,
    database_variant: Option<String>,
    result_sets: Vec<String>,
    affects_data: bool,
}

impl StatementDefinition {
    /// Namespace-qualified id, unique across the registry
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The resource this statement was declared in
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// SQL source, resolved per invocation by the execution engine
    pub fn sql(&self) -> &Arc<dyn SqlSource> {
        &self.sql
    }

    /// Command kind
    pub fn command(&self) -> CommandKind {
        self.command
    }

    /// Statement execution mode
    pub fn execution_mode(&self) -> ExecutionMode {
        self.execution_mode
    }

    /// Driver fetch size hint
    pub fn fetch_size(&self) -> Option<u32> {
        self.fetch_size
    }

    /// Execution timeout
    pub fn timeout_ms(&self) -> Option<u64> {
        self.timeout_ms
    }

    /// Declared parameter type
    pub fn parameter_type(&self) -> &ValueType {
        &self.parameter_type
    }

    /// Parameter map (explicit or synthesized inline)
    pub fn parameter_map(&self) -> Option<&ParameterMap> {
        self.parameter_map.as_ref()
    }

    /// Associated result maps; reads always carry at least one
    pub fn result_maps(&self) -> &[Arc<ResultMap>] {
        &self.result_maps
    }

    /// Result-set fetch shape
    pub fn result_set_shape(&self) -> ResultSetShape {
        self.result_set_shape
    }

    /// Flush the namespace cache when this statement runs
    pub fn flush_cache(&self) -> bool {
        self.flush_cache
    }

    /// Serve results from the namespace cache
    pub fn use_cache(&self) -> bool {
        self.use_cache
    }

    /// The namespace cache active when this statement was registered
    pub fn cache(&self) -> Option<&Arc<CacheConfig>> {
        self.cache.as_ref()
    }

    /// Key-generation strategy
    pub fn key_strategy(&self) -> &KeyStrategy {
        &self.key_strategy
    }

    /// Property receiving the generated key
    pub fn key_property(&self) -> Option<&str> {
        self.key_property.as_deref()
    }

    /// Column supplying the generated key
    pub fn key_column(&self) -> Option<&str> {
        self.key_column.as_deref()
    }

    /// Database-variant identifier this definition is bound to
    pub fn database_variant(&self) -> Option<&str> {
        self.database_variant.as_deref()
    }

    /// Named result-set labels for multi-result statements
    pub fn result_sets(&self) -> &[String] {
        &self.result_sets
    }

    /// A read statement that nonetheless mutates data
    pub fn affects_data(&self) -> bool {
        self.affects_data
    }
}

/// Builder for [`StatementDefinition`]
pub struct StatementBuilder {
    statement: StatementDefinition,
}

impl StatementBuilder {
    /// Start a definition for `id` over `sql`
    pub fn new(id: impl Into<String>, sql: Arc<dyn SqlSource>, command: CommandKind) -> Self {
        Self {
            statement: StatementDefinition {
                id: id.into(),
                resource: String::new(),
                sql,
                command,
                execution_mode: ExecutionMode::default(),
                fetch_size: None,
                timeout_ms: None,
                parameter_type: ValueType::Object,
                parameter_map: None,
                result_maps: Vec::new(),
                result_set_shape: ResultSetShape::default(),
                flush_cache: command.is_mutating(),
                use_cache: command == CommandKind::Select,
                cache: None,
                key_strategy: KeyStrategy::None,
                key_property: None,
                key_column: None,
                database_variant: None,
                result_sets: Vec::new(),
                affects_data: false,
            },
        }
    }

    /// Declaring resource
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.statement.resource = resource.into();
        self
    }

    /// Execution mode
    pub fn execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.statement.execution_mode = mode;
        self
    }

    /// Fetch size hint
    pub fn fetch_size(mut self, fetch_size: Option<u32>) -> Self {
        self.statement.fetch_size = fetch_size;
        self
    }

    /// Execution timeout
    pub fn timeout_ms(mut self, timeout: Option<u64>) -> Self {
        self.statement.timeout_ms = timeout;
        self
    }

    /// Declared parameter type
    pub fn parameter_type(mut self, parameter_type: ValueType) -> Self {
        self.statement.parameter_type = parameter_type;
        self
    }

    /// Parameter map
    pub fn parameter_map(mut self, map: Option<ParameterMap>) -> Self {
        self.statement.parameter_map = map;
        self
    }

    /// Associated result maps
    pub fn result_maps(mut self, maps: Vec<Arc<ResultMap>>) -> Self {
        self.statement.result_maps = maps;
        self
    }

    /// Result-set shape
    pub fn result_set_shape(mut self, shape: ResultSetShape) -> Self {
        self.statement.result_set_shape = shape;
        self
    }

    /// Cache-flush flag
    pub fn flush_cache(mut self, flush: bool) -> Self {
        self.statement.flush_cache = flush;
        self
    }

    /// Cache-use flag
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.statement.use_cache = use_cache;
        self
    }

    /// Active namespace cache
    pub fn cache(mut self, cache: Option<Arc<CacheConfig>>) -> Self {
        self.statement.cache = cache;
        self
    }

    /// Key-generation strategy
    pub fn key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.statement.key_strategy = strategy;
        self
    }

    /// Generated-key property
    pub fn key_property(mut self, property: Option<String>) -> Self {
        self.statement.key_property = property;
        self
    }

    /// Generated-key column
    pub fn key_column(mut self, column: Option<String>) -> Self {
        self.statement.key_column = column;
        self
    }

    /// Database-variant identifier
    pub fn database_variant(mut self, variant: Option<String>) -> Self {
        self.statement.database_variant = variant;
        self
    }

    /// Named result-set labels (comma-separated declaration form)
    pub fn result_sets(mut self, labels: Option<&str>) -> Self {
        self.statement.result_sets = labels
            .map(|value| {
                value
                    .split(',')
                    .map(|label| label.trim().to_string())
                    .filter(|label| !label.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        self
    }

    /// Mutates-data flag for otherwise-read statements
    pub fn affects_data(mut self, affects: bool) -> Self {
        self.statement.affects_data = affects;
        self
    }

    /// Freeze the definition
    pub fn build(self) -> StatementDefinition {
        self.statement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticSqlSource;

    fn sql(text: &str) -> Arc<dyn SqlSource> {
        Arc::new(StaticSqlSource::from_fragments(&[text.to_string()]))
    }

    #[test]
    fn test_cache_flag_defaults_per_command_kind() {
        let select = StatementBuilder::new("app.M.find", sql("select 1"), CommandKind::Select).build();
        assert!(!select.flush_cache());
        assert!(select.use_cache());

        let insert = StatementBuilder::new("app.M.add", sql("insert"), CommandKind::Insert).build();
        assert!(insert.flush_cache());
        assert!(!insert.use_cache());
    }

    #[test]
    fn test_result_set_labels_split_and_trimmed() {
        let stmt = StatementBuilder::new("app.M.multi", sql("call proc()"), CommandKind::Select)
            .result_sets(Some("users, orders ,"))
            .build();
        assert_eq!(stmt.result_sets(), ["users", "orders"]);
    }

    #[test]
    fn test_key_strategy_activity() {
        assert!(!KeyStrategy::None.is_active());
        assert!(KeyStrategy::PostRetrieval.is_active());
        assert!(KeyStrategy::AuxiliarySelect {
            statement_id: format!("app.M.add{SELECT_KEY_SUFFIX}"),
            before: true,
        }
        .is_active());
    }
}
