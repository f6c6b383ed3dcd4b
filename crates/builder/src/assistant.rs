//! Namespace-scoped factory and registrar for mapping metadata
//!
//! The [`MappingAssistant`] builds the immutable entities for one mapping
//! interface and registers them, applying namespace qualification and
//! cross-reference resolution. Its mutable state (namespace, active cache,
//! unresolved cache-ref flag) is per-interface-build and must never be
//! shared across concurrent builds of different interfaces; the internal
//! mutex only exists so deferred entries can retry through the same
//! instance.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use rowbind_core::{
    BuildError, CacheBuilder, CacheConfig, CacheKind, CommandKind, Discriminator, EvictionPolicy,
    ExecutionMode, Incomplete, KeyStrategy, NoPropertyInfo, ParameterMap, ParameterMapping,
    ParameterMode, Properties, ResultFlags, ResultMap, ResultMapBuilder, ResultMapping,
    ResultMappingBuilder, ResultSetShape, SqlSource, StatementBuilder, StatementDefinition,
    StorageType, Result, DefaultTypeHandlers, TypeHandlerResolver, TypePropertyProbe, ValueType,
};
use rowbind_registry::Registry;

/// The qualifying separator between a namespace and a local id
const NAMESPACE_SEPARATOR: char = '.';

/// Id suffix of result/parameter maps synthesized inline for one statement
const INLINE_SUFFIX: &str = "-Inline";

/// Declarative inputs for one result mapping
#[derive(Debug, Clone, Default)]
pub struct MappingDecl {
    /// Target property
    pub property: Option<String>,
    /// Source column (possibly composite)
    pub column: Option<String>,
    /// Explicit value type; probed from the target type when absent
    pub value_type: Option<ValueType>,
    /// Declared storage type
    pub storage_type: Option<StorageType>,
    /// Explicit type-handler override
    pub type_handler: Option<String>,
    /// Nested query reference
    pub nested_query: Option<String>,
    /// Nested result-map reference
    pub nested_result_map: Option<String>,
    /// Column prefix for the nested result map
    pub column_prefix: Option<String>,
    /// Foreign-key column driving a composite parent-key mapping
    pub foreign_column: Option<String>,
    /// Comma list of columns that must be non-null before nested assembly
    pub not_null_columns: Option<String>,
    /// Role flags
    pub flags: ResultFlags,
    /// Lazy fetch
    pub lazy: bool,
}

/// Per-statement option values after marker/default resolution
#[derive(Debug, Clone)]
pub struct StatementOptions {
    /// Execution mode
    pub execution_mode: ExecutionMode,
    /// Fetch size hint
    pub fetch_size: Option<u32>,
    /// Execution timeout
    pub timeout_ms: Option<u64>,
    /// Result-set fetch shape
    pub result_set_shape: ResultSetShape,
    /// Flush the namespace cache
    pub flush_cache: bool,
    /// Serve from the namespace cache
    pub use_cache: bool,
    /// Comma-separated named result-set labels
    pub result_sets: Option<String>,
}

/// Resolved key-generation configuration for one statement
#[derive(Debug, Clone)]
pub struct KeyConfig {
    /// The strategy
    pub strategy: KeyStrategy,
    /// Property receiving the key
    pub property: Option<String>,
    /// Column supplying the key
    pub column: Option<String>,
}

impl KeyConfig {
    /// The no-op key configuration
    pub fn none() -> Self {
        Self {
            strategy: KeyStrategy::None,
            property: None,
            column: None,
        }
    }
}

#[derive(Debug, Default)]
struct AssistantState {
    namespace: Option<String>,
    cache: Option<Arc<CacheConfig>>,
    // referenced namespace whose cache has not resolved yet
    unresolved_cache_ref: Option<String>,
}

/// Namespace-scoped builder/registrar for one interface build
pub struct MappingAssistant {
    registry: Arc<Registry>,
    resource: String,
    type_handlers: Arc<dyn TypeHandlerResolver>,
    probe: Arc<dyn TypePropertyProbe>,
    state: Mutex<AssistantState>,
}

impl MappingAssistant {
    /// An assistant building entities declared by `resource`
    pub fn new(registry: Arc<Registry>, resource: impl Into<String>) -> Self {
        Self {
            registry,
            resource: resource.into(),
            type_handlers: Arc::new(DefaultTypeHandlers),
            probe: Arc::new(NoPropertyInfo),
            state: Mutex::new(AssistantState::default()),
        }
    }

    /// Replace the type-handler resolver collaborator
    pub fn with_type_handlers(mut self, handlers: Arc<dyn TypeHandlerResolver>) -> Self {
        self.type_handlers = handlers;
        self
    }

    /// Replace the property-type probe collaborator
    pub fn with_property_probe(mut self, probe: Arc<dyn TypePropertyProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// The shared registry
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The resource string naming what is being built
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Bind the namespace; set-once, mismatch-checked
    pub fn set_namespace(&self, namespace: &str) -> Result<()> {
        if namespace.is_empty() {
            return Err(BuildError::MissingNamespace);
        }
        let mut state = self.state.lock();
        if let Some(current) = &state.namespace {
            if current != namespace {
                return Err(BuildError::NamespaceMismatch {
                    expected: current.clone(),
                    found: namespace.to_string(),
                });
            }
        }
        state.namespace = Some(namespace.to_string());
        Ok(())
    }

    /// The bound namespace, if set
    pub fn current_namespace(&self) -> Option<String> {
        self.state.lock().namespace.clone()
    }

    /// The namespace whose cache-ref is still unresolved, if any
    pub fn unresolved_cache_ref(&self) -> Option<String> {
        self.state.lock().unresolved_cache_ref.clone()
    }

    /// Namespace-qualify an id
    ///
    /// References already containing a separator are taken as fully
    /// qualified by the caller. Local (non-reference) ids must not carry a
    /// foreign separator; an id already prefixed with the current namespace
    /// passes through.
    pub fn qualify(&self, id: Option<&str>, is_reference: bool) -> Result<Option<String>> {
        let id = match id {
            Some(id) if !id.is_empty() => id,
            _ => return Ok(None),
        };
        if is_reference {
            if id.contains(NAMESPACE_SEPARATOR) {
                return Ok(Some(id.to_string()));
            }
        } else {
            let namespace = self.require_namespace()?;
            if id.starts_with(&format!("{namespace}{NAMESPACE_SEPARATOR}")) {
                return Ok(Some(id.to_string()));
            }
            if id.contains(NAMESPACE_SEPARATOR) {
                return Err(BuildError::IllegalSeparator { id: id.to_string() });
            }
        }
        let namespace = self.require_namespace()?;
        Ok(Some(format!("{namespace}{NAMESPACE_SEPARATOR}{id}")))
    }

    fn require_namespace(&self) -> Result<String> {
        self.state
            .lock()
            .namespace
            .clone()
            .ok_or(BuildError::MissingNamespace)
    }

    // ==================== caches ====================

    /// Register a new cache for the current namespace and make it active
    #[allow(clippy::too_many_arguments)]
    pub fn use_new_cache(
        &self,
        kind: CacheKind,
        eviction: EvictionPolicy,
        flush_interval_ms: Option<u64>,
        size: Option<usize>,
        read_write: bool,
        blocking: bool,
        properties: Properties,
    ) -> Result<Arc<CacheConfig>> {
        let namespace = self.require_namespace()?;
        let cache = self.registry.add_cache(
            CacheBuilder::new(namespace)
                .kind(kind)
                .eviction(eviction)
                .flush_interval_ms(flush_interval_ms)
                .size(size)
                .read_write(read_write)
                .blocking(blocking)
                .properties(properties)
                .build(),
        );
        self.state.lock().cache = Some(cache.clone());
        Ok(cache)
    }

    /// Share the cache declared by another namespace
    ///
    /// While the referenced cache is missing the unresolved flag stays set;
    /// statement registration is refused until it clears.
    pub fn use_cache_ref(&self, namespace: &str) -> Result<Arc<CacheConfig>> {
        if namespace.is_empty() {
            return Err(BuildError::CacheRefTarget);
        }
        let mut state = self.state.lock();
        state.unresolved_cache_ref = Some(namespace.to_string());
        match self.registry.cache(namespace) {
            Some(cache) => {
                state.cache = Some(cache.clone());
                state.unresolved_cache_ref = None;
                Ok(cache)
            }
            None => Err(Incomplete::CacheRef {
                namespace: namespace.to_string(),
            }
            .into()),
        }
    }

    // ==================== parameter maps ====================

    /// Qualify, build, and register an explicit parameter map
    pub fn add_parameter_map(
        &self,
        id: &str,
        parameter_type: ValueType,
        mappings: Vec<ParameterMapping>,
    ) -> Result<Arc<ParameterMap>> {
        let id = self
            .qualify(Some(id), false)?
            .ok_or(BuildError::MissingNamespace)?;
        self.registry
            .add_parameter_map(ParameterMap::new(id, parameter_type, mappings))
    }

    /// Build one parameter mapping, inferring the value type when needed
    pub fn build_parameter_mapping(
        &self,
        parameter_type: &ValueType,
        property: &str,
        value_type: Option<ValueType>,
        storage_type: Option<StorageType>,
        mode: ParameterMode,
        type_handler: Option<&str>,
    ) -> ParameterMapping {
        let value_type = match value_type {
            Some(value_type) => value_type,
            None if storage_type == Some(StorageType::Cursor) => ValueType::named("ResultSet"),
            None => self
                .probe
                .property_type(parameter_type, property)
                .unwrap_or(ValueType::Object),
        };
        let handler = self
            .type_handlers
            .resolve(&value_type, storage_type, type_handler);
        ParameterMapping {
            property: property.to_string(),
            value_type,
            storage_type,
            type_handler: handler,
            mode,
        }
    }

    // ==================== result maps ====================

    /// Qualify, inherit, build, and register a result map
    ///
    /// A declared parent must already be registered (retryable otherwise).
    /// Parent mappings not overridden by the child are carried over; if the
    /// child declares any constructor-argument mapping, every inherited
    /// constructor-argument mapping is dropped.
    pub fn add_result_map(
        &self,
        id: &str,
        target_type: ValueType,
        parent_id: Option<&str>,
        discriminator: Option<Discriminator>,
        mut mappings: Vec<ResultMapping>,
    ) -> Result<Arc<ResultMap>> {
        let id = self
            .qualify(Some(id), false)?
            .ok_or(BuildError::MissingNamespace)?;
        let parent_id = self.qualify(parent_id, true)?;

        if let Some(parent_id) = parent_id {
            let parent = self
                .registry
                .result_map(&parent_id)
                .ok_or(Incomplete::ParentResultMap { id: parent_id })?;

            let child_declares_constructor = mappings.iter().any(|m| m.flags().constructor);
            let inherited = parent
                .mappings()
                .iter()
                .filter(|m| !mappings.contains(*m))
                .filter(|m| !(child_declares_constructor && m.flags().constructor))
                .cloned()
                .collect::<Vec<_>>();
            mappings.extend(inherited);
        }

        self.registry.add_result_map(
            ResultMapBuilder::new(id, target_type)
                .mappings(mappings)
                .discriminator(discriminator)
                .build(),
        )
    }

    /// Build a discriminator: the selector mapping plus qualified variant
    /// result-map ids
    ///
    /// The selector never carries identifier or constructor flags.
    pub fn build_discriminator(
        &self,
        target_type: &ValueType,
        column: &str,
        value_type: Option<ValueType>,
        storage_type: Option<StorageType>,
        type_handler: Option<&str>,
        cases: Vec<(String, String)>,
    ) -> Result<Discriminator> {
        let selector = self.build_result_mapping(
            target_type,
            MappingDecl {
                column: Some(column.to_string()),
                value_type,
                storage_type,
                type_handler: type_handler.map(str::to_string),
                ..MappingDecl::default()
            },
        )?;
        let mut qualified = Vec::with_capacity(cases.len());
        for (value, result_map) in cases {
            let id = self
                .qualify(Some(&result_map), true)?
                .ok_or(BuildError::MissingNamespace)?;
            qualified.push((value, id));
        }
        Ok(Discriminator::new(selector, qualified))
    }

    // ==================== statements ====================

    /// Qualify, resolve, build, and register a statement definition
    ///
    /// Fatal while a cache reference is still pending. Explicit result-map
    /// references must already be registered (retryable); otherwise a
    /// result type synthesizes an inline map. The parameter map resolves
    /// analogously.
    #[allow(clippy::too_many_arguments)]
    pub fn add_statement(
        &self,
        id: &str,
        sql: Arc<dyn SqlSource>,
        command: CommandKind,
        options: StatementOptions,
        parameter_type: Option<ValueType>,
        parameter_map_ref: Option<&str>,
        result_map_refs: Option<&str>,
        result_type: Option<ValueType>,
        key: KeyConfig,
        database_variant: Option<String>,
        affects_data: bool,
    ) -> Result<Arc<StatementDefinition>> {
        if self.state.lock().unresolved_cache_ref.is_some() {
            return Err(BuildError::UnresolvedCacheRef);
        }
        let id = self
            .qualify(Some(id), false)?
            .ok_or(BuildError::MissingNamespace)?;
        debug!(id = %id, ?command, "building statement definition");

        let result_maps = self.statement_result_maps(result_map_refs, result_type, &id)?;
        let parameter_map =
            self.statement_parameter_map(parameter_map_ref, parameter_type.as_ref(), &id)?;

        let cache = self.state.lock().cache.clone();
        let statement = StatementBuilder::new(&id, sql, command)
            .resource(&self.resource)
            .execution_mode(options.execution_mode)
            .fetch_size(options.fetch_size)
            .timeout_ms(options.timeout_ms)
            .parameter_type(parameter_type.unwrap_or(ValueType::Object))
            .parameter_map(parameter_map)
            .result_maps(result_maps)
            .result_set_shape(options.result_set_shape)
            .flush_cache(options.flush_cache)
            .use_cache(options.use_cache)
            .cache(cache)
            .key_strategy(key.strategy)
            .key_property(key.property)
            .key_column(key.column)
            .database_variant(database_variant)
            .result_sets(options.result_sets.as_deref())
            .affects_data(affects_data)
            .build();
        self.registry.add_statement(statement)
    }

    fn statement_result_maps(
        &self,
        result_map_refs: Option<&str>,
        result_type: Option<ValueType>,
        statement_id: &str,
    ) -> Result<Vec<Arc<ResultMap>>> {
        if let Some(refs) = result_map_refs {
            let mut maps = Vec::new();
            for name in refs.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                let id = self
                    .qualify(Some(name), true)?
                    .ok_or(BuildError::MissingNamespace)?;
                let map = self.registry.result_map(&id).ok_or(Incomplete::ResultMap {
                    id,
                    referenced_from: statement_id.to_string(),
                })?;
                maps.push(map);
            }
            return Ok(maps);
        }
        if let Some(result_type) = result_type {
            // anonymous inline map; column correspondence is deferred to
            // execution-time automatic mapping
            let inline =
                ResultMapBuilder::new(format!("{statement_id}{INLINE_SUFFIX}"), result_type)
                    .build();
            return Ok(vec![Arc::new(inline)]);
        }
        Ok(Vec::new())
    }

    fn statement_parameter_map(
        &self,
        parameter_map_ref: Option<&str>,
        parameter_type: Option<&ValueType>,
        statement_id: &str,
    ) -> Result<Option<ParameterMap>> {
        if let Some(name) = parameter_map_ref {
            let id = self
                .qualify(Some(name), true)?
                .ok_or(BuildError::MissingNamespace)?;
            let map = self
                .registry
                .parameter_map(&id)
                .ok_or(Incomplete::ParameterMap { id })?;
            return Ok(Some((*map).clone()));
        }
        if let Some(parameter_type) = parameter_type {
            return Ok(Some(ParameterMap::new(
                format!("{statement_id}{INLINE_SUFFIX}"),
                parameter_type.clone(),
                Vec::new(),
            )));
        }
        Ok(None)
    }

    // ==================== result mappings ====================

    /// Build one result mapping from its declarative inputs
    ///
    /// The effective value type is the explicit one, else the inferred
    /// natural type of the target property, else opaque. A mapping driven
    /// by a nested query or foreign-key column parses its column spec as a
    /// composite when it contains `=` or `,` separators.
    pub fn build_result_mapping(
        &self,
        target_type: &ValueType,
        decl: MappingDecl,
    ) -> Result<ResultMapping> {
        let value_type = match decl.value_type {
            Some(value_type) => value_type,
            None => decl
                .property
                .as_deref()
                .and_then(|property| self.probe.property_type(target_type, property))
                .unwrap_or(ValueType::Object),
        };
        let handler =
            self.type_handlers
                .resolve(&value_type, decl.storage_type, decl.type_handler.as_deref());

        let composites = if decl.nested_query.is_some() || decl.foreign_column.is_some() {
            decl.column
                .as_deref()
                .map(parse_composite_column)
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        ResultMappingBuilder::new(decl.property, decl.column, value_type)
            .composites(composites)
            .storage_type(decl.storage_type)
            .type_handler(handler)
            .nested_query_id(self.qualify(decl.nested_query.as_deref(), true)?)
            .nested_result_map_id(self.qualify(decl.nested_result_map.as_deref(), true)?)
            .column_prefix(decl.column_prefix)
            .not_null_columns(parse_multiple_columns(decl.not_null_columns.as_deref()))
            .foreign_column(decl.foreign_column)
            .flags(decl.flags)
            .lazy(decl.lazy)
            .build()
    }
}

/// Parse a composite column spec into property-to-column pairs
///
/// Syntax: tokens delimited by `{`, `}`, `=`, `,`, or space; token pairs
/// alternate property/column. A spec with no `=` or `,` is a single simple
/// column and yields no pairs.
pub fn parse_composite_column(column: &str) -> Vec<(String, String)> {
    if !column.contains('=') && !column.contains(',') {
        return Vec::new();
    }
    let mut tokens = column
        .split(['{', '}', '=', ',', ' '])
        .filter(|token| !token.is_empty());
    let mut pairs = Vec::new();
    while let (Some(property), Some(col)) = (tokens.next(), tokens.next()) {
        pairs.push((property.to_string(), col.to_string()));
    }
    pairs
}

/// Parse a comma list of column names, tolerating braces and spaces
///
/// A spec with no comma is a single column and passes through whole.
pub fn parse_multiple_columns(columns: Option<&str>) -> Vec<String> {
    let Some(columns) = columns else {
        return Vec::new();
    };
    if columns.is_empty() {
        return Vec::new();
    }
    if !columns.contains(',') {
        return vec![columns.to_string()];
    }
    columns
        .split(['{', '}', ',', ' '])
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assistant() -> MappingAssistant {
        let assistant = MappingAssistant::new(Arc::new(Registry::new()), "app.UserMapper (test)");
        assistant.set_namespace("app.UserMapper").unwrap();
        assistant
    }

    #[test]
    fn test_namespace_set_once() {
        let assistant = assistant();
        // same value is fine
        assistant.set_namespace("app.UserMapper").unwrap();
        let err = assistant.set_namespace("app.OrderMapper").unwrap_err();
        assert!(matches!(err, BuildError::NamespaceMismatch { .. }));
    }

    #[test]
    fn test_empty_namespace_rejected() {
        let assistant = MappingAssistant::new(Arc::new(Registry::new()), "r");
        assert!(matches!(
            assistant.set_namespace("").unwrap_err(),
            BuildError::MissingNamespace
        ));
    }

    #[test]
    fn test_qualify_rules() {
        let assistant = assistant();
        assert_eq!(assistant.qualify(None, false).unwrap(), None);
        assert_eq!(assistant.qualify(Some(""), true).unwrap(), None);
        // reference with a separator is already qualified
        assert_eq!(
            assistant.qualify(Some("other.Mapper.map"), true).unwrap(),
            Some("other.Mapper.map".to_string())
        );
        // unqualified reference gets the current namespace
        assert_eq!(
            assistant.qualify(Some("userMap"), true).unwrap(),
            Some("app.UserMapper.userMap".to_string())
        );
        // non-reference already under this namespace passes through
        assert_eq!(
            assistant.qualify(Some("app.UserMapper.userMap"), false).unwrap(),
            Some("app.UserMapper.userMap".to_string())
        );
        // non-reference with a foreign separator is fatal
        assert!(matches!(
            assistant.qualify(Some("other.map"), false).unwrap_err(),
            BuildError::IllegalSeparator { .. }
        ));
        assert_eq!(
            assistant.qualify(Some("userMap"), false).unwrap(),
            Some("app.UserMapper.userMap".to_string())
        );
    }

    #[test]
    fn test_cache_ref_unresolved_flag_protocol() {
        let assistant = assistant();
        let err = assistant.use_cache_ref("app.OrderMapper").unwrap_err();
        assert!(err.is_incomplete());
        assert_eq!(
            assistant.unresolved_cache_ref().as_deref(),
            Some("app.OrderMapper")
        );

        // the referenced cache appears, the retry clears the flag
        assistant
            .registry()
            .add_cache(CacheBuilder::new("app.OrderMapper").build());
        assistant.use_cache_ref("app.OrderMapper").unwrap();
        assert_eq!(assistant.unresolved_cache_ref(), None);
    }

    #[test]
    fn test_statement_registration_fatal_while_cache_ref_pending() {
        let assistant = assistant();
        let _ = assistant.use_cache_ref("app.OrderMapper");
        let err = assistant
            .add_statement(
                "findUser",
                Arc::new(rowbind_core::StaticSqlSource::from_fragments(&[
                    "select 1".to_string()
                ])),
                CommandKind::Select,
                StatementOptions {
                    execution_mode: ExecutionMode::Prepared,
                    fetch_size: None,
                    timeout_ms: None,
                    result_set_shape: ResultSetShape::Default,
                    flush_cache: false,
                    use_cache: true,
                    result_sets: None,
                },
                None,
                None,
                None,
                Some(ValueType::named("User")),
                KeyConfig::none(),
                None,
                false,
            )
            .unwrap_err();
        assert!(matches!(err, BuildError::UnresolvedCacheRef));
    }

    #[test]
    fn test_child_ctor_args_replace_inherited_ones() {
        let assistant = assistant();
        let ctor = |column: &str| {
            assistant
                .build_result_mapping(
                    &ValueType::named("User"),
                    MappingDecl {
                        column: Some(column.to_string()),
                        value_type: Some(ValueType::named("Long")),
                        flags: ResultFlags {
                            id: false,
                            constructor: true,
                        },
                        ..MappingDecl::default()
                    },
                )
                .unwrap()
        };
        let prop = |property: &str, column: &str| {
            assistant
                .build_result_mapping(
                    &ValueType::named("User"),
                    MappingDecl {
                        property: Some(property.to_string()),
                        column: Some(column.to_string()),
                        value_type: Some(ValueType::named("String")),
                        ..MappingDecl::default()
                    },
                )
                .unwrap()
        };

        assistant
            .add_result_map(
                "parentMap",
                ValueType::named("User"),
                None,
                None,
                vec![ctor("id"), prop("name", "user_name")],
            )
            .unwrap();

        // the child declares its own constructor argument
        let child = assistant
            .add_result_map(
                "childMap",
                ValueType::named("Admin"),
                Some("parentMap"),
                None,
                vec![ctor("admin_id")],
            )
            .unwrap();
        let inherited_ctor = child
            .mappings()
            .iter()
            .filter(|m| m.flags().constructor)
            .collect::<Vec<_>>();
        assert_eq!(inherited_ctor.len(), 1);
        assert_eq!(inherited_ctor[0].column(), Some("admin_id"));
        // the non-constructor parent mapping is carried over
        assert!(child
            .mappings()
            .iter()
            .any(|m| m.property() == Some("name")));
    }

    #[test]
    fn test_missing_parent_is_retryable() {
        let assistant = assistant();
        let err = assistant
            .add_result_map(
                "childMap",
                ValueType::named("Admin"),
                Some("missingParent"),
                None,
                Vec::new(),
            )
            .unwrap_err();
        assert!(err.is_incomplete());
    }

    #[test]
    fn test_composite_column_parsing() {
        assert_eq!(
            parse_composite_column("{a=colA,b=colB}"),
            vec![
                ("a".to_string(), "colA".to_string()),
                ("b".to_string(), "colB".to_string())
            ]
        );
        assert_eq!(
            parse_composite_column("x=col_x, y=col_y"),
            vec![
                ("x".to_string(), "col_x".to_string()),
                ("y".to_string(), "col_y".to_string())
            ]
        );
        // simple columns yield no pairs
        assert_eq!(parse_composite_column("plain_column"), Vec::<(String, String)>::new());
    }

    #[test]
    fn test_multiple_column_parsing() {
        assert_eq!(
            parse_multiple_columns(Some("{name, email}")),
            vec!["name".to_string(), "email".to_string()]
        );
        assert_eq!(
            parse_multiple_columns(Some("a,b,c")),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        // a spec with no comma is one column, braces and all
        assert_eq!(parse_multiple_columns(Some("order_id")), vec!["order_id".to_string()]);
        assert_eq!(parse_multiple_columns(Some("")), Vec::<String>::new());
        assert_eq!(parse_multiple_columns(None), Vec::<String>::new());
    }

    #[test]
    fn test_value_type_probe_fallback() {
        let mut table = rowbind_core::PropertyTypeTable::new();
        let user = ValueType::named("User");
        table.declare(user.clone(), "name", ValueType::named("String"));
        let assistant = MappingAssistant::new(Arc::new(Registry::new()), "r")
            .with_property_probe(Arc::new(table));
        assistant.set_namespace("app.UserMapper").unwrap();

        let probed = assistant
            .build_result_mapping(
                &user,
                MappingDecl {
                    property: Some("name".to_string()),
                    column: Some("user_name".to_string()),
                    ..MappingDecl::default()
                },
            )
            .unwrap();
        assert_eq!(probed.value_type(), &ValueType::named("String"));

        let unknown = assistant
            .build_result_mapping(
                &user,
                MappingDecl {
                    property: Some("shadow".to_string()),
                    column: Some("shadow".to_string()),
                    ..MappingDecl::default()
                },
            )
            .unwrap();
        assert_eq!(unknown.value_type(), &ValueType::Object);
    }
}
