//! Descriptor-driven interface compiler
//!
//! [`InterfaceBuilder`] walks one [`InterfaceDescriptor`] and registers
//! everything it declares: the namespace cache or cache reference, one
//! synthesized result map per read method, and one statement definition per
//! method with a marker matching the active database variant. Methods that
//! fail on a missing cross-reference are parked on the registry's pending
//! queue and retried at the end of every subsequent build.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use rowbind_core::{
    BuildError, CommandKind, DescriptorLoader, Discriminator, ExecutionMode, FetchTiming,
    Incomplete, KeyStrategy, NoCompanion, Result, ResultFlags, ResultMapping, ResultSetShape,
    SqlSource, SqlSourceFactory, TextSourceFactory, ValueType, derive_effective_type,
    resolve_placeholders, statement::SELECT_KEY_SUFFIX, FlushPolicy, Properties,
};
use rowbind_registry::Registry;

use crate::assistant::{KeyConfig, MappingAssistant, MappingDecl, StatementOptions};
use crate::descriptor::{
    CtorArgMarker, InterfaceDescriptor, KeyMarker, MethodDescriptor, OptionsMarker,
    PropertyMarker, StatementMarker,
};
use crate::resolver::{CacheRefResolver, MethodResolver};

/// Compiles one mapping-interface descriptor into registered metadata
pub struct InterfaceBuilder {
    assistant: Arc<MappingAssistant>,
    descriptor: InterfaceDescriptor,
    loader: Arc<dyn DescriptorLoader>,
    sql_factory: Arc<dyn SqlSourceFactory>,
}

impl InterfaceBuilder {
    /// A builder with the default collaborators (no companion documents,
    /// static SQL sources)
    pub fn new(registry: Arc<Registry>, descriptor: InterfaceDescriptor) -> Self {
        let resource = format!("{} (interface)", descriptor.name);
        Self::with_assistant(Arc::new(MappingAssistant::new(registry, resource)), descriptor)
    }

    /// A builder over a pre-configured assistant
    pub fn with_assistant(assistant: Arc<MappingAssistant>, descriptor: InterfaceDescriptor) -> Self {
        Self {
            assistant,
            descriptor,
            loader: Arc::new(NoCompanion),
            sql_factory: Arc::new(TextSourceFactory),
        }
    }

    /// Replace the companion-document loader
    pub fn with_loader(mut self, loader: Arc<dyn DescriptorLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Replace the SQL-source factory
    pub fn with_sql_factory(mut self, factory: Arc<dyn SqlSourceFactory>) -> Self {
        self.sql_factory = factory;
        self
    }

    /// The namespace-scoped assistant
    pub fn assistant(&self) -> &Arc<MappingAssistant> {
        &self.assistant
    }

    /// The descriptor under compilation
    pub fn descriptor(&self) -> &InterfaceDescriptor {
        &self.descriptor
    }

    /// Compile the interface
    ///
    /// Idempotent per resource. Always finishes with a retry sweep over the
    /// pending queue, so entities parked by earlier builds resolve as soon
    /// as their references appear.
    pub fn parse(self: &Arc<Self>) -> Result<()> {
        let registry = Arc::clone(self.assistant.registry());
        let resource = self.assistant.resource().to_string();
        if !registry.is_resource_loaded(&resource) {
            debug!(interface = %self.descriptor.name, "compiling mapping interface");
            self.loader.load_companion(&self.descriptor.name)?;
            registry.mark_resource_loaded(resource);
            self.assistant.set_namespace(&self.descriptor.name)?;
            self.parse_cache()?;
            self.parse_cache_ref()?;
            for method in &self.descriptor.methods {
                if method.synthetic || method.default_impl {
                    continue;
                }
                if method.has_select_marker() && method.result_map_refs.is_empty() {
                    self.parse_result_map(method)?;
                }
                match self.parse_statement(method) {
                    Ok(()) => {}
                    Err(err) if err.is_incomplete() => {
                        debug!(
                            method = %method.name,
                            error = %err,
                            "statement deferred on missing reference"
                        );
                        registry.pending().push(Box::new(MethodResolver::new(
                            Arc::clone(self),
                            method.clone(),
                        )));
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        registry.pending().retry_all()
    }

    // ==================== namespace-level markers ====================

    fn parse_cache(&self) -> Result<()> {
        if let Some(marker) = &self.descriptor.cache {
            let variables = &self.assistant.registry().settings().variables;
            let properties = marker
                .properties
                .iter()
                .map(|(key, value)| (key.clone(), resolve_placeholders(value, variables)))
                .collect::<Properties>();
            self.assistant.use_new_cache(
                marker.kind.clone(),
                marker.eviction.clone(),
                marker.flush_interval_ms,
                marker.size,
                marker.read_write,
                marker.blocking,
                properties,
            )?;
        }
        Ok(())
    }

    fn parse_cache_ref(&self) -> Result<()> {
        let Some(marker) = &self.descriptor.cache_ref else {
            return Ok(());
        };
        let target = match (&marker.type_name, &marker.name) {
            (Some(type_name), None) => type_name.clone(),
            (None, Some(name)) => name.clone(),
            _ => return Err(BuildError::CacheRefTarget),
        };
        let registry = self.assistant.registry();
        registry.add_cache_ref(self.descriptor.name.clone(), target.clone());
        match self.assistant.use_cache_ref(&target) {
            Ok(_) => Ok(()),
            Err(err) if err.is_incomplete() => {
                registry.pending().push(Box::new(CacheRefResolver::new(
                    Arc::clone(&self.assistant),
                    target,
                )));
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    // ==================== result maps ====================

    /// Synthesize and register the method's result map (plus one per
    /// discriminator case, each inheriting from the owner map)
    fn parse_result_map(&self, method: &MethodDescriptor) -> Result<()> {
        let target_type = self.method_result_type(method);
        let local_id = self.result_map_id(method);

        let mut mappings = Vec::new();
        self.apply_ctor_args(&target_type, &method.ctor_args, &mut mappings)?;
        self.apply_results(&target_type, &method.results, &mut mappings)?;
        let discriminator = self.apply_discriminator(&target_type, &local_id, method)?;
        self.assistant
            .add_result_map(&local_id, target_type, None, discriminator, mappings)?;

        if let Some(marker) = &method.discriminator {
            for case in &marker.cases {
                let mut case_mappings = Vec::new();
                self.apply_ctor_args(&case.target_type, &case.ctor_args, &mut case_mappings)?;
                self.apply_results(&case.target_type, &case.results, &mut case_mappings)?;
                self.assistant.add_result_map(
                    &format!("{local_id}-{}", case.value),
                    case.target_type.clone(),
                    Some(&local_id),
                    None,
                    case_mappings,
                )?;
            }
        }
        Ok(())
    }

    fn apply_discriminator(
        &self,
        target_type: &ValueType,
        owner_id: &str,
        method: &MethodDescriptor,
    ) -> Result<Option<Discriminator>> {
        let Some(marker) = &method.discriminator else {
            return Ok(None);
        };
        let value_type = marker
            .value_type
            .clone()
            .unwrap_or_else(|| ValueType::named("String"));
        let cases = marker
            .cases
            .iter()
            .map(|case| (case.value.clone(), format!("{owner_id}-{}", case.value)))
            .collect();
        self.assistant
            .build_discriminator(
                target_type,
                &marker.column,
                Some(value_type),
                marker.storage_type,
                marker.type_handler.as_deref(),
                cases,
            )
            .map(Some)
    }

    fn apply_results(
        &self,
        target_type: &ValueType,
        markers: &[PropertyMarker],
        mappings: &mut Vec<ResultMapping>,
    ) -> Result<()> {
        for marker in markers {
            let nested = marker.nested.as_ref();
            let mapping = self.assistant.build_result_mapping(
                target_type,
                MappingDecl {
                    property: non_empty(&marker.property),
                    column: marker.column.clone(),
                    value_type: marker.value_type.clone(),
                    storage_type: marker.storage_type,
                    type_handler: marker.type_handler.clone(),
                    nested_query: nested.and_then(|n| n.select.clone()),
                    nested_result_map: nested.and_then(|n| n.result_map.clone()),
                    column_prefix: nested.and_then(|n| n.column_prefix.clone()),
                    foreign_column: nested.and_then(|n| n.foreign_column.clone()),
                    not_null_columns: nested.and_then(|n| n.not_null_columns.clone()),
                    flags: ResultFlags {
                        id: marker.id,
                        constructor: false,
                    },
                    lazy: self.is_lazy(nested.map(|n| n.fetch)),
                },
            )?;
            mappings.push(mapping);
        }
        Ok(())
    }

    fn apply_ctor_args(
        &self,
        target_type: &ValueType,
        markers: &[CtorArgMarker],
        mappings: &mut Vec<ResultMapping>,
    ) -> Result<()> {
        for marker in markers {
            let mapping = self.assistant.build_result_mapping(
                target_type,
                MappingDecl {
                    property: marker.name.clone(),
                    column: marker.column.clone(),
                    value_type: marker.value_type.clone(),
                    storage_type: marker.storage_type,
                    type_handler: marker.type_handler.clone(),
                    nested_query: marker.select.clone(),
                    nested_result_map: marker.result_map.clone(),
                    column_prefix: marker.column_prefix.clone(),
                    foreign_column: None,
                    not_null_columns: None,
                    flags: ResultFlags {
                        id: marker.id,
                        constructor: true,
                    },
                    lazy: false,
                },
            )?;
            mappings.push(mapping);
        }
        Ok(())
    }

    fn is_lazy(&self, fetch: Option<FetchTiming>) -> bool {
        match fetch.unwrap_or_default() {
            FetchTiming::Default => self.assistant.registry().settings().lazy_loading_enabled,
            FetchTiming::Eager => false,
            FetchTiming::Lazy => true,
        }
    }

    /// Deterministic local id of the synthesized result map
    ///
    /// An explicit group id wins; otherwise the id is the method name with
    /// one `-SimpleName` suffix per declared parameter, or `-void` for a
    /// parameterless method.
    fn result_map_id(&self, method: &MethodDescriptor) -> String {
        if let Some(group) = &method.result_group_id {
            return group.clone();
        }
        let mut suffix = String::new();
        for parameter in &method.parameters {
            suffix.push('-');
            suffix.push_str(self.descriptor.bindings.resolve(parameter).simple_name());
        }
        if suffix.is_empty() {
            suffix.push_str("-void");
        }
        format!("{}{}", method.name, suffix)
    }

    // ==================== statements ====================

    /// Compile and register the statement a method declares, if any
    ///
    /// Retryable while the namespace's cache reference is unresolved; the
    /// whole method re-runs from the pending queue once it clears.
    pub(crate) fn parse_statement(&self, method: &MethodDescriptor) -> Result<()> {
        if let Some(namespace) = self.assistant.unresolved_cache_ref() {
            return Err(Incomplete::CacheRef { namespace }.into());
        }
        let qualified_method = format!("{}.{}", self.descriptor.name, method.name);
        let Some(marker) = self.select_by_variant(
            &method.statements,
            |m| m.variant(),
            StatementMarker::describe,
            &qualified_method,
            true,
        )?
        else {
            return Ok(());
        };

        let command = marker.command_kind();
        let is_select = command == CommandKind::Select;
        let parameter_type = self.method_parameter_type(method);
        let sql = self.build_sql_source(marker, method, parameter_type.as_ref());

        let options = self.select_by_variant(
            &method.options,
            |o| o.variant.as_deref(),
            describe_options,
            &qualified_method,
            false,
        )?;
        let key = self.resolve_key_config(method, command, options, parameter_type.as_ref(), &qualified_method)?;

        let settings_shape = self.assistant.registry().settings().default_result_set_shape;
        let statement_options = match options {
            Some(options) => StatementOptions {
                execution_mode: options.execution_mode,
                fetch_size: options.fetch_size,
                timeout_ms: options.timeout_ms,
                result_set_shape: options.result_set_shape.unwrap_or(settings_shape),
                flush_cache: match options.flush_cache {
                    FlushPolicy::Default => command.is_mutating(),
                    FlushPolicy::True => true,
                    FlushPolicy::False => false,
                },
                use_cache: is_select && options.use_cache,
                result_sets: options.result_sets.clone(),
            },
            None => StatementOptions {
                execution_mode: ExecutionMode::Prepared,
                fetch_size: None,
                timeout_ms: None,
                result_set_shape: settings_shape,
                flush_cache: command.is_mutating(),
                use_cache: is_select,
                result_sets: None,
            },
        };

        // reads resolve through a (declared or synthesized) result map;
        // writes get an inline map from the effective return type
        let result_map_refs = if is_select {
            if method.result_map_refs.is_empty() {
                Some(self.result_map_id(method))
            } else {
                Some(method.result_map_refs.join(","))
            }
        } else {
            None
        };

        self.assistant.add_statement(
            &method.name,
            sql,
            command,
            statement_options,
            parameter_type,
            None,
            result_map_refs.as_deref(),
            Some(self.method_result_type(method)),
            key,
            marker.variant().map(str::to_string),
            marker.affects_data(),
        )?;
        Ok(())
    }

    fn resolve_key_config(
        &self,
        method: &MethodDescriptor,
        command: CommandKind,
        options: Option<&OptionsMarker>,
        parameter_type: Option<&ValueType>,
        qualified_method: &str,
    ) -> Result<KeyConfig> {
        if !matches!(command, CommandKind::Insert | CommandKind::Update) {
            return Ok(KeyConfig::none());
        }
        if let Some(key_marker) = self.select_by_variant(
            &method.key_markers,
            |k| k.variant.as_deref(),
            describe_key,
            qualified_method,
            false,
        )? {
            return self.register_select_key(method, key_marker, parameter_type);
        }
        if let Some(options) = options {
            // the declared key names are recorded even when retrieval is off
            return Ok(KeyConfig {
                strategy: if options.use_generated_keys {
                    KeyStrategy::PostRetrieval
                } else {
                    KeyStrategy::None
                },
                property: options.key_property.clone(),
                column: options.key_column.clone(),
            });
        }
        let settings = self.assistant.registry().settings();
        if settings.use_generated_keys {
            return Ok(KeyConfig {
                strategy: KeyStrategy::PostRetrieval,
                property: None,
                column: None,
            });
        }
        Ok(KeyConfig::none())
    }

    /// Register the auxiliary key-retrieval SELECT and its strategy
    fn register_select_key(
        &self,
        method: &MethodDescriptor,
        marker: &KeyMarker,
        parameter_type: Option<&ValueType>,
    ) -> Result<KeyConfig> {
        let aux_id = format!("{}{}", method.name, SELECT_KEY_SUFFIX);
        let sql = self.sql_factory.from_text(
            &marker.statement,
            parameter_type.unwrap_or(&ValueType::Object),
        );
        let aux_options = StatementOptions {
            execution_mode: marker.execution_mode,
            fetch_size: None,
            timeout_ms: None,
            result_set_shape: ResultSetShape::Default,
            flush_cache: false,
            use_cache: false,
            result_sets: None,
        };
        let statement = self.assistant.add_statement(
            &aux_id,
            sql,
            CommandKind::Select,
            aux_options,
            parameter_type.cloned(),
            None,
            None,
            Some(marker.result_type.clone()),
            KeyConfig {
                strategy: KeyStrategy::None,
                property: Some(marker.key_property.clone()),
                column: marker.key_column.clone(),
            },
            marker.variant.clone(),
            false,
        )?;
        let strategy = KeyStrategy::AuxiliarySelect {
            statement_id: statement.id().to_string(),
            before: marker.before,
        };
        self.assistant
            .registry()
            .add_key_strategy(statement.id(), strategy.clone());
        Ok(KeyConfig {
            strategy,
            property: Some(marker.key_property.clone()),
            column: marker.key_column.clone(),
        })
    }

    // ==================== marker selection ====================

    /// Pick the marker matching the active database variant
    ///
    /// Two markers with the same variant identifier are a conflict. A
    /// variant-qualified marker beats an unqualified one; with no active
    /// variant only unqualified markers match. When markers exist but none
    /// matches, `error_if_no_match` decides between an error and `None`.
    fn select_by_variant<'a, T>(
        &self,
        items: &'a [T],
        variant_of: fn(&T) -> Option<&str>,
        describe: fn(&T) -> String,
        method: &str,
        error_if_no_match: bool,
    ) -> Result<Option<&'a T>> {
        let settings = self.assistant.registry().settings();
        let active = settings.database_variant.as_deref();
        let mut by_variant: HashMap<Option<&str>, &T> = HashMap::new();
        for item in items {
            if let Some(first) = by_variant.insert(variant_of(item), item) {
                return Err(BuildError::DuplicateVariant {
                    first: describe(first),
                    second: describe(item),
                    method: method.to_string(),
                });
            }
        }
        let chosen = active
            .and_then(|variant| by_variant.get(&Some(variant)))
            .or_else(|| by_variant.get(&None))
            .copied();
        if chosen.is_none() && error_if_no_match && !items.is_empty() {
            return Err(BuildError::NoMatchingVariant {
                method: method.to_string(),
                variant: active.map(str::to_string),
            });
        }
        Ok(chosen)
    }

    // ==================== signature derivation ====================

    fn method_result_type(&self, method: &MethodDescriptor) -> ValueType {
        derive_effective_type(
            &method.return_shape,
            &self.descriptor.bindings,
            method.map_key.is_some(),
            method.result_type_override.as_ref(),
        )
    }

    /// Effective parameter type: the single declared parameter's type, or
    /// the synthetic parameter map when there are several
    fn method_parameter_type(&self, method: &MethodDescriptor) -> Option<ValueType> {
        match method.parameters.as_slice() {
            [] => None,
            [only] => Some(self.descriptor.bindings.resolve(only)),
            _ => Some(ValueType::param_map()),
        }
    }

    fn build_sql_source(
        &self,
        marker: &StatementMarker,
        method: &MethodDescriptor,
        parameter_type: Option<&ValueType>,
    ) -> Arc<dyn SqlSource> {
        match marker {
            StatementMarker::Select { sql, .. }
            | StatementMarker::Update { sql, .. }
            | StatementMarker::Insert { sql, .. }
            | StatementMarker::Delete { sql, .. } => self
                .sql_factory
                .from_text(sql, parameter_type.unwrap_or(&ValueType::Object)),
            StatementMarker::SelectProvider { provider, .. }
            | StatementMarker::UpdateProvider { provider, .. }
            | StatementMarker::InsertProvider { provider, .. }
            | StatementMarker::DeleteProvider { provider, .. } => self
                .sql_factory
                .from_provider(provider, &self.descriptor.name, &method.name),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn describe_options(marker: &OptionsMarker) -> String {
    match &marker.variant {
        Some(variant) => format!("OPTIONS(variant={variant})"),
        None => "OPTIONS(no variant)".to_string(),
    }
}

fn describe_key(marker: &KeyMarker) -> String {
    match &marker.variant {
        Some(variant) => format!("SELECT-KEY(variant={variant})"),
        None => "SELECT-KEY(no variant)".to_string(),
    }
}
