//! Immutable result-assembly and parameter-mapping entities
//!
//! A [`ResultMap`] is a named tree of column-to-property rules used to
//! assemble one result object from one row (or row group). Entities here
//! are built once through their builders, registered, and never mutated
//! afterwards; the registry shares them behind `Arc`.

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};
use crate::source::TypeHandlerRef;
use crate::types::{StorageType, ValueType};

/// Role flags on a result mapping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFlags {
    /// Participates in row identity (grouping key for nested results)
    pub id: bool,
    /// Assembled through a constructor argument rather than a property set
    pub constructor: bool,
}

/// One column-to-property assembly rule
///
/// Equality is deliberately partial: two mappings are equal when they target
/// the same property through the same column spec with the same value type.
/// Flags, nested references, guard columns, storage type, and handler do not
/// discriminate -
/// this is what decides whether a child result map "overrides" an inherited
/// mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMapping {
    property: Option<String>,
    column: Option<String>,
    composites: Vec<(String, String)>,
    value_type: ValueType,
    storage_type: Option<StorageType>,
    type_handler: TypeHandlerRef,
    nested_query_id: Option<String>,
    nested_result_map_id: Option<String>,
    column_prefix: Option<String>,
    not_null_columns: Vec<String>,
    foreign_column: Option<String>,
    flags: ResultFlags,
    lazy: bool,
}

impl ResultMapping {
    /// Target property, if the mapping names one
    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    /// Source column, if the mapping is column-driven
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    /// Composite property-to-column pairs parsed from a compound column spec
    pub fn composites(&self) -> &[(String, String)] {
        &self.composites
    }

    /// Resolved value type of the mapped property
    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    /// Declared storage column type, if any
    pub fn storage_type(&self) -> Option<StorageType> {
        self.storage_type
    }

    /// Resolved type-handler reference
    pub fn type_handler(&self) -> &TypeHandlerRef {
        &self.type_handler
    }

    /// Qualified id of the nested query feeding this property
    pub fn nested_query_id(&self) -> Option<&str> {
        self.nested_query_id.as_deref()
    }

    /// Qualified id of the nested result map assembling this property
    pub fn nested_result_map_id(&self) -> Option<&str> {
        self.nested_result_map_id.as_deref()
    }

    /// Column-name prefix applied inside the nested result map
    pub fn column_prefix(&self) -> Option<&str> {
        self.column_prefix.as_deref()
    }

    /// Columns that must be non-null before the nested object is assembled
    pub fn not_null_columns(&self) -> &[String] {
        &self.not_null_columns
    }

    /// Foreign-key column linking rows of a secondary result set
    pub fn foreign_column(&self) -> Option<&str> {
        self.foreign_column.as_deref()
    }

    /// Role flags
    pub fn flags(&self) -> ResultFlags {
        self.flags
    }

    /// True when the nested query is fetched on first access
    pub fn is_lazy(&self) -> bool {
        self.lazy
    }
}

impl PartialEq for ResultMapping {
    fn eq(&self, other: &Self) -> bool {
        self.property == other.property
            && self.column == other.column
            && self.composites == other.composites
            && self.value_type == other.value_type
    }
}

impl Eq for ResultMapping {}

/// Builder for [`ResultMapping`]
#[derive(Debug, Clone)]
pub struct ResultMappingBuilder {
    mapping: ResultMapping,
}

impl ResultMappingBuilder {
    /// Start a mapping for `property` fed by `column`
    pub fn new(property: Option<String>, column: Option<String>, value_type: ValueType) -> Self {
        Self {
            mapping: ResultMapping {
                property,
                column,
                composites: Vec::new(),
                value_type,
                storage_type: None,
                type_handler: TypeHandlerRef::unknown(),
                nested_query_id: None,
                nested_result_map_id: None,
                column_prefix: None,
                not_null_columns: Vec::new(),
                foreign_column: None,
                flags: ResultFlags::default(),
                lazy: false,
            },
        }
    }

    /// Composite property-to-column pairs
    pub fn composites(mut self, composites: Vec<(String, String)>) -> Self {
        self.mapping.composites = composites;
        self
    }

    /// Storage column type
    pub fn storage_type(mut self, storage_type: Option<StorageType>) -> Self {
        self.mapping.storage_type = storage_type;
        self
    }

    /// Type-handler reference
    pub fn type_handler(mut self, handler: TypeHandlerRef) -> Self {
        self.mapping.type_handler = handler;
        self
    }

    /// Nested query reference (mutually exclusive with a nested result map)
    pub fn nested_query_id(mut self, id: Option<String>) -> Self {
        self.mapping.nested_query_id = id;
        self
    }

    /// Nested result-map reference (mutually exclusive with a nested query)
    pub fn nested_result_map_id(mut self, id: Option<String>) -> Self {
        self.mapping.nested_result_map_id = id;
        self
    }

    /// Column prefix for the nested result map
    pub fn column_prefix(mut self, prefix: Option<String>) -> Self {
        self.mapping.column_prefix = prefix;
        self
    }

    /// Not-null guard columns for the nested object
    pub fn not_null_columns(mut self, columns: Vec<String>) -> Self {
        self.mapping.not_null_columns = columns;
        self
    }

    /// Foreign-key column of a secondary result set
    pub fn foreign_column(mut self, column: Option<String>) -> Self {
        self.mapping.foreign_column = column;
        self
    }

    /// Role flags
    pub fn flags(mut self, flags: ResultFlags) -> Self {
        self.mapping.flags = flags;
        self
    }

    /// Lazy fetch
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.mapping.lazy = lazy;
        self
    }

    /// Validate and freeze the mapping
    pub fn build(self) -> Result<ResultMapping> {
        if self.mapping.nested_query_id.is_some() && self.mapping.nested_result_map_id.is_some() {
            return Err(BuildError::ConflictingNested {
                property: self
                    .mapping
                    .property
                    .clone()
                    .unwrap_or_else(|| "<unnamed>".to_string()),
            });
        }
        Ok(self.mapping)
    }
}

/// Column-driven selector picking among variant result maps per row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discriminator {
    selector: ResultMapping,
    // observed column value -> qualified variant result map id, declared order
    cases: Vec<(String, String)>,
}

impl Discriminator {
    /// A discriminator over `selector` with ordered `value -> id` cases
    pub fn new(selector: ResultMapping, cases: Vec<(String, String)>) -> Self {
        Self { selector, cases }
    }

    /// The distinguishing mapping (column + value type to observe)
    pub fn selector(&self) -> &ResultMapping {
        &self.selector
    }

    /// All cases in declared order
    pub fn cases(&self) -> &[(String, String)] {
        &self.cases
    }

    /// The variant result-map id for an observed column value
    pub fn result_map_for(&self, value: &str) -> Option<&str> {
        self.cases
            .iter()
            .find(|(case, _)| case == value)
            .map(|(_, id)| id.as_str())
    }
}

/// A named tree of column-to-property assembly rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMap {
    id: String,
    target_type: ValueType,
    mappings: Vec<ResultMapping>,
    discriminator: Option<Discriminator>,
}

impl ResultMap {
    /// Namespace-qualified id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Type assembled from each row
    pub fn target_type(&self) -> &ValueType {
        &self.target_type
    }

    /// Mapping entries in declared order (constructor arguments first)
    pub fn mappings(&self) -> &[ResultMapping] {
        &self.mappings
    }

    /// Variant selector, if declared
    pub fn discriminator(&self) -> Option<&Discriminator> {
        self.discriminator.as_ref()
    }

    /// True when any mapping is a constructor argument
    pub fn has_constructor_mappings(&self) -> bool {
        self.mappings.iter().any(|m| m.flags().constructor)
    }
}

/// Builder for [`ResultMap`]
#[derive(Debug, Clone)]
pub struct ResultMapBuilder {
    map: ResultMap,
}

impl ResultMapBuilder {
    /// Start a result map assembling `target_type`
    pub fn new(id: impl Into<String>, target_type: ValueType) -> Self {
        Self {
            map: ResultMap {
                id: id.into(),
                target_type,
                mappings: Vec::new(),
                discriminator: None,
            },
        }
    }

    /// Mapping entries, declared order
    pub fn mappings(mut self, mappings: Vec<ResultMapping>) -> Self {
        self.map.mappings = mappings;
        self
    }

    /// Variant selector
    pub fn discriminator(mut self, discriminator: Option<Discriminator>) -> Self {
        self.map.discriminator = discriminator;
        self
    }

    /// Freeze the result map
    pub fn build(self) -> ResultMap {
        self.map
    }
}

/// Direction of a statement parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterMode {
    /// Input parameter
    #[default]
    In,
    /// Output parameter (callable statements)
    Out,
    /// Both directions
    InOut,
}

/// One property-to-parameter rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterMapping {
    /// Source property on the parameter object
    pub property: String,
    /// Resolved value type
    pub value_type: ValueType,
    /// Declared storage type, if any
    pub storage_type: Option<StorageType>,
    /// Resolved type-handler reference
    pub type_handler: TypeHandlerRef,
    /// Parameter direction
    pub mode: ParameterMode,
}

/// A named set of parameter-mapping rules for one statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterMap {
    id: String,
    parameter_type: ValueType,
    mappings: Vec<ParameterMapping>,
}

impl ParameterMap {
    /// A parameter map; inline maps carry no declared mappings
    pub fn new(id: impl Into<String>, parameter_type: ValueType, mappings: Vec<ParameterMapping>) -> Self {
        Self {
            id: id.into(),
            parameter_type,
            mappings,
        }
    }

    /// Namespace-qualified id (inline maps use the `-Inline` suffix)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Declared parameter type
    pub fn parameter_type(&self) -> &ValueType {
        &self.parameter_type
    }

    /// Declared mappings; empty for inline maps
    pub fn mappings(&self) -> &[ParameterMapping] {
        &self.mappings
    }
}
