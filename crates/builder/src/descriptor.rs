//! Declarative method-marker schema
//!
//! The abstract descriptor model the parser consumes. Markers are attached
//! to interface methods by whatever front end declares them (attribute
//! macros, external documents, code generation); to this crate they are
//! pure data:
//!
//! - **Self-contained**: every attribute needed to compile the statement is
//!   on the marker
//! - **Serializable**: descriptor documents arrive as data
//! - **Typed**: one variant per statement kind and provider flavor, no
//!   generic "any marker" value inspected at call sites

use serde::{Deserialize, Serialize};

use rowbind_core::{
    CacheKind, CommandKind, EvictionPolicy, ExecutionMode, FetchTiming, FlushPolicy, ProviderRef,
    ResultSetShape, ReturnShape, StorageType, TypeBindings, TypeRef, ValueType,
};

/// A statement marker: the SQL (or its provider) plus the command kind
///
/// A method may carry several markers of the same kind for different
/// database variants; at most one per distinct variant identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementMarker {
    /// Read query from inline SQL fragments
    Select {
        /// SQL fragments, joined with single spaces and trimmed
        sql: Vec<String>,
        /// Database-variant identifier
        variant: Option<String>,
        /// This read statement mutates data
        affects_data: bool,
    },
    /// Row update from inline SQL fragments
    Update {
        /// SQL fragments
        sql: Vec<String>,
        /// Database-variant identifier
        variant: Option<String>,
    },
    /// Row insertion from inline SQL fragments
    Insert {
        /// SQL fragments
        sql: Vec<String>,
        /// Database-variant identifier
        variant: Option<String>,
    },
    /// Row deletion from inline SQL fragments
    Delete {
        /// SQL fragments
        sql: Vec<String>,
        /// Database-variant identifier
        variant: Option<String>,
    },
    /// Read query resolved through a provider callable
    SelectProvider {
        /// The provider reference
        provider: ProviderRef,
        /// Database-variant identifier
        variant: Option<String>,
        /// This read statement mutates data
        affects_data: bool,
    },
    /// Update resolved through a provider callable
    UpdateProvider {
        /// The provider reference
        provider: ProviderRef,
        /// Database-variant identifier
        variant: Option<String>,
    },
    /// Insert resolved through a provider callable
    InsertProvider {
        /// The provider reference
        provider: ProviderRef,
        /// Database-variant identifier
        variant: Option<String>,
    },
    /// Delete resolved through a provider callable
    DeleteProvider {
        /// The provider reference
        provider: ProviderRef,
        /// Database-variant identifier
        variant: Option<String>,
    },
}

impl StatementMarker {
    /// The SQL command kind this marker declares
    pub fn command_kind(&self) -> CommandKind {
        match self {
            StatementMarker::Select { .. } | StatementMarker::SelectProvider { .. } => {
                CommandKind::Select
            }
            StatementMarker::Update { .. } | StatementMarker::UpdateProvider { .. } => {
                CommandKind::Update
            }
            StatementMarker::Insert { .. } | StatementMarker::InsertProvider { .. } => {
                CommandKind::Insert
            }
            StatementMarker::Delete { .. } | StatementMarker::DeleteProvider { .. } => {
                CommandKind::Delete
            }
        }
    }

    /// The marker's database-variant identifier
    pub fn variant(&self) -> Option<&str> {
        match self {
            StatementMarker::Select { variant, .. }
            | StatementMarker::Update { variant, .. }
            | StatementMarker::Insert { variant, .. }
            | StatementMarker::Delete { variant, .. }
            | StatementMarker::SelectProvider { variant, .. }
            | StatementMarker::UpdateProvider { variant, .. }
            | StatementMarker::InsertProvider { variant, .. }
            | StatementMarker::DeleteProvider { variant, .. } => variant.as_deref(),
        }
    }

    /// The mutates-data flag (reads only; always false elsewhere)
    pub fn affects_data(&self) -> bool {
        match self {
            StatementMarker::Select { affects_data, .. }
            | StatementMarker::SelectProvider { affects_data, .. } => *affects_data,
            _ => false,
        }
    }

    /// True when the SQL comes from a provider callable
    pub fn is_provider(&self) -> bool {
        matches!(
            self,
            StatementMarker::SelectProvider { .. }
                | StatementMarker::UpdateProvider { .. }
                | StatementMarker::InsertProvider { .. }
                | StatementMarker::DeleteProvider { .. }
        )
    }

    /// Short description for conflict diagnostics
    pub fn describe(&self) -> String {
        let kind = match self {
            StatementMarker::Select { .. } => "SELECT",
            StatementMarker::Update { .. } => "UPDATE",
            StatementMarker::Insert { .. } => "INSERT",
            StatementMarker::Delete { .. } => "DELETE",
            StatementMarker::SelectProvider { .. } => "SELECT-PROVIDER",
            StatementMarker::UpdateProvider { .. } => "UPDATE-PROVIDER",
            StatementMarker::InsertProvider { .. } => "INSERT-PROVIDER",
            StatementMarker::DeleteProvider { .. } => "DELETE-PROVIDER",
        };
        match self.variant() {
            Some(variant) => format!("{kind}(variant={variant})"),
            None => format!("{kind}(no variant)"),
        }
    }
}

/// Nested-object marker on a property mapping
///
/// Exactly one of `select` (a nested query) or `result_map` (a nested
/// result map) may be given; declaring both is a fatal error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NestedObject {
    /// Id of the nested query feeding this property
    pub select: Option<String>,
    /// Id of the nested result map assembling this property
    pub result_map: Option<String>,
    /// Column-name prefix applied inside the nested result map
    pub column_prefix: Option<String>,
    /// Foreign-key column linking rows of a secondary result set
    pub foreign_column: Option<String>,
    /// Comma list of columns that must be non-null before assembly
    pub not_null_columns: Option<String>,
    /// Fetch timing for the nested query
    pub fetch: FetchTiming,
}

/// One property-assembly marker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyMarker {
    /// Target property on the assembled type
    pub property: String,
    /// Source column (possibly a composite `{prop=col,...}` spec)
    pub column: Option<String>,
    /// Explicit value type; inferred from the target type when absent
    pub value_type: Option<ValueType>,
    /// Declared storage column type
    pub storage_type: Option<StorageType>,
    /// Explicit type-conversion handler override
    pub type_handler: Option<String>,
    /// Participates in row identity
    pub id: bool,
    /// Nested object assembly
    pub nested: Option<NestedObject>,
}

impl PropertyMarker {
    /// Convenience constructor for the common property/column pair
    pub fn new(property: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            column: Some(column.into()),
            ..Self::default()
        }
    }
}

/// One ordered constructor-argument marker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CtorArgMarker {
    /// Constructor parameter name, if the declaration names one
    pub name: Option<String>,
    /// Source column
    pub column: Option<String>,
    /// Explicit value type
    pub value_type: Option<ValueType>,
    /// Declared storage column type
    pub storage_type: Option<StorageType>,
    /// Explicit type-conversion handler override
    pub type_handler: Option<String>,
    /// Participates in row identity
    pub id: bool,
    /// Nested query feeding this argument
    pub select: Option<String>,
    /// Nested result map assembling this argument
    pub result_map: Option<String>,
    /// Column prefix for the nested result map
    pub column_prefix: Option<String>,
}

/// One discriminator case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseMarker {
    /// The observed column value selecting this case
    pub value: String,
    /// The variant type assembled for this case
    pub target_type: ValueType,
    /// Property markers local to this case
    #[serde(default)]
    pub results: Vec<PropertyMarker>,
    /// Constructor-argument markers local to this case
    #[serde(default)]
    pub ctor_args: Vec<CtorArgMarker>,
}

/// Column-driven variant selection over a set of cases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscriminatorMarker {
    /// The distinguishing column
    pub column: String,
    /// Value type of the distinguishing column (String when absent)
    #[serde(default)]
    pub value_type: Option<ValueType>,
    /// Storage type of the distinguishing column
    #[serde(default)]
    pub storage_type: Option<StorageType>,
    /// Explicit handler override for the distinguishing column
    #[serde(default)]
    pub type_handler: Option<String>,
    /// Ordered cases
    pub cases: Vec<CaseMarker>,
}

/// Per-statement options marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsMarker {
    /// Use driver-generated key retrieval (INSERT/UPDATE)
    pub use_generated_keys: bool,
    /// Property receiving the generated key
    pub key_property: Option<String>,
    /// Column supplying the generated key
    pub key_column: Option<String>,
    /// Driver fetch size hint
    pub fetch_size: Option<u32>,
    /// Execution timeout
    pub timeout_ms: Option<u64>,
    /// Statement execution mode
    pub execution_mode: ExecutionMode,
    /// Result-set fetch shape override
    pub result_set_shape: Option<ResultSetShape>,
    /// Serve results from the namespace cache (reads)
    pub use_cache: bool,
    /// Three-valued cache-flush override
    pub flush_cache: FlushPolicy,
    /// Comma-separated named result-set labels
    pub result_sets: Option<String>,
    /// Database-variant identifier
    pub variant: Option<String>,
}

impl Default for OptionsMarker {
    fn default() -> Self {
        Self {
            use_generated_keys: false,
            key_property: None,
            key_column: None,
            fetch_size: None,
            timeout_ms: None,
            execution_mode: ExecutionMode::default(),
            result_set_shape: None,
            use_cache: true,
            flush_cache: FlushPolicy::default(),
            result_sets: None,
            variant: None,
        }
    }
}

/// Auxiliary-key marker: a synthetic SELECT run before or after the
/// primary statement to obtain the generated key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMarker {
    /// SQL fragments of the auxiliary select
    pub statement: Vec<String>,
    /// Result type of the key query
    pub result_type: ValueType,
    /// Execution mode of the auxiliary statement
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    /// Property receiving the key
    pub key_property: String,
    /// Column supplying the key
    #[serde(default)]
    pub key_column: Option<String>,
    /// Run before the primary statement instead of after
    #[serde(default)]
    pub before: bool,
    /// Database-variant identifier
    #[serde(default)]
    pub variant: Option<String>,
}

/// Namespace-level cache declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheMarker {
    /// Implementation kind
    pub kind: CacheKind,
    /// Eviction policy
    pub eviction: EvictionPolicy,
    /// Periodic flush interval
    pub flush_interval_ms: Option<u64>,
    /// Entry count bound
    pub size: Option<usize>,
    /// Read/write isolation flag
    pub read_write: bool,
    /// Blocking flag
    pub blocking: bool,
    /// Free-form properties; values may contain `${...}` placeholders
    pub properties: Vec<(String, String)>,
}

impl Default for CacheMarker {
    fn default() -> Self {
        Self {
            kind: CacheKind::default(),
            eviction: EvictionPolicy::default(),
            flush_interval_ms: None,
            size: None,
            read_write: true,
            blocking: false,
            properties: Vec::new(),
        }
    }
}

/// Cache-reference marker: share another namespace's cache
///
/// Exactly one of `type_name` (the target interface) or `name` (a raw
/// namespace string) must be given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheRefMarker {
    /// Target namespace by interface type
    pub type_name: Option<String>,
    /// Target namespace by name
    pub name: Option<String>,
}

/// One declared mapping-interface method with its markers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// Method name
    pub name: String,
    /// Compiler-synthesized bridge method, never a statement
    #[serde(default)]
    pub synthetic: bool,
    /// Interface-default implementation, never a statement
    #[serde(default)]
    pub default_impl: bool,
    /// Declared parameter types, in order
    #[serde(default)]
    pub parameters: Vec<TypeRef>,
    /// Declared return signature
    pub return_shape: ReturnShape,
    /// The column supplying the key for keyed-map returns
    #[serde(default)]
    pub map_key: Option<String>,
    /// Explicit result-type override for `void` returns
    #[serde(default)]
    pub result_type_override: Option<ValueType>,
    /// Statement markers (at most one per database variant)
    #[serde(default)]
    pub statements: Vec<StatementMarker>,
    /// Explicit references to already-declared result maps
    #[serde(default)]
    pub result_map_refs: Vec<String>,
    /// Shared id for the synthesized result-map group
    #[serde(default)]
    pub result_group_id: Option<String>,
    /// Property markers
    #[serde(default)]
    pub results: Vec<PropertyMarker>,
    /// Ordered constructor-argument markers
    #[serde(default)]
    pub ctor_args: Vec<CtorArgMarker>,
    /// Discriminator marker
    #[serde(default)]
    pub discriminator: Option<DiscriminatorMarker>,
    /// Options markers (at most one per database variant)
    #[serde(default)]
    pub options: Vec<OptionsMarker>,
    /// Auxiliary-key markers (at most one per database variant)
    #[serde(default)]
    pub key_markers: Vec<KeyMarker>,
}

impl MethodDescriptor {
    /// A method with no markers and a void return
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            synthetic: false,
            default_impl: false,
            parameters: Vec::new(),
            return_shape: ReturnShape::Void,
            map_key: None,
            result_type_override: None,
            statements: Vec::new(),
            result_map_refs: Vec::new(),
            result_group_id: None,
            results: Vec::new(),
            ctor_args: Vec::new(),
            discriminator: None,
            options: Vec::new(),
            key_markers: Vec::new(),
        }
    }

    /// True when any marker declares a read query
    pub fn has_select_marker(&self) -> bool {
        self.statements
            .iter()
            .any(|marker| marker.command_kind() == CommandKind::Select)
    }
}

/// One declared mapping interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    /// Fully-qualified interface name; doubles as the namespace
    pub name: String,
    /// Generic type-binding context for the declared signatures
    #[serde(default)]
    pub bindings: TypeBindings,
    /// Namespace-level cache declaration
    #[serde(default)]
    pub cache: Option<CacheMarker>,
    /// Namespace-level cache reference
    #[serde(default)]
    pub cache_ref: Option<CacheRefMarker>,
    /// Declared methods
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
}

impl InterfaceDescriptor {
    /// An interface with no methods
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: TypeBindings::new(),
            cache: None,
            cache_ref: None,
            methods: Vec::new(),
        }
    }
}
