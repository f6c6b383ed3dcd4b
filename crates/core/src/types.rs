//! Shared type vocabulary for statement and mapping metadata
//!
//! Everything here is plain data: small serde-friendly enums plus the
//! nominal [`ValueType`] descriptor and the [`TypeBindings`] table used to
//! derive effective types from declared generic signatures.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// SQL command kind of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    /// Read query
    Select,
    /// Row update
    Update,
    /// Row insertion
    Insert,
    /// Row deletion
    Delete,
    /// Not recognizable as any of the above
    Unknown,
}

impl CommandKind {
    /// True for INSERT/UPDATE/DELETE
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            CommandKind::Update | CommandKind::Insert | CommandKind::Delete
        )
    }
}

/// How the statement is handed to the driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Plain, unprepared statement
    Statement,
    /// Prepared statement (the default)
    #[default]
    Prepared,
    /// Callable statement (stored procedures)
    Callable,
}

/// Result-set fetch shape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultSetShape {
    /// Driver default
    #[default]
    Default,
    /// Forward-only cursor
    ForwardOnly,
    /// Scrollable, insensitive to concurrent changes
    ScrollInsensitive,
    /// Scrollable, sensitive to concurrent changes
    ScrollSensitive,
}

/// Fetch timing for nested objects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchTiming {
    /// Use the registry-wide lazy-loading default
    #[default]
    Default,
    /// Fetch together with the owning row
    Eager,
    /// Fetch on first access
    Lazy,
}

/// Three-valued cache-flush override carried by an options marker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlushPolicy {
    /// Use the per-command-kind default (flush on mutation)
    #[default]
    Default,
    /// Always flush
    True,
    /// Never flush
    False,
}

/// Storage (column) type tags
///
/// Only the registration side matters here; conversion between native values
/// and these column types is the external type-handler registry's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageType {
    Char,
    Varchar,
    Integer,
    BigInt,
    Numeric,
    Real,
    Date,
    Time,
    Timestamp,
    Blob,
    Clob,
    Boolean,
    /// Cursor-valued out parameter
    Cursor,
    /// Anything the driver understands but we do not model
    Other,
}

/// Nominal descriptor for a native value type
///
/// The compiler never instantiates values; it only records *which* type a
/// mapping produces so the execution engine and type-handler registry can
/// act on it later. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Untyped/opaque, the fallback when inference fails
    Object,
    /// The absence of a value (a `void` return)
    Void,
    /// A named nominal type, e.g. `"app.model.User"` or `"String"`
    Named(Arc<str>),
}

impl ValueType {
    /// A named type descriptor
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        ValueType::Named(name.into())
    }

    /// The synthetic map type used when a method declares several parameters
    pub fn param_map() -> Self {
        ValueType::named("ParamMap")
    }

    /// Short name used in synthesized result-map id suffixes
    ///
    /// For qualified names only the last segment participates, matching the
    /// id format `<method>-<SimpleName>-...`.
    pub fn simple_name(&self) -> &str {
        match self {
            ValueType::Object => "Object",
            ValueType::Void => "void",
            ValueType::Named(name) => name.rsplit('.').next().unwrap_or(name),
        }
    }

    /// True for the opaque fallback
    pub fn is_object(&self) -> bool {
        matches!(self, ValueType::Object)
    }
}

impl Default for ValueType {
    fn default() -> Self {
        ValueType::Object
    }
}

/// A declared type position: either a type variable from the interface's
/// generic context or a concrete type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeRef {
    /// Type variable, resolved through [`TypeBindings`]
    Var(String),
    /// Concrete type
    Concrete(ValueType),
}

impl TypeRef {
    /// Shorthand for a concrete named type
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        TypeRef::Concrete(ValueType::named(name))
    }
}

/// The interface's generic type-binding context
///
/// An explicit compile-time binding table standing in for runtime generics
/// introspection: a generic base interface `Mapper<T>` specialized as
/// `UserMapper: Mapper<User>` contributes `T -> User`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeBindings {
    bindings: HashMap<String, ValueType>,
}

impl TypeBindings {
    /// Empty binding context
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a type variable to a concrete type
    pub fn bind(&mut self, var: impl Into<String>, ty: ValueType) {
        self.bindings.insert(var.into(), ty);
    }

    /// Resolve a declared type position to an effective type
    ///
    /// An unbound variable degrades to [`ValueType::Object`]; erased
    /// generics cannot do better.
    pub fn resolve(&self, type_ref: &TypeRef) -> ValueType {
        match type_ref {
            TypeRef::Var(var) => self
                .bindings
                .get(var)
                .cloned()
                .unwrap_or(ValueType::Object),
            TypeRef::Concrete(ty) => ty.clone(),
        }
    }
}

/// Declared return signature of a mapper method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnShape {
    /// `void`
    Void,
    /// A plain value
    Plain(TypeRef),
    /// An array of elements
    ArrayOf(TypeRef),
    /// A collection of elements
    CollectionOf(TypeRef),
    /// A streaming cursor of elements
    StreamOf(TypeRef),
    /// An optional value
    OptionalOf(TypeRef),
    /// A keyed map of values
    MapOf {
        /// Key type
        key: TypeRef,
        /// Value type
        value: TypeRef,
    },
}

/// Derive the effective result type from a declared return shape
///
/// Wrapping array/collection/stream/optional shapes are unwrapped to their
/// element type. A keyed map is unwrapped to its value type only when the
/// method explicitly marks which column supplies the key (`map_key_marked`);
/// otherwise the map itself is the result type. A `void` return consults the
/// explicit result-type override marker before giving up.
pub fn derive_effective_type(
    shape: &ReturnShape,
    bindings: &TypeBindings,
    map_key_marked: bool,
    override_type: Option<&ValueType>,
) -> ValueType {
    match shape {
        ReturnShape::Void => override_type.cloned().unwrap_or(ValueType::Void),
        ReturnShape::Plain(t) => bindings.resolve(t),
        ReturnShape::ArrayOf(t)
        | ReturnShape::CollectionOf(t)
        | ReturnShape::StreamOf(t)
        | ReturnShape::OptionalOf(t) => bindings.resolve(t),
        ReturnShape::MapOf { key: _, value } => {
            if map_key_marked {
                bindings.resolve(value)
            } else {
                ValueType::named("Map")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_kind_mutating() {
        assert!(CommandKind::Insert.is_mutating());
        assert!(CommandKind::Update.is_mutating());
        assert!(CommandKind::Delete.is_mutating());
        assert!(!CommandKind::Select.is_mutating());
        assert!(!CommandKind::Unknown.is_mutating());
    }

    #[test]
    fn test_simple_name_strips_qualification() {
        assert_eq!(ValueType::named("app.model.User").simple_name(), "User");
        assert_eq!(ValueType::named("String").simple_name(), "String");
        assert_eq!(ValueType::Object.simple_name(), "Object");
    }

    #[test]
    fn test_bindings_resolve_variable() {
        let mut bindings = TypeBindings::new();
        bindings.bind("T", ValueType::named("app.model.User"));
        assert_eq!(
            bindings.resolve(&TypeRef::Var("T".into())),
            ValueType::named("app.model.User")
        );
        // unbound variables degrade to Object
        assert_eq!(bindings.resolve(&TypeRef::Var("U".into())), ValueType::Object);
    }

    #[test]
    fn test_derive_unwraps_wrappers() {
        let bindings = TypeBindings::new();
        let user = TypeRef::named("User");
        for shape in [
            ReturnShape::Plain(user.clone()),
            ReturnShape::ArrayOf(user.clone()),
            ReturnShape::CollectionOf(user.clone()),
            ReturnShape::StreamOf(user.clone()),
            ReturnShape::OptionalOf(user.clone()),
        ] {
            assert_eq!(
                derive_effective_type(&shape, &bindings, false, None),
                ValueType::named("User")
            );
        }
    }

    #[test]
    fn test_derive_map_requires_key_marker() {
        let bindings = TypeBindings::new();
        let shape = ReturnShape::MapOf {
            key: TypeRef::named("String"),
            value: TypeRef::named("User"),
        };
        assert_eq!(
            derive_effective_type(&shape, &bindings, true, None),
            ValueType::named("User")
        );
        assert_eq!(
            derive_effective_type(&shape, &bindings, false, None),
            ValueType::named("Map")
        );
    }

    #[test]
    fn test_derive_void_checks_override() {
        let bindings = TypeBindings::new();
        let user = ValueType::named("User");
        assert_eq!(
            derive_effective_type(&ReturnShape::Void, &bindings, false, Some(&user)),
            user
        );
        assert_eq!(
            derive_effective_type(&ReturnShape::Void, &bindings, false, None),
            ValueType::Void
        );
    }

    #[test]
    fn test_derive_resolves_generic_collection_element() {
        let mut bindings = TypeBindings::new();
        bindings.bind("T", ValueType::named("app.model.Order"));
        let shape = ReturnShape::CollectionOf(TypeRef::Var("T".into()));
        assert_eq!(
            derive_effective_type(&shape, &bindings, false, None),
            ValueType::named("app.model.Order")
        );
    }
}
