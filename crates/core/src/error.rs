//! Error types for the mapping-metadata compiler
//!
//! Errors come in two tiers with very different handling:
//!
//! - [`BuildError`] - fatal declaration problems (contradictory markers,
//!   namespace mismatches, illegal ids). These abort the current interface
//!   build immediately.
//! - [`Incomplete`] - a referenced entity (parent result map, cache
//!   namespace, parameter map) is not registered *yet*. These are captured,
//!   queued, and retried after all interfaces have had their first pass.
//!
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.

use thiserror::Error;

/// Result type alias for build operations
pub type Result<T> = std::result::Result<T, BuildError>;

/// A reference that could not be resolved because its target is not
/// registered yet. Always retryable: the target may be registered by an
/// interface processed later.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Incomplete {
    /// A referenced result map is not in the registry
    #[error("could not find result map '{id}' referenced from '{referenced_from}'")]
    ResultMap {
        /// The missing result map id
        id: String,
        /// The statement that referenced it
        referenced_from: String,
    },

    /// A parent result map named by an inheriting result map is missing
    #[error("could not find a parent result map with id '{id}'")]
    ParentResultMap {
        /// The missing parent id
        id: String,
    },

    /// An explicitly referenced parameter map is missing
    #[error("could not find parameter map '{id}'")]
    ParameterMap {
        /// The missing parameter map id
        id: String,
    },

    /// A cache-ref points at a namespace with no registered cache
    #[error("no cache for namespace '{namespace}' could be found")]
    CacheRef {
        /// The referenced namespace
        namespace: String,
    },
}

/// Fatal build errors
///
/// Everything here is detectable without needing another not-yet-registered
/// entity, so retrying cannot help. The `Incomplete` variant bridges the
/// retryable tier so callers can propagate both through one type.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A mapping interface build requires a non-empty namespace
    #[error("the mapping interface requires a namespace to be specified")]
    MissingNamespace,

    /// The namespace was already bound to a different value
    #[error("wrong namespace: expected '{expected}' but found '{found}'")]
    NamespaceMismatch {
        /// Namespace the assistant was bound to first
        expected: String,
        /// Conflicting namespace supplied later
        found: String,
    },

    /// A local id contains the qualifying separator
    #[error("dots are not allowed in element names, please remove it from '{id}'")]
    IllegalSeparator {
        /// The offending id
        id: String,
    },

    /// One mapping entry declares both a nested query and a nested result map
    #[error("cannot use both a nested query and a nested result map on property '{property}'")]
    ConflictingNested {
        /// The target property of the mapping entry
        property: String,
    },

    /// Two markers of the same kind carry the same variant identifier
    #[error("detected conflicting markers '{first}' and '{second}' on '{method}'")]
    DuplicateVariant {
        /// Description of the first marker
        first: String,
        /// Description of the conflicting marker
        second: String,
        /// The owning method, `namespace.name`
        method: String,
    },

    /// Markers exist, but none matches the active database variant and none
    /// is unqualified
    #[error(
        "could not find a statement marker that corresponds to the current \
         database variant on method '{method}' (current variant is {variant:?})"
    )]
    NoMatchingVariant {
        /// The owning method, `namespace.name`
        method: String,
        /// The registry's active variant identifier
        variant: Option<String>,
    },

    /// A statement registration was attempted while a cache-ref is pending
    #[error("cache-ref not yet resolved")]
    UnresolvedCacheRef,

    /// A cache-ref must name its target by type or by name, exactly once
    #[error("exactly one of the type or name attribute must be specified in a cache-ref")]
    CacheRefTarget,

    /// The same qualified id was registered twice
    #[error("{kind} '{id}' is already registered")]
    DuplicateEntry {
        /// Entity kind ("statement", "result map", ...)
        kind: &'static str,
        /// The duplicated qualified id
        id: String,
    },

    /// A placeholder resolver rejected an expression
    #[error("could not resolve placeholder expression '{expression}': {reason}")]
    Placeholder {
        /// The expression between the open and close tokens
        expression: String,
        /// Resolver-supplied reason
        reason: String,
    },

    /// Retryable incompleteness, see [`Incomplete`]
    #[error(transparent)]
    Incomplete(#[from] Incomplete),
}

impl BuildError {
    /// True when the error is retryable after more registrations
    pub fn is_incomplete(&self) -> bool {
        matches!(self, BuildError::Incomplete(_))
    }
}
