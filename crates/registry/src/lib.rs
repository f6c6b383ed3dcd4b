//! # Rowbind Registry
//!
//! The shared metadata registry: namespace-qualified maps of statement
//! definitions, result maps, parameter maps, caches, and key strategies,
//! plus the deferred-resolution queue that powers the two-phase
//! registration protocol for forward references.

#![warn(missing_docs)]

mod pending;
mod registry;
mod settings;

pub use pending::{Deferred, PendingQueue};
pub use registry::Registry;
pub use settings::Settings;
