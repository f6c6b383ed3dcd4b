//! Registry-wide build settings
//!
//! Loaded by the bootstrap layer (out of scope here) and frozen before any
//! interface is parsed. Defaults match a plain, variant-less registry.

use serde::{Deserialize, Serialize};

use rowbind_core::{Properties, ResultSetShape};

/// Global settings consulted during metadata compilation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Active database-variant identifier, used to select among
    /// variant-specific markers
    pub database_variant: Option<String>,
    /// Default fetch timing for nested objects
    pub lazy_loading_enabled: bool,
    /// Auto key-generation for mutating statements with no options block
    pub use_generated_keys: bool,
    /// Default result-set fetch shape for statements without an override
    pub default_result_set_shape: ResultSetShape,
    /// Variables substituted into `${...}` placeholders in marker values
    pub variables: Properties,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.database_variant, None);
        assert!(!settings.lazy_loading_enabled);
        assert!(!settings.use_generated_keys);
        assert_eq!(settings.default_result_set_shape, ResultSetShape::Default);
    }

    #[test]
    fn test_partial_config_deserialization() {
        let settings: Settings =
            serde_json::from_str(r#"{"database_variant":"postgres","use_generated_keys":true}"#)
                .unwrap();
        assert_eq!(settings.database_variant.as_deref(), Some("postgres"));
        assert!(settings.use_generated_keys);
        assert!(!settings.lazy_loading_enabled);
    }
}
