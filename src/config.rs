//! Generation settings.
//!
//! The dialect and options are explicit values handed to the generator and
//! the argument pipeline. Nothing here reads the environment.

use serde::{Deserialize, Serialize};

/// The flavor of JSON Schema to emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// Plain protobuf-JSON shapes: native maps, native dynamic values and
    /// `required` reflecting real field presence.
    #[default]
    Standard,
    /// For tool-calling consumers that reject open or optional shapes
    /// (OpenAI strict mode and similar): every property is required,
    /// objects are closed, maps become key/value pair lists and dynamic
    /// values travel as JSON text.
    RestrictedCompat,
}

impl Dialect {
    pub fn is_restricted(self) -> bool {
        self == Dialect::RestrictedCompat
    }
}

/// Whether `format` annotations survive in the restricted dialect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatPolicy {
    Keep,
    /// Drop `format`, for strict consumers that reject the keyword.
    #[default]
    Strip,
}

/// Knobs for [`SchemaGenerator`](crate::generator::SchemaGenerator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// Treat singular scalar and enum fields without explicit presence as
    /// mandatory in the standard dialect.
    pub require_implicit_scalars: bool,
    /// `format` handling under [`Dialect::RestrictedCompat`].
    pub restricted_formats: FormatPolicy,
    /// Use leading `.proto` comments as descriptions.
    pub include_comments: bool,
    /// Nesting depth past which a field degrades to the unconstrained schema.
    pub max_depth: usize,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            require_implicit_scalars: true,
            restricted_formats: FormatPolicy::Strip,
            include_comments: true,
            max_depth: 32,
        }
    }
}
