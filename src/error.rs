//! Error types for schema extraction and the registry

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema extraction and registry errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Descriptor unavailable for {type_name}: {reason}")]
    DescriptorUnavailable { type_name: String, reason: String },

    #[error("Unsupported field kind for {field}: {kind}")]
    UnsupportedFieldKind { field: String, kind: String },

    #[error("Name collision: {first} and {second} both canonicalize to {name}")]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },

    #[error("Enum {enum_name} has no value numbered 0")]
    MissingZeroValue { enum_name: String },

    #[error("Schema not found: {0}")]
    NotFound(String),

    #[error("Compile error: {0}")]
    Compile(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl SchemaError {
    pub(crate) fn descriptor_unavailable(
        type_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::DescriptorUnavailable {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error comes from extraction of a descriptor graph.
    ///
    /// Extraction errors are deterministic: the same descriptor always fails
    /// the same way, so retrying is pointless.
    pub fn is_extraction_error(&self) -> bool {
        matches!(
            self,
            Self::DescriptorUnavailable { .. }
                | Self::UnsupportedFieldKind { .. }
                | Self::NameCollision { .. }
                | Self::MissingZeroValue { .. }
        )
    }
}
