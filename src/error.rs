//! Error types for the deploy-manifest system.
//!
//! This module provides the error hierarchy for every stage a manifest goes
//! through: interpolation of the raw text, structural decoding, per-environment
//! overlay, loading from disk, and validation.

use std::fmt;
use std::path::PathBuf;

use serde::de;
use thiserror::Error;

/// The main error type for the deploy-manifest system.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Structural decoding errors.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Environment overlay errors.
    #[error("Overlay error: {0}")]
    Overlay(#[from] OverlayError),

    /// Variable interpolation errors.
    #[error("Interpolation error: {0}")]
    Interpolate(#[from] InterpolateError),

    /// Manifest loading errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation failed.
    #[error("Manifest validation failed: {field}: {message}")]
    Validation {
        /// Dotted path of the offending field.
        field: String,
        /// Description of the validation error.
        message: String,
    },

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while decoding a raw document value into a typed field.
///
/// `ShapeMismatch` is expected control flow for sum-type fields: it tells the
/// decoder to try the other variant. `Malformed` always stops decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The value has the wrong structure for the target type.
    #[error("shape mismatch: {message}")]
    ShapeMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// The value has the right structure but its content is invalid.
    #[error("malformed value: {message}")]
    Malformed {
        /// Description of the problem.
        message: String,
    },
}

/// Errors raised while applying an environment override to a base manifest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    /// The base and override values have incompatible shapes.
    #[error("cannot override '{path}' in environment '{environment}': {reason}")]
    MergeConflict {
        /// Environment whose override failed.
        environment: String,
        /// Dotted path of the conflicting field.
        path: String,
        /// Why the two values could not be merged.
        reason: String,
    },
}

/// Errors raised while substituting `${NAME}` references.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpolateError {
    /// The variable is neither predefined nor set externally.
    #[error("environment variable {name} is not defined")]
    UndefinedVariable {
        /// Name of the variable.
        name: String,
    },

    /// An external value tried to replace a predefined variable.
    #[error(
        "predefined variable {name} cannot be overridden with \"{attempted}\" (value is \"{predefined}\")"
    )]
    PredefinedVariableConflict {
        /// Name of the variable.
        name: String,
        /// The predefined value.
        predefined: String,
        /// The conflicting external value.
        attempted: String,
    },
}

/// Manifest loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The manifest file was not found.
    #[error("Manifest file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The manifest file could not be parsed.
    #[error("Failed to parse manifest: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// A manifest could not be serialized.
    #[error("Manifest serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },
}

/// Result type alias for deploy-manifest operations.
pub type Result<T> = std::result::Result<T, ManifestError>;

impl ManifestError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: field.into(),
        }
    }
}

impl DecodeError {
    /// Creates a shape mismatch error.
    #[must_use]
    pub fn shape(message: impl fmt::Display) -> Self {
        Self::ShapeMismatch {
            message: message.to_string(),
        }
    }

    /// Creates a malformed value error.
    #[must_use]
    pub fn malformed(message: impl fmt::Display) -> Self {
        Self::Malformed {
            message: message.to_string(),
        }
    }

    /// Returns true if the error only concerns the value's structure.
    #[must_use]
    pub const fn is_shape_mismatch(&self) -> bool {
        matches!(self, Self::ShapeMismatch { .. })
    }
}

// Type mismatches are the only errors a sum-type decoder may recover from;
// every other serde failure is reported as malformed content.
impl de::Error for DecodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::malformed(msg)
    }

    fn invalid_type(unexp: de::Unexpected<'_>, exp: &dyn de::Expected) -> Self {
        Self::shape(format_args!("invalid type: {unexp}, expected {exp}"))
    }

    fn invalid_length(len: usize, exp: &dyn de::Expected) -> Self {
        Self::shape(format_args!("invalid length {len}, expected {exp}"))
    }
}

impl OverlayError {
    /// Creates a merge conflict that is not yet tagged with an environment.
    #[must_use]
    pub fn conflict(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MergeConflict {
            environment: String::new(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Tags the error with the environment whose override failed.
    #[must_use]
    pub fn in_environment(self, name: &str) -> Self {
        match self {
            Self::MergeConflict { path, reason, .. } => Self::MergeConflict {
                environment: name.to_string(),
                path,
                reason,
            },
        }
    }

    /// Prefixes the conflicting path with the name of the enclosing field.
    #[must_use]
    pub fn within(self, field: &str) -> Self {
        match self {
            Self::MergeConflict {
                environment,
                path,
                reason,
            } => {
                let path = if path.is_empty() {
                    field.to_string()
                } else if path.starts_with('[') {
                    format!("{field}{path}")
                } else {
                    format!("{field}.{path}")
                };
                Self::MergeConflict {
                    environment,
                    path,
                    reason,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::Error as _;

    #[test]
    fn test_invalid_type_is_shape_mismatch() {
        let err = DecodeError::invalid_type(de::Unexpected::Map, &"a string");
        assert!(err.is_shape_mismatch());
        assert_eq!(
            err.to_string(),
            "shape mismatch: invalid type: map, expected a string"
        );
    }

    #[test]
    fn test_custom_is_malformed() {
        let err = DecodeError::custom("bad range");
        assert!(!err.is_shape_mismatch());
        assert_eq!(err, DecodeError::malformed("bad range"));
    }

    #[test]
    fn test_unknown_field_is_malformed() {
        let err = DecodeError::unknown_field("colour", &["color"]);
        assert!(!err.is_shape_mismatch());
    }

    #[test]
    fn test_conflict_path_nesting() {
        let err = OverlayError::conflict("", "mapping replaced by scalar")
            .within("logging")
            .within("extensions")
            .in_environment("prod");
        assert_eq!(
            err,
            OverlayError::MergeConflict {
                environment: String::from("prod"),
                path: String::from("extensions.logging"),
                reason: String::from("mapping replaced by scalar"),
            }
        );
        assert!(err.to_string().contains("environment 'prod'"));
    }
}
