//! Validation errors raised before any request is sent

use std::fmt;

use serde_json::{Value, json};
use thiserror::Error;

use super::ResourceKind;

/// A single violation with the dotted path of the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path (`upstream.nodes[0].port`); empty for the object itself
    pub path: String,
    /// Human-readable description of the problem
    pub message: String,
}

impl Violation {
    /// Create a violation
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Why tool input was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Structural violations against the resource schema
    #[error("invalid {kind} payload: {}", join(.violations))]
    Schema {
        /// Resource being validated
        kind: ResourceKind,
        /// Every violation found
        violations: Vec<Violation>,
    },

    /// Discriminator value names no known variant
    #[error("unknown {kind} {field} '{value}'; expected one of: {}", .expected.join(", "))]
    UnknownDiscriminator {
        /// Resource being validated
        kind: ResourceKind,
        /// Discriminator field
        field: &'static str,
        /// Value supplied
        value: String,
        /// Known variants
        expected: &'static [&'static str],
    },

    /// Discriminator is missing or not a string
    #[error("{kind} requires '{field}' to be one of: {}", .expected.join(", "))]
    MissingDiscriminator {
        /// Resource being validated
        kind: ResourceKind,
        /// Discriminator field
        field: &'static str,
        /// Known variants
        expected: &'static [&'static str],
    },

    /// An identifier or path scope was not supplied
    #[error("{kind} requires '{field}'")]
    MissingIdentifier {
        /// Resource being addressed
        kind: ResourceKind,
        /// Missing field
        field: &'static str,
    },

    /// The Admin API has no PATCH for this kind
    #[error("{kind} resources do not support partial updates; use create_or_update_{kind}")]
    PatchUnsupported {
        /// Resource being patched
        kind: ResourceKind,
    },

    /// Tool arguments could not be interpreted
    #[error("invalid arguments: {0}")]
    Arguments(String),
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Short machine-readable class
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "schema_violation",
            Self::UnknownDiscriminator { .. } => "unknown_discriminator",
            Self::MissingDiscriminator { .. } => "missing_discriminator",
            Self::MissingIdentifier { .. } => "missing_identifier",
            Self::PatchUnsupported { .. } => "patch_unsupported",
            Self::Arguments(_) => "invalid_arguments",
        }
    }

    /// JSON body reported back to the tool caller
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut out = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        match self {
            Self::Schema { violations, .. } => {
                out["violations"] = violations
                    .iter()
                    .map(|v| json!({ "path": v.path, "message": v.message }))
                    .collect();
            }
            Self::UnknownDiscriminator {
                value, expected, ..
            } => {
                out["value"] = json!(value);
                out["expected"] = json!(expected);
            }
            Self::MissingDiscriminator { expected, .. } => {
                out["expected"] = json!(expected);
            }
            _ => {}
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_message_lists_every_violation() {
        let err = ValidationError::Schema {
            kind: ResourceKind::Route,
            violations: vec![
                Violation::new("", "at least one of 'uri', 'uris' is required"),
                Violation::new("priority", "expected integer"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "invalid route payload: at least one of 'uri', 'uris' is required; priority: expected integer"
        );
        let body = err.to_json();
        assert_eq!(body["error"], "schema_violation");
        assert_eq!(body["violations"][1]["path"], "priority");
    }

    #[test]
    fn discriminator_errors_name_the_value() {
        let err = ValidationError::UnknownDiscriminator {
            kind: ResourceKind::Secret,
            field: "manager",
            value: "azure".into(),
            expected: &["vault", "aws", "gcp"],
        };
        assert_eq!(
            err.to_string(),
            "unknown secret manager 'azure'; expected one of: vault, aws, gcp"
        );
        assert_eq!(err.to_json()["value"], "azure");
    }
}
