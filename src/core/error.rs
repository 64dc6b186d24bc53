//! Error taxonomy for template assembly and emission.
//!
//! Every variant is a construction-time defect in an orchestration sequence
//! (an out-of-order builder call, a mistyped identifier) and carries the
//! offending identifier so the diagnostic points at it directly.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while declaring, wiring or emitting a template.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StackError {
    /// Identifier contains characters outside `[A-Za-z0-9]`, or is empty
    #[error("invalid identifier '{id}': must be non-empty and alphanumeric")]
    InvalidIdentifier { id: String },

    /// Parameter declared twice
    #[error("duplicate parameter: {id}")]
    DuplicateParameter { id: String },

    /// Resource declared twice, or shadowing a parameter
    #[error("duplicate resource '{id}': already declared as a {existing}")]
    DuplicateNode { id: String, existing: &'static str },

    /// Condition declared twice
    #[error("duplicate condition: {name}")]
    DuplicateCondition { name: String },

    /// Parameter lookup by identifier failed
    #[error("unknown parameter: {id}")]
    UnknownParameter { id: String },

    /// Resource lookup by identifier failed
    #[error("unknown resource: {id}")]
    UnknownNode { id: String },

    /// An attribute or ordering edge targets something not yet declared
    #[error("resource '{from}' references unknown {target_kind} '{target}'")]
    DanglingReference {
        from: String,
        target: String,
        target_kind: &'static str,
    },

    /// Default is not one of the allowed values
    #[error("parameter '{id}': default '{default}' is not one of [{}]", .allowed.join(", "))]
    InvalidDefault {
        id: String,
        default: String,
        allowed: Vec<String>,
    },

    /// Emission met a reference with no declared target
    #[error("unresolved reference '{id}' in '{from}'")]
    UnresolvedReference { from: String, id: String },

    /// Reference and ordering edges form a cycle
    #[error("dependency cycle detected involving: {}", .members.join(", "))]
    CyclicReference { members: Vec<String> },

    /// Preview evaluation could not produce a value
    #[error("preview of '{owner}' failed: {message}")]
    Preview { owner: String, message: String },

    /// Boot-script payload could not be read
    #[error("cannot read payload {}: {message}", .path.display())]
    Payload { path: PathBuf, message: String },

    /// Configuration file could not be read or parsed
    #[error("configuration error: {0}")]
    Config(String),

    /// Document could not be rendered
    #[error("render error: {0}")]
    Render(String),
}

/// Result type for template operations
pub type StackResult<T> = Result<T, StackError>;

impl From<serde_json::Error> for StackError {
    fn from(err: serde_json::Error) -> Self {
        StackError::Render(err.to_string())
    }
}

impl From<serde_yaml_ng::Error> for StackError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        StackError::Render(err.to_string())
    }
}
