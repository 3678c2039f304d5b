//! Schema error types
//!
//! Error codes:
//! - APIMODEL_MISSING_PROPERTY
//! - APIMODEL_INVALID_PROPERTY
//! - APIMODEL_UNDEFINED_PROPERTY
//! - APIMODEL_SCHEMA_DEFINITION
//! - APIMODEL_FORMAT
//! - APIMODEL_UNKNOWN_MODEL
//! - APIMODEL_WRONG_MODEL
//! - APIMODEL_UNEXPECTED_PROPERTY
//! - APIMODEL_DEPTH_EXCEEDED
//! - APIMODEL_CONVERSION
//! - APIMODEL_CONFIG
//! - APIMODEL_INTERNAL
//!
//! Codes are stable and meant to be used as localization keys; the
//! English messages are only a default rendering.

use std::fmt;

use thiserror::Error;

/// Result type for load/dump and schema operations
pub type ModelResult<T> = Result<T, ModelError>;

/// What went wrong, independent of where in a nested payload it happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    // ==================
    // Load / dump errors
    // ==================
    /// Required wire key absent during load
    #[error("property '{property}' not found in {model} payload")]
    MissingProperty { model: String, property: String },

    /// Type or constraint check failed
    #[error("invalid value {actual} in property '{property}' of {model}, according to constraint {constraint}")]
    InvalidProperty {
        model: String,
        property: String,
        constraint: String,
        actual: String,
    },

    /// Non-nullable property unset on the source record during dump
    #[error("undefined property '{property}' of {model}")]
    UndefinedProperty { model: String, property: String },

    /// Value could not be converted by a marshaller.
    ///
    /// `model` and `property` are empty until the owning property claims it.
    #[error("{marshaller} marshaller cannot read {input}{}: {reason}", located(.model, .property))]
    Format {
        model: String,
        property: String,
        marshaller: String,
        input: String,
        reason: String,
    },

    /// Wire key not declared by the schema (strict mode only)
    #[error("undeclared property '{property}' in {model} payload")]
    UnexpectedProperty { model: String, property: String },

    /// Record handed to the wrong schema
    #[error("expected a {expected} record, got a {found} record")]
    WrongModel { expected: String, found: String },

    /// Nesting deeper than the configured limit
    #[error("nesting exceeds the maximum depth of {limit}")]
    DepthExceeded { limit: usize },

    /// Typed extraction from a record failed
    #[error("field '{field}' cannot be read as {expected}, got {found}")]
    Conversion {
        field: String,
        expected: String,
        found: String,
    },

    // ==================
    // Schema errors
    // ==================
    /// Malformed schema declaration or registration
    #[error("schema {model} is malformed: {reason}")]
    SchemaDefinition { model: String, reason: String },

    /// Model name not present in the registry
    #[error("model '{0}' is not registered")]
    UnknownModel(String),

    // ==================
    // Ambient errors
    // ==================
    /// Invalid engine configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Registry state is unusable
    #[error("internal error: {0}")]
    Internal(String),
}

impl ErrorKind {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::MissingProperty { .. } => "APIMODEL_MISSING_PROPERTY",
            ErrorKind::InvalidProperty { .. } => "APIMODEL_INVALID_PROPERTY",
            ErrorKind::UndefinedProperty { .. } => "APIMODEL_UNDEFINED_PROPERTY",
            ErrorKind::Format { .. } => "APIMODEL_FORMAT",
            ErrorKind::UnexpectedProperty { .. } => "APIMODEL_UNEXPECTED_PROPERTY",
            ErrorKind::WrongModel { .. } => "APIMODEL_WRONG_MODEL",
            ErrorKind::DepthExceeded { .. } => "APIMODEL_DEPTH_EXCEEDED",
            ErrorKind::Conversion { .. } => "APIMODEL_CONVERSION",
            ErrorKind::SchemaDefinition { .. } => "APIMODEL_SCHEMA_DEFINITION",
            ErrorKind::UnknownModel(_) => "APIMODEL_UNKNOWN_MODEL",
            ErrorKind::Config(_) => "APIMODEL_CONFIG",
            ErrorKind::Internal(_) => "APIMODEL_INTERNAL",
        }
    }

    /// Property named by the error, if any
    pub fn property(&self) -> Option<&str> {
        match self {
            ErrorKind::MissingProperty { property, .. }
            | ErrorKind::InvalidProperty { property, .. }
            | ErrorKind::UndefinedProperty { property, .. }
            | ErrorKind::UnexpectedProperty { property, .. }
            | ErrorKind::Format { property, .. } => Some(property),
            ErrorKind::Conversion { field, .. } => Some(field),
            _ => None,
        }
    }
}

fn located(model: &str, property: &str) -> String {
    if property.is_empty() {
        String::new()
    } else {
        format!(" in property '{}' of {}", property, model)
    }
}

/// One step of the location of a failure inside a nested payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Wire key of a model or list-of-models property
    Key(String),
    /// Position inside a list of models
    Index(usize),
}

/// Error surfaced by `load`/`dump`, annotated with the path of the nested
/// model it happened in.
///
/// The path is empty when the failure is on the top-level model. It grows
/// from the front as the error propagates out of child models, so the kind
/// itself is never rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelError {
    kind: ErrorKind,
    path: Vec<PathSegment>,
}

impl ModelError {
    /// Create an error with an empty path
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: Vec::new(),
        }
    }

    /// Create a schema definition error
    pub fn schema_definition(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaDefinition {
            model: model.into(),
            reason: reason.into(),
        })
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config(reason.into()))
    }

    /// Create an error for a poisoned registry lock
    pub(crate) fn lock_poisoned() -> Self {
        Self::new(ErrorKind::Internal("Lock poisoned".into()))
    }

    /// Names the model and property of a format error raised by a bare
    /// marshaller. Other kinds are returned unchanged.
    pub fn in_property(mut self, model: &str, property: &str) -> Self {
        if let ErrorKind::Format {
            model: owner,
            property: key,
            ..
        } = &mut self.kind
        {
            if key.is_empty() {
                *owner = model.to_owned();
                *key = property.to_owned();
            }
        }
        self
    }

    /// Prefix the path with a property key
    pub fn at_key(mut self, key: impl Into<String>) -> Self {
        self.path.insert(0, PathSegment::Key(key.into()));
        self
    }

    /// Prefix the path with a list index
    pub fn at_index(mut self, index: usize) -> Self {
        self.path.insert(0, PathSegment::Index(index));
        self
    }

    /// Returns the error kind
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Consumes the error, returning its kind
    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    /// Returns the path segments
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Returns the path rendered as `parts[1].created`
    pub fn path_string(&self) -> String {
        let mut out = String::new();
        for segment in &self.path {
            match segment {
                PathSegment::Key(key) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(key);
                }
                PathSegment::Index(index) => {
                    out.push_str(&format!("[{}]", index));
                }
            }
        }
        out
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Returns the human-readable message without code or path
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl From<ErrorKind> for ModelError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.kind)?;
        if !self.path.is_empty() {
            write!(f, " (at {})", self.path_string())?;
        }
        Ok(())
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
