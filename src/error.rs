use serde::Serialize;
use thiserror::Error;

use crate::value::Value;

// ————————————————————————————————————————————————————————————————————————————
// DATA ERRORS
// ————————————————————————————————————————————————————————————————————————————

/// Why an input did not conform. Never thrown; always returned as a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodeError {
    Regular {
        message: String,
        path: Vec<String>,
        received: Value,
    },
    Union {
        path: Vec<String>,
        received: Value,
        #[serde(rename = "isUnionError")]
        is_union_error: bool,
        errors: Vec<DecodeError>,
    },
}

impl DecodeError {
    pub fn regular(message: impl Into<String>, path: Vec<String>, received: Value) -> Self {
        DecodeError::Regular { message: message.into(), path, received }
    }

    pub fn union(path: Vec<String>, received: Value, errors: Vec<DecodeError>) -> Self {
        DecodeError::Union { path, received, is_union_error: true, errors }
    }

    pub fn path(&self) -> &[String] {
        match self {
            DecodeError::Regular { path, .. } | DecodeError::Union { path, .. } => path,
        }
    }

    pub fn received(&self) -> &Value {
        match self {
            DecodeError::Regular { received, .. } | DecodeError::Union { received, .. } => received,
        }
    }

    /// `None` for union errors.
    pub fn message(&self) -> Option<&str> {
        match self {
            DecodeError::Regular { message, .. } => Some(message),
            DecodeError::Union { .. } => None,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SCHEMA-DEFINITION & INTERNAL ERRORS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Error, Debug)]
pub enum CodecError {
    /// A kind with no JSON-Schema form was asked for one.
    #[error("Cannot generate JSON Schema for {kind} at {path}")]
    UnsupportedSchema { kind: &'static str, path: String },

    #[error("unknown ref `{name}` at {path}")]
    UnknownRef { name: String, path: String },

    #[error("no definition named `{0}`")]
    UnknownCodec(String),

    #[error("invalid regex `{pattern}` at {path}: {reason}")]
    InvalidRegex { pattern: String, path: String, reason: String },

    #[error("empty format list at {path}")]
    EmptyFormats { path: String },

    #[error("{kind} formatter `{name}` is not registered (at {path})")]
    UnknownFormat { kind: &'static str, name: String, path: String },

    #[error("discriminated union on `{discriminator}` has no mapping (at {path})")]
    EmptyDiscriminatorMapping { discriminator: String, path: String },

    #[error("failed to load runtype graph: {0}")]
    GraphLoad(String),

    #[error("internal error: {0}")]
    Internal(String),

    /// Raised by `Codec::parse`; the message is the pretty-printed error list.
    #[error("{message}")]
    Decode { message: String, errors: Vec<DecodeError> },
}

pub type Result<T, E = CodecError> = std::result::Result<T, E>;

/// Human rendering of a schema-walk path, `<root>` when empty.
pub(crate) fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        return "<root>".to_string();
    }
    crate::printer::join_path(path)
}
