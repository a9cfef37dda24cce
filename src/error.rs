//! Error taxonomy for a generation run.
//!
//! Everything in here is fatal: the pipeline never hands a partially resolved
//! IR to the emitters. Non-fatal conditions are [`Warning`]s and travel with
//! the type descriptors instead.

use std::fmt;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal generation errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The input document could not be parsed (raised by the loaders, before the core runs).
    #[error("failed to parse API document: {0}")]
    DocumentParse(String),

    /// A pointer did not resolve or a composition keyword was malformed.
    #[error("cannot resolve schema at '{pointer}': {reason}")]
    SchemaResolution { pointer: String, reason: String },

    /// A parameter asked for a style/explode/location/type combination with no defined encoding.
    #[error("unsupported parameter '{parameter}' in operation '{operation}': {reason}")]
    UnsupportedConstruct {
        operation: String,
        parameter: String,
        reason: String,
    },

    /// A value did not fit a parameter's wire format (reference codec only).
    #[error("cannot serialize parameter '{parameter}': {reason}")]
    Codec { parameter: String, reason: String },

    /// An emitter failed to render its artifact.
    #[error("emitter '{target}' failed: {reason}")]
    Emission { target: String, reason: String },

    /// The generator configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn resolution(pointer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaResolution {
            pointer: pointer.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(
        operation: impl Into<String>,
        parameter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnsupportedConstruct {
            operation: operation.into(),
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

/// A non-fatal condition recorded during mapping (e.g. an unknown `format`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// JSON pointer of the schema the warning is about.
    pub pointer: String,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pointer, self.message)
    }
}
