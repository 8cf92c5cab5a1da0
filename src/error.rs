//! Error types.
//!
//! None of these ever cross back into the scripting environment: inbound
//! calls and the tick log them and carry on. They surface only through the
//! Rust-host APIs that return `Result`.

use thiserror::Error;

use crate::types::CommandKind;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The payload could not be read as a command.
    #[error("malformed {kind} command: {reason}")]
    MalformedCommand { kind: CommandKind, reason: String },

    /// No factory recognizes the type discriminant.
    #[error("no factory recognizes type `{type_name}` for `{id}`")]
    CreationFailure { id: String, type_name: String },

    /// A referenced id never appeared within the retry budget.
    #[error("`{id}` still references unknown `{reference}` after {attempts} ticks")]
    UnresolvedReference {
        id: String,
        reference: String,
        attempts: u32,
    },

    #[error("object `{id}` failed in {hook}: {source}")]
    Hook {
        id: String,
        hook: &'static str,
        #[source]
        source: ObjectError,
    },

    #[error("unknown object `{0}`")]
    UnknownObject(String),

    #[error("script evaluation failed: {0}")]
    Script(#[from] ScriptError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Errors raised by a live object's hooks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ObjectError {
    #[error("unsupported method `{0}`")]
    UnsupportedMethod(String),

    #[error("invalid attribute `{name}`: {reason}")]
    InvalidAttribute { name: String, reason: String },

    #[error("{0}")]
    Native(String),
}

/// Errors raised by the script evaluator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("no script environment attached")]
    Unavailable,

    #[error("{0}")]
    Failed(String),
}
