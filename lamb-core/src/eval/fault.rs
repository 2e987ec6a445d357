use thiserror::Error;

use crate::utils::prelude::SrcSpan;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FaultKind {
    /// A builtin received something other than an integer.
    #[error("`{builtin}` expected an integer")]
    TypeMismatch { builtin: String },
    #[error("integer overflow in `{builtin}`")]
    Overflow { builtin: String },
    #[error("division by zero")]
    DivideByZero,
    #[error("modulo by zero")]
    ModuloByZero,
    #[error("byte {value} is out of range")]
    ByteRange { value: i64 },
    /// A builtin is the result but still waits for arguments.
    #[error("`{builtin}` is missing an argument")]
    MissingArgument { builtin: String },
    #[error("aborted")]
    Abort,
    /// A value demanded itself while being computed.
    #[error("infinite loop")]
    Loop,
    #[error("interrupted")]
    Interrupted,
    #[error("IO operation failed: {kind}")]
    Io { kind: std::io::ErrorKind },
    #[error("internal error: {message}")]
    Internal { message: String },
}

/// A runtime failure, where it happened and the globals leading there.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind}")]
pub struct Fault {
    pub kind: FaultKind,
    pub location: Option<SrcSpan>,
    /// Newest first; empty unless backtraces were requested.
    pub backtrace: Vec<String>,
}

impl Fault {
    pub fn new(kind: FaultKind) -> Self {
        Self { kind, location: None, backtrace: vec![] }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Internal { message: message.into() })
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.kind, FaultKind::Internal { .. })
    }

    pub fn details(&self) -> (&'static str, Vec<String>) {
        match &self.kind {
            FaultKind::TypeMismatch { builtin } => ("Type mismatch", vec![
                format!("`{builtin}` only works on integers.")
            ]),
            FaultKind::Overflow { builtin } => ("Integer overflow", vec![
                format!("The result of `{builtin}` does not fit in 64 bits.")
            ]),
            FaultKind::DivideByZero => ("Division by zero", vec![]),
            FaultKind::ModuloByZero => ("Modulo by zero", vec![]),
            FaultKind::ByteRange { value } => ("Byte out of range", vec![
                format!("`put` writes bytes from 0 to 255, got {value}.")
            ]),
            FaultKind::MissingArgument { builtin } => ("Missing argument", vec![
                format!("`{builtin}` was not given all of its arguments.")
            ]),
            FaultKind::Abort => ("Aborted", vec![]),
            FaultKind::Loop => ("Infinite loop", vec![
                "A value depends on itself.".into()
            ]),
            FaultKind::Interrupted => ("Interrupted", vec![]),
            FaultKind::Io { kind } => ("IO error", vec![
                format!("{kind}")
            ]),
            FaultKind::Internal { message } => ("Internal error", vec![
                message.clone()
            ]),
        }
    }
}
