use thiserror::Error;

use crate::utils::prelude::SrcSpan;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BindErrorType {
    /// A name that is neither a local, a builtin nor an earlier global.
    ///
    /// ```text
    /// main _ = puts greeting   <- `greeting` is not defined
    /// ```
    #[error("undefined symbol `{name}`")]
    UndefinedSymbol { name: String },
    /// ```text
    /// f x = x
    /// f y = y   <- `f` is already defined
    /// ```
    #[error("`{name}` is already defined")]
    Redefinition { name: String, first: Option<SrcSpan> },
    #[error("invalid pattern")]
    InvalidPattern,
    #[error("invalid left-hand side of a definition")]
    InvalidLeftHandSide,
    /// `_` only ever binds, it cannot be read.
    #[error("`{name}` is reserved")]
    ReservedName { name: String },
    #[error("data literal outside of a type definition")]
    MisplacedData,
    /// A block ending in a definition, or a lambda marker without `->`.
    #[error("missing body")]
    MissingBody,
    #[error("nothing to run")]
    NothingToRun,
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{error}")]
pub struct BindError {
    pub error: BindErrorType,
    pub location: SrcSpan,
}

impl BindError {
    pub fn details(&self) -> (&'static str, Vec<String>) {
        match &self.error {
            BindErrorType::UndefinedSymbol { name } => ("Undefined symbol", vec![
                format!("`{name}` is not defined here.")
            ]),
            BindErrorType::Redefinition { name, first: Some(_) } => ("Redefinition", vec![
                format!("`{name}` was defined multiple times.")
            ]),
            BindErrorType::Redefinition { name, first: None } => ("Redefinition", vec![
                format!("`{name}` is a builtin and cannot be redefined.")
            ]),
            BindErrorType::InvalidPattern => ("Invalid pattern", vec![
                "Parameters are names, `_`, `()`, tuples or `name@pattern`.".into()
            ]),
            BindErrorType::InvalidLeftHandSide => ("Invalid definition", vec![
                "Only names, operator applications and (locally) tuples can be defined.".into()
            ]),
            BindErrorType::ReservedName { name } => ("Reserved name", vec![
                format!("`{name}` can only be used as a pattern.")
            ]),
            BindErrorType::MisplacedData => ("Misplaced data literal", vec![
                "`{..}` may only be the body of a top-level type definition.".into()
            ]),
            BindErrorType::MissingBody => ("Missing body", vec![
                "A block must end in an expression.".into()
            ]),
            BindErrorType::NothingToRun => ("Nothing to run", vec![
                "The module has no expression and does not define `main`.".into()
            ]),
        }
    }
}

pub fn bind_error<T>(error: BindErrorType, location: SrcSpan) -> Result<T, BindError> {
    Err(BindError { error, location })
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum BindWarning {
    UnusedBinding {
        name: String,
        location: SrcSpan,
    },
    ShadowedPrelude {
        name: String,
        location: SrcSpan,
    },
}

impl BindWarning {
    pub fn location(&self) -> SrcSpan {
        match self {
            BindWarning::UnusedBinding { location, .. }
            | BindWarning::ShadowedPrelude { location, .. } => *location
        }
    }
}
