use thiserror::Error;

use crate::{lexer::prelude::LexicalError, utils::prelude::SrcSpan};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseErrorType {
    #[error("missing operand for `{operator}`")]
    MissingOperand { operator: String },
    #[error("missing open for `{close}`")]
    MissingOpen { close: String },
    #[error("missing close for `{open}`")]
    MissingClose { open: String },
    #[error("`{left}` and `{right}` cannot be chained without brackets")]
    NonAssociative { left: String, right: String },
    #[error("`{operator}` must follow `{prior}`")]
    PriorMismatch { operator: String, prior: String },
    #[error("`{symbol}` is already defined in this scope")]
    SyntaxRedefinition { symbol: String },
    #[error("invalid `{keyword}` declaration: {reason}")]
    InvalidDeclaration { keyword: String, reason: &'static str },
    #[error("comma outside of brackets")]
    StrayComma,
    #[error("indentation of {width} is not an even step")]
    OddIndentation { width: u32 },
    #[error("indentation of {width} matches no enclosing block")]
    InconsistentIndentation { width: u32 },
    #[error("{error}")]
    LexError { error: LexicalError },
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{error}")]
pub struct ParseError {
    pub error: ParseErrorType,
    pub span: SrcSpan
}

impl ParseError {
    pub fn details(&self) -> (&'static str, Vec<String>) {
        match &self.error {
            ParseErrorType::MissingOperand { operator } => ("Missing operand", vec![
                format!("`{operator}` needs an operand here.")
            ]),
            ParseErrorType::MissingOpen { close } => ("Missing open", vec![
                format!("Missing open for `{close}`.")
            ]),
            ParseErrorType::MissingClose { open } => ("Missing close", vec![
                format!("Missing close for `{open}`.")
            ]),
            ParseErrorType::NonAssociative { left, right } => ("Ambiguous chain", vec![
                format!("`{left}` and `{right}` have the same precedence but do not associate."),
                "Add brackets to say which comes first.".into(),
            ]),
            ParseErrorType::PriorMismatch { operator, prior } => ("Not expected this", vec![
                format!("`{operator}` is only valid after `{prior}`.")
            ]),
            ParseErrorType::SyntaxRedefinition { symbol } => ("Syntax redefinition", vec![
                format!("`{symbol}` already has a syntax rule in this scope.")
            ]),
            ParseErrorType::InvalidDeclaration { keyword, reason } => ("Invalid declaration", vec![
                format!("`{keyword}` declaration {reason}.")
            ]),
            ParseErrorType::StrayComma => ("Comma outside of brackets", vec![
                "Tuples and lists need surrounding brackets.".into()
            ]),
            ParseErrorType::OddIndentation { width } => ("Odd indentation", vec![
                format!("Blocks indent by an even number of spaces, this line has {width}.")
            ]),
            ParseErrorType::InconsistentIndentation { width } => ("Inconsistent indentation", vec![
                format!("No enclosing block is indented by {width} spaces.")
            ]),
            ParseErrorType::LexError { error } => error.details()
        }
    }
}

pub fn parse_error<T>(error: ParseErrorType, span: SrcSpan) -> Result<T, ParseError> {
    Err(ParseError { error, span })
}
