use thiserror::Error;

use crate::utils::prelude::SrcSpan;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LexicalErrorType {
    #[error("unrecognized character `{tok}`")]
    UnrecognizedToken { tok: char },
    #[error("digit out of radix")]
    DigitOutOfRadix,
    #[error("integer literal out of range")]
    IntegerOutOfRange,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated character literal")]
    UnterminatedChar,
    #[error("empty character literal")]
    EmptyChar,
    #[error("invalid escape `\\{ch}`")]
    InvalidEscape { ch: char },
    #[error("tab in indentation")]
    TabIndentation,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{error}")]
pub struct LexicalError {
    pub error: LexicalErrorType,
    pub location: SrcSpan
}

impl LexicalError {
    pub fn details(&self) -> (&'static str, Vec<String>) {
        match self.error {
            LexicalErrorType::UnrecognizedToken { .. } => {
                ("I don't know what to do with this character", vec![])
            },
            LexicalErrorType::DigitOutOfRadix => {
                ("This digit is not valid for the number's radix", vec![])
            },
            LexicalErrorType::IntegerOutOfRange => {
                ("This integer does not fit in 64 bits", vec![
                    format!("Integers range from {} to {}.", i64::MIN, i64::MAX)
                ])
            },
            LexicalErrorType::UnterminatedString => {
                ("Missing closing `\"`", vec![])
            },
            LexicalErrorType::UnterminatedChar => {
                ("Missing closing `'`", vec![])
            },
            LexicalErrorType::EmptyChar => {
                ("Character literal has no character", vec![])
            },
            LexicalErrorType::InvalidEscape { .. } => {
                ("Unknown escape sequence", vec![
                    "Known escapes are \\n \\t \\r \\0 \\\\ \\\" \\' and \\xHH.".into()
                ])
            },
            LexicalErrorType::TabIndentation => {
                ("Indent with spaces, not tabs", vec![])
            },
        }
    }
}
