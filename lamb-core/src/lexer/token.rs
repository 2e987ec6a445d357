use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // letter or `_` followed by letters, digits, `_` and `'`
    Name(String),
    // decimal, or `0x` / `0o` / `0b` prefixed
    Int(i64),
    // "..." with escapes, as bytes
    Str(Vec<u8>),
    // '.' with escapes
    Char(char),
    // runs of symbol characters, or a single punctuation character
    Operator(String),
    // width of the next non-blank line
    Newline(u32),
    Eof,
}

impl Token {
    /// Text the registry is consulted with, if any.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Token::Name(text) | Token::Operator(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> String {
        match self {
            Token::Name(name) => name.clone(),
            Token::Int(value) => value.to_string(),
            Token::Str(value) => format!("\"{}\"", value.escape_ascii()),
            Token::Char(value) => format!("{value:?}"),
            Token::Operator(operator) => operator.clone(),
            Token::Newline(_) => "newline".into(),
            Token::Eof => "end of file".into(),
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_literal())
    }
}

/// Characters that glue together into one operator lexeme.
pub fn is_symbol_char(ch: char) -> bool {
    matches!(
        ch,
        '!' | '#' | '$' | '%' | '&' | '*' | '+' | '-' | '.' | '/' | ':' | '<' | '=' | '>' | '?'
            | '@' | '^' | '|' | '~'
    )
}

/// Characters that always form a lexeme on their own.
pub fn is_punctuation(ch: char) -> bool {
    matches!(ch, '(' | ')' | '[' | ']' | '{' | '}' | ',' | ';' | '\\' | '`')
}

/// Unicode spellings of default operators.
pub fn unicode_alias(ch: char) -> Option<&'static str> {
    Some(match ch {
        '→' => "->",
        'λ' => "\\",
        '≠' => "!=",
        '≤' => "<=",
        '≥' => ">=",
        '∘' => ".",
        _ => return None,
    })
}
