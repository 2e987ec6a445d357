use std::{fmt::Display, rc::Rc};

use crate::utils::prelude::SrcSpan;

/// Which source a tag's span points into.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    #[default]
    Module,
    Prelude,
    Synthetic,
}

#[derive(Debug)]
struct TagData {
    text: String,
    span: SrcSpan,
    origin: Origin,
}

/// Lexeme text plus its location, shared between the surface tree, terms,
/// closures and diagnostics.
///
/// Two tags are equal when their text is equal; locations are ignored so
/// that trees parsed from different renderings of the same program compare
/// equal.
#[derive(Debug, Clone)]
pub struct Tag(Rc<TagData>);

impl Tag {
    pub fn new(text: impl Into<String>, span: SrcSpan) -> Self {
        Self::with_origin(text, span, Origin::Module)
    }

    pub fn with_origin(text: impl Into<String>, span: SrcSpan, origin: Origin) -> Self {
        Self(Rc::new(TagData { text: text.into(), span, origin }))
    }

    pub fn synthetic(text: impl Into<String>) -> Self {
        Self::with_origin(text, SrcSpan::default(), Origin::Synthetic)
    }

    pub fn text(&self) -> &str {
        &self.0.text
    }

    pub fn span(&self) -> SrcSpan {
        self.0.span
    }

    pub fn origin(&self) -> Origin {
        self.0.origin
    }

    /// Operator lexemes are printed in parentheses when used as values.
    pub fn is_symbolic(&self) -> bool {
        is_symbolic(self.text())
    }
}

/// Hidden binder names start with a space and print bare.
pub fn is_symbolic(text: &str) -> bool {
    text.chars()
        .next()
        .map(|ch| !(ch.is_alphanumeric() || ch == '_' || ch == '\'' || ch == ' '))
        .unwrap_or(false)
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.text() == other.text()
    }
}

impl Eq for Tag {}

impl Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text())
    }
}
