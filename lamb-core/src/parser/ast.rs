use std::fmt::Display;

use crate::{term::prelude::Tag, utils::prelude::SrcSpan};

/// Fixity keyword of a syntax declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    InfixLeft,
    InfixRight,
    Infix,
    Prefix,
    Postfix,
    Bracket,
}

impl DeclarationKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::InfixLeft => "infixl",
            Self::InfixRight => "infixr",
            Self::Infix => "infix",
            Self::Prefix => "prefix",
            Self::Postfix => "postfix",
            Self::Bracket => "bracket",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub precedence: Option<u8>,
    pub symbols: Vec<Tag>,
    pub prior: Option<Tag>,
    pub location: SrcSpan,
}

impl Display for Declaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind.keyword())?;
        if let Some(precedence) = self.precedence {
            write!(f, " {precedence}")?;
        }
        for symbol in &self.symbols {
            write!(f, " {symbol}")?;
        }
        if let Some(prior) = &self.prior {
            write!(f, " after {prior}")?;
        }
        Ok(())
    }
}

/// Surface tree produced by the parser, before any name is resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int { value: i64, location: SrcSpan },
    Str { value: Vec<u8>, location: SrcSpan },
    Char { value: char, location: SrcSpan },
    Name { tag: Tag },
    /// Missing operand of an operator section.
    Placeholder { location: SrcSpan },
    Apply { function: Box<Expr>, argument: Box<Expr>, location: SrcSpan },
    Infix { operator: Tag, left: Box<Expr>, right: Box<Expr> },
    Prefix { operator: Tag, operand: Box<Expr> },
    Postfix { operator: Tag, operand: Box<Expr> },
    /// `if c then a else b` has parts `[if, then, else]` and operands `[c, a, b]`.
    Mixfix { parts: Vec<Tag>, operands: Vec<Expr> },
    Bracket { open: Tag, close: Tag, content: Box<Expr> },
    Define { tag: Tag, pattern: Box<Expr>, body: Box<Expr> },
    Lambda { tag: Tag, pattern: Box<Expr>, body: Box<Expr> },
    As { tag: Tag, name: Box<Expr>, pattern: Box<Expr> },
    Sequence { items: Vec<Expr>, location: SrcSpan },
    /// Comma list; only ever lives on the parser stack.
    Comma { items: Vec<Expr>, location: SrcSpan },
    Unit { location: SrcSpan },
    Tuple { items: Vec<Expr>, location: SrcSpan },
    List { items: Vec<Expr>, location: SrcSpan },
    Data { alternatives: Vec<Expr>, location: SrcSpan },
    Section { body: Box<Expr>, location: SrcSpan },
    Declaration(Declaration),
}

impl Expr {
    pub fn location(&self) -> SrcSpan {
        match self {
            Expr::Int { location, .. }
            | Expr::Str { location, .. }
            | Expr::Char { location, .. }
            | Expr::Placeholder { location }
            | Expr::Apply { location, .. }
            | Expr::Sequence { location, .. }
            | Expr::Comma { location, .. }
            | Expr::Unit { location }
            | Expr::Tuple { location, .. }
            | Expr::List { location, .. }
            | Expr::Data { location, .. }
            | Expr::Section { location, .. } => *location,
            Expr::Declaration(declaration) => declaration.location,
            Expr::Name { tag } => tag.span(),
            Expr::Infix { operator, left, right } => {
                // operator chains nest arbitrarily deep; only their outer edges count
                let mut first = left.as_ref();
                while let Expr::Infix { left, .. } = first {
                    first = left;
                }
                let mut last = right.as_ref();
                while let Expr::Infix { right, .. } = last {
                    last = right;
                }
                operator.span().merge(first.location()).merge(last.location())
            },
            Expr::Prefix { operator, operand } | Expr::Postfix { operator, operand } => {
                operator.span().merge(operand.location())
            },
            Expr::Mixfix { parts, operands } => parts
                .iter()
                .map(Tag::span)
                .chain(operands.iter().map(Expr::location))
                .reduce(|span, other| span.merge(other))
                .unwrap_or_default(),
            Expr::Bracket { open, close, .. } => open.span().merge(close.span()),
            Expr::Define { pattern, body, .. }
            | Expr::Lambda { pattern, body, .. } => pattern.location().merge(body.location()),
            Expr::As { name, pattern, .. } => name.location().merge(pattern.location()),
        }
    }

    /// Head and arguments of a juxtaposition chain: `f a b` is `(f, [a, b])`.
    pub fn spine(&self) -> (&Expr, Vec<&Expr>) {
        let mut arguments = vec![];
        let mut head = self;

        while let Expr::Apply { function, argument, .. } = head {
            arguments.push(argument.as_ref());
            head = function;
        }

        arguments.reverse();
        (head, arguments)
    }

    /// Whether `name` occurs anywhere in this tree as a name or operator.
    pub fn mentions(&self, name: &str) -> bool {
        let mut pending = vec![self];

        while let Some(expr) = pending.pop() {
            let found = match expr {
                Expr::Int { .. }
                | Expr::Str { .. }
                | Expr::Char { .. }
                | Expr::Placeholder { .. }
                | Expr::Unit { .. }
                | Expr::Declaration(_) => false,
                Expr::Name { tag } => tag.text() == name,
                Expr::Apply { function, argument, .. } => {
                    pending.extend([argument.as_ref(), function.as_ref()]);
                    false
                },
                Expr::Infix { operator, left, right } => {
                    pending.extend([right.as_ref(), left.as_ref()]);
                    operator.text() == name
                },
                Expr::Prefix { operator, operand } | Expr::Postfix { operator, operand } => {
                    pending.push(operand);
                    operator.text() == name
                },
                Expr::Mixfix { parts, operands } => {
                    pending.extend(operands.iter().rev());
                    mixfix_name(parts) == name
                },
                Expr::Bracket { open, close, content } => {
                    pending.push(content);
                    format!("{open}{close}") == name
                },
                Expr::Define { pattern, body, .. } | Expr::Lambda { pattern, body, .. } => {
                    pending.extend([body.as_ref(), pattern.as_ref()]);
                    false
                },
                Expr::As { pattern, .. } | Expr::Section { body: pattern, .. } => {
                    pending.push(pattern);
                    false
                },
                Expr::Sequence { items, .. }
                | Expr::Comma { items, .. }
                | Expr::Tuple { items, .. }
                | Expr::List { items, .. }
                | Expr::Data { alternatives: items, .. } => {
                    pending.extend(items.iter().rev());
                    false
                },
            };

            if found {
                return true;
            }
        }

        false
    }

    /// Takes the node out, leaving an empty `Unit` in its place.
    pub fn detach(&mut self) -> Expr {
        std::mem::replace(self, Expr::Unit { location: SrcSpan::default() })
    }

    /// Items of a `;` or `,` chain, moved out; empty for any other node.
    pub fn take_items(&mut self) -> Vec<Expr> {
        match self {
            Expr::Sequence { items, .. } | Expr::Comma { items, .. } => std::mem::take(items),
            _ => vec![],
        }
    }

    fn is_leaf(&self) -> bool {
        matches!(
            self,
            Expr::Int { .. }
                | Expr::Str { .. }
                | Expr::Char { .. }
                | Expr::Name { .. }
                | Expr::Placeholder { .. }
                | Expr::Unit { .. }
                | Expr::Declaration(_)
        )
    }

    /// Moves every child that has children of its own into `out`.
    fn release_children(&mut self, out: &mut Vec<Expr>) {
        fn release(child: &mut Expr, out: &mut Vec<Expr>) {
            if !child.is_leaf() {
                out.push(child.detach());
            }
        }

        match self {
            Expr::Apply { function: first, argument: second, .. }
            | Expr::Infix { left: first, right: second, .. }
            | Expr::Define { pattern: first, body: second, .. }
            | Expr::Lambda { pattern: first, body: second, .. }
            | Expr::As { name: first, pattern: second, .. } => {
                release(first, out);
                release(second, out);
            },
            Expr::Prefix { operand: child, .. }
            | Expr::Postfix { operand: child, .. }
            | Expr::Bracket { content: child, .. }
            | Expr::Section { body: child, .. } => release(child, out),
            Expr::Mixfix { operands: items, .. }
            | Expr::Sequence { items, .. }
            | Expr::Comma { items, .. }
            | Expr::Tuple { items, .. }
            | Expr::List { items, .. }
            | Expr::Data { alternatives: items, .. } => out.append(items),
            _ => {},
        }
    }
}

/// Deep trees, such as long operator chains, are released without recursion.
impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = vec![];
        self.release_children(&mut pending);

        while let Some(mut expr) = pending.pop() {
            expr.release_children(&mut pending);
        }
    }
}

/// Binding name of a mixfix chain: its parts joined by `_`.
pub fn mixfix_name(parts: &[Tag]) -> String {
    parts.iter().map(Tag::text).collect::<Vec<_>>().join("_")
}

fn write_items(f: &mut std::fmt::Formatter<'_>, items: &[Expr], separator: &str) -> std::fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            write!(f, "{separator}")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_char(f: &mut std::fmt::Formatter<'_>, ch: char, quote: char) -> std::fmt::Result {
    match ch {
        '\n' => write!(f, "\\n"),
        '\t' => write!(f, "\\t"),
        '\r' => write!(f, "\\r"),
        '\0' => write!(f, "\\0"),
        '\\' => write!(f, "\\\\"),
        ch if ch == quote => write!(f, "\\{ch}"),
        ch if ch.is_control() && (ch as u32) < 0x100 => write!(f, "\\x{:02x}", ch as u32),
        ch => write!(f, "{ch}"),
    }
}

/// Fully parenthesized rendering; parsing it again yields an equal tree.
impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Int { value, .. } => write!(f, "{value}"),
            Expr::Str { value, .. } => {
                write!(f, "\"")?;
                for &byte in value {
                    if byte.is_ascii() {
                        write_char(f, char::from(byte), '"')?;
                    } else {
                        write!(f, "\\x{byte:02x}")?;
                    }
                }
                write!(f, "\"")
            },
            Expr::Char { value, .. } => {
                write!(f, "'")?;
                write_char(f, *value, '\'')?;
                write!(f, "'")
            },
            Expr::Name { tag } if tag.is_symbolic() => write!(f, "({tag})"),
            Expr::Name { tag } => write!(f, "{tag}"),
            Expr::Placeholder { .. } => Ok(()),
            Expr::Apply { function, argument, .. } => write!(f, "({function} {argument})"),
            Expr::Infix { operator, left, right } => match (left.as_ref(), right.as_ref()) {
                (Expr::Placeholder { .. }, _) => write!(f, "({operator} {right})"),
                (_, Expr::Placeholder { .. }) => write!(f, "({left} {operator})"),
                _ => write!(f, "({left} {operator} {right})"),
            },
            Expr::Prefix { operator, operand } => write!(f, "({operator} {operand})"),
            Expr::Postfix { operator, operand } => write!(f, "({operand} {operator})"),
            Expr::Mixfix { parts, operands } => {
                write!(f, "(")?;
                let mut operands = operands.iter();
                // an infix head carries a left operand before its first part
                if operands.len() > parts.len() {
                    if let Some(operand) = operands.next() {
                        write!(f, "{operand} ")?;
                    }
                }
                for (idx, part) in parts.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{part}")?;
                    if let Some(operand) = operands.next() {
                        write!(f, " {operand}")?;
                    }
                }
                write!(f, ")")
            },
            Expr::Bracket { open, close, content } => match content.as_ref() {
                Expr::Unit { .. } => write!(f, "{open} {close}"),
                content => write!(f, "{open} {content} {close}"),
            },
            Expr::Define { tag, pattern, body } | Expr::Lambda { tag, pattern, body } => {
                write!(f, "({pattern} {tag} {body})")
            },
            Expr::As { tag, name, pattern } => write!(f, "({name}{tag}{pattern})"),
            Expr::Sequence { items, .. } => {
                write!(f, "(")?;
                write_items(f, items, "; ")?;
                write!(f, ")")
            },
            Expr::Comma { items, .. } => write_items(f, items, ", "),
            Expr::Unit { .. } => write!(f, "()"),
            Expr::Tuple { items, .. } => {
                write!(f, "(")?;
                write_items(f, items, ", ")?;
                write!(f, ")")
            },
            Expr::List { items, .. } => {
                write!(f, "[")?;
                write_items(f, items, ", ")?;
                write!(f, "]")
            },
            Expr::Data { alternatives, .. } => {
                write!(f, "{{")?;
                write_items(f, alternatives, ", ")?;
                write!(f, "}}")
            },
            Expr::Section { body, .. } => write!(f, "{body}"),
            Expr::Declaration(declaration) => write!(f, "{declaration}"),
        }
    }
}
