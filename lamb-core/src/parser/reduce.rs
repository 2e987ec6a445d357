use crate::{term::prelude::Tag, utils::prelude::SrcSpan};

use super::{
    ast::{Declaration, DeclarationKind, Expr},
    error::{parse_error, ParseError, ParseErrorType},
    registry::{Assoc, BracketKind, Reduce, Rule, MAX_PRECEDENCE},
};

/// Combines the operands of a reduced infix operator.
pub fn reduce_infix(reduce: Reduce, tag: Tag, left: Expr, right: Expr) -> Expr {
    match reduce {
        Reduce::Apply => {
            let location = left.location().merge(right.location());
            Expr::Apply { function: Box::new(left), argument: Box::new(right), location }
        },
        Reduce::Sequence | Reduce::Comma => reduce_chain(reduce, vec![left, right]),
        Reduce::Define => Expr::Define { tag, pattern: Box::new(left), body: Box::new(right) },
        Reduce::Lambda => attach_lambda(left, tag, right),
        Reduce::As => Expr::As { tag, name: Box::new(left), pattern: Box::new(right) },
        _ => Expr::Infix { operator: tag, left: Box::new(left), right: Box::new(right) },
    }
}

/// Joins the operands of a run of `;` or `,` into one node, given in source
/// order. A trailing chain of the same kind is spliced in.
pub fn reduce_chain(reduce: Reduce, mut items: Vec<Expr>) -> Expr {
    let splice = match (reduce, items.last()) {
        (Reduce::Sequence, Some(Expr::Sequence { .. })) | (Reduce::Comma, Some(Expr::Comma { .. })) => true,
        _ => false,
    };
    if splice {
        if let Some(mut last) = items.pop() {
            items.append(&mut last.take_items());
        }
    }

    let location = match (items.first(), items.last()) {
        (Some(first), Some(last)) => first.location().merge(last.location()),
        _ => SrcSpan::default(),
    };

    match reduce {
        Reduce::Comma => Expr::Comma { items, location },
        _ => Expr::Sequence { items, location },
    }
}

fn is_lambda_head(expr: &Expr) -> bool {
    matches!(expr, Expr::Prefix { operator, .. } if operator.text() == "\\")
}

/// Right operand the lambda body would descend into.
fn right_spine(expr: &Expr) -> Option<&Expr> {
    match expr {
        Expr::Apply { argument: last, .. }
        | Expr::Infix { right: last, .. }
        | Expr::Prefix { operand: last, .. } => Some(&**last),
        _ => None,
    }
}

/// Whether a `\`-marked parameter list sits at the end of the right spine.
fn ends_with_lambda_head(expr: &Expr) -> bool {
    let mut cursor = expr;
    loop {
        if is_lambda_head(cursor) {
            return true;
        }
        match right_spine(cursor) {
            Some(next) => cursor = next,
            None => return false,
        }
    }
}

/// `f \x -> b` means `f (\x -> b)`: the body attaches to the innermost
/// `\` on the right spine of the left operand, if there is one.
fn attach_lambda(mut left: Expr, tag: Tag, body: Expr) -> Expr {
    if !ends_with_lambda_head(&left) {
        return Expr::Lambda { tag, pattern: Box::new(left), body: Box::new(body) };
    }

    let end = body.location();
    let mut cursor = &mut left;
    while !is_lambda_head(cursor) {
        cursor = match cursor {
            Expr::Apply { argument: last, location, .. } => {
                *location = location.merge(end);
                &mut **last
            },
            Expr::Infix { right: last, .. } | Expr::Prefix { operand: last, .. } => &mut **last,
            other => other,
        };
    }

    let pattern = match &mut *cursor {
        Expr::Prefix { operand, .. } => operand.detach(),
        other => other.detach(),
    };
    *cursor = Expr::Lambda { tag, pattern: Box::new(pattern), body: Box::new(body) };
    left
}

fn items(content: Option<Expr>) -> Vec<Expr> {
    match content {
        None => vec![],
        Some(mut expr @ Expr::Comma { .. }) => expr.take_items(),
        Some(expr) => vec![expr],
    }
}

/// Turns the content of a closed bracket into its construct.
pub fn reduce_bracket(
    kind: BracketKind,
    open: Tag,
    close: Tag,
    content: Option<Expr>,
    section: bool,
) -> Result<Expr, ParseError> {
    let location = open.span().merge(close.span());

    let expr = match kind {
        BracketKind::Paren => {
            let body = match content {
                None => Expr::Unit { location },
                Some(mut expr @ Expr::Comma { .. }) => Expr::Tuple { items: expr.take_items(), location },
                Some(expr) => expr,
            };

            if section {
                Expr::Section { body: Box::new(body), location }
            } else {
                body
            }
        },
        BracketKind::Square => Expr::List { items: items(content), location },
        BracketKind::Brace => Expr::Data { alternatives: items(content), location },
        BracketKind::Block | BracketKind::File => match content {
            None => Expr::Sequence { items: vec![], location },
            Some(Expr::Comma { location, .. }) => {
                return parse_error(ParseErrorType::StrayComma, location)
            },
            Some(expr) => expr,
        },
        BracketKind::User => {
            let content = content.unwrap_or(Expr::Unit { location: close.span() });
            Expr::Bracket { open, close, content: Box::new(content) }
        },
    };

    Ok(expr)
}

/// Reads `kind [precedence] symbols.. [after prior]` from the operand of a
/// declaration keyword.
pub fn declaration(kind: DeclarationKind, keyword: &Tag, operand: &Expr) -> Result<Declaration, ParseError> {
    let location = keyword.span().merge(operand.location());
    let invalid = |reason| parse_error(
        ParseErrorType::InvalidDeclaration { keyword: keyword.text().to_string(), reason },
        location,
    );

    let (head, arguments) = operand.spine();
    let mut words = std::iter::once(head).chain(arguments);

    let precedence = match kind {
        DeclarationKind::Bracket => None,
        _ => match words.next() {
            Some(Expr::Int { value, .. }) if (0..=MAX_PRECEDENCE as i64).contains(value) => {
                Some(*value as u8)
            },
            Some(Expr::Int { .. }) => return invalid("needs a precedence from 0 to 99"),
            _ => return invalid("needs a precedence"),
        },
    };

    let mut symbols = vec![];
    let mut prior = None;

    while let Some(word) = words.next() {
        let Expr::Name { tag } = word else {
            return invalid("expects symbols");
        };

        if tag.text() == "after" && kind != DeclarationKind::Bracket {
            match (words.next(), words.next()) {
                (Some(Expr::Name { tag }), None) => prior = Some(tag.clone()),
                _ => return invalid("expects exactly one symbol after `after`"),
            }
            break;
        }

        symbols.push(tag.clone());
    }

    if symbols.is_empty() {
        return invalid("declares no symbol");
    }

    if kind == DeclarationKind::Bracket && symbols.len() != 2 {
        return invalid("needs an opening and a closing symbol");
    }

    Ok(Declaration { kind, precedence, symbols, prior, location })
}

/// Syntax rules a declaration introduces.
pub fn declared_rules(declaration: &Declaration) -> Vec<(Tag, Rule)> {
    let precedence = declaration.precedence.unwrap_or(0);

    if declaration.kind == DeclarationKind::Bracket {
        let [open, close] = &declaration.symbols[..] else {
            return vec![];
        };
        let (open_rule, close_rule) = Rule::brackets(open.text(), close.text(), BracketKind::User);
        return vec![(open.clone(), open_rule), (close.clone(), close_rule)];
    }

    declaration.symbols
        .iter()
        .map(|symbol| {
            let text = symbol.text();
            let rule = match declaration.kind {
                DeclarationKind::InfixLeft => Rule::infix(text, precedence, Assoc::Left, Reduce::Operator),
                DeclarationKind::InfixRight => Rule::infix(text, precedence, Assoc::Right, Reduce::Operator),
                DeclarationKind::Prefix => Rule::prefix(text, precedence, Reduce::Operator),
                DeclarationKind::Postfix => Rule::postfix(text, precedence),
                _ => Rule::infix(text, precedence, Assoc::None, Reduce::Operator),
            };

            let rule = match &declaration.prior {
                Some(prior) => rule.after(prior.text()),
                None => rule,
            };

            (symbol.clone(), rule)
        })
        .collect()
}

pub fn placeholder(at: SrcSpan) -> Expr {
    Expr::Placeholder { location: SrcSpan::at(at.start) }
}
