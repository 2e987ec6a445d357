use std::rc::Rc;

use tracing::{debug, trace};

use crate::{
    lexer::prelude::{LexResult, Lexer, Spanned, Token},
    term::prelude::{Origin, Tag},
    utils::prelude::SrcSpan,
};
use super::{
    ast::{Expr, DeclarationKind},
    error::{parse_error, ParseError, ParseErrorType},
    reduce::{declaration, declared_rules, placeholder, reduce_bracket, reduce_chain, reduce_infix},
    registry::{BracketKind, Fixity, Reduce, Registry, RegistryError, Rule},
};

/// An operator waiting for its right operand.
#[derive(Debug)]
struct Pending {
    rule: Rc<Rule>,
    tag: Tag,
    /// Infix operator directly after `(`: the left operand of a section.
    missing_left: bool,
    /// Set on an opener once a section placeholder was made inside it.
    section: bool,
}

impl Pending {
    fn new(rule: Rc<Rule>, tag: Tag) -> Self {
        Self { rule, tag, missing_left: false, section: false }
    }
}

#[derive(Debug)]
enum Item {
    Operand(Expr),
    Pending(Pending),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Block(u32),
    Explicit,
}

/// Shift-reduce operator-precedence parser.
///
/// Operands and pending operators share one stack. Every bracket, including
/// the implicit blocks opened by indentation and the whole file, is an
/// opener on that stack and a scope in the registry.
pub struct Parser<T: Iterator<Item = LexResult>> {
    tokens: T,
    registry: Registry,
    stack: Vec<Item>,
    layout: Vec<Layout>,
    origin: Origin,
    started: bool,

    space: Rc<Rule>,
    newline: Rc<Rule>,
    block: Rc<Rule>,
}

impl<T: Iterator<Item = LexResult>> Parser<T> {
    pub fn new(input: T) -> Self {
        Self::with_registry(input, Registry::new())
    }

    pub fn with_registry(input: T, registry: Registry) -> Self {
        let (block, _) = Rule::brackets("indentation", "dedent", BracketKind::Block);

        Self {
            tokens: input,
            registry,
            stack: vec![],
            layout: vec![],
            origin: Origin::Module,
            started: false,

            space: Rc::new(Rule::space()),
            newline: Rc::new(Rule::newline()),
            block: Rc::new(block),
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn tag(&self, text: impl Into<String>, span: SrcSpan) -> Tag {
        Tag::with_origin(text, span, self.origin)
    }

    pub fn next_token(&mut self) -> Result<Spanned, ParseError> {
        match self.tokens.next() {
            Some(Ok(token)) => Ok(token),
            Some(Err(error)) => parse_error(ParseErrorType::LexError { error }, error.location),
            None => Ok((0, Token::Eof, 0)),
        }
    }

    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let (file, _) = Rule::brackets("", "", BracketKind::File);
        let tag = self.tag("", SrcSpan::at(0));
        self.stack.push(Item::Pending(Pending::new(Rc::new(file), tag)));
        self.layout.push(Layout::Block(0));

        loop {
            let (start, token, end) = self.next_token()?;
            let span = SrcSpan::from(start, end);
            trace!(?token, %span, depth = self.stack.len(), "shift");

            match token {
                Token::Eof => return self.finish(span),
                Token::Newline(width) => self.newline(width, span)?,
                Token::Int(value) => self.operand(Expr::Int { value, location: span })?,
                Token::Str(value) => self.operand(Expr::Str { value, location: span })?,
                Token::Char(value) => self.operand(Expr::Char { value, location: span })?,
                Token::Name(text) | Token::Operator(text) => {
                    let rule = self.registry.lookup(&text);
                    let tag = self.tag(text, span);

                    if rule.is_operand() || self.declaring(&rule) {
                        self.operand(Expr::Name { tag })?
                    } else {
                        self.operator(rule, tag)?
                    }
                }
            }
        }
    }

    /// Symbols named by a declaration are plain operands until it ends at a
    /// separator or bracket, so existing operators can be redeclared.
    fn declaring(&self, rule: &Rule) -> bool {
        if rule.is_separator()
            || rule.reduce == Reduce::Comma
            || matches!(rule.fixity, Fixity::Open | Fixity::Close)
        {
            return false;
        }

        self.stack
            .iter()
            .rev()
            .find_map(|item| match item {
                Item::Operand(_) => None,
                Item::Pending(pending) if pending.rule.reduce == Reduce::Apply => None,
                Item::Pending(pending) => Some(matches!(pending.rule.reduce, Reduce::Declare(_))),
            })
            .unwrap_or(false)
    }

    fn top_is_operand(&self) -> bool {
        matches!(self.stack.last(), Some(Item::Operand(_)))
    }

    fn top_is_opener(&self, kind: BracketKind) -> bool {
        matches!(
            self.stack.last(),
            Some(Item::Pending(pending)) if pending.rule.is_opener() && pending.rule.bracket_kind() == Some(kind)
        )
    }

    /// The operator right below an operand on top of the stack.
    fn pending_under_operand(&self) -> Option<&Pending> {
        match self.stack.len().checked_sub(2).map(|idx| &self.stack[idx..]) {
            Some([Item::Pending(pending), Item::Operand(_)]) => Some(pending),
            _ => None,
        }
    }

    fn nearest_opener(&mut self) -> Option<&mut Pending> {
        self.stack.iter_mut().rev().find_map(|item| match item {
            Item::Pending(pending) if pending.rule.is_opener() => Some(pending),
            _ => None,
        })
    }

    fn pop_operand(&mut self, operator: &Tag) -> Result<Expr, ParseError> {
        match self.stack.pop() {
            Some(Item::Operand(expr)) => Ok(expr),
            item => {
                self.stack.extend(item);
                parse_error(
                    ParseErrorType::MissingOperand { operator: operator.text().to_string() },
                    operator.span(),
                )
            }
        }
    }

    fn pop_pending(&mut self, after: &Tag) -> Result<Pending, ParseError> {
        match self.stack.pop() {
            Some(Item::Pending(pending)) => Ok(pending),
            item => {
                self.stack.extend(item);
                parse_error(
                    ParseErrorType::MissingOperand { operator: after.text().to_string() },
                    after.span(),
                )
            }
        }
    }

    fn operand(&mut self, expr: Expr) -> Result<(), ParseError> {
        if self.top_is_operand() {
            self.juxtapose(expr.location())?;
        }

        self.stack.push(Item::Operand(expr));
        Ok(())
    }

    fn juxtapose(&mut self, at: SrcSpan) -> Result<(), ParseError> {
        let rule = self.space.clone();
        let tag = self.tag(" ", SrcSpan::at(at.start));

        self.reduce_left(&rule, &tag)?;
        self.stack.push(Item::Pending(Pending::new(rule, tag)));
        Ok(())
    }

    fn operator(&mut self, rule: Rc<Rule>, tag: Tag) -> Result<(), ParseError> {
        match rule.fixity {
            Fixity::Open => {
                if self.top_is_operand() {
                    self.juxtapose(tag.span())?;
                }
                self.open(rule, tag);
                Ok(())
            },
            Fixity::Close => self.close(&rule, tag),
            Fixity::Prefix => {
                if self.top_is_operand() {
                    self.juxtapose(tag.span())?;
                }
                self.stack.push(Item::Pending(Pending::new(rule, tag)));
                Ok(())
            },
            Fixity::Infix | Fixity::Postfix => {
                if !self.top_is_operand() {
                    let sectionable = rule.fixity == Fixity::Infix
                        && rule.prior.is_none()
                        && rule.reduce == Reduce::Operator;

                    if sectionable && self.top_is_opener(BracketKind::Paren) {
                        let pending = Pending { missing_left: true, ..Pending::new(rule, tag) };
                        self.stack.push(Item::Pending(pending));
                        return Ok(());
                    }

                    return parse_error(
                        ParseErrorType::MissingOperand { operator: tag.text().to_string() },
                        tag.span(),
                    );
                }

                match &rule.prior {
                    Some(prior) => self.reduce_to_prior(prior, &tag)?,
                    None => self.reduce_left(&rule, &tag)?,
                }

                if rule.fixity == Fixity::Postfix {
                    let operand = self.pop_operand(&tag)?;
                    self.stack.push(Item::Operand(Expr::Postfix { operator: tag, operand: Box::new(operand) }));
                } else {
                    self.stack.push(Item::Pending(Pending::new(rule, tag)));
                }

                Ok(())
            }
        }
    }

    /// Whether the pending operator takes the operand on top of the stack
    /// before `incoming` may.
    fn binds_tighter(pending: &Pending, incoming: &Rule, tag: &Tag) -> Result<bool, ParseError> {
        let (right, left) = (pending.rule.right, incoming.left);

        if right != left {
            return Ok(right > left);
        }

        use super::registry::Assoc;
        match (pending.rule.assoc, incoming.assoc) {
            (Assoc::Left, Assoc::Left) => Ok(true),
            (Assoc::Right, Assoc::Right) => Ok(false),
            _ => parse_error(
                ParseErrorType::NonAssociative {
                    left: pending.tag.text().to_string(),
                    right: tag.text().to_string(),
                },
                pending.tag.span().merge(tag.span()),
            ),
        }
    }

    fn reduce_left(&mut self, incoming: &Rule, tag: &Tag) -> Result<(), ParseError> {
        while let Some(pending) = self.pending_under_operand() {
            if pending.rule.is_opener() || !Self::binds_tighter(pending, incoming, tag)? {
                break;
            }
            // a left section's operator must stay the root of its bracket
            if pending.missing_left {
                return parse_error(
                    ParseErrorType::MissingOperand { operator: pending.tag.text().to_string() },
                    pending.tag.span(),
                );
            }
            self.reduce_top()?;
        }

        Ok(())
    }

    /// Reduces everything above the nearest pending `prior` in the current
    /// bracket.
    fn reduce_to_prior(&mut self, prior: &str, tag: &Tag) -> Result<(), ParseError> {
        loop {
            let Some(pending) = self.pending_under_operand() else {
                return parse_error(
                    ParseErrorType::MissingOperand { operator: tag.text().to_string() },
                    tag.span(),
                );
            };

            if pending.rule.is_opener() {
                return parse_error(
                    ParseErrorType::PriorMismatch {
                        operator: tag.text().to_string(),
                        prior: prior.to_string(),
                    },
                    tag.span(),
                );
            }

            if pending.rule.symbol == prior {
                return Ok(());
            }

            self.reduce_top()?;
        }
    }

    /// Reduces until the operand on top sits right above an opener.
    fn reduce_to_opener(&mut self) -> Result<(), ParseError> {
        loop {
            match self.stack.last() {
                Some(Item::Pending(pending)) if pending.rule.is_opener() => return Ok(()),
                Some(Item::Pending(pending)) => {
                    return parse_error(
                        ParseErrorType::MissingOperand { operator: pending.tag.text().to_string() },
                        pending.tag.span(),
                    )
                },
                _ => {}
            }

            let under_opener = self.pending_under_operand().map(|pending| pending.rule.is_opener());
            match under_opener {
                Some(true) => return Ok(()),
                Some(false) => self.reduce_top()?,
                None => {
                    return parse_error(
                        ParseErrorType::MissingOpen { close: "end of file".into() },
                        SrcSpan::default(),
                    )
                }
            }
        }
    }

    fn top_pending_is(&self, rule: &Rc<Rule>) -> bool {
        matches!(self.stack.last(), Some(Item::Pending(pending)) if Rc::ptr_eq(&pending.rule, rule))
    }

    fn reduce_top(&mut self) -> Result<(), ParseError> {
        let Some(Item::Pending(top)) = self.stack.len().checked_sub(2).and_then(|idx| self.stack.get(idx)) else {
            return Ok(());
        };
        let tag = top.tag.clone();

        let right = self.pop_operand(&tag)?;
        let pending = self.pop_pending(&tag)?;

        let expr = if pending.rule.prior.is_some() {
            self.reduce_mixfix(pending, right)?
        } else {
            match pending.rule.fixity {
                Fixity::Prefix => match pending.rule.reduce {
                    Reduce::Erase => right,
                    Reduce::Declare(kind) => self.declare(kind, &pending.tag, right)?,
                    _ => Expr::Prefix { operator: pending.tag, operand: Box::new(right) },
                },
                _ if matches!(pending.rule.reduce, Reduce::Sequence | Reduce::Comma) => {
                    // the whole run of this separator folds at once
                    let mut items = vec![right, self.pop_operand(&pending.tag)?];
                    while self.top_pending_is(&pending.rule) {
                        let previous = self.pop_pending(&pending.tag)?;
                        items.push(self.pop_operand(&previous.tag)?);
                    }

                    items.reverse();
                    reduce_chain(pending.rule.reduce, items)
                },
                _ => {
                    let left = if pending.missing_left {
                        if let Some(opener) = self.nearest_opener() {
                            opener.section = true;
                        }
                        placeholder(pending.tag.span())
                    } else {
                        self.pop_operand(&pending.tag)?
                    };

                    reduce_infix(pending.rule.reduce, pending.tag, left, right)
                }
            }
        };

        self.stack.push(Item::Operand(expr));
        Ok(())
    }

    /// Collapses a chain such as `if c then a else b`, starting from its last
    /// part, into one `Mixfix` node.
    fn reduce_mixfix(&mut self, last: Pending, right: Expr) -> Result<Expr, ParseError> {
        let mut parts = vec![last.tag.clone()];
        let mut operands = vec![right];
        let mut current = last;

        while let Some(prior) = current.rule.prior.clone() {
            operands.push(self.pop_operand(&current.tag)?);

            let previous = self.pop_pending(&current.tag)?;
            if previous.rule.symbol != prior {
                return parse_error(
                    ParseErrorType::PriorMismatch { operator: current.tag.text().to_string(), prior },
                    current.tag.span(),
                );
            }

            parts.push(previous.tag.clone());
            current = previous;
        }

        if current.rule.fixity == Fixity::Infix {
            operands.push(self.pop_operand(&current.tag)?);
        }

        parts.reverse();
        operands.reverse();

        Ok(Expr::Mixfix { parts, operands })
    }

    fn declare(&mut self, kind: DeclarationKind, keyword: &Tag, operand: Expr) -> Result<Expr, ParseError> {
        let declaration = declaration(kind, keyword, &operand)?;

        for (tag, rule) in declared_rules(&declaration) {
            self.registry.register(rule).or_else(|RegistryError::Redefinition { symbol }| {
                parse_error(ParseErrorType::SyntaxRedefinition { symbol }, tag.span())
            })?;
        }

        debug!(%declaration, scope = self.registry.depth(), "declared syntax");
        Ok(Expr::Declaration(declaration))
    }

    fn open(&mut self, rule: Rc<Rule>, tag: Tag) {
        if rule.bracket_kind() == Some(BracketKind::Block) {
            trace!(scope = self.registry.depth() + 1, "open indentation block");
        } else {
            self.layout.push(Layout::Explicit);
        }

        self.registry.push_scope();
        self.stack.push(Item::Pending(Pending::new(rule, tag)));
    }

    fn erase_separators(&mut self) {
        while let Some(Item::Pending(pending)) = self.stack.last() {
            if !pending.rule.is_separator() {
                break;
            }
            let _ = self.stack.pop();
        }
    }

    /// `(op)` names the operator; `(x op)` gets a placeholder right operand.
    fn complete_section(&mut self) -> Result<(), ParseError> {
        let len = self.stack.len();
        let Some(Item::Pending(pending)) = self.stack.last() else {
            return Ok(());
        };

        if pending.rule.is_opener() {
            return Ok(());
        }

        let below = |depth: usize| len.checked_sub(depth).and_then(|idx| self.stack.get(idx));
        let is_paren = |item: Option<&Item>| matches!(
            item,
            Some(Item::Pending(opener)) if opener.rule.is_opener() && opener.rule.bracket_kind() == Some(BracketKind::Paren)
        );

        if pending.missing_left && is_paren(below(2)) {
            if let Some(Item::Pending(pending)) = self.stack.pop() {
                self.stack.push(Item::Operand(Expr::Name { tag: pending.tag }));
            }
            return Ok(());
        }

        let sectionable = pending.rule.fixity == Fixity::Infix
            && pending.rule.prior.is_none()
            && pending.rule.reduce == Reduce::Operator
            && !pending.missing_left
            && matches!(below(2), Some(Item::Operand(_)))
            && is_paren(below(3));

        let tag = pending.tag.clone();

        if !sectionable {
            return parse_error(
                ParseErrorType::MissingOperand { operator: tag.text().to_string() },
                tag.span(),
            );
        }

        if let Some(Item::Pending(opener)) = self.stack.get_mut(len - 3) {
            opener.section = true;
        }
        self.stack.push(Item::Operand(placeholder(SrcSpan::at(tag.span().end))));
        Ok(())
    }

    /// Pops the content (if any) and the opener of the innermost bracket.
    fn pop_bracket(&mut self, close: &Tag) -> Result<(Option<Expr>, Pending), ParseError> {
        let content = match self.stack.last() {
            Some(Item::Operand(_)) => Some(self.pop_operand(close)?),
            _ => None,
        };

        match self.stack.pop() {
            Some(Item::Pending(opener)) if opener.rule.is_opener() => Ok((content, opener)),
            _ => parse_error(
                ParseErrorType::MissingOpen { close: close.text().to_string() },
                close.span(),
            ),
        }
    }

    fn close(&mut self, rule: &Rule, tag: Tag) -> Result<(), ParseError> {
        self.erase_separators();
        self.complete_section()?;
        self.reduce_to_opener()?;

        let (content, opener) = self.pop_bracket(&tag)?;

        if opener.rule.partner.as_deref() != Some(rule.symbol.as_str()) {
            let unclosed = rule.partner.as_deref().is_some_and(|open| {
                self.stack.iter().any(|item| matches!(
                    item,
                    Item::Pending(pending) if pending.rule.is_opener() && pending.rule.symbol == open
                ))
            });

            return match opener.rule.bracket_kind() {
                Some(BracketKind::Paren | BracketKind::Square | BracketKind::Brace | BracketKind::User)
                    if unclosed => parse_error(
                        ParseErrorType::MissingClose { open: opener.tag.text().to_string() },
                        opener.tag.span(),
                    ),
                _ => parse_error(
                    ParseErrorType::MissingOpen { close: tag.text().to_string() },
                    tag.span(),
                ),
            };
        }

        self.registry.pop_scope();
        let _ = self.layout.pop();

        let kind = opener.rule.bracket_kind().unwrap_or(BracketKind::Paren);
        let expr = reduce_bracket(kind, opener.tag, tag, content, opener.section)?;
        self.stack.push(Item::Operand(expr));
        Ok(())
    }

    fn open_block(&mut self, width: u32, span: SrcSpan) {
        self.layout.push(Layout::Block(width));
        let tag = self.tag("indentation", span);
        self.open(self.block.clone(), tag);
    }

    fn close_block(&mut self, span: SrcSpan) -> Result<(), ParseError> {
        self.erase_separators();
        self.reduce_to_opener()?;

        let tag = self.tag("dedent", span);
        let (content, opener) = self.pop_bracket(&tag)?;

        if opener.rule.bracket_kind() != Some(BracketKind::Block) {
            return parse_error(
                ParseErrorType::MissingClose { open: opener.tag.text().to_string() },
                opener.tag.span(),
            );
        }

        self.registry.pop_scope();
        let _ = self.layout.pop();
        trace!(scope = self.registry.depth(), "close indentation block");

        let expr = reduce_bracket(BracketKind::Block, opener.tag, tag, content, false)?;
        self.stack.push(Item::Operand(expr));
        Ok(())
    }

    fn newline(&mut self, width: u32, span: SrcSpan) -> Result<(), ParseError> {
        let current = match self.layout.last() {
            Some(Layout::Explicit) => return Ok(()),
            Some(Layout::Block(current)) => *current,
            None => 0,
        };

        // the first line sets the indentation of the whole file
        if !self.started {
            self.started = true;
            if let Some(Layout::Block(base)) = self.layout.last_mut() {
                *base = width;
            }
            return Ok(());
        }

        if width > current {
            if !self.top_is_operand() {
                if (width - current) % 2 == 1 {
                    return parse_error(ParseErrorType::OddIndentation { width }, span);
                }
                self.open_block(width, span);
            }
            return Ok(());
        }

        while let Some(Layout::Block(block)) = self.layout.last() {
            if *block <= width || self.layout.len() == 1 {
                break;
            }
            self.close_block(span)?;
        }

        match self.layout.last() {
            Some(Layout::Block(block)) if *block == width => {},
            _ => return parse_error(ParseErrorType::InconsistentIndentation { width }, span),
        }

        if self.top_is_operand() {
            let rule = self.newline.clone();
            let tag = self.tag("newline", span);

            self.reduce_left(&rule, &tag)?;
            self.stack.push(Item::Pending(Pending::new(rule, tag)));
        }

        Ok(())
    }

    fn finish(&mut self, span: SrcSpan) -> Result<Expr, ParseError> {
        while let Some(Layout::Block(_)) = self.layout.last() {
            if self.layout.len() == 1 {
                break;
            }
            self.close_block(span)?;
        }

        self.erase_separators();
        self.reduce_to_opener()?;

        let tag = self.tag("end of file", span);
        let (content, opener) = self.pop_bracket(&tag)?;

        if opener.rule.bracket_kind() != Some(BracketKind::File) {
            return parse_error(
                ParseErrorType::MissingClose { open: opener.tag.text().to_string() },
                opener.tag.span(),
            );
        }

        debug!(scopes = self.registry.depth(), "parsed module");
        reduce_bracket(BracketKind::File, opener.tag, tag, content, false)
    }
}

fn indexed(stream: impl Iterator<Item = char>) -> impl Iterator<Item = (u32, char)> {
    stream.scan(0, |pos, c| {
        *pos += c.len_utf8() as u32;
        Some((*pos - c.len_utf8() as u32, c))
    })
}

pub fn parse_module(src: &str) -> Result<Expr, ParseError> {
    let lexer = Lexer::new(src.char_indices().map(|(i, c)| (i as u32, c)));
    let mut parser = Parser::new(lexer);

    parser.parse()
}

/// Parses source whose tags should point into the prelude.
pub fn parse_prelude(src: &str) -> Result<Expr, ParseError> {
    let lexer = Lexer::new(src.char_indices().map(|(i, c)| (i as u32, c)));
    let mut parser = Parser::new(lexer).with_origin(Origin::Prelude);

    parser.parse()
}

pub fn parse_module_from_stream(stream: impl Iterator<Item = char>) -> Result<Expr, ParseError> {
    let lexer = Lexer::new(indexed(stream));
    let mut parser = Parser::new(lexer);

    parser.parse()
}
