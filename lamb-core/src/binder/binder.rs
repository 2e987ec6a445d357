use std::{collections::HashMap, path::PathBuf};

use tracing::{debug, trace};

use crate::{
    parser::prelude::{mixfix_name, Expr},
    term::prelude::{Builtin, Hold, Origin, Tag, Term},
    utils::prelude::{BindWarningEmitter, SrcSpan},
};
use super::error::{bind_error, BindError, BindErrorType, BindWarning};

/// Hidden local names; no lexeme can spell them.
const SECTION: &str = " section";
const TUPLE: &str = " tuple";
const UNIT: &str = " unit";

#[derive(Debug)]
pub struct Global {
    pub tag: Tag,
    pub term: Hold,
}

#[derive(Debug)]
pub enum Entry {
    /// Top-level expressions; the value is printed after the run.
    Expression(Hold),
    /// `main` applied to the input stream; it talks through `put` only.
    Main(Hold),
}

impl Entry {
    pub fn term(&self) -> &Hold {
        match self {
            Entry::Expression(term) | Entry::Main(term) => term,
        }
    }
}

/// A bound program: the prelude's globals followed by the module's, and the
/// term to run.
#[derive(Debug)]
pub struct Module {
    pub globals: Vec<Global>,
    pub entry: Entry,
    pub path: PathBuf,
    pub src: String,
}

/// Pending work of [`Binder::bind_expr`].
enum Task<'e> {
    Bind(&'e Expr),
    /// Applies the first of the last `n` terms to the rest.
    Apply(usize),
    /// Makes a list of the last `n` terms.
    List(usize),
}

/// A block statement, bound but not yet wrapped around the rest.
enum Statement {
    Action(Hold),
    /// `slot` is the local's position within the block's scope.
    Local { tag: Tag, value: Hold, slot: usize },
    Destructure { pattern: Pattern, value: Hold },
}

#[derive(Debug)]
struct Local {
    tag: Tag,
    used: bool,
}

/// Parameter shapes accepted on the left of `=` and `->`.
#[derive(Debug)]
enum Pattern {
    Name(Tag),
    Unit,
    Tuple(Vec<Pattern>),
    As(Tag, Box<Pattern>),
}

impl Pattern {
    fn from_expr(expr: &Expr) -> Result<Self, BindError> {
        match expr {
            Expr::Name { tag } => Ok(Pattern::Name(tag.clone())),
            Expr::Unit { .. } => Ok(Pattern::Unit),
            Expr::Tuple { items, .. } => Ok(Pattern::Tuple(
                items.iter().map(Pattern::from_expr).collect::<Result<_, _>>()?
            )),
            Expr::As { name, pattern, .. } => match name.as_ref() {
                Expr::Name { tag } if tag.text() != "_" => {
                    Ok(Pattern::As(tag.clone(), Box::new(Pattern::from_expr(pattern)?)))
                },
                name => bind_error(BindErrorType::InvalidPattern, name.location()),
            },
            expr => bind_error(BindErrorType::InvalidPattern, expr.location()),
        }
    }

    /// Locals bound by the pattern, in binding order.
    fn locals(&self, out: &mut Vec<Tag>) {
        match self {
            Pattern::Name(tag) => out.push(tag.clone()),
            Pattern::Unit => out.push(Tag::synthetic(UNIT)),
            Pattern::Tuple(items) => {
                out.push(Tag::synthetic(TUPLE));
                for item in items {
                    item.locals(out);
                }
            },
            Pattern::As(tag, pattern) => {
                out.push(tag.clone());
                pattern.locals(out);
            },
        }
    }
}

/// Builds the function that takes one argument per pattern and continues
/// with `body`, which was bound under the patterns' locals.
///
/// A tuple or as-pattern becomes a one-argument wrapper handing projections
/// of its argument to the sub-patterns.
fn compile(patterns: &[&Pattern], body: Hold) -> Hold {
    let Some((first, rest)) = patterns.split_first() else {
        return body;
    };

    match first {
        Pattern::Name(tag) => Term::lambda(tag.clone(), compile(rest, body)),
        Pattern::Unit => Term::lambda(Tag::synthetic(UNIT), compile(rest, body)),
        Pattern::Tuple(items) => {
            let inner = items.iter().chain(rest.iter().copied()).collect::<Vec<_>>();
            let tuple = Tag::synthetic(TUPLE);
            let projections = (0..items.len())
                .map(|index| Term::apply(projection(items.len(), index), Term::local(0, tuple.clone())))
                .collect::<Vec<_>>();

            Term::lambda(tuple, Term::apply_all(compile(&inner, body), projections))
        },
        Pattern::As(tag, pattern) => {
            let inner = std::iter::once(pattern.as_ref()).chain(rest.iter().copied()).collect::<Vec<_>>();
            Term::lambda(tag.clone(), Term::apply(compile(&inner, body), Term::local(0, tag.clone())))
        },
    }
}

fn name(text: impl Into<String>) -> Tag {
    Tag::synthetic(text)
}

fn lambdas(names: Vec<Tag>, body: Hold) -> Hold {
    names.into_iter().rev().fold(body, |body, tag| Term::lambda(tag, body))
}

fn numbered(prefix: &str, count: usize) -> impl Iterator<Item = Tag> + '_ {
    (1..=count).map(move |idx| name(format!("{prefix}{idx}")))
}

/// `\x -> x`
fn identity() -> Hold {
    Term::lambda(name("x"), Term::local(0, name("x")))
}

/// `\n c -> n`
fn nil() -> Hold {
    lambdas(vec![name("n"), name("c")], Term::local(1, name("n")))
}

/// `\h t n c -> c h t`
fn cons() -> Hold {
    let body = Term::apply_all(Term::local(0, name("c")), [
        Term::local(3, name("h")),
        Term::local(2, name("t")),
    ]);
    lambdas(vec![name("h"), name("t"), name("n"), name("c")], body)
}

/// `\f -> (\x -> f (x x)) (\x -> f (x x))`
fn fix() -> Hold {
    let twice = Term::apply(Term::local(0, name("x")), Term::local(0, name("x")));
    let half = Term::lambda(name("x"), Term::apply(Term::local(1, name("f")), twice));
    Term::lambda(name("f"), Term::apply(half.clone(), half))
}

/// `\x1 .. xn k -> k x1 .. xn`
fn tuple(arity: usize) -> Hold {
    let fields = numbered("x", arity)
        .enumerate()
        .map(|(idx, tag)| Term::local((arity - idx) as u32, tag));
    let body = Term::apply_all(Term::local(0, name("k")), fields);

    lambdas(numbered("x", arity).chain([name("k")]).collect(), body)
}

/// `\t -> t (\x1 .. xn -> xi)`
fn projection(arity: usize, index: usize) -> Hold {
    let field = name(format!("x{}", index + 1));
    let pick = lambdas(numbered("x", arity).collect(), Term::local((arity - 1 - index) as u32, field));

    Term::lambda(name("t"), Term::apply(Term::local(0, name("t")), pick))
}

/// Constructor `index` of a type with `alternatives` constructors:
/// `\f1 .. fk h1 .. hn -> hi f1 .. fk`
fn constructor(fields: usize, alternatives: usize, index: usize) -> Hold {
    let handler = Term::local((alternatives - 1 - index) as u32, name(format!("h{}", index + 1)));
    let arguments = numbered("f", fields)
        .enumerate()
        .map(|(idx, tag)| Term::local((alternatives + fields - 1 - idx) as u32, tag));

    let names = numbered("f", fields).chain(numbered("h", alternatives)).collect();
    lambdas(names, Term::apply_all(handler, arguments))
}

/// Total dispatcher named after the type: `\v h1 .. hn -> v h1 .. hn`
fn dispatcher(alternatives: usize) -> Hold {
    let handlers = numbered("h", alternatives)
        .enumerate()
        .map(|(idx, tag)| Term::local((alternatives - 1 - idx) as u32, tag));
    let body = Term::apply_all(Term::local(alternatives as u32, name("v")), handlers);

    lambdas(std::iter::once(name("v")).chain(numbered("h", alternatives)).collect(), body)
}

/// Partial dispatcher `case_C v handler otherwise`: the handler takes the
/// fields of `C`, every other constructor falls through to `otherwise`.
fn case_dispatcher(arities: &[usize], index: usize) -> Hold {
    let handlers = arities.iter().enumerate().map(|(idx, &fields)| {
        if idx == index {
            Term::local(1, name("handler"))
        } else {
            lambdas(numbered("f", fields).collect(), Term::local(fields as u32, name("otherwise")))
        }
    });
    let body = Term::apply_all(Term::local(2, name("v")), handlers);

    lambdas(vec![name("v"), name("handler"), name("otherwise")], body)
}

fn joined(text: String, parts: &[&Tag]) -> Tag {
    let span = parts
        .iter()
        .map(|tag| tag.span())
        .reduce(|span, other| span.merge(other))
        .unwrap_or_default();
    let origin = parts.first().map(|tag| tag.origin()).unwrap_or(Origin::Synthetic);

    Tag::with_origin(text, span, origin)
}

fn mixfix_tag(parts: &[Tag]) -> Tag {
    joined(mixfix_name(parts), &parts.iter().collect::<Vec<_>>())
}

fn bracket_tag(open: &Tag, close: &Tag) -> Tag {
    joined(format!("{open}{close}"), &[open, close])
}

/// Name being defined and its parameters, for every left-hand side that
/// defines a name.
fn definition_head(lhs: &Expr) -> Option<(Tag, Vec<&Expr>)> {
    match lhs {
        Expr::Name { tag } => Some((tag.clone(), vec![])),
        Expr::Apply { .. } => {
            let (head, arguments) = lhs.spine();
            let (tag, mut parameters) = definition_head(head)?;
            parameters.extend(arguments);
            Some((tag, parameters))
        },
        Expr::Infix { operator, left, right } => Some((operator.clone(), vec![left, right])),
        Expr::Prefix { operator, .. } if operator.text() == "\\" => None,
        Expr::Prefix { operator, operand } | Expr::Postfix { operator, operand } => {
            Some((operator.clone(), vec![operand]))
        },
        Expr::Mixfix { parts, operands } => Some((mixfix_tag(parts), operands.iter().collect())),
        Expr::Bracket { open, close, content } => Some((bracket_tag(open, close), vec![content])),
        _ => None,
    }
}

fn top_items(program: &Expr) -> Vec<&Expr> {
    match program {
        Expr::Sequence { items, .. } => items.iter().collect(),
        expr => vec![expr],
    }
}

/// Resolves names and desugars surface trees into terms.
///
/// One binder first takes the prelude, then the module, so both share the
/// global table.
pub struct Binder<'w> {
    globals: Vec<Global>,
    names: HashMap<String, usize>,
    locals: Vec<Local>,
    warnings: &'w BindWarningEmitter,

    identity: Hold,
    nil: Hold,
    cons: Hold,
    fix: Hold,
}

impl<'w> Binder<'w> {
    pub fn new(warnings: &'w BindWarningEmitter) -> Self {
        Self {
            globals: vec![],
            names: HashMap::new(),
            locals: vec![],
            warnings,

            identity: identity(),
            nil: nil(),
            cons: cons(),
            fix: fix(),
        }
    }

    pub fn globals(&self) -> &[Global] {
        &self.globals
    }

    /// Binds the top-level items of a parsed source: definitions become
    /// globals, expressions are returned right-nested as `e1 (e2 e3)`.
    pub fn bind_items(&mut self, program: &Expr) -> Result<Option<Hold>, BindError> {
        let mut expressions = vec![];

        for item in top_items(program) {
            match item {
                Expr::Declaration(_) => {},
                Expr::Define { pattern, body, .. } => match body.as_ref() {
                    Expr::Data { alternatives, .. } => self.define_type(pattern, alternatives)?,
                    _ => self.define_global(pattern, body)?,
                },
                expr => expressions.push(self.bind_expr(expr)?),
            }
        }

        Ok(expressions.into_iter().rev().reduce(|rest, expr| Term::apply(expr, rest)))
    }

    /// Picks the entry: the module's expressions, else `main` on the input
    /// stream.
    pub fn finish(mut self, expression: Option<Hold>, end: SrcSpan) -> Result<(Vec<Global>, Entry), BindError> {
        let entry = match expression {
            Some(term) => Entry::Expression(term),
            None => {
                let main = self.names
                    .get("main")
                    .and_then(|&index| self.globals.get(index).map(|global| (index, global.tag.clone())));

                let Some((index, tag)) = main else {
                    return bind_error(BindErrorType::NothingToRun, end);
                };

                let input = self.resolve(&Tag::synthetic("input_from"))?;
                Entry::Main(Term::apply(Term::global(index, tag), Term::apply(input, Term::int(0))))
            }
        };

        Ok((self.globals, entry))
    }

    fn check_global_name(&self, tag: &Tag) -> Result<(), BindError> {
        if Builtin::from_name(tag.text()).is_some() {
            return bind_error(
                BindErrorType::Redefinition { name: tag.text().to_string(), first: None },
                tag.span(),
            );
        }

        let Some(global) = self.names.get(tag.text()).and_then(|&index| self.globals.get(index)) else {
            return Ok(());
        };

        if global.tag.origin() == Origin::Prelude && tag.origin() == Origin::Module {
            self.warnings.emit(BindWarning::ShadowedPrelude {
                name: tag.text().to_string(),
                location: tag.span(),
            });
            return Ok(());
        }

        bind_error(
            BindErrorType::Redefinition { name: tag.text().to_string(), first: Some(global.tag.span()) },
            tag.span(),
        )
    }

    fn add_global(&mut self, tag: Tag, term: Hold) {
        let index = self.globals.len();
        debug!(name = %tag, index, "bound global");

        let _ = self.names.insert(tag.text().to_string(), index);
        self.globals.push(Global { tag, term });
    }

    fn define_global(&mut self, lhs: &Expr, body: &Expr) -> Result<(), BindError> {
        let Some((tag, parameters)) = definition_head(lhs) else {
            return bind_error(BindErrorType::InvalidLeftHandSide, lhs.location());
        };

        if tag.text() == "_" {
            return bind_error(BindErrorType::InvalidLeftHandSide, tag.span());
        }

        self.check_global_name(&tag)?;
        let term = self.bind_definition(&tag, &parameters, body)?;
        self.add_global(tag, term);

        Ok(())
    }

    /// `T params = {C1 fields.., C2 fields..}`
    fn define_type(&mut self, lhs: &Expr, alternatives: &[Expr]) -> Result<(), BindError> {
        // type parameters only document the fields
        let Some((tag, _)) = definition_head(lhs) else {
            return bind_error(BindErrorType::InvalidLeftHandSide, lhs.location());
        };

        let mut constructors = vec![];
        for alternative in alternatives {
            match alternative.spine() {
                (Expr::Name { tag }, fields) if tag.text() != "_" => constructors.push((tag.clone(), fields.len())),
                _ => return bind_error(BindErrorType::InvalidPattern, alternative.location()),
            }
        }

        let arities = constructors.iter().map(|(_, fields)| *fields).collect::<Vec<_>>();

        self.check_global_name(&tag)?;
        self.add_global(tag, dispatcher(arities.len()));

        for (index, (constructor_tag, fields)) in constructors.iter().enumerate() {
            self.check_global_name(constructor_tag)?;
            self.add_global(constructor_tag.clone(), constructor(*fields, arities.len(), index));
        }

        for (index, (constructor_tag, _)) in constructors.iter().enumerate() {
            let case = Tag::with_origin(
                format!("case_{constructor_tag}"),
                constructor_tag.span(),
                constructor_tag.origin(),
            );
            self.check_global_name(&case)?;
            self.add_global(case, case_dispatcher(&arities, index));
        }

        Ok(())
    }

    /// A definition's value; when the body mentions the defined name it is
    /// bound as `fix (\name -> value)`.
    fn bind_definition(&mut self, tag: &Tag, parameters: &[&Expr], body: &Expr) -> Result<Hold, BindError> {
        if !body.mentions(tag.text()) {
            return self.bind_function(parameters, body);
        }

        debug!(name = %tag, "recursive definition");
        self.push_local(tag.clone());
        let function = self.bind_function(parameters, body);
        let _ = self.locals.pop();

        Ok(Term::apply(self.fix.clone(), Term::lambda(tag.clone(), function?)))
    }

    fn bind_function(&mut self, parameters: &[&Expr], body: &Expr) -> Result<Hold, BindError> {
        let patterns = parameters
            .iter()
            .map(|parameter| Pattern::from_expr(parameter))
            .collect::<Result<Vec<_>, _>>()?;

        let mut locals = vec![];
        for pattern in &patterns {
            pattern.locals(&mut locals);
        }

        let mut seen: HashMap<&str, SrcSpan> = HashMap::new();
        for local in &locals {
            if local.origin() == Origin::Synthetic || local.text() == "_" {
                continue;
            }
            if let Some(first) = seen.insert(local.text(), local.span()) {
                return bind_error(
                    BindErrorType::Redefinition { name: local.text().to_string(), first: Some(first) },
                    local.span(),
                );
            }
        }

        let count = locals.len();
        for local in locals {
            self.push_local(local);
        }

        let body = self.bind_expr(body);
        self.locals.truncate(self.locals.len() - count);

        Ok(compile(&patterns.iter().collect::<Vec<_>>(), body?))
    }

    fn push_local(&mut self, tag: Tag) {
        self.locals.push(Local { tag, used: false });
    }

    /// Locals shadow builtins, builtins shadow globals.
    fn resolve(&mut self, tag: &Tag) -> Result<Hold, BindError> {
        let name = tag.text();

        if name == "_" {
            return bind_error(BindErrorType::ReservedName { name: name.to_string() }, tag.span());
        }

        if let Some((depth, local)) = self.locals.iter_mut().rev().enumerate().find(|(_, local)| local.tag.text() == name) {
            local.used = true;
            return Ok(Term::local(depth as u32, tag.clone()));
        }

        if let Some(builtin) = Builtin::from_name(name) {
            return Ok(Term::builtin(builtin, tag.clone()));
        }

        match self.names.get(name) {
            Some(&index) => Ok(Term::global(index, tag.clone())),
            None => bind_error(BindErrorType::UndefinedSymbol { name: name.to_string() }, tag.span()),
        }
    }

    fn string(&self, value: &[u8]) -> Hold {
        let bytes = value.iter().map(|&byte| Term::int(i64::from(byte))).collect();
        self.list(bytes)
    }

    /// Scott list, built from the end.
    fn list(&self, items: Vec<Hold>) -> Hold {
        items
            .into_iter()
            .rev()
            .fold(self.nil.clone(), |tail, head| Term::apply_all(self.cons.clone(), [head, tail]))
    }

    /// Binds one expression with an explicit task stack, so long operator
    /// chains and nested applications do not grow the native stack. Only
    /// constructs that open a scope bind their bodies through a nested call.
    pub fn bind_expr(&mut self, expr: &Expr) -> Result<Hold, BindError> {
        let mut tasks = vec![Task::Bind(expr)];
        let mut terms = vec![];

        while let Some(task) = tasks.pop() {
            match task {
                Task::Bind(expr) => self.bind_node(expr, &mut tasks, &mut terms)?,
                Task::Apply(count) => {
                    let mut operands = terms.split_off(terms.len().saturating_sub(count)).into_iter();
                    if let Some(head) = operands.next() {
                        terms.push(Term::apply_all(head, operands));
                    }
                },
                Task::List(count) => {
                    let items = terms.split_off(terms.len().saturating_sub(count));
                    terms.push(self.list(items));
                },
            }
        }

        match terms.pop() {
            Some(term) => Ok(term),
            None => bind_error(BindErrorType::MissingBody, expr.location()),
        }
    }

    /// Pushes exactly one term for `expr`, either at once or through the
    /// tasks it schedules.
    fn bind_node<'e>(
        &mut self,
        expr: &'e Expr,
        tasks: &mut Vec<Task<'e>>,
        terms: &mut Vec<Hold>,
    ) -> Result<(), BindError> {
        let mut apply = |head: Hold, operands: &[&'e Expr]| {
            terms.push(head);
            tasks.push(Task::Apply(operands.len() + 1));
            tasks.extend(operands.iter().rev().map(|&operand| Task::Bind(operand)));
        };

        match expr {
            Expr::Apply { function, argument, .. } => {
                tasks.extend([Task::Apply(2), Task::Bind(&**argument), Task::Bind(&**function)]);
            },
            Expr::Infix { operator, left, right } => apply(self.resolve(operator)?, &[&**left, &**right]),
            Expr::Prefix { operator, .. } if operator.text() == "\\" => {
                return bind_error(BindErrorType::MissingBody, expr.location())
            },
            Expr::Prefix { operator, operand } | Expr::Postfix { operator, operand } => {
                apply(self.resolve(operator)?, &[&**operand])
            },
            Expr::Mixfix { parts, operands } => {
                apply(self.resolve(&mixfix_tag(parts))?, &operands.iter().collect::<Vec<_>>())
            },
            Expr::Bracket { open, close, content } => {
                apply(self.resolve(&bracket_tag(open, close))?, &[&**content])
            },
            Expr::Tuple { items, .. } | Expr::Comma { items, .. } => {
                apply(tuple(items.len()), &items.iter().collect::<Vec<_>>())
            },
            Expr::List { items, .. } => {
                tasks.push(Task::List(items.len()));
                tasks.extend(items.iter().rev().map(Task::Bind));
            },
            expr => {
                let term = self.bind_leaf(expr)?;
                terms.push(term);
            },
        }

        Ok(())
    }

    /// Literals, names and the constructs that open a scope of their own.
    fn bind_leaf(&mut self, expr: &Expr) -> Result<Hold, BindError> {
        match expr {
            Expr::Int { value, .. } => Ok(Term::int(*value)),
            Expr::Char { value, .. } => Ok(Term::int(i64::from(u32::from(*value)))),
            Expr::Str { value, .. } => Ok(self.string(value)),
            Expr::Name { tag } => self.resolve(tag),
            Expr::Placeholder { location } => {
                let section = Tag::with_origin(SECTION, *location, Origin::Synthetic);
                self.resolve(&section)
            },
            Expr::Lambda { pattern, body, .. } => {
                let parameters = match pattern.as_ref() {
                    pattern @ Expr::Apply { .. } => {
                        let (head, arguments) = pattern.spine();
                        std::iter::once(head).chain(arguments).collect()
                    },
                    pattern => vec![pattern],
                };
                self.bind_function(&parameters, body)
            },
            Expr::Sequence { items, location } => self.bind_block(items, *location),
            Expr::Unit { .. } => Ok(self.identity.clone()),
            Expr::Section { body, .. } => {
                self.push_local(Tag::synthetic(SECTION));
                let body = self.bind_expr(body);
                let _ = self.locals.pop();
                Ok(Term::lambda(Tag::synthetic(SECTION), body?))
            },
            Expr::Data { location, .. } => bind_error(BindErrorType::MisplacedData, *location),
            Expr::As { .. } => bind_error(BindErrorType::InvalidPattern, expr.location()),
            Expr::Declaration(declaration) => bind_error(BindErrorType::MissingBody, declaration.location),
            expr => bind_error(BindErrorType::MissingBody, expr.location()),
        }
    }

    /// `d; rest` is `(\x -> rest) value`, `e; rest` is `e rest`.
    ///
    /// Statements are bound front to back in one pass, then wrapped around
    /// the final expression from the back.
    fn bind_block(&mut self, items: &[Expr], location: SrcSpan) -> Result<Hold, BindError> {
        let items = items
            .iter()
            .filter(|item| !matches!(item, Expr::Declaration(_)))
            .collect::<Vec<_>>();

        trace!(items = items.len(), "bind block");

        let scope = self.locals.len();
        let bound = self.bind_statements(&items, location, scope);
        let locals = self.locals.split_off(scope.min(self.locals.len()));
        let (statements, mut body) = bound?;

        for statement in statements.into_iter().rev() {
            body = match statement {
                Statement::Action(action) => Term::apply(action, body),
                Statement::Local { tag, value, slot } => {
                    let used = locals.get(slot).is_some_and(|local| local.used);
                    if !used && !tag.text().starts_with('_') {
                        self.warnings.emit(BindWarning::UnusedBinding {
                            name: tag.text().to_string(),
                            location: tag.span(),
                        });
                    }
                    Term::apply(Term::lambda(tag, body), value)
                },
                Statement::Destructure { pattern, value } => Term::apply(compile(&[&pattern], body), value),
            };
        }

        Ok(body)
    }

    fn bind_statements(
        &mut self,
        items: &[&Expr],
        location: SrcSpan,
        scope: usize,
    ) -> Result<(Vec<Statement>, Hold), BindError> {
        let Some((last, init)) = items.split_last() else {
            return bind_error(BindErrorType::MissingBody, location);
        };

        let mut defined = HashMap::new();
        let mut statements = vec![];

        for item in init {
            let statement = match item {
                Expr::Define { pattern, body, .. } => {
                    if let Expr::Data { location, .. } = body.as_ref() {
                        return bind_error(BindErrorType::MisplacedData, *location);
                    }
                    self.bind_local_definition(pattern, body, scope, &mut defined)?
                },
                expr => Statement::Action(self.bind_expr(expr)?),
            };
            statements.push(statement);
        }

        let body = match last {
            Expr::Define { .. } => return bind_error(BindErrorType::MissingBody, last.location()),
            expr => self.bind_expr(expr)?,
        };

        Ok((statements, body))
    }

    fn define_local(&self, tag: &Tag, defined: &mut HashMap<String, SrcSpan>) -> Result<(), BindError> {
        if tag.text() == "_" || tag.origin() == Origin::Synthetic {
            return Ok(());
        }

        match defined.insert(tag.text().to_string(), tag.span()) {
            Some(first) => bind_error(
                BindErrorType::Redefinition { name: tag.text().to_string(), first: Some(first) },
                tag.span(),
            ),
            None => Ok(()),
        }
    }

    /// Binds the value of a block-local definition and brings its names into
    /// scope for the statements after it.
    fn bind_local_definition(
        &mut self,
        lhs: &Expr,
        body: &Expr,
        scope: usize,
        defined: &mut HashMap<String, SrcSpan>,
    ) -> Result<Statement, BindError> {
        if let Some((tag, parameters)) = definition_head(lhs).filter(|(tag, _)| tag.text() != "_") {
            self.define_local(&tag, defined)?;
            let value = self.bind_definition(&tag, &parameters, body)?;

            let slot = self.locals.len() - scope;
            self.push_local(tag.clone());
            return Ok(Statement::Local { tag, value, slot });
        }

        // destructuring `(a, b) = e`
        let pattern = match lhs {
            Expr::Tuple { .. } | Expr::As { .. } => Pattern::from_expr(lhs)?,
            lhs => return bind_error(BindErrorType::InvalidLeftHandSide, lhs.location()),
        };

        let mut locals = vec![];
        pattern.locals(&mut locals);
        for local in &locals {
            self.define_local(local, defined)?;
        }

        let value = self.bind_expr(body)?;
        for local in locals {
            self.push_local(local);
        }

        Ok(Statement::Destructure { pattern, value })
    }
}
