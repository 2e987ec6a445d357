use std::{collections::HashMap, rc::Rc};

use tracing::debug;

use super::ast::DeclarationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixity {
    Infix,
    Prefix,
    Postfix,
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
    None,
}

/// What a bracket pair reduces its content to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketKind {
    Paren,
    Square,
    Brace,
    /// Implicit indentation block.
    Block,
    /// The whole source.
    File,
    User,
}

/// How a pending operator turns its operands into a tree once reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduce {
    /// Not an operator at all.
    Operand,
    Operator,
    Apply,
    Sequence,
    Comma,
    Define,
    Lambda,
    Erase,
    As,
    Declare(DeclarationKind),
    Bracket(BracketKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub symbol: String,
    pub left: u8,
    pub right: u8,
    pub fixity: Fixity,
    pub assoc: Assoc,
    /// Mixfix continuation: only valid while this symbol is pending.
    pub prior: Option<String>,
    pub reduce: Reduce,
    /// Matching symbol of a bracket pair.
    pub partner: Option<String>,
}

pub const MAX_PRECEDENCE: u8 = 99;

impl Rule {
    pub fn operand(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            left: 0,
            right: 0,
            fixity: Fixity::Infix,
            assoc: Assoc::None,
            prior: None,
            reduce: Reduce::Operand,
            partner: None,
        }
    }

    pub fn infix(symbol: &str, precedence: u8, assoc: Assoc, reduce: Reduce) -> Self {
        Self {
            symbol: symbol.to_string(),
            left: precedence,
            right: precedence,
            fixity: Fixity::Infix,
            assoc,
            prior: None,
            reduce,
            partner: None,
        }
    }

    pub fn prefix(symbol: &str, precedence: u8, reduce: Reduce) -> Self {
        Self {
            fixity: Fixity::Prefix,
            ..Self::infix(symbol, precedence, Assoc::Right, reduce)
        }
    }

    pub fn postfix(symbol: &str, precedence: u8) -> Self {
        Self {
            fixity: Fixity::Postfix,
            ..Self::infix(symbol, precedence, Assoc::Left, Reduce::Operator)
        }
    }

    pub fn after(self, prior: &str) -> Self {
        Self { prior: Some(prior.to_string()), ..self }
    }

    /// Opening and closing rules of a bracket pair.
    pub fn brackets(open: &str, close: &str, kind: BracketKind) -> (Self, Self) {
        let bracket = |symbol: &str, partner: &str, fixity| Self {
            symbol: symbol.to_string(),
            left: 0,
            right: 0,
            fixity,
            assoc: Assoc::None,
            prior: None,
            reduce: Reduce::Bracket(kind),
            partner: Some(partner.to_string()),
        };

        (bracket(open, close, Fixity::Open), bracket(close, open, Fixity::Close))
    }

    /// Juxtaposition.
    pub fn space() -> Self {
        Self::infix(" ", 95, Assoc::Left, Reduce::Apply)
    }

    /// Line break at the current block's indentation.
    ///
    /// Its precedence is fixed at the separator level. Deeper lines open an
    /// indentation block and shallower lines close blocks until the widths
    /// match, so each block does the grouping a width-derived precedence
    /// would otherwise do.
    pub fn newline() -> Self {
        Self::infix("newline", 1, Assoc::Right, Reduce::Sequence)
    }

    pub fn is_operand(&self) -> bool {
        self.reduce == Reduce::Operand
    }

    pub fn is_opener(&self) -> bool {
        self.fixity == Fixity::Open
    }

    pub fn bracket_kind(&self) -> Option<BracketKind> {
        match self.reduce {
            Reduce::Bracket(kind) => Some(kind),
            _ => None,
        }
    }

    /// Separators dropped before a closing bracket.
    pub fn is_separator(&self) -> bool {
        self.reduce == Reduce::Sequence
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
    Redefinition { symbol: String },
}

/// Scope-stacked table of syntax rules.
///
/// The base scope holds the default grammar. Every bracket pushes a scope on
/// open and pops it on close, so declarations made inside a bracket vanish
/// with it. Each symbol keeps its own stack of rules, innermost last, so a
/// lookup costs the same at any nesting depth.
#[derive(Debug, Clone)]
pub struct Registry {
    rules: HashMap<String, Vec<(usize, Rc<Rule>)>>,
    /// Symbols registered in each open scope.
    scopes: Vec<Vec<String>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn empty() -> Self {
        Self { rules: HashMap::new(), scopes: vec![vec![]] }
    }

    pub fn new() -> Self {
        let mut registry = Self::empty();

        for rule in default_rules() {
            // the default table has no duplicate symbols
            let _ = registry.register(rule);
        }

        registry
    }

    pub fn register(&mut self, rule: Rule) -> Result<(), RegistryError> {
        let scope = self.scopes.len() - 1;
        let Some(symbols) = self.scopes.last_mut() else {
            return Err(RegistryError::Redefinition { symbol: rule.symbol });
        };

        let stack = self.rules.entry(rule.symbol.clone()).or_default();
        if stack.last().is_some_and(|(depth, _)| *depth == scope) {
            return Err(RegistryError::Redefinition { symbol: rule.symbol });
        }

        debug!(symbol = %rule.symbol, scope, fixity = ?rule.fixity, "registered syntax rule");
        symbols.push(rule.symbol.clone());
        stack.push((scope, Rc::new(rule)));

        Ok(())
    }

    /// Innermost rule for `symbol`, or the plain operand rule.
    pub fn lookup(&self, symbol: &str) -> Rc<Rule> {
        self.rules
            .get(symbol)
            .and_then(|stack| stack.last())
            .map(|(_, rule)| rule.clone())
            .unwrap_or_else(|| Rc::new(Rule::operand(symbol)))
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(vec![]);
    }

    pub fn pop_scope(&mut self) {
        // the base scope is never popped
        if self.scopes.len() <= 1 {
            return;
        }

        for symbol in self.scopes.pop().into_iter().flatten() {
            if let Some(stack) = self.rules.get_mut(&symbol) {
                let _ = stack.pop();
                if stack.is_empty() {
                    let _ = self.rules.remove(&symbol);
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

fn default_rules() -> Vec<Rule> {
    use Assoc::{Left, None, Right};

    let mut rules = vec![];

    for (open, close, kind) in [
        ("(", ")", BracketKind::Paren),
        ("[", "]", BracketKind::Square),
        ("{", "}", BracketKind::Brace),
    ] {
        let (open, close) = Rule::brackets(open, close, kind);
        rules.push(open);
        rules.push(close);
    }

    rules.extend([
        Rule::infix(";", 1, Right, Reduce::Sequence),
        Rule::infix(",", 1, Right, Reduce::Comma),
        Rule::infix("=", 2, None, Reduce::Define),
        Rule::prefix("let", 3, Reduce::Erase),
        Rule::infix("->", 3, Right, Reduce::Lambda),
        Rule::prefix("if", 3, Reduce::Operator),
        Rule::infix("then", 3, Right, Reduce::Operator).after("if"),
        Rule::infix("else", 3, Right, Reduce::Operator).after("then"),
        Rule::prefix("\\", 4, Reduce::Operator),
        Rule::infix("@", 97, Right, Reduce::As),
    ]);

    for (symbols, precedence, assoc) in [
        (&["$"][..], 10, Right),
        (&["||"], 20, Right),
        (&["&&"], 30, Right),
        (&["==", "!=", "<", "<=", ">", ">="], 40, None),
        (&[":", "++"], 50, Right),
        (&["+", "-"], 60, Left),
        (&["*", "/", "%"], 70, Left),
        (&["^"], 80, Right),
        (&["."], 90, Right),
    ] {
        for symbol in symbols {
            rules.push(Rule::infix(symbol, precedence, assoc, Reduce::Operator));
        }
    }

    for kind in [
        DeclarationKind::InfixLeft,
        DeclarationKind::InfixRight,
        DeclarationKind::Infix,
        DeclarationKind::Prefix,
        DeclarationKind::Postfix,
        DeclarationKind::Bracket,
    ] {
        rules.push(Rule::prefix(kind.keyword(), 2, Reduce::Declare(kind)));
    }

    rules
}
