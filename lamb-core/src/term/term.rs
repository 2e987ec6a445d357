use std::{cell::Cell, fmt::Display, rc::Rc};

use super::{builtin::Builtin, tag::Tag};

thread_local! {
    static LIVE_NODES: Cell<isize> = const { Cell::new(0) };
}

/// Number of term nodes and closures currently alive on this thread.
///
/// Every constructor increments the count and every `Drop` decrements it, so
/// after all terms and closures of a run are released it is back to zero.
pub fn live_nodes() -> isize {
    LIVE_NODES.with(|live| live.get())
}

pub(crate) fn acquire() {
    LIVE_NODES.with(|live| live.set(live.get() + 1));
}

pub(crate) fn release() {
    LIVE_NODES.with(|live| live.set(live.get() - 1));
}

pub type Hold = Rc<Term>;

#[derive(Debug)]
pub enum Kind {
    Int(i64),
    Builtin(Builtin, Tag),
    /// De Bruijn depth; 0 is the innermost binder.
    Local(u32, Tag),
    Global(usize, Tag),
    Lambda(Tag, Hold),
    Apply(Hold, Hold),
}

#[derive(Debug)]
pub struct Term {
    kind: Kind,
}

impl Term {
    pub fn new(kind: Kind) -> Hold {
        acquire();
        Rc::new(Term { kind })
    }

    pub fn int(value: i64) -> Hold {
        Self::new(Kind::Int(value))
    }

    pub fn builtin(builtin: Builtin, tag: Tag) -> Hold {
        Self::new(Kind::Builtin(builtin, tag))
    }

    pub fn local(depth: u32, tag: Tag) -> Hold {
        Self::new(Kind::Local(depth, tag))
    }

    pub fn global(index: usize, tag: Tag) -> Hold {
        Self::new(Kind::Global(index, tag))
    }

    pub fn lambda(tag: Tag, body: Hold) -> Hold {
        Self::new(Kind::Lambda(tag, body))
    }

    pub fn apply(left: Hold, right: Hold) -> Hold {
        Self::new(Kind::Apply(left, right))
    }

    /// Left-nested application of `head` to every argument in order.
    pub fn apply_all(head: Hold, arguments: impl IntoIterator<Item = Hold>) -> Hold {
        arguments.into_iter().fold(head, Term::apply)
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn is_value(&self) -> bool {
        match &self.kind {
            Kind::Int(_) | Kind::Lambda(..) => true,
            Kind::Builtin(builtin, _) => builtin.arity() > 0,
            _ => false,
        }
    }

    /// One-line description used by step tracing.
    pub fn describe(&self) -> String {
        match &self.kind {
            Kind::Int(value) => format!("int {value}"),
            Kind::Builtin(builtin, _) => format!("builtin {}", builtin.name()),
            Kind::Local(depth, tag) => format!("local {tag}#{depth}"),
            Kind::Global(index, tag) => format!("global {tag}#{index}"),
            Kind::Lambda(tag, _) => format!("lambda {tag}"),
            Kind::Apply(..) => "apply".to_string(),
        }
    }
}

impl Drop for Term {
    // Long application spines (string literals, accumulated lists) would
    // overflow the native stack if released recursively.
    fn drop(&mut self) {
        release();

        let mut pending = match std::mem::replace(&mut self.kind, Kind::Int(0)) {
            Kind::Apply(left, right) => vec![left, right],
            Kind::Lambda(_, body) => vec![body],
            _ => return,
        };

        while let Some(hold) = pending.pop() {
            if let Ok(mut term) = Rc::try_unwrap(hold) {
                match std::mem::replace(&mut term.kind, Kind::Int(0)) {
                    Kind::Apply(left, right) => {
                        pending.push(left);
                        pending.push(right);
                    },
                    Kind::Lambda(_, body) => pending.push(body),
                    _ => {}
                }
            }
        }
    }
}

pub(crate) fn write_name(f: &mut std::fmt::Formatter<'_>, tag: &Tag) -> std::fmt::Result {
    if tag.is_symbolic() {
        write!(f, "({tag})")
    } else {
        write!(f, "{tag}")
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            Kind::Int(value) => write!(f, "{value}"),
            Kind::Builtin(builtin, _) => write!(f, "{builtin}"),
            Kind::Local(_, tag) | Kind::Global(_, tag) => write_name(f, tag),
            Kind::Lambda(tag, body) => {
                write!(f, "(\\")?;
                write_name(f, tag)?;

                let mut body = body;
                while let Kind::Lambda(tag, inner) = &body.kind {
                    write!(f, " ")?;
                    write_name(f, tag)?;
                    body = inner;
                }

                write!(f, " -> {body})")
            },
            Kind::Apply(..) => {
                let mut arguments = vec![];
                let mut head = self;
                while let Kind::Apply(left, right) = &head.kind {
                    arguments.push(right);
                    head = left;
                }

                write!(f, "({head}")?;
                for argument in arguments.iter().rev() {
                    write!(f, " {argument}")?;
                }
                write!(f, ")")
            }
        }
    }
}
