use std::fmt::Display;

use crate::term::{prelude::{Hold, Kind, Term}, term::write_name};
use super::closure::{Env, State};

/// Evaluated locals substituted deeper than this print by name.
const READBACK_LIMIT: usize = 16;

/// A term in weak head normal form together with the locals it closes
/// over.
#[derive(Debug, Clone)]
pub struct Value {
    pub term: Hold,
    pub locals: Env,
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self.term.kind() {
            Kind::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Readback { term: &self.term, locals: &self.locals, bound: 0, nesting: 0 })
    }
}

/// Prints a term with its free locals read back from the environment.
///
/// Locals whose closures hold a value are replaced by that value, printed
/// the same way. Locals not evaluated yet print as `<thunk>`.
struct Readback<'a> {
    term: &'a Term,
    locals: &'a Env,
    /// Lambdas entered inside `term` so far.
    bound: u32,
    nesting: usize,
}

impl<'a> Readback<'a> {
    fn with(&self, term: &'a Term, bound: u32) -> Readback<'a> {
        Readback { term, locals: self.locals, bound, nesting: self.nesting }
    }
}

impl Display for Readback<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.term.kind() {
            Kind::Int(value) => write!(f, "{value}"),
            Kind::Builtin(builtin, _) => write!(f, "{builtin}"),
            Kind::Global(_, tag) => write_name(f, tag),
            Kind::Local(depth, tag) if *depth < self.bound => write_name(f, tag),
            Kind::Local(depth, tag) => {
                let Some(thunk) = self.locals.get(depth - self.bound) else {
                    return write_name(f, tag);
                };

                let closure = thunk.borrow();
                match closure.state {
                    State::Done if self.nesting < READBACK_LIMIT => {
                        let nested = Readback {
                            term: &closure.term,
                            locals: &closure.locals,
                            bound: 0,
                            nesting: self.nesting + 1,
                        };
                        write!(f, "{nested}")
                    },
                    State::Done => write_name(f, tag),
                    State::Pending | State::Running => write!(f, "<thunk>"),
                }
            },
            Kind::Lambda(tag, body) => {
                write!(f, "(\\")?;
                write_name(f, tag)?;

                let mut bound = self.bound + 1;
                let mut body = body;
                while let Kind::Lambda(tag, inner) = body.kind() {
                    write!(f, " ")?;
                    write_name(f, tag)?;
                    bound += 1;
                    body = inner;
                }

                write!(f, " -> {})", self.with(body, bound))
            },
            Kind::Apply(..) => {
                let mut arguments = vec![];
                let mut head = self.term;
                while let Kind::Apply(left, right) = head.kind() {
                    arguments.push(right);
                    head = left;
                }

                write!(f, "({}", self.with(head, self.bound))?;
                for argument in arguments.iter().rev() {
                    write!(f, " {}", self.with(argument, self.bound))?;
                }
                write!(f, ")")
            },
        }
    }
}
