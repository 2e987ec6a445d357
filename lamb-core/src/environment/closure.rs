use std::{cell::{Cell, RefCell}, rc::Rc};

use crate::term::{prelude::Hold, term::{acquire, release}};
use super::backtrace::Backtrace;

pub type Thunk = Rc<RefCell<Closure>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Not demanded yet.
    Pending,
    /// Under evaluation; demanding it again is a loop.
    Running,
    /// Holds a value; every later demand reuses it.
    Done,
}

/// A term with the thunks its free locals refer to.
#[derive(Debug)]
pub struct Closure {
    pub term: Hold,
    pub locals: Env,
    pub backtrace: Backtrace,
    pub state: State,
}

impl Closure {
    pub fn new(term: Hold, locals: Env, backtrace: Backtrace) -> Self {
        acquire();

        let state = if term.is_value() { State::Done } else { State::Pending };
        Self { term, locals, backtrace, state }
    }

    pub fn thunk(term: Hold, locals: Env, backtrace: Backtrace) -> Thunk {
        Rc::new(RefCell::new(Self::new(term, locals, backtrace)))
    }

    /// Overwrites the closure with its value.
    pub fn update(&mut self, term: Hold, locals: Env) {
        self.term = term;
        self.locals = locals;
        self.state = State::Done;
    }
}

thread_local! {
    static GRAVEYARD: RefCell<Vec<Env>> = const { RefCell::new(vec![]) };
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

/// Releases `env` without recursing through the closures it reaches.
///
/// A closure dropped while the graveyard drains only queues its locals, so
/// the native stack stays flat however deep the thunk graph is.
fn bury(env: Env) {
    let queued = GRAVEYARD
        .try_with(|graveyard| graveyard.borrow_mut().push(env))
        .is_ok();

    if !queued || DRAINING.with(|draining| draining.replace(true)) {
        return;
    }

    while let Some(env) = GRAVEYARD.with(|graveyard| graveyard.borrow_mut().pop()) {
        drop(env);
    }

    DRAINING.with(|draining| draining.set(false));
}

impl Drop for Closure {
    fn drop(&mut self) {
        release();
        bury(std::mem::take(&mut self.locals));
    }
}

#[derive(Debug)]
pub struct EnvNode {
    thunk: Thunk,
    next: Env,
}

/// Persistent list of thunks addressed by De Bruijn depth.
#[derive(Debug, Default, Clone)]
pub struct Env(Option<Rc<EnvNode>>);

impl Env {
    pub fn new() -> Self {
        Self(None)
    }

    pub fn push(&self, thunk: Thunk) -> Self {
        Self(Some(Rc::new(EnvNode { thunk, next: self.clone() })))
    }

    pub fn get(&self, depth: u32) -> Option<&Thunk> {
        let mut node = self.0.as_ref()?;
        for _ in 0..depth {
            node = node.next.0.as_ref()?;
        }

        Some(&node.thunk)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl Drop for Env {
    fn drop(&mut self) {
        let mut next = self.0.take();

        while let Some(node) = next {
            match Rc::try_unwrap(node) {
                Ok(mut node) => next = node.next.0.take(),
                Err(_) => break,
            }
        }
    }
}
