use std::{
    fmt::Display,
    io::{Read, Write},
    sync::{atomic::{AtomicBool, Ordering}, Arc},
};

use tracing::{debug, info, trace};

use crate::{
    binder::prelude::Global,
    environment::prelude::{Backtrace, Closure, Env, State, Thunk, Value},
    term::prelude::{Builtin, Hold, Kind, Origin, Tag, Term},
};
use super::{fault::{Fault, FaultKind}, input::Input};

/// Steps between two looks at the interrupt flag.
const INTERRUPT_POLL: u64 = 4096;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Log every step at trace level.
    pub trace: bool,
    /// Collect counters for a report after the run.
    pub profile: bool,
    /// Attach the global backtrace to faults.
    pub backtrace: bool,
    /// Leave source locations out of faults.
    pub test: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub steps: u64,
    pub thunks: u64,
    pub updates: u64,
    pub unfolds: u64,
    pub max_spine: usize,
}

impl Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} steps, {} thunks, {} updates, {} numeral unfolds, spine depth {}",
            self.steps, self.thunks, self.updates, self.unfolds, self.max_spine,
        )
    }
}

#[derive(Debug)]
enum Frame {
    /// An argument waiting for a function.
    Arg(Thunk),
    /// A thunk to overwrite with the value under evaluation.
    Update(Thunk),
    /// A builtin collecting its forced arguments; `pending` is popped from
    /// the end.
    Force {
        builtin: Builtin,
        tag: Tag,
        values: Vec<i64>,
        pending: Vec<Thunk>,
        backtrace: Backtrace,
    },
}

fn closed(names: &[&str], body: impl FnOnce(&[Tag]) -> Hold) -> Hold {
    let tags = names.iter().map(|name| Tag::synthetic(*name)).collect::<Vec<_>>();
    let body = body(&tags);

    tags.into_iter().rev().fold(body, |body, tag| Term::lambda(tag, body))
}

/// Call-by-need graph reduction to weak head normal form.
///
/// The machine never recurses: pending work lives on the spine as frames,
/// and the focus is a term with its locals.
pub struct Machine<'m, R, W, E> {
    globals: &'m [Global],
    cafs: Vec<Option<Thunk>>,

    input: Input<R>,
    output: W,
    errors: E,
    aborting: bool,
    interrupt: Option<Arc<AtomicBool>>,

    options: Options,
    stats: Stats,

    spine: Vec<Frame>,
    term: Hold,
    locals: Env,
    backtrace: Backtrace,

    truth: Hold,
    falsity: Hold,
    identity: Hold,
    zero: Hold,
    succ: Hold,
}

impl<'m, R: Read, W: Write, E: Write> Machine<'m, R, W, E> {
    pub fn new(globals: &'m [Global], input: R, output: W, errors: E, options: Options) -> Self {
        let local = |depth: u32, tags: &[Tag], idx: usize| Term::local(depth, tags[idx].clone());

        Self {
            globals,
            cafs: globals.iter().map(|_| None).collect(),

            input: Input::new(input),
            output,
            errors,
            aborting: false,
            interrupt: None,

            options,
            stats: Stats::default(),

            spine: vec![],
            term: Term::int(0),
            locals: Env::new(),
            backtrace: Backtrace::new(),

            truth: closed(&["t", "f"], |tags| local(1, tags, 0)),
            falsity: closed(&["t", "f"], |tags| local(0, tags, 1)),
            identity: closed(&["x"], |tags| local(0, tags, 0)),
            zero: closed(&["f", "x"], |tags| local(0, tags, 1)),
            // \m f x -> f (m f x)
            succ: closed(&["m", "f", "x"], |tags| Term::apply(
                local(1, tags, 1),
                Term::apply_all(local(2, tags, 0), [local(1, tags, 1), local(0, tags, 2)]),
            )),
        }
    }

    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn input(&self) -> &Input<R> {
        &self.input
    }

    /// Reduces `entry` to weak head normal form.
    pub fn run(&mut self, entry: &Hold) -> Result<Value, Fault> {
        info!(globals = self.globals.len(), "run started");

        self.term = entry.clone();
        self.locals = Env::new();
        self.backtrace = Backtrace::new();
        self.aborting = false;

        let result = self.reduce();
        self.spine.clear();
        self.term = Term::int(0);
        self.locals = Env::new();

        let flushed = self.output.flush().and_then(|_| self.errors.flush());

        match &result {
            Ok(_) => info!(steps = self.stats.steps, thunks = self.stats.thunks, "run finished"),
            Err(fault) => debug!(%fault, steps = self.stats.steps, "run faulted"),
        }

        match (result, flushed) {
            (Ok(_), Err(err)) => Err(Fault::new(FaultKind::Io { kind: err.kind() })),
            (result, _) => result,
        }
    }

    fn reduce(&mut self) -> Result<Value, Fault> {
        loop {
            self.step()?;

            let term = self.term.clone();
            match term.kind() {
                Kind::Apply(left, right) => {
                    let thunk = self.delay(right)?;
                    self.spine.push(Frame::Arg(thunk));
                    self.term = left.clone();
                },
                Kind::Lambda(_, body) => match self.pop_arg() {
                    Some(thunk) => {
                        self.locals = self.locals.push(thunk);
                        self.term = body.clone();
                    },
                    None => if let Some(value) = self.settle()? {
                        return Ok(value);
                    },
                },
                Kind::Local(depth, tag) => {
                    let thunk = self.local(*depth, tag)?;
                    self.enter(thunk)?;
                },
                Kind::Global(index, tag) => {
                    self.backtrace = self.backtrace.push(tag.clone());

                    let globals = self.globals;
                    let Some(global) = globals.get(*index) else {
                        return Err(self.fault(FaultKind::Internal { message: format!("unknown global `{tag}`") }, Some(tag)));
                    };

                    if global.term.is_value() {
                        self.term = global.term.clone();
                        self.locals = Env::new();
                    } else {
                        let thunk = self.caf(*index, &global.term);
                        self.enter(thunk)?;
                    }
                },
                Kind::Int(value) => {
                    if !matches!(self.spine.last(), Some(Frame::Arg(_))) {
                        if let Some(value) = self.settle()? {
                            return Ok(value);
                        }
                        continue;
                    }

                    // one Church layer; numerals below one iterate zero times
                    self.stats.unfolds += 1;
                    self.locals = Env::new();
                    if *value > 0 {
                        let predecessor = Closure::thunk(Term::int(value - 1), Env::new(), self.backtrace.clone());
                        self.spine.push(Frame::Arg(predecessor));
                        self.term = self.succ.clone();
                    } else {
                        self.term = self.zero.clone();
                    }
                },
                Kind::Builtin(builtin, tag) => {
                    let available = self.spine
                        .iter()
                        .rev()
                        .take_while(|frame| matches!(frame, Frame::Arg(_)))
                        .count();

                    if available < builtin.arity() {
                        self.partial(*builtin, tag, available)?;
                        continue;
                    }

                    let arguments = (0..builtin.arity())
                        .filter_map(|_| self.pop_arg())
                        .collect::<Vec<_>>();
                    self.call(*builtin, tag, arguments)?;
                },
            }
        }
    }

    fn step(&mut self) -> Result<(), Fault> {
        self.stats.steps += 1;
        self.stats.max_spine = self.stats.max_spine.max(self.spine.len());

        if self.options.trace {
            trace!(step = self.stats.steps, spine = self.spine.len(), focus = %self.term.describe());
        }

        if self.stats.steps % INTERRUPT_POLL == 0
            && self.interrupt.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return Err(self.fault(FaultKind::Interrupted, None));
        }

        Ok(())
    }

    fn pop_arg(&mut self) -> Option<Thunk> {
        if !matches!(self.spine.last(), Some(Frame::Arg(_))) {
            return None;
        }

        match self.spine.pop() {
            Some(Frame::Arg(thunk)) => Some(thunk),
            _ => None,
        }
    }

    fn local(&self, depth: u32, tag: &Tag) -> Result<Thunk, Fault> {
        match self.locals.get(depth) {
            Some(thunk) => Ok(thunk.clone()),
            None => Err(self.fault(FaultKind::Internal { message: format!("unbound local `{tag}`") }, Some(tag))),
        }
    }

    /// The per-run thunk of a global that is not a value yet.
    fn caf(&mut self, index: usize, term: &Hold) -> Thunk {
        if let Some(Some(thunk)) = self.cafs.get(index) {
            return thunk.clone();
        }

        self.stats.thunks += 1;
        let thunk = Closure::thunk(term.clone(), Env::new(), self.backtrace.clone());
        if let Some(slot) = self.cafs.get_mut(index) {
            *slot = Some(thunk.clone());
        }

        thunk
    }

    /// The argument thunk for `term` in the current locals.
    fn delay(&mut self, term: &Hold) -> Result<Thunk, Fault> {
        let locals = match term.kind() {
            Kind::Local(depth, tag) => return self.local(*depth, tag),
            Kind::Int(_) | Kind::Builtin(..) | Kind::Global(..) => Env::new(),
            Kind::Lambda(..) | Kind::Apply(..) => self.locals.clone(),
        };

        self.stats.thunks += 1;
        Ok(Closure::thunk(term.clone(), locals, self.backtrace.clone()))
    }

    /// Moves the focus into `thunk`, arranging for its value to be written
    /// back unless it already holds one.
    fn enter(&mut self, thunk: Thunk) -> Result<(), Fault> {
        let state = {
            let mut closure = thunk.borrow_mut();
            let state = closure.state;

            if state != State::Running {
                self.term = closure.term.clone();
                self.locals = closure.locals.clone();
                self.backtrace = closure.backtrace.clone();
            }
            if state == State::Pending {
                closure.state = State::Running;
            }

            state
        };

        match state {
            State::Done => Ok(()),
            State::Pending => {
                self.spine.push(Frame::Update(thunk));
                Ok(())
            },
            State::Running => Err(self.fault(FaultKind::Loop, None)),
        }
    }

    /// The focus is a value with no argument to consume. Returns the final
    /// value once the spine is empty.
    fn settle(&mut self) -> Result<Option<Value>, Fault> {
        match self.spine.pop() {
            None => Ok(Some(Value { term: self.term.clone(), locals: self.locals.clone() })),
            Some(Frame::Update(thunk)) => {
                self.stats.updates += 1;
                thunk.borrow_mut().update(self.term.clone(), self.locals.clone());
                Ok(None)
            },
            Some(Frame::Force { builtin: Builtin::Abort, tag, backtrace, .. }) => {
                let _ = self.errors.flush();
                self.backtrace = backtrace;
                Err(self.fault(FaultKind::Abort, Some(&tag)))
            },
            Some(Frame::Force { builtin, tag, mut values, mut pending, backtrace }) => {
                let Kind::Int(value) = self.term.kind() else {
                    return Err(self.fault(FaultKind::TypeMismatch { builtin: builtin.name().into() }, Some(&tag)));
                };
                values.push(*value);

                match pending.pop() {
                    Some(next) => {
                        self.spine.push(Frame::Force { builtin, tag, values, pending, backtrace });
                        self.enter(next)?;
                    },
                    None => {
                        self.backtrace = backtrace;
                        self.term = self.primitive(builtin, &tag, &values)?;
                        self.locals = Env::new();
                    },
                }

                Ok(None)
            },
            Some(frame @ Frame::Arg(_)) => {
                self.spine.push(frame);
                Err(self.fault(FaultKind::Internal { message: "value left an argument on the spine".into() }, None))
            },
        }
    }

    /// A builtin short of arguments is only a value when a thunk is waiting
    /// for it; the thunk then holds the builtin applied to what it has.
    fn partial(&mut self, builtin: Builtin, tag: &Tag, available: usize) -> Result<(), Fault> {
        let below = self.spine.len() - available;
        match below.checked_sub(1).and_then(|index| self.spine.get(index)) {
            Some(Frame::Update(_)) => {},
            Some(Frame::Force { builtin: waiting, tag: waiting_tag, .. }) => {
                let kind = FaultKind::TypeMismatch { builtin: waiting.name().into() };
                return Err(self.fault(kind, Some(&waiting_tag.clone())));
            },
            _ => return Err(self.fault(FaultKind::MissingArgument { builtin: builtin.name().into() }, Some(tag))),
        }

        let mut locals = Env::new();
        let mut arguments = vec![];
        for depth in (0..available).rev() {
            if let Some(thunk) = self.pop_arg() {
                locals = locals.push(thunk);
                arguments.push(Term::local(depth as u32, Tag::synthetic(format!("a{}", available - depth))));
            }
        }

        let term = Term::apply_all(Term::builtin(builtin, tag.clone()), arguments);
        match self.spine.pop() {
            Some(Frame::Update(thunk)) => {
                self.stats.updates += 1;
                thunk.borrow_mut().update(term.clone(), locals.clone());
            },
            _ => return Err(self.fault(FaultKind::Internal { message: "partial application lost its update".into() }, Some(tag))),
        }

        self.term = term;
        self.locals = locals;
        Ok(())
    }

    /// Starts forcing the arguments of a saturated builtin.
    fn call(&mut self, builtin: Builtin, tag: &Tag, mut arguments: Vec<Thunk>) -> Result<(), Fault> {
        if builtin == Builtin::Abort {
            debug!("abort: output switched to standard error");
            let _ = self.output.flush();
            self.aborting = true;
        }

        arguments.reverse();
        let Some(first) = arguments.pop() else {
            return Err(self.fault(FaultKind::MissingArgument { builtin: builtin.name().into() }, Some(tag)));
        };

        self.spine.push(Frame::Force {
            builtin,
            tag: tag.clone(),
            values: Vec::with_capacity(builtin.arity()),
            pending: arguments,
            backtrace: self.backtrace.clone(),
        });
        self.enter(first)
    }

    fn boolean(&self, value: bool) -> Hold {
        if value { self.truth.clone() } else { self.falsity.clone() }
    }

    fn primitive(&mut self, builtin: Builtin, tag: &Tag, values: &[i64]) -> Result<Hold, Fault> {
        let overflow = || FaultKind::Overflow { builtin: builtin.name().into() };

        let result = match (builtin, values) {
            (Builtin::Add, &[a, b]) => a.checked_add(b).map(Term::int).ok_or_else(overflow),
            (Builtin::Sub, &[a, b]) => a.checked_sub(b).map(Term::int).ok_or_else(overflow),
            (Builtin::Mul, &[a, b]) => a.checked_mul(b).map(Term::int).ok_or_else(overflow),
            (Builtin::Div, &[_, 0]) => Err(FaultKind::DivideByZero),
            (Builtin::Div, &[a, b]) => a.checked_div(b).map(Term::int).ok_or_else(overflow),
            (Builtin::Mod, &[_, 0]) => Err(FaultKind::ModuloByZero),
            (Builtin::Mod, &[a, b]) => a.checked_rem(b).map(Term::int).ok_or_else(overflow),
            (Builtin::Eq, &[a, b]) => Ok(self.boolean(a == b)),
            (Builtin::Ne, &[a, b]) => Ok(self.boolean(a != b)),
            (Builtin::Lt, &[a, b]) => Ok(self.boolean(a < b)),
            (Builtin::Le, &[a, b]) => Ok(self.boolean(a <= b)),
            (Builtin::Gt, &[a, b]) => Ok(self.boolean(a > b)),
            (Builtin::Ge, &[a, b]) => Ok(self.boolean(a >= b)),
            (Builtin::Put, &[value]) => match u8::try_from(value) {
                Ok(byte) => self.put(byte).map(|_| self.identity.clone()),
                Err(_) => Err(FaultKind::ByteRange { value }),
            },
            (Builtin::Get, &[index]) => self.get(index).map(Term::int),
            _ => Err(FaultKind::Internal { message: format!("`{}` applied to {} values", builtin.name(), values.len()) }),
        };

        result.map_err(|kind| self.fault(kind, Some(tag)))
    }

    fn put(&mut self, byte: u8) -> Result<(), FaultKind> {
        let written = if self.aborting {
            self.errors.write_all(&[byte])
        } else {
            self.output.write_all(&[byte])
        };

        written.map_err(|err| FaultKind::Io { kind: err.kind() })
    }

    fn get(&mut self, index: i64) -> Result<i64, FaultKind> {
        let Self { input, output, .. } = self;

        input
            .get(index, || output.flush())
            .map_err(|err| FaultKind::Io { kind: err.kind() })
    }

    /// Locates a fault at `tag` when it is module code, else at the newest
    /// module reference in the backtrace.
    fn fault(&self, kind: FaultKind, tag: Option<&Tag>) -> Fault {
        let location = if self.options.test {
            None
        } else {
            tag.filter(|tag| tag.origin() == Origin::Module)
                .or_else(|| self.backtrace.module_tag())
                .map(|tag| tag.span())
        };

        let backtrace = if self.options.backtrace { self.backtrace.names() } else { vec![] };

        Fault { kind, location, backtrace }
    }
}
