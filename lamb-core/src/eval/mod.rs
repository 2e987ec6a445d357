pub mod fault;
pub mod input;
pub mod machine;

pub mod prelude {
    pub use super::{
        fault::*,
        input::*,
        machine::*
    };
}

#[cfg(test)]
mod tests;

use std::{
    io::{Read, Write},
    sync::{atomic::AtomicBool, Arc},
};

use crate::{
    binder::prelude::{Entry, Module},
    environment::prelude::Value,
};
use self::prelude::{Fault, Machine, Options, Stats};

/// What a finished run produced.
#[derive(Debug)]
pub struct Outcome {
    /// Set for expression programs; `main` programs only talk through
    /// their output.
    pub value: Option<Value>,
    pub stats: Stats,
}

/// Runs the module's entry against the given streams.
pub fn run<R: Read, W: Write, E: Write>(
    module: &Module,
    options: Options,
    input: R,
    output: W,
    errors: E,
    interrupt: Option<Arc<AtomicBool>>,
) -> Result<Outcome, Fault> {
    let mut machine = Machine::new(&module.globals, input, output, errors, options);
    if let Some(flag) = interrupt {
        machine = machine.with_interrupt(flag);
    }

    let value = machine.run(module.entry.term())?;
    let value = match module.entry {
        Entry::Expression(_) => Some(value),
        Entry::Main(_) => None,
    };

    Ok(Outcome { value, stats: machine.stats() })
}
