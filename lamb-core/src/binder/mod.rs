pub mod error;
pub mod binder;

pub mod prelude {
    pub use super::{
        binder::*,
        error::*
    };
}

use std::{io::BufRead, path::PathBuf, rc::Rc};

use utf8_chars::BufReadCharsExt;

use crate::{
    binder::prelude::{Binder, Module},
    parser::prelude::{parse_module, parse_prelude},
    utils::prelude::{BindWarningEmitter, Error, SrcSpan, WarningEmitter, WarningEmitterIO},
};

/// Source of the definitions every module sees.
pub const PRELUDE: &str = include_str!("prelude.lamb");
pub const PRELUDE_PATH: &str = "<prelude>";

/// Parses and binds `src` on top of the prelude.
pub fn bind(
    path: PathBuf,
    src: String,
    warnings: Rc<dyn WarningEmitterIO>,
) -> Result<Module, Error> {
    let warnings = BindWarningEmitter::new(
        path.clone(),
        src.clone(),
        WarningEmitter::new(warnings),
    );
    let mut binder = Binder::new(&warnings);

    let prelude = parse_prelude(PRELUDE).map_err(|error| Error::Parse {
        path: PRELUDE_PATH.into(),
        src: PRELUDE.into(),
        error,
    })?;
    let _ = binder.bind_items(&prelude).map_err(|error| Error::Bind {
        path: PRELUDE_PATH.into(),
        src: PRELUDE.into(),
        error,
    })?;

    let parsed = match parse_module(&src) {
        Ok(parsed) => parsed,
        Err(error) => return Err(Error::Parse { path, src, error }),
    };

    let end = SrcSpan::at(src.len() as u32);
    let bound = binder
        .bind_items(&parsed)
        .and_then(|expression| binder.finish(expression, end));

    match bound {
        Ok((globals, entry)) => Ok(Module { globals, entry, path, src }),
        Err(error) => Err(Error::Bind { path, src, error }),
    }
}

pub fn bind_file(
    path: PathBuf,
    warnings: Rc<dyn WarningEmitterIO>,
) -> Result<Module, Error> {
    let file = std::fs::File::open(&path).map_err(|err| Error::StdIo { err: err.kind() })?;
    bind_reader(path, std::io::BufReader::new(file), warnings)
}

/// Reads the whole source from `reader`, decoding UTF-8 as it streams.
pub fn read_source(mut reader: impl BufRead) -> Result<String, Error> {
    reader
        .chars()
        .collect::<Result<String, _>>()
        .map_err(|err| Error::StdIo { err: err.kind() })
}

pub fn bind_reader(
    path: PathBuf,
    reader: impl BufRead,
    warnings: Rc<dyn WarningEmitterIO>,
) -> Result<Module, Error> {
    bind(path, read_source(reader)?, warnings)
}

#[cfg(test)]
mod tests;
