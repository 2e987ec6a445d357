mod cli;
mod rlpl;
mod rppl;

use std::{
    fmt::Display,
    io::{BufReader, Read, Write},
    path::PathBuf,
    process::ExitCode,
    rc::Rc,
    sync::{atomic::{AtomicBool, Ordering}, Arc},
    time::Instant,
};

use clap::Parser;
use cli::{print_finished, print_leaked, print_profile, print_running};
use lamb_core::{
    binder::{bind_file, bind_reader, read_source},
    eval::{prelude::Options, run},
    parser::prelude::parse_module,
    term::prelude::live_nodes,
    utils::prelude::{Error, Warning, WarningEmitterIO},
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
enum Command {
    /// Parses, binds and evaluates a program
    Run {
        /// Path of source file; `-` or nothing reads it from standard input
        path: Option<PathBuf>,
        /// Log every evaluation step
        #[arg(long, default_value_t = false)]
        trace: bool,
        /// Print evaluation counters after the run
        #[arg(long, default_value_t = false)]
        profile: bool,
        /// Print the chain of globals that led to a runtime fault
        #[arg(long, default_value_t = false)]
        backtrace: bool,
        /// Hide source locations and check that every term was released
        #[arg(long, default_value_t = false)]
        test: bool,
    },
    /// Prints the parsed surface tree of a source file
    Parse {
        /// Path of source file
        path: PathBuf,
    },
    /// Runs Read Lex Print Loop
    Rlpl,
    /// Runs Read Parse Print Loop
    Rppl
}

fn main() -> ExitCode {
    let status = match Command::parse() {
        Command::Run { path, trace, profile, backtrace, test } => {
            init_tracing(trace);
            run_program(path, Options { trace, profile, backtrace, test })
        },
        Command::Parse { path } => {
            init_tracing(false);
            parse_program(path)
        },
        Command::Rlpl => io_status(rlpl::start()),
        Command::Rppl => io_status(rppl::start()),
    };

    ExitCode::from(status)
}

fn init_tracing(trace: bool) {
    let filter = if trace {
        EnvFilter::new("trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn io_status(result: std::io::Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(err) => report(&Error::StdIo { err: err.kind() }, false),
    }
}

fn report(error: &Error, test: bool) -> u8 {
    let buffer_writer = cli::stderr_buffer_writer();
    let mut buffer = buffer_writer.buffer();

    for mut diagnostic in error.to_diagnostics() {
        if test {
            diagnostic.location = None;
        }
        if diagnostic.write(&mut buffer).and_then(|_| writeln!(buffer)).is_err() {
            break;
        }
    }
    let _ = buffer_writer.print(&buffer);

    u8::try_from(error.exit_code()).unwrap_or(1)
}

fn run_program(path: Option<PathBuf>, options: Options) -> u8 {
    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = interrupt.clone();
    if let Err(err) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
        warn!(%err, "interrupts will not stop the program");
    }

    let from_stdin = path.as_ref().map_or(true, |path| path.as_os_str() == "-");
    let start = Instant::now();

    let status = {
        let warnings = Rc::new(ConsoleWarningEmitter { test: options.test });
        let bound = match path.filter(|_| !from_stdin) {
            Some(path) => {
                print_running(&path.to_string_lossy());
                bind_file(path, warnings)
            },
            None => {
                print_running("standard input");
                bind_reader(PathBuf::from("<stdin>"), std::io::stdin().lock(), warnings)
            },
        };

        match bound {
            Err(err) => report(&err, options.test),
            Ok(module) => {
                // a program read from standard input has no input of its own
                let input: Box<dyn Read> = if from_stdin {
                    Box::new(std::io::empty())
                } else {
                    Box::new(std::io::stdin().lock())
                };
                let output = std::io::BufWriter::new(std::io::stdout().lock());

                match run(&module, options, input, output, std::io::stderr(), Some(interrupt)) {
                    Ok(outcome) => {
                        let printed = match &outcome.value {
                            Some(value) => print_line(std::io::stdout().lock(), value),
                            None => Ok(()),
                        };
                        if options.profile {
                            print_profile(&outcome.stats.to_string());
                        }
                        match printed {
                            Ok(()) => 0,
                            Err(err) => report(&err, options.test),
                        }
                    },
                    Err(fault) => report(
                        &Error::Runtime { path: module.path.clone(), src: module.src.clone(), fault },
                        options.test,
                    ),
                }
            },
        }
    };

    if options.test && live_nodes() != 0 {
        print_leaked(live_nodes());
        return 3;
    }

    print_finished(Instant::now() - start);
    status
}

/// Writes `shown` on a line of its own. A closed pipe is an error, not a
/// panic.
fn print_line(mut out: impl Write, shown: impl Display) -> Result<(), Error> {
    writeln!(out, "{shown}").map_err(|err| Error::StdIo { err: err.kind() })
}

fn parse_program(path: PathBuf) -> u8 {
    let src = match std::fs::File::open(&path) {
        Ok(file) => read_source(BufReader::new(file)),
        Err(err) => Err(Error::StdIo { err: err.kind() }),
    };

    let parsed = src.and_then(|src| match parse_module(&src) {
        Ok(expr) => Ok(expr),
        Err(error) => Err(Error::Parse { path, src, error }),
    });

    let printed = parsed.and_then(|expr| print_line(std::io::stdout().lock(), expr));

    match printed {
        Ok(()) => 0,
        Err(err) => report(&err, false),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConsoleWarningEmitter {
    test: bool,
}

impl WarningEmitterIO for ConsoleWarningEmitter {
    fn emit_warning(&self, warning: Warning) {
        let buffer_writer = cli::stderr_buffer_writer();
        let mut buffer = buffer_writer.buffer();

        let mut diagnostic = warning.to_diagnostic();
        if self.test {
            diagnostic.location = None;
        }

        if diagnostic.write(&mut buffer).is_ok() {
            let _ = buffer_writer.print(&buffer);
        }
    }
}

#[cfg(test)]
mod tests;
