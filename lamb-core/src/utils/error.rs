use std::path::PathBuf;

use termcolor::Buffer;
use thiserror::Error;

use crate::{
    binder::prelude::{BindError, BindErrorType},
    eval::prelude::Fault,
    parser::prelude::ParseError,
};
use super::diagnostic::{Diagnostic, Label, Level, Location};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("failed to parse source code")]
    Parse {
        path: PathBuf,
        src: String,
        error: ParseError
    },
    #[error("failed to bind names")]
    Bind {
        path: PathBuf,
        src: String,
        error: BindError
    },
    #[error("program faulted: {fault}")]
    Runtime {
        path: PathBuf,
        src: String,
        fault: Fault
    },
    #[error("IO operation failed")]
    StdIo {
        err: std::io::ErrorKind
    }
}

impl Error {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Runtime { fault, .. } if fault.is_internal() => 3,
            Error::Parse { .. } | Error::Bind { .. } | Error::Runtime { .. } => 1,
            Error::StdIo { .. } => 2,
        }
    }

    pub fn pretty_string(&self) -> String {
        let mut nocolor = Buffer::no_color();
        // writing into memory cannot fail
        let _ = self.pretty(&mut nocolor);
        String::from_utf8_lossy(nocolor.as_slice()).into_owned()
    }

    pub fn pretty(&self, buf: &mut Buffer) -> std::io::Result<()> {
        use std::io::Write;

        for diagnostic in self.to_diagnostics() {
            diagnostic.write(buf)?;
            writeln!(buf)?;
        }

        Ok(())
    }

    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Error::Parse { path, src, error } => {
                let (label, extra) = error.details();

                vec![Diagnostic {
                    title: "Syntax error".into(),
                    text: extra.join("\n"),
                    level: Level::Error,
                    location: Some(Location {
                        src,
                        path: path.clone(),
                        label: Label {
                            text: Some(label.to_string()),
                            span: error.span,
                        },
                        extra_labels: vec![],
                    }),
                }]
            },
            Error::Bind { path, src, error } => {
                let (title, extra) = error.details();

                let (label, extra_labels) = match &error.error {
                    BindErrorType::Redefinition { first: Some(first), .. } => (
                        Some("Redefined here".to_string()),
                        vec![Label {
                            text: Some("First defined here".into()),
                            span: *first,
                        }],
                    ),
                    error => (Some(error.to_string()), vec![]),
                };

                vec![Diagnostic {
                    title: title.into(),
                    text: extra.join("\n"),
                    level: Level::Error,
                    location: Some(Location {
                        src,
                        path: path.clone(),
                        label: Label {
                            text: label,
                            span: error.location,
                        },
                        extra_labels,
                    }),
                }]
            },
            Error::Runtime { path, src, fault } => {
                let (title, mut text) = fault.details();

                if !fault.backtrace.is_empty() {
                    text.push("Backtrace, newest first:".into());
                    text.extend(fault.backtrace.iter().map(|name| format!("    {name}")));
                }

                let location = fault.location.map(|span| Location {
                    src,
                    path: path.clone(),
                    label: Label {
                        text: Some(fault.kind.to_string()),
                        span,
                    },
                    extra_labels: vec![],
                });

                vec![Diagnostic {
                    title: title.into(),
                    text: text.join("\n"),
                    level: Level::Error,
                    location,
                }]
            },
            Error::StdIo { err } => {
                vec![Diagnostic {
                    title: "Standard IO error".into(),
                    text: format!("{err}"),
                    level: Level::Error,
                    location: None,
                }]
            },
        }
    }
}
