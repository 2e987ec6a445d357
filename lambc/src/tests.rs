use std::io::{ErrorKind, Write};

use lamb_core::utils::prelude::Error;

use super::print_line;

struct ClosedPipe;

impl Write for ClosedPipe {
    fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
        Err(ErrorKind::BrokenPipe.into())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_print_line() -> Result<(), Error> {
    let mut out = vec![];
    print_line(&mut out, 42)?;
    print_line(&mut out, "(\\k -> (k 1 2))")?;

    assert_eq!(out, b"42\n(\\k -> (k 1 2))\n");

    Ok(())
}

#[test]
fn test_closed_stdout_exits_with_io_status() {
    let Err(err) = print_line(ClosedPipe, 42) else {
        panic!("writing into a closed pipe succeeded");
    };

    assert!(matches!(err, Error::StdIo { err: ErrorKind::BrokenPipe }));
    assert_eq!(err.exit_code(), 2);
}
