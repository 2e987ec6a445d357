use std::io::Read;

use tracing::trace;

/// The program's input stream, read one byte per demand and cached by
/// index so that every `get i` sees the same byte.
#[derive(Debug)]
pub struct Input<R> {
    reader: R,
    bytes: Vec<u8>,
    exhausted: bool,
    reads: usize,
}

impl<R: Read> Input<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, bytes: vec![], exhausted: false, reads: 0 }
    }

    /// Number of reads issued to the underlying reader.
    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn cached(&self) -> usize {
        self.bytes.len()
    }

    /// The byte at `index`, or `-1` past the end of the input.
    ///
    /// `before_read` runs before the reader is touched, so pending output
    /// can be flushed ahead of a blocking read.
    pub fn get(
        &mut self,
        index: i64,
        mut before_read: impl FnMut() -> std::io::Result<()>,
    ) -> std::io::Result<i64> {
        let Ok(index) = usize::try_from(index) else {
            return Ok(-1);
        };

        while self.bytes.len() <= index && !self.exhausted {
            before_read()?;
            self.read_byte()?;
        }

        Ok(self.bytes.get(index).map_or(-1, |&byte| i64::from(byte)))
    }

    fn read_byte(&mut self) -> std::io::Result<()> {
        let mut byte = [0u8];

        loop {
            self.reads += 1;
            match self.reader.read(&mut byte) {
                Ok(0) => {
                    trace!(bytes = self.bytes.len(), "input exhausted");
                    self.exhausted = true;
                    return Ok(());
                },
                Ok(_) => {
                    self.bytes.push(byte[0]);
                    return Ok(());
                },
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}
