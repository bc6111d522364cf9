//! Strict Line Reader
//!
//! Buffered reader that yields one journal line at a time and remembers
//! whether input ended in the middle of a line.

use std::io::{self, Read};

/// Default buffer capacity (8 KB)
pub const DEFAULT_CAPACITY: usize = 8192;

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// Reads `\n`- or `\r\n`-terminated lines from an underlying stream.
///
/// `read_line` returns `Ok(None)` at end of input. If the input ended after
/// some bytes of a line but before its terminator, those bytes are dropped
/// and `has_unterminated_line` reports `true`: for the journal this is a
/// torn append, not a record.
///
/// Buffered data lives in `buf[pos..end]`.
pub struct StrictLineReader<R> {
    inner: R,
    buf: Box<[u8]>,
    pos: usize,
    end: usize,
    unterminated: bool,
}

impl<R: Read> StrictLineReader<R> {
    /// Create a reader with the default capacity
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, DEFAULT_CAPACITY)
    }

    /// Create a reader with a custom buffer capacity
    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");

        Self {
            inner,
            buf: vec![0u8; capacity].into_boxed_slice(),
            pos: 0,
            end: 0,
            unterminated: false,
        }
    }

    /// Read the next line without its terminator
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        if self.pos >= self.end && !self.fill_buf()? {
            return Ok(None);
        }

        // Fast path: the whole line is already buffered.
        if let Some(i) = self.find_lf() {
            let line = trim_cr(&self.buf[self.pos..i]).to_vec();
            self.pos = i + 1;
            return decode(line);
        }

        // Slow path: the line spans several refills. Anticipate 80 extra bytes.
        let mut line = Vec::with_capacity(self.end - self.pos + 80);
        loop {
            line.extend_from_slice(&self.buf[self.pos..self.end]);
            self.pos = self.end;

            if !self.fill_buf()? {
                self.unterminated = true;
                return Ok(None);
            }

            if let Some(i) = self.find_lf() {
                line.extend_from_slice(&self.buf[self.pos..i]);
                self.pos = i + 1;
                let len = trim_cr(&line).len();
                line.truncate(len);
                return decode(line);
            }
        }
    }

    /// True if input ended in the middle of a line
    pub fn has_unterminated_line(&self) -> bool {
        self.unterminated
    }

    /// Give back the underlying stream
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn find_lf(&self) -> Option<usize> {
        self.buf[self.pos..self.end]
            .iter()
            .position(|&b| b == LF)
            .map(|offset| self.pos + offset)
    }

    /// Refill the buffer. Returns false at end of input.
    fn fill_buf(&mut self) -> io::Result<bool> {
        loop {
            match self.inner.read(&mut self.buf) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    self.pos = 0;
                    self.end = n;
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

fn trim_cr(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(&CR) => &line[..line.len() - 1],
        _ => line,
    }
}

fn decode(line: Vec<u8>) -> io::Result<Option<String>> {
    String::from_utf8(line)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
