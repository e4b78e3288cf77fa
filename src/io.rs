//! Character I/O collaborator used by the built-in trap routines.
//!
//! The core never touches a terminal itself. GETC, OUT, PUTS, IN and
//! PUTSP go through a [`Console`], and the caller decides what sits
//! behind it: a real terminal, a pipe, or a scripted buffer in tests.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Synchronous character device seen by trap routines.
pub trait Console {
    /// Read one character, blocking if needed. `None` means end of input.
    fn read_char(&mut self) -> Option<char>;

    /// Write one character.
    fn write_char(&mut self, c: char);

    /// Write a sequence of characters.
    fn write_string(&mut self, s: &str) {
        for c in s.chars() {
            self.write_char(c);
        }
    }
}

/// In-memory console: input comes from a queue, output is captured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedConsole {
    input: VecDeque<char>,
    output: String,
}

impl ScriptedConsole {
    /// A console with no input.
    pub fn new() -> Self {
        Self::default()
    }

    /// A console whose input yields the characters of `input` in order.
    pub fn with_input(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            output: String::new(),
        }
    }

    /// Queue more input characters.
    pub fn push_input(&mut self, input: &str) {
        self.input.extend(input.chars());
    }

    /// Everything written so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Take the captured output, leaving the buffer empty.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Number of input characters not yet consumed.
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }
}

impl Console for ScriptedConsole {
    fn read_char(&mut self) -> Option<char> {
        self.input.pop_front()
    }

    fn write_char(&mut self, c: char) {
        self.output.push(c);
    }

    fn write_string(&mut self, s: &str) {
        self.output.push_str(s);
    }
}

/// Console over any buffered reader and writer (stdin/stdout, pipes, files).
///
/// Input is consumed one line of raw bytes at a time and handed out as
/// Latin-1 characters, one per byte. Once the reader reports end of input
/// every later read returns `None`. Write errors are logged and otherwise
/// ignored.
#[derive(Debug)]
pub struct StreamConsole<R, W> {
    reader: R,
    writer: W,
    pending: VecDeque<u8>,
    exhausted: bool,
}

impl<R: BufRead, W: Write> StreamConsole<R, W> {
    /// Wrap a reader and a writer.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            pending: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Recover the underlying reader and writer.
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    fn fill(&mut self) -> io::Result<bool> {
        let mut line = Vec::new();
        let read = self.reader.read_until(b'\n', &mut line)?;
        self.pending.extend(line);
        Ok(read > 0)
    }

    fn report(result: io::Result<()>) {
        if let Err(err) = result {
            tracing::warn!(%err, "console write failed");
        }
    }
}

impl<R: BufRead, W: Write> Console for StreamConsole<R, W> {
    fn read_char(&mut self) -> Option<char> {
        if self.pending.is_empty() && !self.exhausted {
            // Output written so far should be visible before blocking.
            Self::report(self.writer.flush());
            match self.fill() {
                Ok(true) => {}
                Ok(false) => self.exhausted = true,
                Err(err) => {
                    tracing::warn!(%err, "console read failed, treating as end of input");
                    self.exhausted = true;
                }
            }
        }
        self.pending.pop_front().map(char::from)
    }

    fn write_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        Self::report(self.writer.write_all(c.encode_utf8(&mut buf).as_bytes()));
    }

    fn write_string(&mut self, s: &str) {
        Self::report(self.writer.write_all(s.as_bytes()));
    }
}
