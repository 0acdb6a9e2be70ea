//! Incremental line framer for the radio module's serial output.
//!
//! The module terminates every response and every unsolicited frame with `\r\n`. Raw
//! reads arrive in arbitrary chunks, so bytes are accumulated here and whole lines are
//! handed out once their terminator has been seen. A partial line stays buffered for the
//! next read.
use log::warn;

/// Longest unterminated line kept before the buffer is dropped to resynchronise.
/// A maximal `+RCV` line (240 byte payload plus header and link metrics) fits easily.
pub const MAX_LINE_BYTES: usize = 512;

#[derive(Debug, Default)]
pub struct LineFramer {
    buf: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(MAX_LINE_BYTES),
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
        if self.buf.len() > MAX_LINE_BYTES && !self.buf.contains(&b'\n') {
            warn!(
                "Dropping {} buffered bytes without a line terminator",
                self.buf.len()
            );
            self.buf.clear();
        }
    }

    /// Next complete line with its `\r\n` or `\n` terminator removed.
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// True when some bytes of an unterminated line are buffered.
    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty() && !self.buf.contains(&b'\n')
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}
