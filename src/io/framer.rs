// src/io/framer.rs
//
// Line assembler for newline-delimited serial text.
// Buffers raw bytes across reads and emits complete lines with the
// terminator stripped (`\n` or `\r\n`). Splitting happens on the raw byte
// buffer, so a UTF-8 character that arrives split across two read chunks
// decodes correctly once its line completes.

/// Max buffered bytes before a lineless stream is force-split.
/// Telemetry lines are a few dozen bytes; anything near this length is noise.
pub const MAX_LINE_LEN: usize = 1024;

/// Stateful line framer for one serial stream.
pub struct LineFramer {
    buffer: Vec<u8>,
    max_len: usize,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    pub fn new() -> Self {
        Self::with_max_len(MAX_LINE_LEN)
    }

    pub fn with_max_len(max_len: usize) -> Self {
        LineFramer {
            buffer: Vec::new(),
            max_len,
        }
    }

    /// Feed raw bytes into the framer.
    /// Returns all complete lines parsed, in order. Empty lines are emitted
    /// (callers skip them), so blank keep-alives do not shift framing.
    pub fn feed(&mut self, data: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for &byte in data {
            if byte == b'\n' {
                let mut line: Vec<u8> = self.buffer.drain(..).collect();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                lines.push(decode(line));
            } else {
                self.buffer.push(byte);

                // Force split on max length
                if self.buffer.len() >= self.max_len {
                    let line: Vec<u8> = self.buffer.drain(..).collect();
                    lines.push(decode(line));
                }
            }
        }

        lines
    }

    /// Surface any trailing unterminated text.
    /// Call when the stream ends. The read loop logs and discards the result
    /// rather than parsing it - a line without a terminator was never
    /// completed by the device.
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            let tail: Vec<u8> = self.buffer.drain(..).collect();
            Some(decode(tail))
        }
    }

    /// Bytes currently held for an incomplete line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Decode one line's bytes. Invalid UTF-8 decodes lossily; a line is never
/// dropped for encoding reasons alone.
fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

// ============================================================================
// Tests
// ============================================================================
