//! Buffered reading of command lines and raw transfer bytes.
//!
//! Both modes share one buffer: bytes received after a line's newline, or
//! after an upload's end marker, stay pending for the next read.

use std::io::{self, Read};

use super::SessionError;
use crate::transport::read_with_retry;

/// Longest accepted command line, newline included.
pub(crate) const MAX_LINE_BYTES: usize = 64 * 1024;

const READ_CHUNK: usize = 4 * 1024;

pub(crate) struct InputBuffer<R> {
    source: R,
    pending: Vec<u8>,
}

impl<R: Read> InputBuffer<R> {
    pub(crate) fn new(source: R) -> Self {
        Self {
            source,
            pending: Vec::new(),
        }
    }

    /// Reads one line with its `\n` or `\r\n` removed. Returns `None` when
    /// the peer closed the stream; an unterminated trailing line is dropped.
    pub(crate) fn read_line(&mut self) -> Result<Option<String>, SessionError> {
        let mut chunk = [0_u8; READ_CHUNK];
        loop {
            if let Some(position) = self.pending.iter().position(|byte| *byte == b'\n') {
                let mut line: Vec<u8> = self.pending.drain(..=position).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }
            if self.pending.len() >= MAX_LINE_BYTES {
                return Err(SessionError::LineTooLong {
                    limit: MAX_LINE_BYTES,
                });
            }
            let read = read_with_retry(&mut self.source, &mut chunk)
                .map_err(|source| SessionError::Read { source })?;
            if read == 0 {
                return Ok(None);
            }
            self.pending.extend_from_slice(&chunk[..read]);
        }
    }

    /// Reads raw bytes, serving pending bytes before touching the stream.
    pub(crate) fn read_raw(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            return read_with_retry(&mut self.source, buffer);
        }
        let len = self.pending.len().min(buffer.len());
        buffer[..len].copy_from_slice(&self.pending[..len]);
        self.pending.drain(..len);
        Ok(len)
    }

    /// Returns bytes to the front of the buffer.
    pub(crate) fn unread(&mut self, bytes: &[u8]) {
        self.pending.splice(0..0, bytes.iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn buffer(input: &[u8]) -> InputBuffer<Cursor<Vec<u8>>> {
        InputBuffer::new(Cursor::new(input.to_vec()))
    }

    #[test]
    fn splits_pipelined_lines() {
        let mut input = buffer(b"pwd\r\nls\n");
        assert_eq!(input.read_line().expect("first").as_deref(), Some("pwd"));
        assert_eq!(input.read_line().expect("second").as_deref(), Some("ls"));
        assert_eq!(input.read_line().expect("eof"), None);
    }

    #[test]
    fn drops_unterminated_line_at_eof() {
        let mut input = buffer(b"pwd");
        assert_eq!(input.read_line().expect("eof"), None);
    }

    #[test]
    fn rejects_overlong_lines() {
        let mut input = buffer(&vec![b'a'; MAX_LINE_BYTES + 1]);
        let error = input.read_line().expect_err("line too long");
        assert!(matches!(error, SessionError::LineTooLong { .. }));
    }

    #[test]
    fn raw_reads_consume_pending_bytes_first() {
        let mut input = buffer(b"put a\nPAYLOAD");
        assert_eq!(input.read_line().expect("line").as_deref(), Some("put a"));
        let mut raw = [0_u8; 32];
        let read = input.read_raw(&mut raw).expect("raw read");
        assert_eq!(&raw[..read], b"PAYLOAD");
    }

    #[test]
    fn unread_bytes_form_the_next_line() {
        let mut input = buffer(b"");
        input.unread(b"pwd\n");
        assert_eq!(input.read_line().expect("line").as_deref(), Some("pwd"));
    }
}
