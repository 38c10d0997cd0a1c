//! Response writing for the session loop.
//!
//! Failed sends of protocol lines are logged and swallowed: the session
//! notices a dead peer on its next read. Raw transfer writes report their
//! errors so a download can stop streaming early.

use std::io::{self, Write};

use tracing::warn;

use myftp_protocol::Response;

use super::SESSION_TARGET;

pub(crate) struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Sends one response line.
    pub(crate) fn send(&mut self, response: &Response) {
        self.send_text(&response.to_line());
    }

    /// Sends protocol text verbatim.
    pub(crate) fn send_text(&mut self, text: &str) {
        if let Err(error) = self.write_raw(text.as_bytes()) {
            warn!(target: SESSION_TARGET, error = %error, "failed to send response");
        }
    }

    /// Writes raw bytes and flushes.
    pub(crate) fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()
    }

    #[cfg(test)]
    pub(crate) fn get_ref(&self) -> &W {
        &self.writer
    }
}
