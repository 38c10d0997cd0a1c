//! `get` and `put`: the two raw-byte sub-protocols.
//!
//! A download sends `SUCCESS: FILE_TRANSFER_START`, the file bytes, then the
//! end marker. An upload sends `SUCCESS: READY_TO_RECEIVE` and consumes
//! bytes until the end marker, which may arrive split across reads. Both
//! register with the cancellation registry while they run.

use std::io::{self, Read, Write};

use tracing::{info, warn};

use myftp_protocol::{
    CHUNK_SIZE, END_MARKER, MarkerScanner, READY_TO_RECEIVE, Response, Scan, TRANSFER_START,
};

use super::{HandlerResult, Reply, SESSION_TARGET, Session, require_name};
use crate::dispatch::{CommandError, Target};
use crate::transport::read_with_retry;

enum UploadFailure {
    /// The peer went away before the end marker.
    Disconnected { source: Option<io::Error> },
    /// The destination rejected a write. The payload was still consumed.
    Write { source: io::Error },
}

impl<R: Read, W: Write> Session<R, W> {
    pub(super) fn download(&mut self, argument: &str) -> HandlerResult {
        let name = require_name(argument, Target::File)?;
        let path = self.resolve(name);
        if !self.context.gateway.exists(&path) {
            return Err(CommandError::NotFound {
                target: Target::File,
            });
        }
        let mut source = self
            .context
            .gateway
            .open_read_stream(&path)
            .map_err(|error| CommandError::from_io(error, Target::File, "Failed to open file"))?;

        let guard = self.context.cancellations.begin();
        info!(
            target: SESSION_TARGET,
            client = %self.client,
            command_id = guard.id().get(),
            file = name,
            "download started"
        );
        self.output.send(&Response::success(TRANSFER_START));

        let mut chunk = vec![0_u8; CHUNK_SIZE];
        let mut sent = 0_usize;
        loop {
            let read = match read_with_retry(&mut source, &mut chunk) {
                Ok(0) => break,
                Ok(read) => read,
                Err(error) => {
                    // The marker still goes out so the client leaves raw mode.
                    warn!(
                        target: SESSION_TARGET,
                        client = %self.client,
                        command_id = guard.id().get(),
                        error = %error,
                        "download read failed"
                    );
                    break;
                }
            };
            if let Err(error) = self.output.write_raw(&chunk[..read]) {
                warn!(
                    target: SESSION_TARGET,
                    client = %self.client,
                    command_id = guard.id().get(),
                    error = %error,
                    "download aborted"
                );
                return Ok(Reply::Streamed);
            }
            sent += read;
        }
        if let Err(error) = self.output.write_raw(END_MARKER) {
            warn!(
                target: SESSION_TARGET,
                client = %self.client,
                command_id = guard.id().get(),
                error = %error,
                "download aborted"
            );
            return Ok(Reply::Streamed);
        }
        info!(
            target: SESSION_TARGET,
            client = %self.client,
            command_id = guard.id().get(),
            bytes = sent,
            "download finished"
        );
        Ok(Reply::Streamed)
    }

    pub(super) fn upload(&mut self, argument: &str) -> HandlerResult {
        let name = require_name(argument, Target::File)?;
        let path = self.resolve(name);
        let mut sink = self
            .context
            .gateway
            .create_write_stream(&path)
            // NotFound here means the parent directory is missing.
            .map_err(|error| {
                CommandError::from_io(error, Target::Directory, "Failed to create file")
            })?;

        let guard = self.context.cancellations.begin();
        info!(
            target: SESSION_TARGET,
            client = %self.client,
            command_id = guard.id().get(),
            file = name,
            "upload started"
        );
        self.output.send(&Response::success(READY_TO_RECEIVE));

        let outcome = self.receive_payload(sink.as_mut());
        drop(sink);
        let failure = match outcome {
            Ok(received) => {
                info!(
                    target: SESSION_TARGET,
                    client = %self.client,
                    command_id = guard.id().get(),
                    bytes = received,
                    "upload finished"
                );
                return Ok(Reply::Line(Response::success("File transfer completed.")));
            }
            Err(failure) => failure,
        };

        if let Err(error) = self.context.gateway.remove(&path) {
            warn!(
                target: SESSION_TARGET,
                client = %self.client,
                error = %error,
                path = %path.display(),
                "failed to remove partial upload"
            );
        }
        match failure {
            UploadFailure::Disconnected { source } => {
                warn!(
                    target: SESSION_TARGET,
                    client = %self.client,
                    command_id = guard.id().get(),
                    error = ?source,
                    "File transfer failed"
                );
                Err(CommandError::Disconnected)
            }
            UploadFailure::Write { source } => Err(CommandError::io("Failed to write file", source)),
        }
    }

    /// Copies bytes up to the end marker into `sink`. Bytes after the marker
    /// are returned to the input buffer. Returns the payload length.
    fn receive_payload(&mut self, sink: &mut dyn Write) -> Result<usize, UploadFailure> {
        let mut scanner = MarkerScanner::new();
        let mut chunk = vec![0_u8; CHUNK_SIZE];
        let mut written = 0_usize;
        let mut write_error = None::<io::Error>;
        loop {
            let read = match self.input.read_raw(&mut chunk) {
                Ok(0) => return Err(UploadFailure::Disconnected { source: None }),
                Ok(read) => read,
                Err(error) => {
                    return Err(UploadFailure::Disconnected {
                        source: Some(error),
                    });
                }
            };
            let (payload, complete) = match scanner.feed(&chunk[..read]) {
                Scan::Pending { payload } => (payload, false),
                Scan::Complete { payload, trailing } => {
                    self.input.unread(&trailing);
                    (payload, true)
                }
            };
            if write_error.is_none() {
                match sink.write_all(&payload) {
                    Ok(()) => written += payload.len(),
                    Err(error) => write_error = Some(error),
                }
            }
            if complete {
                break;
            }
        }
        if write_error.is_none()
            && let Err(error) = sink.flush()
        {
            write_error = Some(error);
        }
        match write_error {
            Some(source) => Err(UploadFailure::Write { source }),
            None => Ok(written),
        }
    }
}
