//! Per-connection protocol state machine.
//!
//! A session greets the client, then reads one line at a time and runs the
//! matching command until the client sends `quit`, the peer closes the
//! stream, or a read fails. Commands run strictly in sequence. Handler
//! failures become `ERROR:` lines and never end the session, except a peer
//! disconnect in the middle of an upload.

mod input;
mod navigation;
mod response;
mod transfer;


use std::io::{self, Read, Write};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use myftp_protocol::{GREETING, Response};

use crate::cancel::CancellationRegistry;
use crate::dispatch::{Command, CommandError, CommandKind, CommandRegistry, Target};
use crate::gateway::FilesystemGateway;

use self::input::InputBuffer;
use self::response::ResponseWriter;

pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Transport failures that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading from the client failed.
    #[error("failed to read from client: {source}")]
    Read {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The client sent more than the line limit without a newline.
    #[error("command line exceeds {limit} bytes")]
    LineTooLong {
        /// Maximum accepted line length.
        limit: usize,
    },
}

/// Shared services every session uses.
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub(crate) gateway: Arc<dyn FilesystemGateway>,
    pub(crate) registry: Arc<CommandRegistry>,
    pub(crate) cancellations: Arc<CancellationRegistry>,
}

/// What a handler produced.
pub(crate) enum Reply {
    /// One response line to send.
    Line(Response),
    /// The handler already wrote everything it had to say.
    Streamed,
    /// End the session without a response.
    Close,
}

type HandlerResult = Result<Reply, CommandError>;

pub(crate) struct Session<R, W> {
    input: InputBuffer<R>,
    output: ResponseWriter<W>,
    context: SessionContext,
    cwd: PathBuf,
    client: String,
}

impl<R: Read, W: Write> Session<R, W> {
    /// Creates a session starting in the gateway's root directory.
    pub(crate) fn new(reader: R, writer: W, context: SessionContext, client: String) -> Self {
        let cwd = context.gateway.cwd();
        Self {
            input: InputBuffer::new(reader),
            output: ResponseWriter::new(writer),
            context,
            cwd,
            client,
        }
    }

    /// Runs the session until it closes.
    pub(crate) fn run(mut self) {
        info!(target: SESSION_TARGET, client = %self.client, "session started");
        self.output.send_text(GREETING);
        loop {
            match self.input.read_line() {
                Ok(Some(line)) => {
                    if self.handle_line(&line).is_break() {
                        break;
                    }
                }
                Ok(None) => {
                    info!(target: SESSION_TARGET, client = %self.client, "client disconnected");
                    break;
                }
                Err(error) => {
                    warn!(
                        target: SESSION_TARGET,
                        client = %self.client,
                        error = %error,
                        "closing session"
                    );
                    break;
                }
            }
        }
        info!(target: SESSION_TARGET, client = %self.client, "session closed");
    }

    fn handle_line(&mut self, line: &str) -> ControlFlow<()> {
        let Some(command) = Command::parse(line) else {
            self.output.send_text("\n");
            return ControlFlow::Continue(());
        };
        info!(
            target: SESSION_TARGET,
            client = %self.client,
            command = command.name(),
            argument = command.argument(),
            "command received"
        );
        let result = match self.context.registry.lookup(command.name()) {
            Some(kind) => self.execute(kind, command.argument()),
            None => Err(CommandError::UnknownCommand),
        };
        match result {
            Ok(Reply::Line(response)) => self.output.send(&response),
            Ok(Reply::Streamed) => {}
            Ok(Reply::Close) | Err(CommandError::Disconnected) => return ControlFlow::Break(()),
            Err(error) => {
                debug!(
                    target: SESSION_TARGET,
                    client = %self.client,
                    command = command.name(),
                    error = %error,
                    "command failed"
                );
                self.output.send(&Response::error(error.to_string()));
            }
        }
        ControlFlow::Continue(())
    }

    fn execute(&mut self, kind: CommandKind, argument: &str) -> HandlerResult {
        match kind {
            CommandKind::Pwd => Ok(self.print_directory()),
            CommandKind::Ls => self.list_directory(),
            CommandKind::Cd => self.change_directory(argument),
            CommandKind::Mkdir => self.make_directory(argument),
            CommandKind::Delete => self.delete_file(argument),
            CommandKind::Get => self.download(argument),
            CommandKind::Put => self.upload(argument),
            CommandKind::Quit => Ok(Reply::Close),
        }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.cwd.join(name)
    }
}

/// Rejects an empty argument before any filesystem access.
fn require_name(argument: &str, target: Target) -> Result<&str, CommandError> {
    if argument.is_empty() {
        Err(CommandError::InvalidArgument { target })
    } else {
        Ok(argument)
    }
}
