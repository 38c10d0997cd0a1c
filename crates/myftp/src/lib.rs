//! Interactive client for the myftp file transfer server.
//!
//! [`run`] parses the command line, connects to the server, and then reads
//! commands from the supplied input until `quit`, end of input, or a server
//! disconnect. All IO handles are injected so tests can drive a session with
//! in-memory buffers.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::net::TcpStream;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use myftp_config::DEFAULT_CANCEL_PORT;
use myftp_protocol::{CommandId, QUIT_COMMAND, Response};

mod connection;
mod errors;
mod transport;

use connection::{SendFailure, ServerConnection, Transfer};
pub use errors::AppError;

/// Prompt printed before each command is read.
pub const PROMPT: &str = "myftp> ";

#[derive(Parser, Debug)]
#[command(name = "myftp", version, about = "Interactive myftp client")]
struct Cli {
    /// Server host name or address.
    host: String,
    /// Server command port.
    port: u16,
    /// Server cancellation port.
    #[arg(long, default_value_t = DEFAULT_CANCEL_PORT)]
    cancel_port: u16,
    /// Local directory that `get` writes into and `put` reads from.
    #[arg(long, value_name = "DIR", default_value = ".")]
    local_dir: PathBuf,
}

/// Runs the client with the provided arguments and IO handles.
///
/// Returns success after `quit` or end of input, and failure for usage
/// errors, connection failures, and server disconnects.
#[must_use]
pub fn run<I, R, W, E>(args: I, stdin: &mut R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) if !error.use_stderr() => {
            write!(stdout, "{error}").ok();
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            write!(stderr, "{}", AppError::CliUsage(error)).ok();
            return ExitCode::FAILURE;
        }
    };

    let result = transport::connect(&cli.host, cli.port).and_then(|stream| {
        let mut repl = Repl {
            connection: ServerConnection::new(stream),
            cli: &cli,
            stdin,
            stdout: &mut *stdout,
        };
        repl.run()
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            writeln!(stderr, "{error}").ok();
            ExitCode::FAILURE
        }
    }
}

struct Repl<'a, R, W> {
    connection: ServerConnection<TcpStream>,
    cli: &'a Cli,
    stdin: &'a mut R,
    stdout: &'a mut W,
}

impl<R: BufRead, W: Write> Repl<'_, R, W> {
    fn run(&mut self) -> Result<(), AppError> {
        let greeting = self.connection.read_line()?;
        self.print(&greeting)?;
        loop {
            write!(self.stdout, "{PROMPT}")
                .and_then(|()| self.stdout.flush())
                .map_err(AppError::Output)?;
            let mut line = String::new();
            if self.stdin.read_line(&mut line).map_err(AppError::Input)? == 0 {
                return self.connection.send_line(QUIT_COMMAND);
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match self.execute(line) {
                Ok(ControlFlow::Break(())) => return Ok(()),
                Ok(ControlFlow::Continue(())) => {}
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => self.print(&error.to_string())?,
            }
        }
    }

    fn execute(&mut self, line: &str) -> Result<ControlFlow<()>, AppError> {
        let (verb, argument) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));
        match verb {
            QUIT_COMMAND => {
                self.connection.send_line(QUIT_COMMAND)?;
                return Ok(ControlFlow::Break(()));
            }
            "get" if !argument.is_empty() => self.download(argument)?,
            "put" if !argument.is_empty() => self.upload(argument)?,
            "terminate" => self.terminate(argument)?,
            _ => {
                let response = self.connection.command(line)?;
                self.print(&response.to_string())?;
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    fn download(&mut self, name: &str) -> Result<(), AppError> {
        if let Transfer::Refused(response) = self.connection.request_download(name)? {
            return self.print(&response.to_string());
        }
        let path = self.cli.local_dir.join(name);
        let (received, failure) = match File::create(&path) {
            Ok(mut file) => {
                let (received, failure) = self.connection.receive_payload(&mut file)?;
                if failure.is_some() {
                    drop(file);
                    fs::remove_file(&path).ok();
                }
                (received, failure)
            }
            Err(error) => {
                let (received, _) = self.connection.receive_payload(&mut io::sink())?;
                (received, Some(error))
            }
        };
        match failure {
            None => self.print(&format!("Downloaded {name} ({received} bytes).")),
            Some(source) => Err(AppError::LocalFile { path, source }),
        }
    }

    fn upload(&mut self, name: &str) -> Result<(), AppError> {
        let path = self.cli.local_dir.join(name);
        let opened = File::open(&path).and_then(|file| {
            if file.metadata()?.is_dir() {
                Err(io::Error::from(io::ErrorKind::IsADirectory))
            } else {
                Ok(file)
            }
        });
        let mut file = match opened {
            Ok(file) => file,
            Err(source) => return Err(AppError::LocalFile { path, source }),
        };
        if let Transfer::Refused(response) = self.connection.request_upload(name)? {
            return self.print(&response.to_string());
        }
        let sent = self.connection.send_payload(&mut file);
        let verdict = Response::parse(&self.connection.read_line()?);
        self.print(&verdict.to_string())?;
        match sent {
            Ok(_) => Ok(()),
            Err(SendFailure::Local(source)) => Err(AppError::LocalFile { path, source }),
            Err(SendFailure::Connection(error)) => Err(error),
        }
    }

    fn terminate(&mut self, argument: &str) -> Result<(), AppError> {
        let raw: u64 = argument.parse().map_err(AppError::CommandId)?;
        transport::send_cancellation(&self.cli.host, self.cli.cancel_port, CommandId::new(raw))?;
        self.print(&format!("Cancellation requested for command {raw}."))
    }

    fn print(&mut self, text: &str) -> Result<(), AppError> {
        writeln!(self.stdout, "{text}").map_err(AppError::Output)
    }
}
