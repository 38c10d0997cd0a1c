//! Error types for the client runtime.

use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;


/// Failures surfaced by the client.
#[derive(Debug, Error)]
pub enum AppError {
    /// Argument parsing failed or help was requested.
    #[error("{0}")]
    CliUsage(clap::Error),
    /// The server address could not be resolved.
    #[error("failed to resolve server address {endpoint}: {source}")]
    Resolve {
        /// `host:port` as given.
        endpoint: String,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// Connecting to the server failed.
    #[error("failed to connect to server at {endpoint}: {source}")]
    Connect {
        /// `host:port` as given.
        endpoint: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Writing to the server failed.
    #[error("failed to send request to server: {0}")]
    SendRequest(#[source] io::Error),
    /// Reading from the server failed.
    #[error("failed to read response from server: {0}")]
    ReadResponse(#[source] io::Error),
    /// The server closed the connection.
    #[error("server closed the connection")]
    Disconnected,
    /// Writing to the terminal failed.
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
    /// Reading a command from standard input failed.
    #[error("failed to read input: {0}")]
    Input(#[source] io::Error),
    /// A local file could not be opened, created, read, or written.
    #[error("local file {path}: {source}")]
    LocalFile {
        /// Local path involved.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A `terminate` argument was not a command identifier.
    #[error("invalid command identifier: {0}")]
    CommandId(#[source] ParseIntError),
}

impl AppError {
    /// Whether the connection to the server is gone.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SendRequest(_) | Self::ReadResponse(_) | Self::Disconnected | Self::Output(_)
        )
    }
}
