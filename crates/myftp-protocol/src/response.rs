//! Response line model.
//!
//! Most commands answer with `STATUS: message\n`. Commands whose result is
//! the message itself (`pwd`, `ls`) answer with the bare text.

use std::fmt;

/// Status prefix of a framed response line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The command completed.
    Success,
    /// The command failed; the message explains why.
    Error,
}

impl Status {
    /// Returns the wire spelling of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        }
    }
}

/// One response line, without its trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A `STATUS: message` line.
    Framed {
        /// Outcome of the command.
        status: Status,
        /// Human readable message.
        message: String,
    },
    /// Raw command output such as a directory listing.
    Bare(String),
}

impl Response {
    /// Builds a `SUCCESS` response.
    pub fn success(message: impl Into<String>) -> Self {
        Self::Framed {
            status: Status::Success,
            message: message.into(),
        }
    }

    /// Builds an `ERROR` response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Framed {
            status: Status::Error,
            message: message.into(),
        }
    }

    /// Builds a bare response.
    pub fn bare(message: impl Into<String>) -> Self {
        Self::Bare(message.into())
    }

    /// Parses a received line, tolerating a trailing `\n` or `\r\n`.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        for status in [Status::Success, Status::Error] {
            if let Some(rest) = line
                .strip_prefix(status.as_str())
                .and_then(|rest| rest.strip_prefix(':'))
            {
                return Self::Framed {
                    status,
                    message: rest.trim_start().to_owned(),
                };
            }
        }
        Self::Bare(line.to_owned())
    }

    /// Returns `true` for `SUCCESS` lines.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Framed {
                status: Status::Success,
                ..
            }
        )
    }

    /// Returns the message body without the status prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Framed { message, .. } => message,
            Self::Bare(message) => message,
        }
    }

    /// Renders the line as sent on the wire, including the newline.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for Response {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Framed { status, message } => write!(formatter, "{}: {message}", status.as_str()),
            Self::Bare(message) => formatter.write_str(message),
        }
    }
}
