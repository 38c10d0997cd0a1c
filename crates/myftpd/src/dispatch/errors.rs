//! Error taxonomy for command handlers.
//!
//! Every variant except [`CommandError::Disconnected`] is recovered inside
//! the session and rendered as `ERROR: <display text>`. The display strings
//! are the exact wire messages.

use std::fmt;
use std::io;

use thiserror::Error;

/// Kind of filesystem object a command operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A regular file.
    File,
    /// A directory.
    Directory,
}

impl fmt::Display for Target {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::File => "File",
            Self::Directory => "Directory",
        })
    }
}

/// Failures reported to the client by command handlers.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command requires a name and none was given.
    #[error("{target} name not specified.")]
    InvalidArgument {
        /// Kind of name that was expected.
        target: Target,
    },
    /// The path does not exist.
    #[error("404 - {target} not found.")]
    NotFound {
        /// Kind of object that was looked up.
        target: Target,
    },
    /// A directory was found where a file was expected, or the reverse.
    #[error("{message}")]
    WrongType {
        /// Wire message.
        message: &'static str,
    },
    /// The path already exists.
    #[error("{target} already exists.")]
    AlreadyExists {
        /// Kind of object that was to be created.
        target: Target,
    },
    /// The OS refused access.
    #[error("Permission denied.")]
    PermissionDenied,
    /// Any other OS failure, reported with its reason.
    #[error("{context}: {source}.")]
    Io {
        /// What the handler was doing.
        context: &'static str,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The command token is not registered.
    #[error("Invalid command.")]
    UnknownCommand,
    /// The peer closed the connection mid-command.
    #[error("connection closed by peer")]
    Disconnected,
}

impl CommandError {
    /// Wraps an OS failure without classifying it.
    pub fn io(context: &'static str, source: io::Error) -> Self {
        Self::Io { context, source }
    }

    /// Classifies an OS failure for an operation on `target`.
    #[must_use]
    pub fn from_io(source: io::Error, target: Target, context: &'static str) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { target },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists { target },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::NotADirectory => Self::WrongType {
                message: "Not a directory.",
            },
            io::ErrorKind::IsADirectory => Self::WrongType {
                message: "Is a directory.",
            },
            _ => Self::io(context, source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CommandError::InvalidArgument { target: Target::File }, "File name not specified.")]
    #[case(
        CommandError::InvalidArgument { target: Target::Directory },
        "Directory name not specified."
    )]
    #[case(CommandError::NotFound { target: Target::File }, "404 - File not found.")]
    #[case(CommandError::NotFound { target: Target::Directory }, "404 - Directory not found.")]
    #[case(
        CommandError::AlreadyExists { target: Target::Directory },
        "Directory already exists."
    )]
    #[case(CommandError::PermissionDenied, "Permission denied.")]
    #[case(CommandError::UnknownCommand, "Invalid command.")]
    fn renders_wire_messages(#[case] error: CommandError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case(io::ErrorKind::NotFound, "404 - Directory not found.")]
    #[case(io::ErrorKind::AlreadyExists, "Directory already exists.")]
    #[case(io::ErrorKind::PermissionDenied, "Permission denied.")]
    #[case(io::ErrorKind::NotADirectory, "Not a directory.")]
    fn classifies_io_errors(#[case] kind: io::ErrorKind, #[case] expected: &str) {
        let error = CommandError::from_io(io::Error::from(kind), Target::Directory, "unused");
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn unclassified_errors_keep_reason() {
        let error = CommandError::from_io(
            io::Error::other("disk on fire"),
            Target::File,
            "Failed to open file",
        );
        assert_eq!(error.to_string(), "Failed to open file: disk on fire.");
    }
}
