//! Cancellation side-channel payload.
//!
//! A canceller connects to the auxiliary port and writes
//! `terminate <id>\n`. The server reads the decimal command identifier
//! starting at [`CANCEL_ID_OFFSET`]; the prefix itself is not checked.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use thiserror::Error;

/// Conventional text preceding the identifier.
pub const CANCEL_PREFIX: &str = "terminate ";

/// Byte offset of the command identifier in a cancellation payload.
pub const CANCEL_ID_OFFSET: usize = CANCEL_PREFIX.len();

/// Identifier of a cancellable in-flight command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u64);

impl CommandId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Encodes a cancellation request for this identifier.
    #[must_use]
    pub fn cancel_payload(self) -> Vec<u8> {
        format!("{CANCEL_PREFIX}{self}\n").into_bytes()
    }

    /// Extracts the identifier from a received cancellation payload.
    ///
    /// # Errors
    ///
    /// Fails when the payload ends before the identifier offset, when no
    /// digits follow the offset, or when the digits overflow `u64`.
    pub fn from_cancel_payload(payload: &[u8]) -> Result<Self, CancelParseError> {
        let tail = payload
            .get(CANCEL_ID_OFFSET..)
            .ok_or(CancelParseError::TooShort {
                length: payload.len(),
            })?;
        let digits = tail
            .iter()
            .position(|byte| !byte.is_ascii_digit())
            .map_or(tail, |end| tail.get(..end).unwrap_or_default());
        if digits.is_empty() {
            return Err(CancelParseError::MissingIdentifier);
        }
        String::from_utf8_lossy(digits).parse()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for CommandId {
    type Err = CancelParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        input
            .trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|source| CancelParseError::InvalidIdentifier { source })
    }
}

/// Errors raised while decoding a cancellation payload.
#[derive(Debug, Error)]
pub enum CancelParseError {
    /// The payload ended before the identifier offset.
    #[error("cancellation payload of {length} bytes is shorter than the identifier offset")]
    TooShort {
        /// Number of bytes received.
        length: usize,
    },
    /// No digits were found at the identifier offset.
    #[error("cancellation payload carries no command identifier")]
    MissingIdentifier,
    /// The identifier did not parse as an unsigned integer.
    #[error("invalid command identifier: {source}")]
    InvalidIdentifier {
        /// Underlying integer parse error.
        #[source]
        source: ParseIntError,
    },
}
