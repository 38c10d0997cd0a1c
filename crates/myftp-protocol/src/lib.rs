//! Wire vocabulary shared by the `myftp` server and client.
//!
//! The protocol is line oriented: the client sends `<name>[ <argument>]\n`
//! and the server answers with one response line per command. The `get` and
//! `put` commands switch the connection into a raw byte stream that is
//! terminated by [`END_MARKER`]. The cancellation side-channel uses a
//! separate port and a fixed-offset payload described in [`cancel`].

pub mod cancel;
mod marker;
mod response;

pub use cancel::{CANCEL_ID_OFFSET, CANCEL_PREFIX, CancelParseError, CommandId};
pub use marker::{MarkerScanner, Scan};
pub use response::{Response, Status};

/// Welcome line sent by the server as soon as a session starts.
pub const GREETING: &str = "Welcome to the FTP-Server! Command Away\n";

/// Literal terminator that closes a raw file payload in either direction.
pub const END_MARKER: &[u8] = b"FILE_TRANSFER_END\n";

/// Success message announcing that raw download bytes follow.
pub const TRANSFER_START: &str = "FILE_TRANSFER_START";

/// Success message announcing that the server waits for upload bytes.
pub const READY_TO_RECEIVE: &str = "READY_TO_RECEIVE";

/// Command token that ends a session.
pub const QUIT_COMMAND: &str = "quit";

/// Size of the chunks used when streaming file payloads.
pub const CHUNK_SIZE: usize = 8 * 1024;
