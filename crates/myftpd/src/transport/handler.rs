//! Connection handling abstractions for the listeners.

use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream};

/// Handles accepted socket connections.
///
/// `handle` runs on the accept thread, so implementations hand long-running
/// work off to another thread and return promptly.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Takes ownership of one accepted connection.
    fn handle(&self, stream: TcpStream, peer: SocketAddr);
}

/// Reads into `buffer`, retrying reads interrupted by a signal.
pub(crate) fn read_with_retry<R: Read + ?Sized>(
    reader: &mut R,
    buffer: &mut [u8],
) -> io::Result<usize> {
    loop {
        match reader.read(buffer) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
}
