//! Connection helpers for the command and cancellation ports.

use std::io::Write;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use myftp_protocol::CommandId;

use crate::AppError;

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Connects to `host:port`, trying each resolved address in turn.
pub(crate) fn connect(host: &str, port: u16) -> Result<TcpStream, AppError> {
    let endpoint = format!("{host}:{port}");
    let addresses: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|source| AppError::Resolve {
            endpoint: endpoint.clone(),
            source,
        })?
        .collect();
    let mut last_error = None;
    for address in addresses {
        match TcpStream::connect_timeout(&address, CONNECTION_TIMEOUT) {
            Ok(stream) => return Ok(stream),
            Err(error) => last_error = Some(error),
        }
    }
    Err(AppError::Connect {
        endpoint,
        source: last_error
            .unwrap_or_else(|| std::io::Error::from(std::io::ErrorKind::AddrNotAvailable)),
    })
}

/// Sends a one-shot cancellation request. The server sends no reply.
pub(crate) fn send_cancellation(host: &str, port: u16, id: CommandId) -> Result<(), AppError> {
    let mut stream = connect(host, port)?;
    stream
        .write_all(&id.cancel_payload())
        .and_then(|()| stream.flush())
        .map_err(AppError::SendRequest)
}
