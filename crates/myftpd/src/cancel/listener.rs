use std::io;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use myftp_protocol::CommandId;

use super::{CANCEL_TARGET, CancellationRegistry};
use crate::transport::{ConnectionHandler, client_ip, read_with_retry};

/// Cancellation requests are short; anything longer is truncated.
const MAX_REQUEST_BYTES: usize = 64;
const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Handles connections on the cancellation port.
///
/// Each request is read on its own short-lived thread so a slow canceller
/// cannot stall the accept loop. Nothing is written back.
pub(crate) struct CancelRequestHandler {
    registry: Arc<CancellationRegistry>,
}

impl CancelRequestHandler {
    pub(crate) fn new(registry: Arc<CancellationRegistry>) -> Self {
        Self { registry }
    }
}

impl ConnectionHandler for CancelRequestHandler {
    fn handle(&self, stream: TcpStream, peer: SocketAddr) {
        let registry = Arc::clone(&self.registry);
        let spawned = thread::Builder::new()
            .name("myftp-cancel-request".to_owned())
            .spawn(move || process_request(&registry, stream, peer));
        if let Err(error) = spawned {
            warn!(
                target: CANCEL_TARGET,
                error = %error,
                "failed to spawn cancellation request thread"
            );
        }
    }
}

fn process_request(registry: &CancellationRegistry, mut stream: TcpStream, peer: SocketAddr) {
    let client = client_ip(&peer);
    let payload = match read_request(&mut stream) {
        Ok(payload) => payload,
        Err(error) => {
            debug!(target: CANCEL_TARGET, %client, error = %error, "cancellation read failed");
            return;
        }
    };
    let id = match CommandId::from_cancel_payload(&payload) {
        Ok(id) => id,
        Err(error) => {
            debug!(target: CANCEL_TARGET, %client, error = %error, "malformed cancellation request");
            return;
        }
    };
    if registry.cancel(id) {
        info!(target: CANCEL_TARGET, %client, command_id = id.get(), "command cancelled");
    } else {
        debug!(
            target: CANCEL_TARGET,
            %client,
            command_id = id.get(),
            "cancellation ignored for unknown command"
        );
    }
}

/// Reads until a newline, end of stream, or the size cap.
fn read_request(stream: &mut TcpStream) -> io::Result<Vec<u8>> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    let mut payload = Vec::with_capacity(MAX_REQUEST_BYTES);
    let mut chunk = [0_u8; MAX_REQUEST_BYTES];
    while payload.len() < MAX_REQUEST_BYTES && !payload.contains(&b'\n') {
        let room = MAX_REQUEST_BYTES - payload.len();
        let read = read_with_retry(stream, &mut chunk[..room])?;
        if read == 0 {
            break;
        }
        payload.extend_from_slice(&chunk[..read]);
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;
    use std::time::Instant;

    fn deliver(registry: &CancellationRegistry, payload: &[u8]) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let addr = listener.local_addr().expect("listener address");
        let mut client = TcpStream::connect(addr).expect("connect client");
        client.write_all(payload).expect("write payload");
        drop(client);
        let (stream, peer) = listener.accept().expect("accept connection");
        process_request(registry, stream, peer);
    }

    #[test]
    fn cancels_registered_command() {
        let registry = Arc::new(CancellationRegistry::new());
        let guard = registry.begin();
        deliver(&registry, &guard.id().cancel_payload());
        assert!(!guard.is_running());
        assert!(registry.is_empty());
    }

    #[test]
    fn ignores_unknown_and_malformed_requests() {
        let registry = Arc::new(CancellationRegistry::new());
        let guard = registry.begin();
        deliver(&registry, b"terminate 42\n");
        deliver(&registry, b"short");
        deliver(&registry, b"terminate abc\n");
        assert!(guard.is_running());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn handler_processes_requests_off_the_accept_thread() {
        let registry = Arc::new(CancellationRegistry::new());
        let guard = registry.begin();
        let handler = CancelRequestHandler::new(Arc::clone(&registry));

        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let addr = listener.local_addr().expect("listener address");
        let mut client = TcpStream::connect(addr).expect("connect client");
        let (stream, peer) = listener.accept().expect("accept connection");
        handler.handle(stream, peer);
        client
            .write_all(&guard.id().cancel_payload())
            .expect("write payload");

        let deadline = Instant::now() + Duration::from_secs(2);
        while guard.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!guard.is_running());
    }
}
