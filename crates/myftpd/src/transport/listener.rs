//! Listener implementation for the server's TCP ports.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{info, warn};

use myftp_config::ListenEndpoint;

use super::{ConnectionHandler, ListenerError, TRANSPORT_TARGET};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const LISTEN_BACKLOG: i32 = 64;

/// Listener bound to one TCP endpoint.
#[derive(Debug)]
pub(crate) struct SocketListener {
    endpoint: ListenEndpoint,
    listener: TcpListener,
    role: &'static str,
}

impl SocketListener {
    /// Binds `endpoint`. `role` names the listener in logs and thread names.
    pub(crate) fn bind(endpoint: &ListenEndpoint, role: &'static str) -> Result<Self, ListenerError> {
        let listener = bind_tcp(endpoint.host(), endpoint.port())?;
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
            role,
        })
    }

    pub(crate) fn local_addr(&self) -> Result<SocketAddr, ListenerError> {
        self.listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })
    }

    /// Starts the accept loop on a background thread.
    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name(format!("myftp-{}-accept", self.role))
            .spawn(move || run_accept_loop(&self, &shutdown_flag, handler.as_ref()))
            .map_err(|source| ListenerError::ThreadSpawn { source })?;
        Ok(ListenerHandle {
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to a background accept thread.
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        self.shutdown();
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    listener: &SocketListener,
    shutdown: &AtomicBool,
    handler: &dyn ConnectionHandler,
) {
    info!(
        target: TRANSPORT_TARGET,
        endpoint = %listener.endpoint,
        role = listener.role,
        "socket listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(&listener.listener) {
            Ok(Some((stream, peer))) => {
                last_error = None;
                handler.handle(stream, peer);
            }
            Ok(None) => thread::sleep(ACCEPT_BACKOFF),
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: TRANSPORT_TARGET,
                        role = listener.role,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    info!(target: TRANSPORT_TARGET, role = listener.role, "socket listener stopped");
}

fn accept_connection(listener: &TcpListener) -> io::Result<Option<(TcpStream, SocketAddr)>> {
    match listener.accept() {
        Ok((stream, peer)) => {
            stream.set_nonblocking(false)?;
            Ok(Some((stream, peer)))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let addr = resolve(host, port)?;
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(|source| ListenerError::Socket { addr, source })?;
    // Accept IPv4 clients on IPv6 sockets as mapped addresses.
    if addr.is_ipv6() {
        socket
            .set_only_v6(false)
            .map_err(|source| ListenerError::Socket { addr, source })?;
    }
    socket
        .set_reuse_address(true)
        .map_err(|source| ListenerError::Socket { addr, source })?;
    socket
        .bind(&SockAddr::from(addr))
        .map_err(|source| ListenerError::BindTcp { addr, source })?;
    socket
        .listen(LISTEN_BACKLOG)
        .map_err(|source| ListenerError::Listen { addr, source })?;
    Ok(socket.into())
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    addrs.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_owned(),
        port,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    impl ConnectionHandler for CountingHandler {
        fn handle(&self, _stream: TcpStream, _peer: SocketAddr) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn wait_for_count(count: &AtomicUsize, expected: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if count.load(Ordering::SeqCst) >= expected {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn tcp_listener_accepts_connections() {
        let endpoint = ListenEndpoint::new("127.0.0.1", 0);
        let listener = SocketListener::bind(&endpoint, "test").expect("bind tcp listener");
        let addr = listener.local_addr().expect("listener address");
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(CountingHandler {
            count: Arc::clone(&count),
        });
        let handle = listener.start(handler).expect("start listener");

        TcpStream::connect(addr).expect("connect first client");
        TcpStream::connect(addr).expect("connect second client");

        assert!(wait_for_count(&count, 2), "expected two connections");
        handle.join().expect("join listener");
    }

    #[test]
    fn rejects_unresolvable_host() {
        let endpoint = ListenEndpoint::new("host.invalid.", 0);
        let error = SocketListener::bind(&endpoint, "test").expect_err("resolution fails");
        assert!(matches!(
            error,
            ListenerError::Resolve { .. } | ListenerError::ResolveEmpty { .. }
        ));
    }

    #[test]
    fn rejects_port_in_use() {
        let first = SocketListener::bind(&ListenEndpoint::new("127.0.0.1", 0), "first")
            .expect("bind first listener");
        let port = first.local_addr().expect("first address").port();
        let error = SocketListener::bind(&ListenEndpoint::new("127.0.0.1", port), "second")
            .expect_err("port already bound");
        assert!(matches!(error, ListenerError::BindTcp { .. }));
    }
}
