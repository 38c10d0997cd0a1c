//! Server assembly: listeners, worker pool, and shared session services.
//!
//! [`Server::bind`] resolves the served root and binds both ports;
//! [`Server::start`] launches the accept loops and returns a
//! [`ServerHandle`]. Dropping the handle shuts everything down.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, info, warn};

use myftp_config::Config;

use crate::cancel::{CancelRequestHandler, CancellationRegistry};
use crate::dispatch::CommandRegistry;
use crate::gateway::{FilesystemGateway, LocalFilesystem};
use crate::pool::{PoolError, WorkerPool};
use crate::session::{SESSION_TARGET, Session, SessionContext};
use crate::transport::{
    ConnectionHandler, ListenerError, ListenerHandle, SocketListener, TRANSPORT_TARGET, client_ip,
};

/// Errors raised while starting or stopping the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The served root could not be resolved.
    #[error("failed to resolve served directory '{path}': {source}")]
    Root {
        /// Configured root.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A listener failed to bind, start, or stop.
    #[error(transparent)]
    Listener(#[from] ListenerError),
    /// The worker pool failed to start.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// A bound but not yet accepting server.
pub struct Server {
    listener: SocketListener,
    cancel_listener: SocketListener,
    pool: Arc<WorkerPool>,
    context: SessionContext,
    sessions: Arc<ActiveSessions>,
}

impl Server {
    /// Canonicalises the served root, starts the worker pool, and binds the
    /// command and cancellation ports.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the root cannot be resolved, a port
    /// cannot be bound, or the pool cannot start.
    pub fn bind(config: &Config) -> Result<Self, ServerError> {
        let root = fs::canonicalize(config.root()).map_err(|source| ServerError::Root {
            path: config.root().to_path_buf(),
            source,
        })?;
        Self::bind_with_gateway(config, Arc::new(LocalFilesystem::new(root)))
    }

    /// Like [`Server::bind`] but serves through a caller-supplied gateway.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when a port cannot be bound or the pool cannot
    /// start.
    pub fn bind_with_gateway(
        config: &Config,
        gateway: Arc<dyn FilesystemGateway>,
    ) -> Result<Self, ServerError> {
        let listener = SocketListener::bind(&config.listen_endpoint(), "command")?;
        let cancel_listener = SocketListener::bind(&config.cancel_endpoint(), "cancel")?;
        let pool = Arc::new(WorkerPool::new(config.worker_count())?);
        let context = SessionContext {
            gateway,
            registry: Arc::new(CommandRegistry::new()),
            cancellations: Arc::new(CancellationRegistry::new()),
        };
        Ok(Self {
            listener,
            cancel_listener,
            pool,
            context,
            sessions: Arc::new(ActiveSessions::default()),
        })
    }

    /// Starts both accept loops.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Listener`] when an accept thread cannot start.
    pub fn start(self) -> Result<ServerHandle, ServerError> {
        let local_addr = self.listener.local_addr()?;
        let cancel_addr = self.cancel_listener.local_addr()?;
        let cancellations = Arc::clone(&self.context.cancellations);
        let mut handle = ServerHandle {
            local_addr,
            cancel_addr,
            cancellations: Arc::clone(&cancellations),
            sessions: Arc::clone(&self.sessions),
            pool: Arc::clone(&self.pool),
            listeners: Vec::with_capacity(2),
        };

        let sessions = SessionHandler {
            pool: self.pool,
            context: self.context,
            sessions: self.sessions,
        };
        // On failure `handle` drops and stops whatever already started.
        handle.listeners.push(self.listener.start(Arc::new(sessions))?);
        handle.listeners.push(
            self.cancel_listener
                .start(Arc::new(CancelRequestHandler::new(cancellations)))?,
        );
        info!(
            target: TRANSPORT_TARGET,
            %local_addr,
            %cancel_addr,
            workers = handle.pool.size().get(),
            "server started"
        );
        Ok(handle)
    }
}

/// Running server. Dropping it performs [`ServerHandle::shutdown`].
pub struct ServerHandle {
    local_addr: SocketAddr,
    cancel_addr: SocketAddr,
    cancellations: Arc<CancellationRegistry>,
    sessions: Arc<ActiveSessions>,
    pool: Arc<WorkerPool>,
    listeners: Vec<ListenerHandle>,
}

impl ServerHandle {
    /// Bound address of the command port.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Bound address of the cancellation port.
    #[must_use]
    pub const fn cancel_addr(&self) -> SocketAddr {
        self.cancel_addr
    }

    /// Number of sessions currently being served by a worker.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Registry of in-flight cancellable commands.
    #[must_use]
    pub fn cancellations(&self) -> &CancellationRegistry {
        &self.cancellations
    }

    /// Stops accepting, disconnects every session, and joins the workers.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Listener`] if an accept thread panicked. The
    /// remaining shutdown steps still run.
    pub fn shutdown(mut self) -> Result<(), ServerError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), ServerError> {
        for listener in &self.listeners {
            listener.shutdown();
        }
        let mut outcome = Ok(());
        for listener in self.listeners.drain(..) {
            if let Err(error) = listener.join() {
                outcome = Err(ServerError::Listener(error));
            }
        }
        self.sessions.disconnect_all();
        self.pool.shutdown();
        outcome
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            warn!(target: TRANSPORT_TARGET, error = %error, "server shutdown incomplete");
        }
    }
}

/// Hands accepted command connections to the worker pool.
struct SessionHandler {
    pool: Arc<WorkerPool>,
    context: SessionContext,
    sessions: Arc<ActiveSessions>,
}

impl ConnectionHandler for SessionHandler {
    fn handle(&self, stream: TcpStream, peer: SocketAddr) {
        let context = self.context.clone();
        let sessions = Arc::clone(&self.sessions);
        info!(
            target: TRANSPORT_TARGET,
            client = %client_ip(&peer),
            queued = self.pool.queued(),
            "connection accepted"
        );
        if let Err(error) = self
            .pool
            .submit(move || serve_connection(&context, &sessions, stream, peer))
        {
            warn!(
                target: TRANSPORT_TARGET,
                client = %client_ip(&peer),
                error = %error,
                "connection dropped"
            );
        }
    }
}

fn serve_connection(
    context: &SessionContext,
    sessions: &Arc<ActiveSessions>,
    stream: TcpStream,
    peer: SocketAddr,
) {
    let client = client_ip(&peer).to_string();
    let Some(_ticket) = ActiveSessions::register(sessions, &stream) else {
        debug!(target: SESSION_TARGET, %client, "server stopping; connection closed unserved");
        return;
    };
    let reader = match stream.try_clone() {
        Ok(reader) => reader,
        Err(error) => {
            warn!(target: SESSION_TARGET, %client, error = %error, "failed to clone session stream");
            return;
        }
    };
    Session::new(reader, stream, context.clone(), client).run();
}

#[derive(Default)]
struct SessionTable {
    next_key: u64,
    streams: HashMap<u64, TcpStream>,
    closed: bool,
}

/// Sockets of the sessions currently running, kept so shutdown can
/// disconnect them.
#[derive(Default)]
struct ActiveSessions {
    table: Mutex<SessionTable>,
}

impl ActiveSessions {
    /// Records a session's socket. Returns `None` once shutdown has begun or
    /// when the socket cannot be duplicated.
    fn register(sessions: &Arc<Self>, stream: &TcpStream) -> Option<SessionTicket> {
        let mut table = sessions.lock();
        if table.closed {
            return None;
        }
        let clone = stream.try_clone().ok()?;
        let key = table.next_key;
        table.next_key += 1;
        table.streams.insert(key, clone);
        Some(SessionTicket {
            sessions: Arc::clone(sessions),
            key,
        })
    }

    fn disconnect_all(&self) {
        let mut table = self.lock();
        table.closed = true;
        for stream in table.streams.values() {
            if let Err(error) = stream.shutdown(Shutdown::Both) {
                debug!(target: SESSION_TARGET, error = %error, "session socket already closed");
            }
        }
    }

    fn len(&self) -> usize {
        self.lock().streams.len()
    }

    fn lock(&self) -> MutexGuard<'_, SessionTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes its session from [`ActiveSessions`] when dropped.
struct SessionTicket {
    sessions: Arc<ActiveSessions>,
    key: u64,
}

impl Drop for SessionTicket {
    fn drop(&mut self) {
        self.sessions.lock().streams.remove(&self.key);
    }
}
