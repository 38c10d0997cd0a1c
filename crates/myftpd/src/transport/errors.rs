//! Error types for socket listener operations.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced while binding or running a socket listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The configured host could not be resolved.
    #[error("failed to resolve TCP address {host}:{port}: {source}")]
    Resolve {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// Resolution succeeded but produced no address.
    #[error("no TCP addresses resolved for {host}:{port}")]
    ResolveEmpty {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },
    /// Creating or configuring the socket failed.
    #[error("failed to configure socket for {addr}: {source}")]
    Socket {
        /// Address the socket was meant for.
        addr: SocketAddr,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Binding the socket failed.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    BindTcp {
        /// Address that could not be bound.
        addr: SocketAddr,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Switching the socket to listening mode failed.
    #[error("failed to listen on {addr}: {source}")]
    Listen {
        /// Bound address.
        addr: SocketAddr,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The bound address could not be read back.
    #[error("failed to read listener address: {source}")]
    LocalAddr {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The listener could not be switched to non-blocking accepts.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The accept thread could not be spawned.
    #[error("failed to spawn listener thread: {source}")]
    ThreadSpawn {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The accept thread panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
}
