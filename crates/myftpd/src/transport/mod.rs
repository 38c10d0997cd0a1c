//! TCP listeners for the command port and the cancellation side-channel.
//!
//! Each listener binds a dual-stack socket and accepts connections on a
//! background thread, handing every accepted stream to a
//! [`ConnectionHandler`].

mod errors;
mod handler;
mod listener;
mod peer;

pub use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, read_with_retry};
pub(crate) use self::listener::{ListenerHandle, SocketListener};
pub(crate) use self::peer::client_ip;

pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
