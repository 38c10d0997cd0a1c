//! Advisory cancellation of in-flight transfers.
//!
//! `get` and `put` register themselves in a [`CancellationRegistry`] for
//! their duration. A peer may connect to the cancellation port and name a
//! command identifier; a registered command has its liveness flag cleared
//! and its entry removed. Handlers do not poll the flag, so a cancelled
//! transfer still runs to completion.

mod listener;
mod registry;

pub(crate) use self::listener::CancelRequestHandler;
pub use self::registry::{CancellationRegistry, CommandGuard};

pub(crate) const CANCEL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::cancel");
