//! Server side of the `myftp` remote filesystem service.
//!
//! The server exposes one directory over TCP. Each accepted connection
//! becomes a session that runs on a worker from a fixed-size pool, so the
//! pool size bounds how many clients are served at once; further
//! connections wait in the pool's queue. A session speaks the line protocol
//! defined in [`myftp_protocol`], switching to raw byte streams for `get` and
//! `put`.
//!
//! A second port accepts advisory cancellation requests naming a running
//! transfer by identifier. Cancellation clears the transfer's entry in the
//! [`CancellationRegistry`] but does not interrupt it.
//!
//! [`process::run_server`] is the binary's entry point; [`Server`] can also
//! be embedded directly, which the integration tests do.

mod cancel;
mod dispatch;
mod gateway;
mod pool;
pub mod process;
mod server;
mod session;
pub mod telemetry;
mod transport;

pub use cancel::{CancellationRegistry, CommandGuard};
pub use dispatch::{Command, CommandError, CommandKind, CommandRegistry, Target};
pub use gateway::{DirEntry, FilesystemGateway, LocalFilesystem};
pub use pool::{PoolError, WorkerPool};
pub use server::{Server, ServerError, ServerHandle};
pub use session::SessionError;
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;
