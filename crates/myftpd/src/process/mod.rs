//! Process entry point: configuration, telemetry, serving, and shutdown.

mod shutdown;

use thiserror::Error;
use tracing::info;

use myftp_config::Config;

use crate::server::{Server, ServerError};
use crate::telemetry::{self, TelemetryError};

pub use self::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Errors that stop the server process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Telemetry could not be initialised.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The server failed to start or stop cleanly.
    #[error("server failed: {source}")]
    Server {
        /// Underlying server error.
        #[source]
        source: ServerError,
    },
    /// Waiting for the shutdown signal failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
}

impl From<TelemetryError> for LaunchError {
    fn from(source: TelemetryError) -> Self {
        Self::Telemetry { source }
    }
}

impl From<ServerError> for LaunchError {
    fn from(source: ServerError) -> Self {
        Self::Server { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}

/// Serves `config` until `signal` fires, then shuts down.
///
/// # Errors
///
/// Returns [`LaunchError`] when telemetry, server startup, signal handling,
/// or shutdown fails. A failed signal wait still shuts the server down.
pub fn run_server(config: &Config, signal: &dyn ShutdownSignal) -> Result<(), LaunchError> {
    telemetry::initialise(config)?;
    let server = Server::bind(config)?.start()?;
    info!(
        target: PROCESS_TARGET,
        address = %server.local_addr(),
        cancel_address = %server.cancel_addr(),
        root = %config.root().display(),
        "myftp server listening"
    );
    let waited = signal.wait();
    info!(
        target: PROCESS_TARGET,
        active_sessions = server.active_sessions(),
        "shutting down"
    );
    server.shutdown()?;
    waited?;
    info!(target: PROCESS_TARGET, "shutdown complete");
    Ok(())
}
