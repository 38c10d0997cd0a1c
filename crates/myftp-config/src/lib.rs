//! Shared configuration for the `myftp` server.
//!
//! Values are layered from three sources, highest precedence first:
//! command-line flags, `MYFTP_*` environment variables, and the built-in
//! defaults in [`defaults`]. The whole surface is a single `clap` parser so
//! that `--help` documents every environment variable next to its flag.

use std::ffi::OsString;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use clap::Parser;
use thiserror::Error;

mod defaults;
mod endpoint;
mod logging;

pub use defaults::{
    DEFAULT_CANCEL_PORT, DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_PORT, DEFAULT_ROOT,
    default_log_filter, default_log_format, default_worker_count,
};
pub use endpoint::ListenEndpoint;
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved server configuration.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "myftpserver",
    version,
    about = "Serves a working directory to myftp clients over TCP"
)]
pub struct Config {
    /// Port of the command listener.
    #[arg(value_name = "PORT", env = "MYFTP_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Host or address the listeners bind to.
    #[arg(long, env = "MYFTP_HOST", default_value = DEFAULT_HOST)]
    pub host: String,
    /// Port of the cancellation side-channel.
    #[arg(long, env = "MYFTP_CANCEL_PORT", default_value_t = DEFAULT_CANCEL_PORT)]
    pub cancel_port: u16,
    /// Number of session workers; `0` selects the host parallelism.
    #[arg(short, long, env = "MYFTP_WORKERS", default_value_t = 0)]
    pub workers: usize,
    /// Directory served to clients.
    #[arg(long, env = "MYFTP_ROOT", default_value = DEFAULT_ROOT)]
    pub root: PathBuf,
    /// Tracing filter expression (for example `info,myftpd::session=debug`).
    #[arg(long, env = "MYFTP_LOG_FILTER", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,
    /// Log output format: `json` or `compact`.
    #[arg(long, env = "MYFTP_LOG_FORMAT", default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: DEFAULT_HOST.to_owned(),
            cancel_port: DEFAULT_CANCEL_PORT,
            workers: 0,
            root: PathBuf::from(DEFAULT_ROOT),
            log_filter: default_log_filter().to_owned(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Cli`] when parsing fails or help/version output
    /// was requested.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration from an explicit argument list. The first item is
    /// the program name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Cli`] when parsing fails or help/version output
    /// was requested.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args).map_err(ConfigError::Cli)
    }

    /// Endpoint of the command listener.
    #[must_use]
    pub fn listen_endpoint(&self) -> ListenEndpoint {
        ListenEndpoint::new(self.host.clone(), self.port)
    }

    /// Endpoint of the cancellation listener.
    #[must_use]
    pub fn cancel_endpoint(&self) -> ListenEndpoint {
        ListenEndpoint::new(self.host.clone(), self.cancel_port)
    }

    /// Worker pool size with `0` resolved to the host parallelism.
    #[must_use]
    pub fn worker_count(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.workers).unwrap_or_else(default_worker_count)
    }

    /// Directory served to clients, as configured.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Argument or environment parsing failed, or help was requested.
    #[error("{0}")]
    Cli(#[source] clap::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_workers_are_kept() {
        let config = Config {
            workers: 3,
            ..Config::default()
        };
        assert_eq!(config.worker_count().get(), 3);
    }

    #[test]
    fn zero_workers_resolve_to_parallelism() {
        let config = Config::default();
        assert_eq!(config.worker_count(), default_worker_count());
    }

    #[test]
    fn endpoints_share_host() {
        let config = Config {
            host: "127.0.0.1".to_owned(),
            port: 2121,
            cancel_port: 2122,
            ..Config::default()
        };
        assert_eq!(config.listen_endpoint(), ListenEndpoint::new("127.0.0.1", 2121));
        assert_eq!(config.cancel_endpoint(), ListenEndpoint::new("127.0.0.1", 2122));
    }
}
