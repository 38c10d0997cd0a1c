use std::num::NonZeroUsize;
use std::thread;

/// Default bind host. `::` accepts IPv4 and IPv6 clients on a dual-stack socket.
pub const DEFAULT_HOST: &str = "::";

/// Default port for the command listener.
pub const DEFAULT_PORT: u16 = 8080;

/// Default port for the cancellation side-channel.
pub const DEFAULT_CANCEL_PORT: u16 = 8081;

/// Default directory served to clients.
pub const DEFAULT_ROOT: &str = ".";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

/// Worker count used when none is configured: host-visible parallelism,
/// never less than one.
#[must_use]
pub fn default_worker_count() -> NonZeroUsize {
    thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}
