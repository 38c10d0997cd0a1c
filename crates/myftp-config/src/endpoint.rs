use std::fmt;

/// Host and port pair a listener binds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenEndpoint {
    host: String,
    port: u16,
}

impl ListenEndpoint {
    /// Builds an endpoint from its parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or literal address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port; `0` asks the OS for an ephemeral port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ListenEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(formatter, "tcp://[{}]:{}", self.host, self.port)
        } else {
            write!(formatter, "tcp://{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_ipv4_endpoint() {
        assert_eq!(
            ListenEndpoint::new("127.0.0.1", 8080).to_string(),
            "tcp://127.0.0.1:8080"
        );
    }

    #[test]
    fn display_ipv6_endpoint_brackets_host() {
        assert_eq!(ListenEndpoint::new("::", 8081).to_string(), "tcp://[::]:8081");
    }
}
