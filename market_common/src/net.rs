//! Shared networking defaults used by client and server.

/// Host the client connects to when none is configured.
pub const DEFAULT_HOST: &str = "localhost";
/// Address the server binds when none is configured.
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
/// TCP port of the market data server.
pub const DEFAULT_PORT: u16 = 9999;
/// Payload encoding both peers must agree on.
pub const DEFAULT_MIME_TYPE: &str = "application/json";

/// Helper to format a host and port like "host:port".
pub fn addr(host: &str, port: u16) -> String {
    format!("{}:{}", host, port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_host_and_port() {
        assert_eq!(addr(DEFAULT_HOST, DEFAULT_PORT), "localhost:9999");
    }
}
