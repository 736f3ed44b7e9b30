//! Client connection options.

use super::dialer::{Dialer, TcpDialer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3322
}

fn default_metrics_port() -> u16 {
    9497
}

fn default_database() -> String {
    "defaultdb".to_string()
}

fn default_username() -> String {
    "immudb".to_string()
}

fn default_dial_timeout_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_token_file() -> String {
    ".immuadmin_token".to_string()
}

/// Connection configuration for a client.
///
/// `dialer` overrides the transport; `None` means plain TCP. It is never read
/// from or written to configuration files.
#[derive(Clone, Serialize, Deserialize)]
pub struct Options {
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Port of the server's HTTP metrics endpoint
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_dial_timeout_ms")]
    pub dial_timeout_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Name of the token file inside the user's home directory
    #[serde(default = "default_token_file")]
    pub token_file: String,

    #[serde(skip)]
    pub dialer: Option<Arc<dyn Dialer>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            metrics_port: default_metrics_port(),
            database: default_database(),
            username: default_username(),
            dial_timeout_ms: default_dial_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            token_file: default_token_file(),
            dialer: None,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("metrics_port", &self.metrics_port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("dial_timeout_ms", &self.dial_timeout_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("token_file", &self.token_file)
            .field("custom_dialer", &self.dialer.is_some())
            .finish()
    }
}

impl Options {
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = port;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_token_file(mut self, token_file: impl Into<String>) -> Self {
        self.token_file = token_file.into();
        self
    }

    pub fn with_dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = Some(dialer);
        self
    }

    /// `host:port` of the database endpoint.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// URL scraped by the `stats` command.
    pub fn metrics_url(&self) -> String {
        format!("http://{}:{}/metrics", self.address, self.metrics_port)
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Configured dialer, or TCP.
    pub fn effective_dialer(&self) -> Arc<dyn Dialer> {
        self.dialer
            .clone()
            .unwrap_or_else(|| Arc::new(TcpDialer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.bind_address(), "127.0.0.1:3322");
        assert_eq!(options.metrics_url(), "http://127.0.0.1:9497/metrics");
        assert_eq!(options.database, "defaultdb");
        assert_eq!(options.username, "immudb");
        assert!(options.dialer.is_none());
    }

    #[test]
    fn test_builders() {
        let options = Options::default()
            .with_address("10.0.0.5")
            .with_port(4000)
            .with_metrics_port(9000)
            .with_database("sales");
        assert_eq!(options.bind_address(), "10.0.0.5:4000");
        assert_eq!(options.metrics_url(), "http://10.0.0.5:9000/metrics");
        assert_eq!(options.database, "sales");
    }

    #[test]
    fn test_debug_hides_dialer_internals() {
        let options = Options::default().with_dialer(Arc::new(TcpDialer));
        let rendered = format!("{:?}", options);
        assert!(rendered.contains("custom_dialer: true"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let options: Options = toml::from_str("port = 4242\n").unwrap();
        assert_eq!(options.port, 4242);
        assert_eq!(options.address, "127.0.0.1");
        assert_eq!(options.token_file, ".immuadmin_token");
    }
}
