//! In-process Server
//!
//! A small key/value server used to exercise clients end to end without a
//! real deployment. The same connection handler serves in-memory "bufconn"
//! streams and TCP sockets.

pub mod bufconn;
pub mod connection;
pub mod service;
pub mod store;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use bufconn::{BufconnDialer, BufconnServer};
pub use connection::{serve_connection, serve_tcp};
pub use service::ImmuService;
pub use store::{KvStore, MemoryStore, SledStore, StoredEntry};

fn default_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_database() -> String {
    "defaultdb".to_string()
}

fn default_admin_user() -> String {
    "immudb".to_string()
}

/// Server policy flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerOptions {
    /// Require login before data operations
    #[serde(default = "default_true")]
    pub auth: bool,

    /// Keep data in memory instead of a sled database under `dir`
    #[serde(default)]
    pub in_memory: bool,

    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_database")]
    pub default_database: String,

    #[serde(default = "default_admin_user")]
    pub admin_user: String,

    #[serde(default = "default_admin_user")]
    pub admin_password: String,
}

fn default_true() -> bool {
    true
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            auth: true,
            in_memory: false,
            dir: default_dir(),
            default_database: default_database(),
            admin_user: default_admin_user(),
            admin_password: default_admin_user(),
        }
    }
}

impl ServerOptions {
    pub fn with_auth(mut self, auth: bool) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_in_memory_store(mut self, in_memory: bool) -> Self {
        self.in_memory = in_memory;
        self
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn with_admin_password(mut self, password: impl Into<String>) -> Self {
        self.admin_password = password.into();
        self
    }
}
