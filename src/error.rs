//! Error types
//!
//! One enum per layer: the networked client, the in-process server, and the
//! command-line front ends that sit on top of both.

use thiserror::Error;

/// RPC error codes shared by client and server.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const UNAUTHENTICATED: i32 = 16;
    pub const INVALID_CREDENTIALS: i32 = 17;
    pub const DATABASE_NOT_FOUND: i32 = 18;
    pub const DATABASE_EXISTS: i32 = 19;
}

/// Errors surfaced by an `ImmuClient` implementation.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("failed to dial {address}: {source}")]
    Dial {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode or decode message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("rpc error ({code}): {message}")]
    Rpc { code: i32, message: String },

    #[error("client is not connected")]
    NotConnected,

    #[error("invalid response from server")]
    InvalidResponse,

    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: &'static str, millis: u64 },

    #[error("{0}")]
    Other(String),
}

impl ClientError {
    /// RPC code carried by the error, if the server produced one.
    pub fn rpc_code(&self) -> Option<i32> {
        match self {
            ClientError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Errors raised inside the in-process server.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("database not found: {0}")]
    DatabaseNotFound(String),

    #[error("database already exists: {0}")]
    DatabaseExists(String),

    #[error("invalid user name or password")]
    InvalidCredentials,

    #[error("not logged in")]
    Unauthenticated,

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("server is not running")]
    NotRunning,

    #[error("no async runtime available to host the server")]
    NoRuntime,
}

impl ServerError {
    /// Wire code used when the error is returned to a client.
    pub fn code(&self) -> i32 {
        match self {
            ServerError::Storage(_)
            | ServerError::Codec(_)
            | ServerError::NotRunning
            | ServerError::NoRuntime => codes::INTERNAL_ERROR,
            ServerError::DatabaseNotFound(_) => codes::DATABASE_NOT_FOUND,
            ServerError::DatabaseExists(_) => codes::DATABASE_EXISTS,
            ServerError::InvalidCredentials => codes::INVALID_CREDENTIALS,
            ServerError::Unauthenticated => codes::UNAUTHENTICATED,
            ServerError::InvalidParams(_) => codes::INVALID_PARAMS,
            ServerError::MethodNotFound(_) => codes::METHOD_NOT_FOUND,
        }
    }
}

/// Errors returned by the `immuadmin` and `immutest` command handlers.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("Home directory error: {0}")]
    Homedir(String),

    #[error("Failed to get user input: {0}")]
    Input(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Usage(String),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Failed to write output: {0}")]
    Output(#[source] std::io::Error),

    #[error("seeding stopped after {written} entries: {source}")]
    SeedInterrupted {
        written: usize,
        #[source]
        source: ClientError,
    },
}

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self {
        CliError::ConfigError(err.to_string())
    }
}
