//! Client Layer
//!
//! `ImmuClient` is the seam every command talks through. `RemoteClient` speaks
//! the line protocol over whatever `Dialer` the options carry; tests substitute
//! `crate::testing::ImmuClientMock` or point the dialer at a `BufconnServer`.

pub mod dialer;
pub mod options;
pub mod remote;

use crate::error::ClientError;
use crate::protocol::{Database, HealthResponse, Index, Item, LoginResponse, UseDatabaseReply};
use async_trait::async_trait;
use std::sync::Arc;

pub use dialer::{Connection, Dialer, TcpDialer};
pub use options::Options;
pub use remote::RemoteClient;

/// Operations the admin and seeding tools need from a database client.
#[async_trait]
pub trait ImmuClient: Send + Sync {
    /// Options the client was built with.
    fn options(&self) -> Options;

    async fn health_check(&self) -> Result<HealthResponse, ClientError>;

    async fn login(&self, user: &[u8], password: &[u8]) -> Result<LoginResponse, ClientError>;

    async fn logout(&self) -> Result<(), ClientError>;

    async fn use_database(&self, database: &Database) -> Result<UseDatabaseReply, ClientError>;

    async fn set(&self, key: &[u8], value: &[u8]) -> Result<Index, ClientError>;

    async fn get(&self, key: &[u8]) -> Result<Item, ClientError>;

    async fn disconnect(&self) -> Result<(), ClientError>;
}

/// Builds a client from options. Construction errors are reported unchanged.
pub type ClientFactory =
    Arc<dyn Fn(&Options) -> Result<Arc<dyn ImmuClient>, ClientError> + Send + Sync>;

/// Factory producing `RemoteClient`s.
pub fn remote_client_factory() -> ClientFactory {
    Arc::new(|options: &Options| {
        let client: Arc<dyn ImmuClient> = Arc::new(RemoteClient::new(options.clone()));
        Ok(client)
    })
}
