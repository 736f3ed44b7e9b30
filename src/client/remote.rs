//! Networked client speaking the line protocol.

use super::{ImmuClient, Options};
use crate::client::dialer::Connection;
use crate::error::ClientError;
use crate::protocol::{
    methods, Database, HealthResponse, Index, Item, Key, KeyValue, LoginParams, LoginResponse,
    Request, Response, UseDatabaseReply,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, warn};

struct Session {
    conn: Option<BufReader<Box<dyn Connection>>>,
    token: Option<String>,
}

/// Client that dials lazily on the first call and keeps one connection open.
///
/// Calls are serialised over that connection. A transport failure drops the
/// connection; the next call dials again.
pub struct RemoteClient {
    options: Options,
    next_id: AtomicU64,
    session: Mutex<Session>,
}

impl RemoteClient {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            next_id: AtomicU64::new(1),
            session: Mutex::new(Session {
                conn: None,
                token: None,
            }),
        }
    }

    /// Start with a token obtained earlier, e.g. read back from the token file.
    pub fn with_token(self, token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            session: Mutex::new(Session {
                conn: None,
                token: Some(token),
            }),
            ..self
        }
    }

    /// Token currently attached to requests.
    pub async fn token(&self) -> Option<String> {
        self.session.lock().await.token.clone()
    }

    async fn dial(&self) -> Result<BufReader<Box<dyn Connection>>, ClientError> {
        let address = self.options.bind_address();
        let dialer = self.options.effective_dialer();
        let timeout = self.options.dial_timeout();
        debug!(address = %address, "Dialing server");
        let conn = tokio::time::timeout(timeout, dialer.dial(&address))
            .await
            .map_err(|_| ClientError::Timeout {
                operation: "dial",
                millis: self.options.dial_timeout_ms,
            })?
            .map_err(|source| ClientError::Dial {
                address: address.clone(),
                source,
            })?;
        Ok(BufReader::new(conn))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, ClientError> {
        let mut session = self.session.lock().await;
        if session.conn.is_none() {
            session.conn = Some(self.dial().await?);
        }

        let request = Request::new(
            self.next_id.fetch_add(1, Ordering::SeqCst),
            method,
            params,
            session.token.clone(),
        );
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');

        let conn = session.conn.as_mut().ok_or(ClientError::NotConnected)?;
        let exchange = async {
            conn.get_mut().write_all(line.as_bytes()).await?;
            conn.get_mut().flush().await?;
            let mut response_line = String::new();
            let read = conn.read_line(&mut response_line).await?;
            Ok::<_, std::io::Error>((read, response_line))
        };

        let outcome = tokio::time::timeout(self.options.request_timeout(), exchange).await;
        let (read, response_line) = match outcome {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                warn!(method, error = %e, "Connection failed, dropping it");
                session.conn = None;
                return Err(ClientError::Io(e));
            }
            Err(_) => {
                session.conn = None;
                return Err(ClientError::Timeout {
                    operation: "request",
                    millis: self.options.request_timeout_ms,
                });
            }
        };
        if read == 0 {
            session.conn = None;
            return Err(ClientError::NotConnected);
        }

        let response: Response = match serde_json::from_str(&response_line) {
            Ok(response) => response,
            Err(e) => {
                warn!(method, error = %e, "Undecodable response, dropping connection");
                session.conn = None;
                return Err(ClientError::Serialization(e));
            }
        };
        if response.id != request.id {
            session.conn = None;
            return Err(ClientError::InvalidResponse);
        }
        if let Some(error) = response.error {
            return Err(ClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        let result = response.result.ok_or(ClientError::InvalidResponse)?;
        Ok(serde_json::from_value(result)?)
    }

    async fn set_token(&self, token: Option<String>) {
        self.session.lock().await.token = token;
    }
}

#[async_trait]
impl ImmuClient for RemoteClient {
    fn options(&self) -> Options {
        self.options.clone()
    }

    async fn health_check(&self) -> Result<HealthResponse, ClientError> {
        self.call(methods::HEALTH, None).await
    }

    async fn login(&self, user: &[u8], password: &[u8]) -> Result<LoginResponse, ClientError> {
        let params = LoginParams {
            user: String::from_utf8_lossy(user).into_owned(),
            password: password.to_vec(),
        };
        let response: LoginResponse = self
            .call(methods::LOGIN, Some(serde_json::to_value(params)?))
            .await?;
        self.set_token(Some(response.token.clone())).await;
        Ok(response)
    }

    async fn logout(&self) -> Result<(), ClientError> {
        let _: Value = self.call(methods::LOGOUT, None).await?;
        self.set_token(None).await;
        Ok(())
    }

    async fn use_database(&self, database: &Database) -> Result<UseDatabaseReply, ClientError> {
        let reply: UseDatabaseReply = self
            .call(methods::USE_DATABASE, Some(serde_json::to_value(database)?))
            .await?;
        self.set_token(Some(reply.token.clone())).await;
        Ok(reply)
    }

    async fn set(&self, key: &[u8], value: &[u8]) -> Result<Index, ClientError> {
        let params = KeyValue {
            key: key.to_vec(),
            value: value.to_vec(),
        };
        self.call(methods::SET, Some(serde_json::to_value(params)?))
            .await
    }

    async fn get(&self, key: &[u8]) -> Result<Item, ClientError> {
        let params = Key { key: key.to_vec() };
        self.call(methods::GET, Some(serde_json::to_value(params)?))
            .await
    }

    async fn disconnect(&self) -> Result<(), ClientError> {
        let mut session = self.session.lock().await;
        let conn = session.conn.take().ok_or(ClientError::NotConnected)?;
        let mut stream = conn.into_inner();
        if let Err(e) = stream.shutdown().await {
            debug!(error = %e, "Ignoring shutdown error on disconnect");
        }
        Ok(())
    }
}
