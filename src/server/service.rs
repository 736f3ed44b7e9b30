//! Request dispatch for the in-process server.

use super::store::{KvStore, MemoryStore, SledStore};
use super::ServerOptions;
use crate::error::{codes, ServerError};
use crate::protocol::{
    methods, Database, HealthResponse, Index, Item, Key, KeyValue, LoginParams, LoginResponse,
    Request, Response, UseDatabaseReply,
};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Live sessions kept per user; a further login evicts the oldest.
pub const MAX_SESSIONS_PER_USER: usize = 8;

const DEFAULT_PASSWORD_WARNING: &str =
    "default password in use, change it before exposing the server";

#[derive(Debug, Clone)]
struct Session {
    user: String,
    database: String,
    /// Issue order, set by `issue_token`
    issued: u64,
}

/// Handles decoded requests against a `KvStore`.
///
/// Sessions live only as long as the service. Each login or database switch
/// issues a fresh token.
pub struct ImmuService {
    options: ServerOptions,
    store: Arc<dyn KvStore>,
    sessions: RwLock<HashMap<String, Session>>,
    token_counter: AtomicU64,
}

impl ImmuService {
    /// Open the configured backend and make sure the default database exists.
    pub fn new(options: ServerOptions) -> Result<Self, ServerError> {
        let store: Arc<dyn KvStore> = if options.in_memory {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(SledStore::open(&options.dir)?)
        };
        Self::with_store(options, store)
    }

    pub fn with_store(options: ServerOptions, store: Arc<dyn KvStore>) -> Result<Self, ServerError> {
        if !store.database_exists(&options.default_database)? {
            store.create_database(&options.default_database)?;
        }
        Ok(Self {
            options,
            store,
            sessions: RwLock::new(HashMap::new()),
            token_counter: AtomicU64::new(0),
        })
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn store(&self) -> Arc<dyn KvStore> {
        Arc::clone(&self.store)
    }

    /// Dispatch one request. Failures become error responses with the same id.
    pub fn handle(&self, request: Request) -> Response {
        let id = request.id;
        debug!(id, method = %request.method, "Handling request");
        match self.dispatch(&request) {
            Ok(result) => Response::success(id, result),
            Err(e) => {
                debug!(id, method = %request.method, error = %e, "Request failed");
                Response::error(id, e.code(), e.to_string())
            }
        }
    }

    /// Reply for a line that could not be decoded as a request.
    pub fn parse_error(message: impl Into<String>) -> Response {
        Response::error(0, codes::PARSE_ERROR, message)
    }

    fn dispatch(&self, request: &Request) -> Result<Value, ServerError> {
        let token = request.token.as_deref();
        match request.method.as_str() {
            methods::HEALTH => to_value(HealthResponse {
                status: true,
                version: env!("CARGO_PKG_VERSION").to_string(),
            }),
            methods::LOGIN => to_value(self.login(params(request)?)?),
            methods::LOGOUT => {
                self.logout(token)?;
                Ok(Value::Object(Default::default()))
            }
            methods::USE_DATABASE => to_value(self.use_database(token, params(request)?)?),
            methods::CREATE_DATABASE => {
                let database: Database = params(request)?;
                self.session(token)?;
                self.store.create_database(&database.name)?;
                info!(database = %database.name, "Database created");
                Ok(Value::Object(Default::default()))
            }
            methods::SET => {
                let kv: KeyValue = params(request)?;
                let session = self.session(token)?;
                let index = self.store.set(&session.database, &kv.key, &kv.value)?;
                to_value(Index { index })
            }
            methods::GET => {
                let key: Key = params(request)?;
                let session = self.session(token)?;
                let entry = self
                    .store
                    .get(&session.database, &key.key)?
                    .ok_or_else(|| ServerError::InvalidParams(format!("key not found: {}", hex::encode(&key.key))))?;
                to_value(Item {
                    key: key.key,
                    value: entry.value,
                    index: entry.index,
                })
            }
            other => Err(ServerError::MethodNotFound(other.to_string())),
        }
    }

    fn login(&self, params: LoginParams) -> Result<LoginResponse, ServerError> {
        if params.user != self.options.admin_user
            || params.password != self.options.admin_password.as_bytes()
        {
            return Err(ServerError::InvalidCredentials);
        }
        self.evict_oldest_sessions(&params.user);
        let token = self.issue_token(Session {
            user: params.user,
            database: self.options.default_database.clone(),
            issued: 0,
        });
        let warning = (self.options.admin_password == "immudb")
            .then(|| DEFAULT_PASSWORD_WARNING.to_string());
        Ok(LoginResponse { token, warning })
    }

    fn logout(&self, token: Option<&str>) -> Result<(), ServerError> {
        match token {
            Some(token) => {
                if self.sessions.write().remove(token).is_none() && self.options.auth {
                    return Err(ServerError::Unauthenticated);
                }
                Ok(())
            }
            None if self.options.auth => Err(ServerError::Unauthenticated),
            None => Ok(()),
        }
    }

    fn use_database(
        &self,
        token: Option<&str>,
        database: Database,
    ) -> Result<UseDatabaseReply, ServerError> {
        let session = self.session(token)?;
        if !self.store.database_exists(&database.name)? {
            return Err(ServerError::DatabaseNotFound(database.name));
        }
        if let Some(old) = token {
            self.sessions.write().remove(old);
        }
        let token = self.issue_token(Session {
            user: session.user,
            database: database.name,
            issued: 0,
        });
        Ok(UseDatabaseReply { token })
    }

    /// Session bound to `token`. Without auth, a missing or unknown token
    /// falls back to an anonymous session on the default database.
    fn session(&self, token: Option<&str>) -> Result<Session, ServerError> {
        if let Some(session) = token.and_then(|t| self.sessions.read().get(t).cloned()) {
            return Ok(session);
        }
        if self.options.auth {
            return Err(ServerError::Unauthenticated);
        }
        Ok(Session {
            user: String::new(),
            database: self.options.default_database.clone(),
            issued: 0,
        })
    }

    /// Make room for one more session of `user`.
    fn evict_oldest_sessions(&self, user: &str) {
        let mut sessions = self.sessions.write();
        let mut owned: Vec<(u64, String)> = sessions
            .iter()
            .filter(|(_, session)| session.user == user)
            .map(|(token, session)| (session.issued, token.clone()))
            .collect();
        if owned.len() < MAX_SESSIONS_PER_USER {
            return;
        }
        owned.sort_unstable();
        let excess = owned.len() + 1 - MAX_SESSIONS_PER_USER;
        for (_, token) in owned.into_iter().take(excess) {
            sessions.remove(&token);
        }
        debug!(user, evicted = excess, "Evicted oldest sessions");
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    fn issue_token(&self, mut session: Session) -> String {
        session.issued = self.token_counter.fetch_add(1, Ordering::SeqCst);
        let mut hasher = blake3::Hasher::new();
        hasher.update(session.user.as_bytes());
        hasher.update(session.database.as_bytes());
        hasher.update(&session.issued.to_le_bytes());
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        hasher.update(&nanos.to_le_bytes());
        let token = hex::encode(hasher.finalize().as_bytes());
        self.sessions.write().insert(token.clone(), session);
        token
    }
}

fn params<T: DeserializeOwned>(request: &Request) -> Result<T, ServerError> {
    let value = request
        .params
        .clone()
        .ok_or_else(|| ServerError::InvalidParams("missing params".to_string()))?;
    serde_json::from_value(value).map_err(|e| ServerError::InvalidParams(e.to_string()))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, ServerError> {
    serde_json::to_value(value).map_err(|e| ServerError::InvalidParams(e.to_string()))
}
