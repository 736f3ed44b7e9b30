use crate::client::{ImmuClient, Options};
use crate::error::ClientError;
use crate::protocol::{Database, HealthResponse, Index, Item, LoginResponse, UseDatabaseReply};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

type HealthFn = Arc<dyn Fn() -> Result<HealthResponse, ClientError> + Send + Sync>;
type LoginFn = Arc<dyn Fn(&[u8], &[u8]) -> Result<LoginResponse, ClientError> + Send + Sync>;
type LogoutFn = Arc<dyn Fn() -> Result<(), ClientError> + Send + Sync>;
type UseDatabaseFn = Arc<dyn Fn(&Database) -> Result<UseDatabaseReply, ClientError> + Send + Sync>;
type SetFn = Arc<dyn Fn(&[u8], &[u8]) -> Result<Index, ClientError> + Send + Sync>;
type GetFn = Arc<dyn Fn(&[u8]) -> Result<Item, ClientError> + Send + Sync>;
type DisconnectFn = Arc<dyn Fn() -> Result<(), ClientError> + Send + Sync>;

/// Scriptable `ImmuClient`.
///
/// Every operation delegates to a replaceable function. Unconfigured
/// operations succeed with a fixed reply (`set` always answers index 0).
/// Calls are recorded by operation name.
///
/// ```ignore
/// let writes = Arc::new(Mutex::new(BTreeMap::new()));
/// let sink = Arc::clone(&writes);
/// let mock = ImmuClientMock::new().on_set(move |key, value| {
///     sink.lock().insert(key.to_vec(), value.to_vec());
///     Ok(Index { index: 0 })
/// });
/// ```
#[derive(Clone)]
pub struct ImmuClientMock {
    options: Options,
    health_check_f: HealthFn,
    login_f: LoginFn,
    logout_f: LogoutFn,
    use_database_f: UseDatabaseFn,
    set_f: SetFn,
    get_f: GetFn,
    disconnect_f: DisconnectFn,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl Default for ImmuClientMock {
    fn default() -> Self {
        Self::new()
    }
}

impl ImmuClientMock {
    pub fn new() -> Self {
        Self {
            options: Options::default(),
            health_check_f: Arc::new(|| {
                Ok(HealthResponse {
                    status: true,
                    version: "mock".to_string(),
                })
            }),
            login_f: Arc::new(|_: &[u8], _: &[u8]| {
                Ok(LoginResponse {
                    token: "token".to_string(),
                    warning: None,
                })
            }),
            logout_f: Arc::new(|| Ok(())),
            use_database_f: Arc::new(|_: &Database| {
                Ok(UseDatabaseReply {
                    token: "token".to_string(),
                })
            }),
            set_f: Arc::new(|_: &[u8], _: &[u8]| Ok(Index { index: 0 })),
            get_f: Arc::new(|key: &[u8]| {
                Ok(Item {
                    key: key.to_vec(),
                    value: Vec::new(),
                    index: 0,
                })
            }),
            disconnect_f: Arc::new(|| Ok(())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Options returned by `ImmuClient::options`.
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn on_health_check<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<HealthResponse, ClientError> + Send + Sync + 'static,
    {
        self.health_check_f = Arc::new(f);
        self
    }

    pub fn on_login<F>(mut self, f: F) -> Self
    where
        F: Fn(&[u8], &[u8]) -> Result<LoginResponse, ClientError> + Send + Sync + 'static,
    {
        self.login_f = Arc::new(f);
        self
    }

    pub fn on_logout<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<(), ClientError> + Send + Sync + 'static,
    {
        self.logout_f = Arc::new(f);
        self
    }

    pub fn on_use_database<F>(mut self, f: F) -> Self
    where
        F: Fn(&Database) -> Result<UseDatabaseReply, ClientError> + Send + Sync + 'static,
    {
        self.use_database_f = Arc::new(f);
        self
    }

    pub fn on_set<F>(mut self, f: F) -> Self
    where
        F: Fn(&[u8], &[u8]) -> Result<Index, ClientError> + Send + Sync + 'static,
    {
        self.set_f = Arc::new(f);
        self
    }

    pub fn on_get<F>(mut self, f: F) -> Self
    where
        F: Fn(&[u8]) -> Result<Item, ClientError> + Send + Sync + 'static,
    {
        self.get_f = Arc::new(f);
        self
    }

    pub fn on_disconnect<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<(), ClientError> + Send + Sync + 'static,
    {
        self.disconnect_f = Arc::new(f);
        self
    }

    /// Operation names in call order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls.lock().iter().filter(|c| **c == operation).count()
    }

    fn record(&self, operation: &'static str) {
        self.calls.lock().push(operation);
    }
}

#[async_trait]
impl ImmuClient for ImmuClientMock {
    fn options(&self) -> Options {
        self.record("options");
        self.options.clone()
    }

    async fn health_check(&self) -> Result<HealthResponse, ClientError> {
        self.record("health_check");
        (self.health_check_f)()
    }

    async fn login(&self, user: &[u8], password: &[u8]) -> Result<LoginResponse, ClientError> {
        self.record("login");
        (self.login_f)(user, password)
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.record("logout");
        (self.logout_f)()
    }

    async fn use_database(&self, database: &Database) -> Result<UseDatabaseReply, ClientError> {
        self.record("use_database");
        (self.use_database_f)(database)
    }

    async fn set(&self, key: &[u8], value: &[u8]) -> Result<Index, ClientError> {
        self.record("set");
        (self.set_f)(key, value)
    }

    async fn get(&self, key: &[u8]) -> Result<Item, ClientError> {
        self.record("get");
        (self.get_f)(key)
    }

    async fn disconnect(&self) -> Result<(), ClientError> {
        self.record("disconnect");
        (self.disconnect_f)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_defaults_succeed() {
        let mock = ImmuClientMock::new();
        assert!(mock.health_check().await.unwrap().status);
        assert_eq!(mock.login(b"u", b"p").await.unwrap().token, "token");
        assert_eq!(mock.set(b"k", b"v").await.unwrap().index, 0);
        mock.disconnect().await.unwrap();
        assert_eq!(mock.calls(), vec!["health_check", "login", "set", "disconnect"]);
    }

    #[tokio::test]
    async fn test_closures_capture_test_state() {
        let data = Arc::new(Mutex::new(BTreeMap::new()));
        let sink = Arc::clone(&data);
        let mock = ImmuClientMock::new().on_set(move |key, value| {
            let mut data = sink.lock();
            data.insert(key.to_vec(), value.to_vec());
            Ok(Index {
                index: data.len() as u64 - 1,
            })
        });

        assert_eq!(mock.set(b"a", b"1").await.unwrap().index, 0);
        assert_eq!(mock.set(b"b", b"2").await.unwrap().index, 1);
        assert_eq!(data.lock().len(), 2);
        assert_eq!(mock.call_count("set"), 2);
    }

    #[tokio::test]
    async fn test_clones_share_call_log() {
        let mock = ImmuClientMock::new()
            .on_login(|_, _| Err(ClientError::Other("denied".to_string())));
        let clone = mock.clone();
        assert!(clone.login(b"u", b"p").await.is_err());
        assert_eq!(mock.call_count("login"), 1);
    }
}
