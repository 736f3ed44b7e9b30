//! Shared fixtures and builders for the integration tests.
#![allow(dead_code)]

use immucli::admin::CommandLine;
use immucli::client::{ClientFactory, ImmuClient, Options, RemoteClient};
use immucli::error::ClientError;
use immucli::metrics::MetricsStub;
use immucli::protocol::Index;
use immucli::seed::SeedContext;
use immucli::server::{BufconnServer, ServerOptions};
use immucli::testing::{HomedirServiceMock, ImmuClientMock, PasswordReaderMock, TerminalReaderMock};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Metrics document served by the stub, byte for byte.
pub const STATS_RESPONSE: &[u8] = include_bytes!("../fixtures/stats_response.txt");

/// Running auth-less, in-memory bufconn server.
pub fn bufconn_server() -> BufconnServer {
    let server = BufconnServer::new(ServerOptions::default().with_auth(false).with_in_memory_store(true));
    server.start().expect("bufconn server must start");
    server
}

/// Stub on an ephemeral port serving `STATS_RESPONSE`.
pub async fn metrics_stub() -> MetricsStub {
    MetricsStub::start("127.0.0.1:0", STATS_RESPONSE.to_vec())
        .await
        .expect("metrics stub must bind")
}

/// Options dialing `server`, scraping `stub` if given.
pub fn options_for(server: &BufconnServer, stub: Option<&MetricsStub>) -> Options {
    let mut options = Options::default()
        .with_address("127.0.0.1")
        .with_dialer(server.dialer());
    if let Some(stub) = stub {
        options = options.with_metrics_port(stub.local_addr().port());
    }
    options
}

/// `CommandLine` over a real `RemoteClient` and mocked I/O.
pub fn admin_harness(options: Options) -> (CommandLine, HomedirServiceMock) {
    let homedir = HomedirServiceMock::new();
    let client = RemoteClient::new(options.clone());
    let cl = CommandLine::new(options, Arc::new(client))
        .with_password_reader(Arc::new(PasswordReaderMock::new("immudb")))
        .with_terminal_reader(Arc::new(TerminalReaderMock::new("Y")))
        .with_homedir(Arc::new(homedir.clone()));
    (cl, homedir)
}

/// Key/value pairs written through a recording mock. Owned by one test.
pub type SeedData = Arc<Mutex<BTreeMap<String, String>>>;

/// Mock whose `set` records into a fresh map and hands out increasing indexes.
pub fn recording_client() -> (ImmuClientMock, SeedData) {
    let data: SeedData = Arc::new(Mutex::new(BTreeMap::new()));
    let sink = Arc::clone(&data);
    let mock = ImmuClientMock::new().on_set(move |key, value| {
        let mut data = sink.lock();
        let index = data.len() as u64;
        data.insert(
            String::from_utf8_lossy(key).into_owned(),
            String::from_utf8_lossy(value).into_owned(),
        );
        Ok(Index { index })
    });
    (mock, data)
}

pub fn factory_for(mock: ImmuClientMock) -> ClientFactory {
    Arc::new(move |_: &Options| {
        let client: Arc<dyn ImmuClient> = Arc::new(mock.clone());
        Ok(client)
    })
}

pub fn failing_factory(message: &'static str) -> ClientFactory {
    Arc::new(move |_: &Options| Err(ClientError::Other(message.to_string())))
}

/// Seed context with mocked I/O answering `answer` to the confirmation.
pub fn seed_context(factory: ClientFactory, answer: &str) -> (SeedContext, HomedirServiceMock) {
    let homedir = HomedirServiceMock::new();
    let options = Options::default().with_database("defaultdb").with_username("immudb");
    let ctx = SeedContext::new(options, factory)
        .with_password_reader(Arc::new(PasswordReaderMock::default()))
        .with_terminal_reader(Arc::new(TerminalReaderMock::new(answer)))
        .with_homedir(Arc::new(homedir.clone()));
    (ctx, homedir)
}
