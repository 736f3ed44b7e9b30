mod support;

use immucli::client::{remote_client_factory, Options};
use immucli::error::{ClientError, CliError};
use immucli::seed;
use immucli::testing::ImmuClientMock;
use support::{bufconn_server, factory_for, failing_factory, recording_client, seed_context};

fn args(count: &str) -> Vec<String> {
    vec![count.to_string()]
}

#[tokio::test]
async fn seeds_requested_number_of_records() {
    let (mock, data) = recording_client();
    let (ctx, _) = seed_context(factory_for(mock.clone()), "Y");

    let summary = seed::execute(&ctx, &args("3"), &mut Vec::new()).await.unwrap();
    assert_eq!(summary.written, 3);
    assert_eq!(summary.last_index, Some(2));

    let data = data.lock();
    assert_eq!(data.len(), 3);
    assert_eq!(data.get("key0").map(String::as_str), Some("value0"));
    assert_eq!(data.get("key2").map(String::as_str), Some("value2"));
    assert_eq!(mock.call_count("login"), 1);
    assert_eq!(mock.call_count("use_database"), 1);
}

#[tokio::test]
async fn constructor_error_is_returned_unchanged() {
    let (ctx, homedir) = seed_context(failing_factory("some immuclient error"), "Y");

    let err = seed::execute(&ctx, &args("3"), &mut Vec::new()).await.unwrap_err();
    match err {
        CliError::Client(ClientError::Other(message)) => {
            assert_eq!(message, "some immuclient error")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(homedir.file_names().is_empty());
}

#[tokio::test]
async fn failing_constructor_after_successful_run_writes_nothing() {
    let (mock, data) = recording_client();
    let (ctx, _) = seed_context(factory_for(mock.clone()), "Y");
    seed::execute(&ctx, &args("3"), &mut Vec::new()).await.unwrap();
    assert_eq!(data.lock().len(), 3);
    assert_eq!(mock.call_count("set"), 3);

    let (ctx, homedir) = seed_context(failing_factory("some immuclient error"), "Y");
    let err = seed::execute(&ctx, &args("3"), &mut Vec::new()).await.unwrap_err();
    assert_eq!(err.to_string(), "some immuclient error");
    assert!(matches!(err, CliError::Client(ClientError::Other(_))));

    assert_eq!(data.lock().len(), 3);
    assert_eq!(mock.call_count("set"), 3);
    assert_eq!(mock.call_count("login"), 1);
    assert!(homedir.file_names().is_empty());
}

#[tokio::test]
async fn declined_confirmation_writes_nothing() {
    let (mock, data) = recording_client();
    let (ctx, _) = seed_context(factory_for(mock.clone()), "N");

    let mut out = Vec::new();
    let summary = seed::execute(&ctx, &args("3"), &mut out).await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.written, 0);
    assert!(data.lock().is_empty());
    assert_eq!(mock.call_count("disconnect"), 1);
    assert!(String::from_utf8(out).unwrap().contains("Canceled"));
}

#[tokio::test]
async fn invalid_count_does_nothing() {
    for bad in ["0", "-1", "three"] {
        let (mock, _) = recording_client();
        let (ctx, _) = seed_context(factory_for(mock.clone()), "Y");
        let err = seed::execute(&ctx, &args(bad), &mut Vec::new()).await.unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)), "count {bad}");
        assert!(mock.calls().is_empty());
    }
}

#[tokio::test]
async fn write_failure_stops_the_run() {
    let mock = ImmuClientMock::new().on_set(|key, _| {
        if key == b"key2" {
            Err(ClientError::Other("disk full".to_string()))
        } else {
            Ok(immucli::protocol::Index { index: 0 })
        }
    });
    let (ctx, _) = seed_context(factory_for(mock.clone()), "Y");

    let err = seed::execute(&ctx, &args("5"), &mut Vec::new()).await.unwrap_err();
    match err {
        CliError::SeedInterrupted { written, source } => {
            assert_eq!(written, 2);
            assert_eq!(source.to_string(), "disk full");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(mock.call_count("set"), 3);
    assert_eq!(mock.call_count("disconnect"), 1);
}

#[tokio::test]
async fn seeds_bufconn_server_end_to_end() {
    let server = bufconn_server();
    let (ctx, homedir) = seed_context(remote_client_factory(), "Y");
    let ctx = seed::SeedContext {
        options: Options::default().with_dialer(server.dialer()),
        ..ctx
    };
    let ctx = ctx.with_password_reader(std::sync::Arc::new(
        immucli::testing::PasswordReaderMock::new("immudb"),
    ));

    let summary = seed::execute(&ctx, &args("4"), &mut Vec::new()).await.unwrap();
    assert_eq!(summary.written, 4);
    assert_eq!(summary.last_index, Some(3));
    assert!(homedir.content(".immuadmin_token").is_some());

    let service = server.service().unwrap();
    let entry = service.store().get("defaultdb", b"key3").unwrap().unwrap();
    assert_eq!(entry.value, b"value3".to_vec());
}
