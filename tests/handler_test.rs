use chrono::{TimeZone, Utc};
use rask_loki_handler::config::PUSH_PATH;
use rask_loki_handler::sender::PushRequest;
use rask_loki_handler::{
    FieldValue, HandlerConfig, LogRecord, LokiHandler, SerializationError, Severity,
    TransportError,
};
use serde_json::Value;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{basic_auth, header, method, path},
};

async fn mount_push(server: &MockServer, status: u16, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(PUSH_PATH))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn pushed(server: &MockServer) -> Vec<PushRequest> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}

fn line_json(request: &PushRequest, stream: usize) -> Value {
    serde_json::from_str(&request.streams[stream].values[0][1]).unwrap()
}

#[tokio::test]
async fn test_push_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PUSH_PATH))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let handler = LokiHandler::new(
        HandlerConfig::new(format!("{}/", server.uri()))
            .with_label("app", "shop")
            .with_label("shard", 3)
            .with_client_name("web-01"),
    )
    .unwrap();

    let record = LogRecord::new(Severity::Error, "checkout failed")
        .at(Utc.timestamp_opt(1_700_000_000, 5).unwrap())
        .with_channel("payments")
        .with_context("cart", 17);

    let delivery = handler.handle_one(record).await.unwrap();
    assert!(delivery.delivered());
    assert_eq!(delivery.outcome().unwrap().status_code, Some(204));

    let requests = server.received_requests().await.unwrap();
    let raw = &requests[0];
    assert_eq!(
        raw.headers.get("content-length").unwrap().to_str().unwrap(),
        raw.body.len().to_string()
    );
    assert!(raw.headers.get("x-scope-orgid").is_none());
    assert!(raw.headers.get("authorization").is_none());

    let request: PushRequest = serde_json::from_slice(&raw.body).unwrap();
    assert_eq!(request.streams.len(), 1);
    assert_eq!(request.streams[0].stream["app"], "shop");
    assert_eq!(request.streams[0].stream["shard"], "3");
    assert_eq!(request.streams[0].values[0][0], "1700000000000000005");

    let line = line_json(&request, 0);
    assert_eq!(line["message"], "checkout failed");
    assert_eq!(line["level"], "error");
    assert_eq!(line["channel"], "payments");
    assert_eq!(line["context"]["cart"], 17);
    assert_eq!(line["context"]["host"], "web-01");
}

#[tokio::test]
async fn test_tenant_header_and_field_on_every_line() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PUSH_PATH))
        .and(header("x-scope-orgid", "acme"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let handler =
        LokiHandler::new(HandlerConfig::new(server.uri()).with_tenant_id("acme")).unwrap();

    let delivery = handler
        .handle_batch(vec![
            LogRecord::new(Severity::Info, "one"),
            LogRecord::new(Severity::Info, "two").with_context("tenantId", "intruder"),
        ])
        .await
        .unwrap();
    assert!(delivery.delivered());

    let request = &pushed(&server).await[0];
    for stream in 0..2 {
        assert_eq!(line_json(request, stream)["context"]["tenantId"], "acme");
    }
}

#[tokio::test]
async fn test_basic_auth_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PUSH_PATH))
        .and(basic_auth("loki-user", "s3cret"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let handler = LokiHandler::new(
        HandlerConfig::new(server.uri()).with_basic_auth("loki-user", "s3cret"),
    )
    .unwrap();

    let delivery = handler
        .handle_one(LogRecord::new(Severity::Notice, "login"))
        .await
        .unwrap();
    assert!(delivery.delivered());
}

#[tokio::test]
async fn test_malformed_basic_auth_sends_no_credentials() {
    let server = MockServer::start().await;
    mount_push(&server, 204, 1).await;

    let mut config = HandlerConfig::new(server.uri());
    config.auth.basic = Some(vec!["only-a-user".to_string()]);
    let handler = LokiHandler::new(config).unwrap();
    assert!(handler.settings().basic_auth().is_none());

    handler
        .handle_one(LogRecord::new(Severity::Info, "anonymous"))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_reserved_transport_options_cannot_change_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PUSH_PATH))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let handler = LokiHandler::new(
        HandlerConfig::new(server.uri())
            .with_transport_option("CURLOPT_CUSTOMREQUEST", "GET")
            .with_transport_option("headers", vec!["Content-Type: text/plain"])
            .with_transport_option("body", "{}")
            .with_transport_option("capture_response", false),
    )
    .unwrap();

    let delivery = handler
        .handle_one(LogRecord::new(Severity::Info, "still a push"))
        .await
        .unwrap();
    assert!(delivery.delivered());

    let request = &pushed(&server).await[0];
    assert_eq!(line_json(request, 0)["message"], "still a push");
}

#[tokio::test]
async fn test_records_below_level_make_no_request() {
    let server = MockServer::start().await;
    mount_push(&server, 204, 0).await;

    let handler =
        LokiHandler::new(HandlerConfig::new(server.uri()).with_level(Severity::Warning)).unwrap();

    let delivery = handler
        .handle_one(LogRecord::new(Severity::Info, "too quiet"))
        .await
        .unwrap();
    assert!(delivery.is_filtered());

    let delivery = handler
        .handle_batch(vec![
            LogRecord::new(Severity::Debug, "a"),
            LogRecord::new(Severity::Notice, "b"),
        ])
        .await
        .unwrap();
    assert!(delivery.is_filtered());
}

#[tokio::test]
async fn test_batch_sends_only_accepted_records_in_one_request() {
    let server = MockServer::start().await;
    mount_push(&server, 204, 1).await;

    let handler =
        LokiHandler::new(HandlerConfig::new(server.uri()).with_level(Severity::Warning)).unwrap();

    let delivery = handler
        .handle_batch(vec![
            LogRecord::new(Severity::Error, "disk full"),
            LogRecord::new(Severity::Info, "heartbeat"),
            LogRecord::new(Severity::Critical, "db down").with_label("component", "db"),
        ])
        .await
        .unwrap();
    assert_eq!(delivery.outcome().unwrap().streams, 2);

    let request = &pushed(&server).await[0];
    assert_eq!(request.streams.len(), 2);
    assert_eq!(line_json(request, 0)["message"], "disk full");
    assert_eq!(line_json(request, 1)["message"], "db down");
    assert_eq!(request.streams[1].stream["component"], "db");
    assert!(!request.streams[0].stream.contains_key("component"));
}

#[tokio::test]
async fn test_unencodable_field_fails_before_any_request() {
    let server = MockServer::start().await;
    mount_push(&server, 204, 0).await;

    let handler = LokiHandler::new(HandlerConfig::new(server.uri())).unwrap();

    let err = handler
        .handle_batch(vec![
            LogRecord::new(Severity::Info, "fine"),
            LogRecord::new(Severity::Info, "broken").with_context("ratio", f64::NAN),
        ])
        .await
        .unwrap_err();

    match err {
        SerializationError::Line { stream, line, .. } => {
            assert_eq!(stream, 1);
            assert_eq!(line, 0);
        }
        other => panic!("Expected SerializationError::Line, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_reported_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PUSH_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("ingester unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let handler = LokiHandler::new(HandlerConfig::new(server.uri())).unwrap();
    let delivery = handler
        .handle_one(LogRecord::new(Severity::Error, "lost"))
        .await
        .unwrap();

    let outcome = delivery.outcome().unwrap();
    assert!(!outcome.delivered);
    assert_eq!(outcome.status_code, Some(500));
    assert_eq!(
        outcome.error,
        Some(TransportError::Status {
            status: 500,
            body: "ingester unavailable".to_string(),
        })
    );
}

#[tokio::test]
async fn test_unreachable_endpoint_is_reported_not_raised() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let handler =
        LokiHandler::new(HandlerConfig::new(format!("http://127.0.0.1:{port}"))).unwrap();

    let delivery = handler
        .handle_one(LogRecord::new(Severity::Alert, "nobody listening"))
        .await
        .unwrap();

    let outcome = delivery.outcome().unwrap();
    assert!(!outcome.delivered);
    assert_eq!(outcome.status_code, None);
    assert!(matches!(outcome.error, Some(TransportError::Connect(_))));

    // The handler stays usable after a failed push.
    let delivery = handler
        .handle_one(LogRecord::new(Severity::Alert, "still nobody"))
        .await
        .unwrap();
    assert!(!delivery.delivered());
}

#[tokio::test]
async fn test_timeout_option_bounds_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PUSH_PATH))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let handler = LokiHandler::new(
        HandlerConfig::new(server.uri()).with_transport_option("timeout_ms", 100),
    )
    .unwrap();

    let delivery = handler
        .handle_one(LogRecord::new(Severity::Info, "slow"))
        .await
        .unwrap();

    let outcome = delivery.outcome().unwrap();
    assert!(!outcome.delivered);
    assert!(matches!(outcome.error, Some(TransportError::Timeout(_))));
    assert!(outcome.latency < Duration::from_secs(2));
}

#[tokio::test]
async fn test_processor_output_is_what_gets_pushed() {
    let server = MockServer::start().await;
    mount_push(&server, 204, 1).await;

    let handler = LokiHandler::new(HandlerConfig::new(server.uri()))
        .unwrap()
        .with_processor(|record: LogRecord| record.with_context("request_id", "r-81"));

    handler
        .handle_one(LogRecord::new(Severity::Info, "processed"))
        .await
        .unwrap();

    let request = &pushed(&server).await[0];
    assert_eq!(
        line_json(request, 0)["context"]["request_id"],
        Value::from("r-81")
    );
}

#[tokio::test]
async fn test_global_context_and_record_context_merge() {
    let server = MockServer::start().await;
    mount_push(&server, 204, 1).await;

    let handler = LokiHandler::new(
        HandlerConfig::new(server.uri())
            .with_context("region", "eu-west-1")
            .with_context("release", "1.4.0")
            .with_client_name("web-01"),
    )
    .unwrap();

    handler
        .handle_one(
            LogRecord::new(Severity::Info, "deploy")
                .with_context("release", "1.5.0")
                .with_context("host", FieldValue::from("canary-7")),
        )
        .await
        .unwrap();

    let line = line_json(&pushed(&server).await[0], 0);
    assert_eq!(line["context"]["region"], "eu-west-1");
    assert_eq!(line["context"]["release"], "1.5.0");
    assert_eq!(line["context"]["host"], "canary-7");
}
