use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tincan_provider::config::ConfigSource;
use tincan_provider::domain::{Actor, LearningObject, Statement, StatementResult, Verb};
use tincan_provider::outbound::tincan::TincanProvider;

mod utils;
use utils::spawn_mock_lrs;

fn config_for(url: &str) -> Arc<dyn ConfigSource> {
    let map: HashMap<String, String> = [
        ("lrs.tincanapi.url", url),
        ("lrs.tincanapi.basicAuthUserPass", "user:pass"),
        ("lrs.tincanapi.request.timeout", "2000"),
        ("lrs.inverse.functional.identifier", "mbox"),
        ("server.url", "https://lms.example.edu"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    Arc::new(map)
}

fn statement() -> Statement {
    Statement::new(
        Actor::agent()
            .with_name("Learner One")
            .with_mbox("mailto:learner@example.edu"),
        Verb::new("http://adlnet.gov/expapi/verbs/completed").with_display("en-US", "completed"),
        LearningObject::new("https://lms.example.edu/activities/quiz-1"),
    )
    .with_result(StatementResult {
        completion: Some(true),
        duration_seconds: 90,
        raw: Some(87.5),
        ..StatementResult::default()
    })
}

#[test]
fn delivers_mapped_statement_with_fixed_and_auth_headers() {
    // One self-test POST at initialize, one statement POST
    let (url, mock) = spawn_mock_lrs(2, 200, "OK", "{}");

    let provider = TincanProvider::new("tincanapi", config_for(&url));
    provider.initialize().expect("initialize");
    provider.handle_statement(&statement());
    provider.shutdown();

    let requests = mock.join().expect("mock thread");
    assert_eq!(requests.len(), 2);

    let delivery = &requests[1];
    assert_eq!(delivery.header("Content-Type"), Some("application/json"));
    assert_eq!(delivery.header("X-Experience-API-Version"), Some("1.0.0"));
    // base64("user:pass"), standard alphabet
    assert_eq!(delivery.header("Authorization"), Some("Basic dXNlcjpwYXNz"));

    let document: Value = serde_json::from_str(&delivery.body).expect("delivery body is JSON");
    assert_eq!(
        document["actor"]["mbox"],
        Value::String("mailto:learner@example.edu".into())
    );
    assert_eq!(
        document["verb"]["id"],
        Value::String("http://adlnet.gov/expapi/verbs/completed".into())
    );
    assert_eq!(
        document["object"]["objectType"],
        Value::String("Activity".into())
    );
    assert_eq!(document["result"]["duration"], Value::String("PT90S".into()));
}

#[test]
fn self_test_statement_is_posted_at_initialize() {
    let (url, mock) = spawn_mock_lrs(1, 200, "OK", "{}");

    let provider = TincanProvider::new("tincanapi", config_for(&url));
    provider.initialize().expect("initialize");

    let requests = mock.join().expect("mock thread");
    let probe: Value = serde_json::from_str(&requests[0].body).expect("self-test body is JSON");
    assert_eq!(
        probe["verb"]["id"],
        Value::String("http://adlnet.gov/expapi/verbs/interacted".into())
    );
}

#[test]
fn created_201_is_classified_as_success() {
    let (url, mock) = spawn_mock_lrs(2, 201, "Created", "{}");

    let provider = TincanProvider::new("tincanapi", config_for(&url));
    provider.initialize().expect("initialize");
    provider.handle_statement(&statement());

    let requests = mock.join().expect("mock thread");
    assert_eq!(requests.len(), 2);
}

#[test]
fn not_found_and_server_error_do_not_propagate() {
    for (status, reason) in [(404u16, "Not Found"), (500u16, "Internal Server Error")] {
        let (url, mock) = spawn_mock_lrs(2, status, reason, r#"{"error":"nope"}"#);

        let provider = TincanProvider::new("tincanapi", config_for(&url));
        provider.initialize().expect("initialize");
        // Undelivered, logged as a warning, and no error escapes
        provider.handle_statement(&statement());

        let requests = mock.join().expect("mock thread");
        assert_eq!(requests.len(), 2, "status {status}");
    }
}

#[test]
fn raw_json_statement_is_delivered_verbatim() {
    let (url, mock) = spawn_mock_lrs(2, 200, "OK", "{}");

    let provider = TincanProvider::new("tincanapi", config_for(&url));
    provider.initialize().expect("initialize");

    let raw = r#"{"actor":{"mbox":"mailto:raw@example.edu"},"verb":{"id":"http://adlnet.gov/expapi/verbs/attempted"},"object":{"id":"https://lms.example.edu/activities/quiz-9"}}"#;
    provider.handle_statement(&Statement {
        raw_json: Some(raw.to_string()),
        ..Statement::default()
    });

    let requests = mock.join().expect("mock thread");
    assert_eq!(requests[1].body, raw);
}

#[test]
fn raw_map_statement_takes_priority_over_raw_json() {
    let (url, mock) = spawn_mock_lrs(2, 200, "OK", "{}");

    let provider = TincanProvider::new("tincanapi", config_for(&url));
    provider.initialize().expect("initialize");

    let mut raw_map = serde_json::Map::new();
    raw_map.insert("id".to_string(), Value::String("from-map".into()));

    provider.handle_statement(&Statement {
        raw_map: Some(raw_map),
        raw_json: Some(r#"{"id":"from-json"}"#.to_string()),
        ..Statement::default()
    });

    let requests = mock.join().expect("mock thread");
    let body: Value = serde_json::from_str(&requests[1].body).expect("body is JSON");
    assert_eq!(body["id"], Value::String("from-map".into()));
}

#[test]
fn oauth_mode_recomputes_authorization_per_request() {
    let (url, mock) = spawn_mock_lrs(3, 200, "OK", "{}");

    let map: HashMap<String, String> = [
        ("lrs.tincanapi.url", url.as_str()),
        ("lrs.tincanapi.consumer.key", "consumer-key"),
        ("lrs.tincanapi.consumer.secret", "consumer-secret"),
        ("lrs.tincanapi.realm", "ExampleRealm"),
        ("lrs.tincanapi.request.timeout", "2000"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let provider = TincanProvider::new("tincanapi", Arc::new(map));
    provider.initialize().expect("initialize");
    provider.handle_statement(&statement());
    provider.handle_statement(&statement());

    let requests = mock.join().expect("mock thread");
    let auth: Vec<&str> = requests
        .iter()
        .map(|r| r.header("Authorization").expect("authorization header"))
        .collect();

    for header in &auth {
        assert!(header.starts_with("OAuth realm=\"ExampleRealm\""), "{header}");
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
    }
    // Fresh nonce per request: no two headers may match
    assert_ne!(auth[1], auth[2]);
}
