//! Uses the single integration test approach.
//!
//! This improves parallelism when running the tests, and reduces the number of binaries that have to be built (and linked)

mod auth;
mod persistence;
mod provisioning;

use devicehub_client::api::{ApiClient, Method};
use devicehub_client::config::ApiConfig;
use devicehub_common::{ApiEnvelope, EnvelopeStatus, SYNTHESIZED_ERROR_CODE};
use serde_json::{Value, json};
use std::sync::Arc;

use common::{MockApi, RecordingBridge};

fn api_client(base_url: &str, bridge: Arc<RecordingBridge>) -> ApiClient {
    ApiClient::new(
        &ApiConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
        },
        bridge,
    )
    .expect("client should build")
}

#[tokio::test]
async fn test_every_call_logs_request_and_response() {
    let mock = MockApi::start().await;
    let bridge = Arc::new(RecordingBridge::default());
    let client = api_client(&mock.base_url, Arc::clone(&bridge));

    let body = json!({ "email": "a@b.com", "password": "hunter2" });
    let envelope: ApiEnvelope<Value> = client
        .request(Method::POST, "/login", Some(&body), None)
        .await;
    assert_eq!(envelope.status, EnvelopeStatus::Success);

    let lines = bridge.lines();
    assert_eq!(lines.len(), 2, "expected one request and one response line: {lines:?}");
    assert!(lines[0].starts_with("API Request: POST"), "{}", lines[0]);
    assert!(!lines[0].contains("hunter2"), "password leaked into log");
    assert!(lines[1].starts_with("API Response: 201"), "{}", lines[1]);
}

#[tokio::test]
async fn test_bearer_token_is_sent_and_redacted_in_logs() {
    let mock = MockApi::start().await;
    let bridge = Arc::new(RecordingBridge::default());
    let client = api_client(&mock.base_url, Arc::clone(&bridge));

    let token = secrecy::SecretString::from("super-secret-token");
    drop::<ApiEnvelope<Value>>(
        client
            .request(Method::POST, "/devices/", Some(&json!({})), Some(&token))
            .await,
    );

    let request = mock.request_to("/devices/").expect("request not recorded");
    assert_eq!(
        request.authorization.as_deref(),
        Some("Bearer super-secret-token")
    );
    assert!(
        bridge.lines().iter().all(|l| !l.contains("super-secret-token")),
        "token leaked into log"
    );
}

#[tokio::test]
async fn test_transport_error_yields_synthesized_envelope() {
    // Bind and drop a listener so nothing accepts on the port
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let bridge = Arc::new(RecordingBridge::default());
    let client = api_client(&format!("http://127.0.0.1:{port}"), Arc::clone(&bridge));

    let envelope: ApiEnvelope<Value> = client.request(Method::POST, "/login", None, None).await;
    assert_eq!(envelope.status, EnvelopeStatus::Error);
    assert_eq!(envelope.code, SYNTHESIZED_ERROR_CODE);
    assert!(!envelope.msg.is_empty(), "transport error message missing");
    assert!(envelope.data.is_none());
    assert!(
        bridge.lines().iter().any(|l| l.starts_with("API Response Error")),
        "transport error not logged"
    );
}

#[tokio::test]
async fn test_non_envelope_error_body_uses_status_message() {
    let mock = MockApi::start().await;
    mock.respond_with("/login", 503, json!("maintenance"));
    let client = api_client(&mock.base_url, Arc::new(RecordingBridge::default()));

    let envelope: ApiEnvelope<Value> = client.request(Method::POST, "/login", None, None).await;
    assert_eq!(envelope.code, SYNTHESIZED_ERROR_CODE);
    assert_eq!(envelope.msg, "Request failed with status code 503");
}
