use std::sync::{Arc, Mutex};
use std::time::Duration;

use collector_engine::{LoadingSink, OpenAiRefiner, RefineError, RefineSettings, Refiner};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingLoadingSink {
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingLoadingSink {
    fn take(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl LoadingSink for RecordingLoadingSink {
    fn show_loading(&self) {
        self.events.lock().unwrap().push("show");
    }

    fn hide_loading(&self) {
        self.events.lock().unwrap().push("hide");
    }
}

fn settings_for(server: &MockServer) -> RefineSettings {
    RefineSettings {
        base_url: format!("{}/v1/chat/completions", server.uri()),
        request_timeout: Duration::from_secs(5),
        ..RefineSettings::new("sk-test")
    }
}

fn tool_call_response(arguments: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{
            "message": {
                "tool_calls": [{
                    "function": {
                        "name": "structure_content",
                        "arguments": arguments
                    }
                }]
            }
        }]
    }))
}

#[tokio::test]
async fn refine_converts_tool_call_arguments_to_markdown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_string_contains(
            "Refine the following markdown content based on this prompt: \\\"tighten\\\"",
        ))
        .and(body_string_contains("structure_content"))
        .respond_with(tool_call_response(
            r#"{"title":"T","content":[{"type":"paragraph","content":"p"}]}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let refiner = OpenAiRefiner::new(settings_for(&server)).expect("client");
    let sink = RecordingLoadingSink::default();
    let refined = refiner
        .refine("# raw", "tighten", &sink)
        .await
        .expect("refined markdown");

    assert_eq!(refined, "# T\n\np");
    assert_eq!(sink.take(), vec!["show", "hide"]);
}

#[tokio::test]
async fn refine_accepts_legacy_function_call_payloads() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "function_call": {
                        "name": "structure_content",
                        "arguments": r#"{"content":[{"type":"heading","level":2,"content":"H"}]}"#
                    }
                }
            }]
        })))
        .mount(&server)
        .await;

    let refiner = OpenAiRefiner::new(settings_for(&server)).expect("client");
    let refined = refiner
        .refine("# raw", "restructure", &collector_engine::NoopLoadingSink)
        .await
        .expect("refined markdown");
    assert_eq!(refined, "## H");
}

#[tokio::test]
async fn refine_falls_back_to_plain_message_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "just markdown" } }]
        })))
        .mount(&server)
        .await;

    let refiner = OpenAiRefiner::new(settings_for(&server)).expect("client");
    let refined = refiner
        .refine("# raw", "restructure", &collector_engine::NoopLoadingSink)
        .await
        .expect("refined markdown");
    assert_eq!(refined, "just markdown");
}

#[tokio::test]
async fn response_without_any_payload_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": {} }]
        })))
        .mount(&server)
        .await;

    let refiner = OpenAiRefiner::new(settings_for(&server)).expect("client");
    let err = refiner
        .refine("# raw", "restructure", &collector_engine::NoopLoadingSink)
        .await
        .unwrap_err();
    assert!(matches!(err, RefineError::MalformedResponse));
}

#[tokio::test]
async fn unparseable_tool_arguments_are_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(tool_call_response("not json at all"))
        .mount(&server)
        .await;

    let refiner = OpenAiRefiner::new(settings_for(&server)).expect("client");
    let err = refiner
        .refine("# raw", "restructure", &collector_engine::NoopLoadingSink)
        .await
        .unwrap_err();
    assert!(matches!(err, RefineError::MalformedResponse));
}

#[tokio::test]
async fn unauthorized_status_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided" }
        })))
        .mount(&server)
        .await;

    let refiner = OpenAiRefiner::new(settings_for(&server)).expect("client");
    let sink = RecordingLoadingSink::default();
    let err = refiner.refine("# raw", "restructure", &sink).await.unwrap_err();
    assert!(matches!(err, RefineError::Auth));
    // The spinner is hidden again even when the call fails.
    assert_eq!(sink.take(), vec!["show", "hide"]);
}

#[tokio::test]
async fn other_non_success_statuses_carry_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "Rate limit reached" }
        })))
        .mount(&server)
        .await;

    let refiner = OpenAiRefiner::new(settings_for(&server)).expect("client");
    let err = refiner
        .refine("# raw", "restructure", &collector_engine::NoopLoadingSink)
        .await
        .unwrap_err();
    match err {
        RefineError::RateOrServer { status, message } => {
            assert_eq!(status, 429);
            assert_eq!(message, "Rate limit reached");
        }
        other => panic!("expected RateOrServer, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_a_connection_error() {
    let settings = RefineSettings {
        base_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
        request_timeout: Duration::from_secs(2),
        ..RefineSettings::new("sk-test")
    };
    let refiner = OpenAiRefiner::new(settings).expect("client");
    let err = refiner
        .refine("# raw", "restructure", &collector_engine::NoopLoadingSink)
        .await
        .unwrap_err();
    assert!(matches!(err, RefineError::Connection(_)));
}
