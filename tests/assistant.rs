use complaint_hub::assistant::{describe_complaint, AssistantError, GeminiAssistant, NoopAssistant, USER_FACING_FAILURE};
use complaint_hub::error::{ApiError, ValidationError};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/gemini-test:generateContent";

#[tokio::test]
async fn drafts_description_from_keywords() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_string_contains("projector in room 2 broken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "\n  Dear Sir/Madam, the projector is broken.  \n" }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let assistant = GeminiAssistant::new(server.uri(), "gemini-test", "test-key");
    let text = describe_complaint(&assistant, "  projector in room 2 broken ").await.unwrap();
    assert_eq!(text, "Dear Sir/Madam, the projector is broken.");
}

#[tokio::test]
async fn empty_keywords_never_reach_the_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let assistant = GeminiAssistant::new(server.uri(), "gemini-test", "test-key");
    let err = describe_complaint(&assistant, "   ").await.unwrap_err();
    assert!(matches!(err, AssistantError::Validation(ValidationError::EmptyKeywords)));
    let api: ApiError = err.into();
    assert!(matches!(api, ApiError::BadRequest(_)));
}

#[tokio::test]
async fn upstream_failures_map_to_the_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let assistant = GeminiAssistant::new(server.uri(), "gemini-test", "test-key");
    let err = describe_complaint(&assistant, "wifi down").await.unwrap_err();
    assert!(matches!(err, AssistantError::Upstream(503)));
    let api: ApiError = err.into();
    assert_eq!(api.to_string(), USER_FACING_FAILURE);
}

#[tokio::test]
async fn empty_candidates_are_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let assistant = GeminiAssistant::new(server.uri(), "gemini-test", "test-key");
    assert!(matches!(describe_complaint(&assistant, "wifi down").await, Err(AssistantError::EmptyResponse)));
}

#[tokio::test]
async fn noop_assistant_reports_not_configured() {
    let err = describe_complaint(&NoopAssistant, "anything").await.unwrap_err();
    assert!(matches!(err, AssistantError::NotConfigured));
}
