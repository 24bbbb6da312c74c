//! `CompletionsClient` against a wiremock chat completion endpoint.

use std::time::Duration;

use wiremock::matchers::{bearer_token, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use logtriage_llm::{
    ChatMessage, ChatRequest, CompletionsClient, LlmProviderConfig, Provider, ProviderError,
    RetryConfig, RetryPolicy,
};

const MODEL: &str = "llama-3.1-8b-instant";

fn client(server: &MockServer, timeout_secs: u64) -> CompletionsClient {
    let config = LlmProviderConfig {
        name: "mock".into(),
        base_url: server.uri(),
        api_key_env: "LOGTRIAGE_MOCK_UNSET_KEY".into(),
        timeout_secs: Some(timeout_secs),
    };
    CompletionsClient::with_api_key(config, "gsk-mock".into())
}

fn classify_request() -> ChatRequest {
    ChatRequest::new(
        MODEL,
        vec![ChatMessage::user(
            "Case escalation for ticket ID 7324 failed because the assigned support agent is no longer active.",
        )],
    )
}

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "id": "chatcmpl-1",
        "model": MODEL,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 61, "completion_tokens": 3, "total_tokens": 64}
    }))
}

async fn endpoint(server: &MockServer, response: ResponseTemplate, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn sends_bearer_and_model_and_reads_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(bearer_token("gsk-mock"))
        .and(body_partial_json(serde_json::json!({ "model": MODEL })))
        .respond_with(completion("Workflow Error"))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server, 5).complete(&classify_request()).await.unwrap();
    assert_eq!(reply.first_text(), Some("Workflow Error"));
    assert_eq!(reply.usage.map(|u| u.total_tokens), Some(64));
}

#[tokio::test]
async fn missing_key_never_reaches_the_server() {
    let server = MockServer::start().await;
    endpoint(&server, completion("Workflow Error"), 0).await;

    let config = LlmProviderConfig {
        name: "mock".into(),
        base_url: server.uri(),
        api_key_env: "LOGTRIAGE_MOCK_UNSET_KEY".into(),
        timeout_secs: Some(5),
    };
    let err = CompletionsClient::new(config)
        .complete(&classify_request())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::NotConfigured(_)));
}

#[tokio::test]
async fn rejected_key_is_auth_failure() {
    let server = MockServer::start().await;
    endpoint(
        &server,
        ResponseTemplate::new(401)
            .set_body_json(serde_json::json!({"error": {"message": "Invalid API Key"}})),
        1,
    )
    .await;

    let err = client(&server, 5).complete(&classify_request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::AuthFailed(ref d) if d == "Invalid API Key"));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn rate_limit_reads_retry_after_header() {
    let server = MockServer::start().await;
    endpoint(
        &server,
        ResponseTemplate::new(429).insert_header("retry-after", "2"),
        1,
    )
    .await;

    match client(&server, 5).complete(&classify_request()).await.unwrap_err() {
        ProviderError::RateLimited { retry_after_ms } => assert_eq!(retry_after_ms, 2000),
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn unparseable_body_is_invalid_response() {
    let server = MockServer::start().await;
    endpoint(&server, ResponseTemplate::new(200).set_body_string("<html>gateway</html>"), 1).await;

    let err = client(&server, 5).complete(&classify_request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidResponse(_)), "got {err:?}");
}

#[tokio::test]
async fn slow_reply_times_out() {
    let server = MockServer::start().await;
    endpoint(&server, completion("Workflow Error").set_delay(Duration::from_secs(3)), 1).await;

    let err = client(&server, 1).complete(&classify_request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Timeout), "got {err:?}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn one_retry_recovers_from_overload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("over capacity"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    endpoint(&server, completion("Deprecation Warning"), 1).await;

    let policy = RetryPolicy::new(
        client(&server, 5),
        RetryConfig {
            max_retries: 1,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter_fraction: 0.0,
        },
    );
    let reply = policy.complete(&classify_request()).await.unwrap();
    assert_eq!(reply.first_text(), Some("Deprecation Warning"));
}

#[tokio::test]
async fn bad_request_is_not_retried() {
    let server = MockServer::start().await;
    endpoint(
        &server,
        ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "context too long"})),
        1,
    )
    .await;

    let policy = RetryPolicy::new(client(&server, 5), RetryConfig::default());
    let err = policy.complete(&classify_request()).await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 400: context too long");
}
