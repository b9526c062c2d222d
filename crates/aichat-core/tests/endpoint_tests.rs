use std::sync::Arc;

use aichat_core::{
    ChatMessage, ChatSession, EndpointClient, Generator, RequestFailed, FALLBACK_MESSAGE,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> EndpointClient {
    EndpointClient::new(&format!("{}/generate", server.uri()))
}

#[tokio::test]
async fn test_client_keeps_configured_url() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    assert_eq!(client.url(), format!("{}/generate", server.uri()));
    assert_eq!(client.clone().url(), client.url());
}

#[tokio::test]
async fn test_posts_prompt_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "prompt": "capital of France" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "Paris" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let text = client.generate("capital of France").await.unwrap();
    assert_eq!(text, "Paris");
}

#[tokio::test]
async fn test_extra_fields_are_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "text": "ok", "model": "x" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.generate("hi").await.unwrap(), "ok");
}

#[tokio::test]
async fn test_non_success_status_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "text": "oops" })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.generate("hi").await.unwrap_err();
    assert!(matches!(err, RequestFailed::Status(s) if s.as_u16() == 500));
}

#[tokio::test]
async fn test_missing_text_field_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": "Paris" })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.generate("hi").await.unwrap_err();
    assert!(matches!(err, RequestFailed::Malformed(_)));
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.generate("hi").await.unwrap_err();
    assert!(matches!(err, RequestFailed::Malformed(_)));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Start and drop a server to get a port nobody is listening on
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let client = EndpointClient::new(&format!("{}/generate", uri));
    let err = client.generate("hi").await.unwrap_err();
    assert!(matches!(err, RequestFailed::Transport(_)));
}

#[tokio::test]
async fn test_session_over_http_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({ "prompt": "capital of France" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "Paris" })))
        .mount(&server)
        .await;

    let mut session = ChatSession::new(Arc::new(client_for(&server)));
    session.set_draft("capital of France");

    assert!(session.submit_draft().await);
    assert_eq!(session.messages().last(), Some(&ChatMessage::answer("Paris")));
    assert_eq!(session.draft(), "");
    assert!(!session.is_awaiting_response());
}

#[tokio::test]
async fn test_session_over_http_failure_shows_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut session = ChatSession::new(Arc::new(client_for(&server)));

    assert!(session.submit("anything").await);
    assert_eq!(
        session.messages(),
        &[
            ChatMessage::question("anything"),
            ChatMessage::answer(FALLBACK_MESSAGE),
        ]
    );
    assert!(!session.is_awaiting_response());
}
