//! HTTP tests for chat and conversation memory.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;
use server_core::kernel::{MockAI, TestDependencies};

const SITE: &str = "https://example.com/";

#[tokio::test]
async fn root_and_health() {
    let app = TestApp::new(TestDependencies::new());

    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("<h1>🚀 Server running</h1>"));

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["status"], "in_memory");
}

#[tokio::test]
async fn chat_answers_and_saves_the_exchange() {
    let ai = MockAI::new().with_response("Cookies are small files stored by your browser.");
    let app = TestApp::new(TestDependencies::new().mock_ai(ai));

    let (status, body) = app
        .post(
            "/chat",
            json!({"question": "What are cookies?", "session_id": "s1", "user_id": "u1"}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Cookies are small files stored by your browser.");
    assert_eq!(body["status"], "success");
    assert_eq!(body["session_id"], "s1");
    assert_eq!(body["user_id"], "u1");

    let conversation = app.deps.conversations.get("s1", Some("u1")).await.unwrap().unwrap();
    assert_eq!(conversation.title, "What are cookies?");
    assert_eq!(conversation.messages.len(), 2);
}

#[tokio::test]
async fn chat_uses_stored_history() {
    let ai = MockAI::new()
        .with_response("Cookies are small files.")
        .with_response("You asked what cookies are.");
    let app = TestApp::new(TestDependencies::new().mock_ai(ai.clone()));

    app.post("/chat", json!({"question": "What are cookies?", "session_id": "s1"}))
        .await;
    let (_, body) = app
        .post(
            "/chat",
            json!({"question": "What was the last question?", "session_id": "s1"}),
        )
        .await;

    assert_eq!(body["response"], "You asked what cookies are.");
    // system + two stored messages + the new question
    assert_eq!(ai.calls()[1].messages.len(), 4);
}

#[tokio::test]
async fn chat_on_unindexed_site_reports_scraping() {
    let app = TestApp::new(TestDependencies::new());

    let (status, body) = app
        .post(
            "/chat",
            json!({
                "question": "Do they sell my data?",
                "session_id": "s1",
                "current_url": "http://127.0.0.1:9"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["response"]
        .as_str()
        .unwrap()
        .starts_with("I'm currently analyzing this website's documents."));
    assert_eq!(body["current_url"], "http://127.0.0.1:9/");
}

#[tokio::test]
async fn chat_saves_site_named_in_the_question() {
    let ai = MockAI::new().with_response("Answer about the other site.");
    let app = TestApp::new(TestDependencies::new().mock_ai(ai).with_site(SITE, true, None));

    let (status, body) = app
        .post(
            "/chat",
            json!({
                "question": "What does https://other.org say about cookies?",
                "session_id": "s1",
                "current_url": SITE
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_url"], "https://other.org/");
    let conversation = app.deps.conversations.get("s1", None).await.unwrap().unwrap();
    assert_eq!(conversation.url.as_deref(), Some("https://other.org/"));
}

#[tokio::test]
async fn chat_rejects_empty_question() {
    let app = TestApp::new(TestDependencies::new());

    let (status, body) = app
        .post("/chat", json!({"question": "   ", "session_id": "s1"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "question must not be empty");
}

#[tokio::test]
async fn chat_refuses_another_users_session() {
    let app = TestApp::new(TestDependencies::new());
    app.deps
        .conversations
        .save_exchange("s1", "q", "a", Some("owner"), None)
        .await
        .unwrap();

    let (status, _) = app
        .post(
            "/chat",
            json!({"question": "hello", "session_id": "s1", "user_id": "intruder"}),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn conversations_list_get_and_delete() {
    let app = TestApp::new(TestDependencies::new().with_site(SITE, true, None));
    let store = app.deps.conversations.clone();
    store
        .save_exchange("s1", "Do they share data with advertisers?", "Yes.", Some("u1"), Some(SITE))
        .await
        .unwrap();
    store
        .save_exchange("s1", "Can I delete my account?", "Yes, from settings.", Some("u1"), None)
        .await
        .unwrap();

    let (status, body) = app.post("/conversations", json!({"user_id": "u1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], "s1");
    assert_eq!(body[0]["session_id"], "s1");
    assert_eq!(body[0]["title"], "Do they share data with advertisers?");
    assert_eq!(body[0]["time"], "Just now");
    assert_eq!(body[0]["message_count"], 4);

    let (_, body) = app.post("/conversations", json!({"user_id": "nobody"})).await;
    assert_eq!(body, json!([]));

    let (status, body) = app.get("/conversation/s1?user_id=u1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], SITE);
    assert_eq!(body["messages"][1]["role"], "assistant");

    let (status, _) = app.get("/conversation/s1?user_id=u2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.delete("/conversation/s1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Conversation deleted successfully");

    let (status, body) = app.delete("/conversation/s1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Conversation not found");
}
