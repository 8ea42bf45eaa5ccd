//! HTTP routes exercised in-process with `tower::ServiceExt::oneshot`.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use cbr_agents::api::ApiServer;
use cbr_agents::domain::models::{Config, MOCK_AGENT, MOCK_THREAD};
use cbr_agents::infrastructure::runtime::Operation;
use cbr_agents::services::AppContext;
use common::{context, online_config, runtime};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn router(ctx: &AppContext) -> Router {
    ApiServer::new(ctx.orchestrator(), ctx.config().server.clone()).router()
}

async fn offline_router() -> Router {
    let ctx = AppContext::with_runtime(Config::default(), None).await.unwrap();
    router(&ctx)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = offline_router().await.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "cbr-agents");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_offline_chat_returns_mock_result() {
    let response = offline_router()
        .await
        .oneshot(post_json(
            "/api/v1/chat",
            &json!({"message": "Wat kost het examen?", "session_id": "web-1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["degraded"], true);
    assert_eq!(body["agent_used"], MOCK_AGENT);
    assert_eq!(body["thread_id"], MOCK_THREAD);
    assert_eq!(body["session_id"], "web-1");
    assert_eq!(body["intent"], "pricing");
}

#[tokio::test]
async fn test_empty_message_is_validation_error() {
    let response = offline_router()
        .await
        .oneshot(post_json("/api/v1/chat", &json!({"message": "   "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_unknown_agent_is_validation_error() {
    let app = offline_router().await;

    let response = app
        .clone()
        .oneshot(post_json("/api/v1/chat/planner", &json!({"message": "hoi"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "validation_error");

    let response = app
        .oneshot(post_json(
            "/api/v1/chat",
            &json!({"message": "hoi", "agent": "planner"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "validation_error");
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"message\": "))
        .unwrap();

    let response = offline_router().await.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test(start_paused = true)]
async fn test_chat_with_agent_override() {
    let runtime = runtime();
    let ctx = context(online_config(), &runtime).await;

    let response = router(&ctx)
        .oneshot(post_json(
            "/api/v1/chat/agent2",
            &json!({"message": "Wanneer is er plek?", "session_id": "web-2"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["agent_used"], "booking");
    assert!(body.get("intent").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_session_then_history() {
    let runtime = runtime();
    let ctx = context(online_config(), &runtime).await;
    let app = router(&ctx);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/sessions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = json_body(response).await;
    let session_id = session["session_id"].as_str().unwrap().to_string();
    let thread_id = session["thread_id"].as_str().unwrap().to_string();
    assert!(session_id.starts_with("session_"));

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/chat",
            &json!({"message": "Hoe lang duurt het rijexamen?", "session_id": session_id}),
        ))
        .await
        .unwrap();
    let chat = json_body(response).await;
    assert_eq!(chat["thread_id"], thread_id.as_str());

    let response = app
        .oneshot(get(&format!("/api/v1/history/{thread_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let history = json_body(response).await;
    assert_eq!(history["thread_id"], thread_id.as_str());
    // Question, routing reply, specialist answer
    assert_eq!(history["total_messages"], 3);
    assert_eq!(history["messages"][0]["role"], "user");
}

#[tokio::test]
async fn test_history_of_unknown_thread_is_bad_gateway() {
    let runtime = runtime();
    let ctx = context(online_config(), &runtime).await;

    let response = router(&ctx)
        .oneshot(get("/api/v1/history/thread_missing"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["error"], "runtime_error");
}

#[tokio::test]
async fn test_status_lists_agents() {
    let runtime = runtime();
    let ctx = context(online_config(), &runtime).await;

    let response = router(&ctx).oneshot(get("/api/v1/status")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "online");
    assert_eq!(body["agents"]["orchestrator"]["status"], "online");
    assert_eq!(body["agents"]["search"]["model"], "gpt-4o");
    assert_eq!(body["active_sessions"], 0);
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/chat")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = offline_router().await.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:3000"
    );
}

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn open_session(app: &Router) -> (String, String) {
    let response = app
        .clone()
        .oneshot(request(Method::POST, "/api/v1/sessions"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    (
        body["session_id"].as_str().unwrap().to_string(),
        body["thread_id"].as_str().unwrap().to_string(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_sessions_listed_most_recent_first() {
    let runtime = runtime();
    let ctx = context(online_config(), &runtime).await;
    let app = router(&ctx);

    let (first, _) = open_session(&app).await;
    let (second, _) = open_session(&app).await;
    app.clone()
        .oneshot(post_json(
            "/api/v1/chat",
            &json!({"message": "Wat kost rijles?", "session_id": first}),
        ))
        .await
        .unwrap();

    let response = app.oneshot(get("/api/v1/sessions")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total_sessions"], 2);
    assert_eq!(body["sessions"][0]["id"], first.as_str());
    assert_eq!(body["sessions"][1]["id"], second.as_str());
}

#[tokio::test]
async fn test_offline_session_list_is_empty() {
    let response = offline_router()
        .await
        .oneshot(get("/api/v1/sessions"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total_sessions"], 0);
    assert_eq!(body["sessions"], json!([]));
}

#[tokio::test]
async fn test_delete_session_then_not_found() {
    let runtime = runtime();
    let ctx = context(online_config(), &runtime).await;
    let app = router(&ctx);
    let (session_id, thread_id) = open_session(&app).await;
    let uri = format!("/api/v1/sessions/{session_id}");

    let response = app
        .clone()
        .oneshot(request(Method::DELETE, &uri))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["session_id"], session_id.as_str());
    assert_eq!(runtime.deleted_threads().await, vec![thread_id]);

    let response = app
        .clone()
        .oneshot(request(Method::DELETE, &uri))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "session_not_found");

    let response = app.oneshot(get("/api/v1/sessions")).await.unwrap();
    assert_eq!(json_body(response).await["total_sessions"], 0);
}

#[tokio::test(start_paused = true)]
async fn test_clear_session_moves_to_fresh_thread() {
    let runtime = runtime();
    let ctx = context(online_config(), &runtime).await;
    let app = router(&ctx);
    let (session_id, old_thread) = open_session(&app).await;
    app.clone()
        .oneshot(post_json(
            "/api/v1/chat",
            &json!({"message": "Wat kost rijles?", "session_id": session_id}),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            &format!("/api/v1/sessions/{session_id}/clear"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["session_id"], session_id.as_str());
    let new_thread = body["thread_id"].as_str().unwrap().to_string();
    assert_ne!(new_thread, old_thread);
    assert_eq!(runtime.deleted_threads().await, vec![old_thread]);

    let response = app
        .oneshot(get(&format!("/api/v1/history/{new_thread}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["total_messages"], 0);
}

#[tokio::test]
async fn test_clear_unknown_session_is_not_found() {
    let runtime = runtime();
    let ctx = context(online_config(), &runtime).await;

    let response = router(&ctx)
        .oneshot(request(Method::POST, "/api/v1/sessions/session_missing/clear"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "session_not_found");
    assert!(runtime.deleted_threads().await.is_empty());
}

#[tokio::test]
async fn test_history_rejects_ids_that_reshape_the_upstream_url() {
    let runtime = runtime();
    let ctx = context(online_config(), &runtime).await;
    let app = router(&ctx);

    for uri in [
        "/api/v1/history/x%3Forder=desc%26limit=1%23",
        "/api/v1/history/..%2Fassistants%2Fasst_1",
        "/api/v1/history/thread%20one",
    ] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json_body(response).await["error"], "validation_error");
    }
    assert_eq!(runtime.call_count(Operation::ListMessages).await, 0);
}
