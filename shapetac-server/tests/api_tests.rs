//! Integration tests for shapetac-server API

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use shapetac_server::{create_router, ServerConfig, ServerState};
use std::sync::Arc;
use tower::ServiceExt;

fn test_app() -> axum::Router {
    let config = ServerConfig::default();
    let state = Arc::new(ServerState::new());
    create_router(&config, state)
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Red human moves first against a greedy Blue
async fn create_vs_greedy(app: &axum::Router) -> String {
    let (status, json) = send(
        app,
        "POST",
        "/api/games",
        Some(json!({
            "seed": 1,
            "shuffle_turn_order": false,
            "blue": {"strategy": "greedy"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_status_endpoint() {
    let app = test_app();
    let (status, json) = send(&app, "GET", "/api/status", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["engine"], "rust");
    assert_eq!(json["games"], 0);
}

#[tokio::test]
async fn test_create_with_defaults() {
    let app = test_app();
    let (status, json) = send(&app, "POST", "/api/games", None).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(json["id"].is_string());

    let state = &json["state"];
    assert_eq!(state["board"].as_object().unwrap().len(), 61);
    assert_eq!(state["bonuses"].as_object().unwrap().len(), 5);
    assert_eq!(state["game_over"], false);
    assert_eq!(state["moves_played"], 0);
    assert_eq!(state["max_rounds"], 25);
    assert!(state["winner"].is_null());
}

#[tokio::test]
async fn test_create_with_partial_config() {
    let app = test_app();
    let (status, json) = send(
        &app,
        "POST",
        "/api/games",
        Some(json!({
            "radius": 2,
            "end_condition": {"mode": "score_threshold", "target": 20}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["state"]["board"].as_object().unwrap().len(), 19);
    assert_eq!(json["state"]["target_score"], 20);
    assert!(json["state"]["max_rounds"].is_null());
}

#[tokio::test]
async fn test_create_rejects_bad_config() {
    let app = test_app();
    let (status, json) = send(&app, "POST", "/api/games", Some(json!({"radius": "big"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["reason"], "BadRequest");
}

#[tokio::test]
async fn test_move_and_agent_reply() {
    let app = test_app();
    let id = create_vs_greedy(&app).await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/api/games/{}/move", id),
        Some(json!({"q": 0, "r": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["board"]["0,0,0"], "Red");
    assert_eq!(json["current_player"], "Blue");

    let (status, json) = send(&app, "POST", &format!("/api/games/{}/ai-move", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["moves_played"], 2);
    assert_eq!(json["current_player"], "Red");

    // Red is human: no agent to move
    let (status, json) = send(&app, "POST", &format!("/api/games/{}/ai-move", id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["reason"], "NoAgentMove");
}

#[tokio::test]
async fn test_rejected_moves() {
    let app = test_app();
    let id = create_vs_greedy(&app).await;
    let uri = format!("/api/games/{}/move", id);

    let (status, json) = send(&app, "POST", &uri, Some(json!({"q": 1, "r": -1, "s": 0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["reason"], "FirstMoveMustBeCenter");
    assert_eq!(json["error"], "first move must be in the center");

    let (status, json) = send(&app, "POST", &uri, Some(json!({"q": 1, "r": 1, "s": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["reason"], "BadRequest");

    let (status, _) = send(&app, "POST", &uri, Some(json!({"q": 0, "r": 0, "s": 0}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "POST", &uri, Some(json!({"q": 0, "r": 0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["reason"], "CellOccupied");

    let (status, json) = send(&app, "POST", &uri, Some(json!({"q": 3, "r": -3}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["reason"], "AdjacencyViolation");

    // Extreme but well-formed coordinates are rejected, never overflowed
    let (status, json) = send(
        &app,
        "POST",
        &uri,
        Some(json!({"q": i32::MIN, "r": 1 << 30, "s": 1 << 30})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["reason"], "AdjacencyViolation");

    let (status, json) = send(&app, "POST", &uri, Some(json!({"q": i32::MIN, "r": -1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["reason"], "BadRequest");

    let (status, json) =
        send(&app, "POST", &uri, Some(json!({"q": i32::MAX, "r": i32::MAX, "s": 5}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["reason"], "BadRequest");

    // Rejections leave the game where it was
    let (_, json) = send(&app, "GET", &format!("/api/games/{}", id), None).await;
    assert_eq!(json["moves_played"], 1);
    assert_eq!(json["current_player"], "Blue");
}

#[tokio::test]
async fn test_suggest() {
    let app = test_app();
    let id = create_vs_greedy(&app).await;

    let (status, json) = send(&app, "GET", &format!("/api/games/{}/suggest", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["move"], json!({"q": 0, "r": 0, "s": 0}));

    // Suggesting never plays
    let (_, json) = send(&app, "GET", &format!("/api/games/{}", id), None).await;
    assert_eq!(json["moves_played"], 0);
}

#[tokio::test]
async fn test_delete_and_unknown_game() {
    let app = test_app();
    let id = create_vs_greedy(&app).await;

    let (status, _) = send(&app, "DELETE", &format!("/api/games/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, json) = send(&app, "GET", &format!("/api/games/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["reason"], "GameNotFound");

    let (status, _) = send(&app, "POST", "/api/games/999/ai-move", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/api/games/not-a-number", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
