//! Tests for the REST transport, driven through the router without a socket.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use reversi_arena::{AgentConfig, AgentLibrary, MatchRegistry, router};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app(library: AgentLibrary) -> Router {
    router(MatchRegistry::new(library))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build request")
}

async fn new_game(app: &Router) -> String {
    let request = Request::builder()
        .method("POST")
        .uri("/api/game/new")
        .body(Body::empty())
        .expect("Failed to build request");
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    body["gameId"]
        .as_str()
        .expect("gameId missing")
        .to_string()
}

#[tokio::test]
async fn test_health() {
    let app = app(AgentLibrary::default());
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

#[tokio::test]
async fn test_new_game_without_body() {
    let app = app(AgentLibrary::default());
    let request = Request::builder()
        .method("POST")
        .uri("/api/game/new")
        .body(Body::empty())
        .expect("Failed to build request");
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currentPlayer"], "BLACK");
    assert_eq!(body["board"][3][3], "WHITE");
    assert_eq!(body["board"][0][0], "EMPTY");
    assert_eq!(body["score"], json!({"black": 2, "white": 2}));
    assert_eq!(body["legalMoves"].as_array().map(Vec::len), Some(4));
    assert_eq!(body["legalMoves"][0], json!({"row": 2, "col": 3}));
    assert_eq!(body["gameOver"], false);
    assert_eq!(body["winner"], Value::Null);
    assert_eq!(body["passed"], false);
}

#[tokio::test]
async fn test_new_game_with_empty_json_object() {
    let app = app(AgentLibrary::default());
    let (status, body) = send(&app, post_json("/api/game/new", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["gameId"].is_string());
}

#[tokio::test]
async fn test_new_game_with_unknown_agent() {
    let app = app(AgentLibrary::default());
    let (status, body) = send(
        &app,
        post_json(
            "/api/game/new",
            json!({"aiPlayer": {"aiPlayerId": "missing", "aiColor": "WHITE"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "configuration_error");
    assert!(
        body["detail"]
            .as_str()
            .is_some_and(|d| d.contains("missing"))
    );
}

#[tokio::test]
async fn test_malformed_new_game_body() {
    let app = app(AgentLibrary::default());
    let request = Request::builder()
        .method("POST")
        .uri("/api/game/new")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("Failed to build request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");
}

#[tokio::test]
async fn test_malformed_move_body_is_bad_request() {
    let app = app(AgentLibrary::default());
    let id = new_game(&app).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/game/move")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"gameId\": "))
        .expect("Failed to build request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");
    assert!(body["detail"].is_string());

    // Well-formed JSON with the wrong shape gets the same treatment.
    let (status, body) = send(
        &app,
        post_json("/api/game/move", json!({"gameId": id, "position": "d3"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");

    // The match is untouched.
    let (_, fetched) = send(&app, get(&format!("/api/game/{id}"))).await;
    assert_eq!(fetched["score"], json!({"black": 2, "white": 2}));
}

#[tokio::test]
async fn test_ai_move_without_game_id_is_bad_request() {
    let app = app(AgentLibrary::default());

    let (status, body) = send(&app, post_json("/api/game/ai-move", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");

    let request = Request::builder()
        .method("POST")
        .uri("/api/game/ai-move")
        .body(Body::from("{}"))
        .expect("Failed to build request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "missing content type");
    assert_eq!(body["kind"], "bad_request");
}

#[tokio::test]
async fn test_move_flow() {
    let app = app(AgentLibrary::default());
    let id = new_game(&app).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/game/move",
            json!({"gameId": id, "position": {"row": 2, "col": 3}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["currentPlayer"], "WHITE");
    assert_eq!(body["score"], json!({"black": 4, "white": 1}));

    let (status, fetched) = send(&app, get(&format!("/api/game/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, body);
}

#[tokio::test]
async fn test_invalid_move_is_bad_request() {
    let app = app(AgentLibrary::default());
    let id = new_game(&app).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/game/move",
            json!({"gameId": id, "position": {"row": 0, "col": 0}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_move");
}

#[tokio::test]
async fn test_unknown_game_is_not_found() {
    let app = app(AgentLibrary::default());

    let (status, body) = send(&app, get("/api/game/no-such-game")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, _) = send(
        &app,
        post_json(
            "/api/game/move",
            json!({"gameId": "no-such-game", "position": {"row": 2, "col": 3}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ai_move_on_human_game() {
    let app = app(AgentLibrary::default());
    let id = new_game(&app).await;

    let (status, body) = send(&app, post_json("/api/game/ai-move", json!({"gameId": id}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "no_agent_configured");
}

#[tokio::test]
async fn test_delete_game() {
    let app = app(AgentLibrary::default());
    let id = new_game(&app).await;

    let delete = |id: &str| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/game/{id}"))
            .body(Body::empty())
            .expect("Failed to build request")
    };

    let (status, body) = send(&app, delete(&id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        Value::String(format!("Game {id} deleted successfully"))
    );

    let (status, _) = send(&app, get(&format!("/api/game/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, delete(&id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_agents() {
    let library = AgentLibrary::from_configs(vec![AgentConfig::new(
        "greedy".to_string(),
        "Greedy Player".to_string(),
        vec!["greedy_agent".to_string()],
        "Takes the most discs".to_string(),
    )]);
    let app = app(library);

    let (status, body) = send(&app, get("/api/ai/players")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{"id": "greedy", "name": "Greedy Player", "description": "Takes the most discs"}])
    );
}

#[cfg(unix)]
mod agents {
    use super::*;
    use reversi_arena::{AgentSupervisor, SupervisorSettings};
    use std::time::Duration;

    fn script_app(id: &str, script: &str) -> Router {
        let library = AgentLibrary::from_configs(vec![AgentConfig::new(
            id.to_string(),
            id.to_string(),
            vec!["sh".to_string(), "-c".to_string(), script.to_string(), id.to_string()],
            String::new(),
        )]);
        let registry = MatchRegistry::builder(library)
            .supervisor(AgentSupervisor::new(SupervisorSettings::new(
                Duration::from_secs(5),
                Duration::from_millis(300),
                Duration::from_millis(200),
            )))
            .build();
        router(registry)
    }

    async fn new_agent_game(app: &Router, id: &str) -> String {
        let (status, body) = send(
            app,
            post_json(
                "/api/game/new",
                json!({"aiPlayer": {"aiPlayerId": id, "aiColor": "BLACK"}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "body: {body}");
        body["gameId"]
            .as_str()
            .expect("gameId missing")
            .to_string()
    }

    #[tokio::test]
    async fn test_ai_move_applies_reply() {
        let script =
            r#"while read line; do if [ "$line" = ping ]; then echo pong; else echo 26; fi; done"#;
        let app = script_app("bot", script);
        let id = new_agent_game(&app, "bot").await;

        let (status, body) =
            send(&app, post_json("/api/game/ai-move", json!({"gameId": id}))).await;
        assert_eq!(status, StatusCode::OK, "body: {body}");
        assert_eq!(body["board"][3][2], "BLACK");
        assert_eq!(body["currentPlayer"], "WHITE");
    }

    #[tokio::test]
    async fn test_agent_protocol_error_is_bad_gateway() {
        let script =
            r#"while read line; do if [ "$line" = ping ]; then echo pong; else echo banana; fi; done"#;
        let app = script_app("bot", script);
        let id = new_agent_game(&app, "bot").await;

        let (status, body) =
            send(&app, post_json("/api/game/ai-move", json!({"gameId": id}))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "agent_protocol_error");
    }

    #[tokio::test]
    async fn test_agent_timeout_is_gateway_timeout() {
        let script = r#"while read line; do if [ "$line" = ping ]; then echo pong; fi; done"#;
        let app = script_app("bot", script);
        let id = new_agent_game(&app, "bot").await;

        let (status, body) =
            send(&app, post_json("/api/game/ai-move", json!({"gameId": id}))).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["kind"], "agent_timeout");
    }
}
