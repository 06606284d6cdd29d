//! REST transport over the match registry.

use crate::agent_library::AgentSummary;
use crate::board::{Color, Position};
use crate::error::{ArenaError, ArenaErrorKind};
use crate::game::{SeatConfig, Snapshot};
use crate::registry::MatchRegistry;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Agent seat requested at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiPlayerSettings {
    /// Library id of the agent.
    pub ai_player_id: String,
    /// Seat the agent plays.
    pub ai_color: Color,
}

/// Body of `POST /api/game/new`. The body itself is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    /// Agent seat, if any.
    #[serde(default)]
    pub ai_player: Option<AiPlayerSettings>,
}

impl CreateGameRequest {
    /// Seat assignment this request asks for.
    pub fn seats(&self) -> SeatConfig {
        match &self.ai_player {
            Some(ai) => SeatConfig::with_agent(ai.ai_color, ai.ai_player_id.clone()),
            None => SeatConfig::humans(),
        }
    }
}

/// Body of `POST /api/game/move`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeMoveRequest {
    /// Match id.
    pub game_id: String,
    /// Square to play.
    pub position: Position,
}

/// Body of `POST /api/game/ai-move`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiMoveRequest {
    /// Match id.
    pub game_id: String,
}

/// Error payload returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error code, see [`ArenaErrorKind::code`].
    pub kind: String,
    /// Human-readable detail.
    pub detail: String,
}

/// A failed request rendered as an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// An orchestration failure.
    Arena(ArenaError),
    /// The request body could not be decoded.
    BadRequest(String),
}

impl From<ArenaError> for ApiError {
    fn from(err: ArenaError) -> Self {
        Self::Arena(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

fn status_for(kind: &ArenaErrorKind) -> StatusCode {
    match kind {
        ArenaErrorKind::NotFound(_) => StatusCode::NOT_FOUND,
        ArenaErrorKind::AgentTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        k if k.is_agent_failure() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Arena(err) => {
                let kind = err.kind();
                let status = status_for(kind);
                warn!(status = %status, error = %err, "Request failed");
                let body = ErrorBody {
                    kind: kind.code().to_string(),
                    detail: kind.to_string(),
                };
                (status, body)
            }
            Self::BadRequest(detail) => {
                debug!(detail = %detail, "Malformed request body");
                let body = ErrorBody {
                    kind: "bad_request".to_string(),
                    detail,
                };
                (StatusCode::BAD_REQUEST, body)
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Builds the router.
pub fn router(registry: MatchRegistry) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/ai/players", get(list_agents))
        .route("/api/game/new", post(create_game))
        .route("/api/game/move", post(make_move))
        .route("/api/game/ai-move", post(make_ai_move))
        .route("/api/game/{game_id}", get(get_game).delete(delete_game))
        .with_state(registry)
}

async fn health() -> &'static str {
    "ok"
}

#[instrument(skip(registry))]
async fn list_agents(State(registry): State<MatchRegistry>) -> Json<Vec<AgentSummary>> {
    Json(registry.library().summaries())
}

#[instrument(skip(registry, body), fields(len = body.len()))]
async fn create_game(
    State(registry): State<MatchRegistry>,
    body: Bytes,
) -> Result<Json<Snapshot>, ApiError> {
    let request: CreateGameRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CreateGameRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    Ok(Json(registry.create(request.seats()).await?))
}

#[instrument(skip(registry, payload))]
async fn make_move(
    State(registry): State<MatchRegistry>,
    payload: Result<Json<MakeMoveRequest>, JsonRejection>,
) -> Result<Json<Snapshot>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(
        registry
            .apply_move(&request.game_id, request.position)
            .await?,
    ))
}

#[instrument(skip(registry))]
async fn get_game(
    State(registry): State<MatchRegistry>,
    Path(game_id): Path<String>,
) -> Result<Json<Snapshot>, ApiError> {
    Ok(Json(registry.get(&game_id).await?))
}

#[instrument(skip(registry, payload))]
async fn make_ai_move(
    State(registry): State<MatchRegistry>,
    payload: Result<Json<AiMoveRequest>, JsonRejection>,
) -> Result<Json<Snapshot>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(registry.request_agent_move(&request.game_id).await?))
}

#[instrument(skip(registry))]
async fn delete_game(
    State(registry): State<MatchRegistry>,
    Path(game_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    registry.delete(&game_id).await?;
    Ok(Json(serde_json::json!({
        "message": format!("Game {game_id} deleted successfully")
    })))
}
