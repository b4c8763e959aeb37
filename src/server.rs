//! HTTP front end over the session manager.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

use crate::error::EngineError;
use crate::games::ludo::{MatchSnapshot, MoveDelta, PlayerId, Seat};
use crate::session::SessionManager;
use crate::store::SessionRecord;

/// Body of `POST /sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    /// Game type to play.
    pub game_type: String,
    /// Player ids in seat order.
    pub roster: Vec<PlayerId>,
}

/// Body naming the acting seat.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeatRequest {
    /// Acting seat.
    pub seat: Seat,
}

/// Body of `POST /sessions/{id}/move`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Acting seat.
    pub seat: Seat,
    /// Piece to move.
    pub piece: u8,
}

/// Body of `POST /sessions/{id}/cancel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    /// Reason recorded on the outcome.
    pub reason: String,
}

/// Response of `POST /sessions/{id}/roll`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollResponse {
    /// Value rolled.
    pub value: u8,
    /// Pieces that may move with it; empty when the turn passed.
    pub legal_moves: Vec<MoveDelta>,
}

/// [`EngineError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            EngineError::InvalidRoster(_) => StatusCode::BAD_REQUEST,
            EngineError::Move(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::SessionNotFound(_) | EngineError::UnknownGameType(_) => {
                StatusCode::NOT_FOUND
            }
            EngineError::SessionTerminal(_)
            | EngineError::DuplicateSettlement(_)
            | EngineError::NotTerminal(_) => StatusCode::CONFLICT,
            EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self.0, "Request failed");
        }
        let body = json!({ "error": self.0.kind(), "message": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Builds the router.
pub fn router(manager: SessionManager) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/game-types", get(game_types))
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/{id}", get(snapshot))
        .route("/sessions/{id}/record", get(record))
        .route("/sessions/{id}/moves", get(legal_moves))
        .route("/sessions/{id}/join", post(join))
        .route("/sessions/{id}/roll", post(roll))
        .route("/sessions/{id}/move", post(submit_move))
        .route("/sessions/{id}/disconnect", post(disconnect))
        .route("/sessions/{id}/reconnect", post(reconnect))
        .route("/sessions/{id}/cancel", post(cancel))
        .with_state(manager)
}

/// Binds `host:port` and serves until the process exits.
///
/// # Errors
///
/// Returns the I/O error if binding or serving fails.
#[instrument(skip(manager))]
pub async fn serve(manager: SessionManager, host: String, port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind((host.as_str(), port)).await?;
    info!(address = %listener.local_addr()?, "Engine listening");
    axum::serve(listener, router(manager)).await
}

async fn health() -> &'static str {
    "ok"
}

async fn game_types(State(manager): State<SessionManager>) -> Json<Vec<String>> {
    Json(manager.catalog().ids().map(str::to_string).collect())
}

async fn list_sessions(State(manager): State<SessionManager>) -> Json<Vec<String>> {
    Json(manager.active_sessions())
}

#[instrument(skip(manager, request), fields(game_type = %request.game_type))]
async fn create_session(
    State(manager): State<SessionManager>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<MatchSnapshot>), ApiError> {
    let snapshot = manager.create_session(&request.game_type, request.roster)?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn snapshot(
    State(manager): State<SessionManager>,
    Path(id): Path<String>,
) -> ApiResult<MatchSnapshot> {
    Ok(Json(manager.snapshot(&id)?))
}

async fn record(
    State(manager): State<SessionManager>,
    Path(id): Path<String>,
) -> ApiResult<SessionRecord> {
    Ok(Json(manager.record(&id)?))
}

async fn legal_moves(
    State(manager): State<SessionManager>,
    Path(id): Path<String>,
) -> ApiResult<Vec<MoveDelta>> {
    Ok(Json(manager.legal_moves(&id)?))
}

async fn join(
    State(manager): State<SessionManager>,
    Path(id): Path<String>,
    Json(request): Json<SeatRequest>,
) -> ApiResult<MatchSnapshot> {
    manager.join(&id, request.seat)?;
    Ok(Json(manager.snapshot(&id)?))
}

async fn roll(
    State(manager): State<SessionManager>,
    Path(id): Path<String>,
    Json(request): Json<SeatRequest>,
) -> ApiResult<RollResponse> {
    let value = manager.submit_roll(&id, request.seat)?;
    let legal_moves = manager.legal_moves(&id).unwrap_or_default();
    Ok(Json(RollResponse { value, legal_moves }))
}

async fn submit_move(
    State(manager): State<SessionManager>,
    Path(id): Path<String>,
    Json(request): Json<MoveRequest>,
) -> ApiResult<MoveDelta> {
    Ok(Json(manager.submit_move(&id, request.seat, request.piece)?))
}

async fn disconnect(
    State(manager): State<SessionManager>,
    Path(id): Path<String>,
    Json(request): Json<SeatRequest>,
) -> Result<StatusCode, ApiError> {
    manager.disconnect(&id, request.seat)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reconnect(
    State(manager): State<SessionManager>,
    Path(id): Path<String>,
    Json(request): Json<SeatRequest>,
) -> Result<StatusCode, ApiError> {
    manager.reconnect(&id, request.seat)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn cancel(
    State(manager): State<SessionManager>,
    Path(id): Path<String>,
    Json(request): Json<CancelRequest>,
) -> Result<StatusCode, ApiError> {
    manager.cancel_session(&id, &request.reason)?;
    Ok(StatusCode::NO_CONTENT)
}
