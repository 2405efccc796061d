use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};

use cabal_core::{GameError, GameView, PlayerId, RoomTicket};

use crate::error::AppError;
use crate::state::AppState;

/// `?playerId=` on player-scoped routes.
#[derive(Debug, Deserialize)]
pub struct PlayerQuery {
    #[serde(rename = "playerId")]
    pub player_id: PlayerId,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomBody {
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomBody {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectTeamBody {
    pub player_ids: Vec<PlayerId>,
}

#[derive(Debug, Deserialize)]
pub struct VoteBody {
    pub vote: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessSeerBody {
    pub seer_id: PlayerId,
}

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KickBody {
    pub target_id: PlayerId,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

fn ok() -> Json<SuccessResponse> {
    Json(SuccessResponse { success: true })
}

fn rejected(op: &'static str, code: &str, err: GameError) -> AppError {
    tracing::debug!(room = %code, op, error = %err, "Rejected");
    AppError::from(err)
}

/// POST /api/rooms
pub async fn create_room(
    State(state): State<AppState>,
    Json(body): Json<CreateRoomBody>,
) -> Result<Json<RoomTicket>, AppError> {
    let mut rooms = state.rooms.write().await;
    let ticket = rooms
        .create_room(&body.name, body.avatar.as_deref())
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected create_room");
            AppError::from(e)
        })?;
    Ok(Json(ticket))
}

/// POST /api/rooms/join
pub async fn join_room(
    State(state): State<AppState>,
    Json(body): Json<JoinRoomBody>,
) -> Result<Json<RoomTicket>, AppError> {
    let mut rooms = state.rooms.write().await;
    let ticket = rooms
        .join_room(&body.code, &body.name, body.avatar.as_deref())
        .map_err(|e| rejected("join_room", &body.code, e))?;
    Ok(Json(ticket))
}

/// GET /api/rooms/{code}?playerId=
///
/// The caller's view of the room. Clients poll this about once a second.
pub async fn get_game_state(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<PlayerQuery>,
) -> Result<Json<GameView>, AppError> {
    let mut rooms = state.rooms.write().await;
    let view = rooms
        .get_game_state(&code, &query.player_id)
        .map_err(|e| rejected("get_game_state", &code, e))?;
    Ok(Json(view))
}

/// POST /api/rooms/{code}/start
pub async fn start_game(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    let mut rooms = state.rooms.write().await;
    rooms
        .start_game(&code)
        .map_err(|e| rejected("start_game", &code, e))?;
    Ok(ok())
}

/// POST /api/rooms/{code}/team
pub async fn select_team(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(body): Json<SelectTeamBody>,
) -> Result<Json<SuccessResponse>, AppError> {
    let mut rooms = state.rooms.write().await;
    rooms
        .select_team(&code, &body.player_ids)
        .map_err(|e| rejected("select_team", &code, e))?;
    Ok(ok())
}

/// POST /api/rooms/{code}/team-vote?playerId=
pub async fn vote_team(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<PlayerQuery>,
    Json(body): Json<VoteBody>,
) -> Result<Json<SuccessResponse>, AppError> {
    let mut rooms = state.rooms.write().await;
    rooms
        .vote_team(&code, &query.player_id, body.vote)
        .map_err(|e| rejected("vote_team", &code, e))?;
    Ok(ok())
}

/// POST /api/rooms/{code}/vote?playerId=
pub async fn vote_quest(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<PlayerQuery>,
    Json(body): Json<VoteBody>,
) -> Result<Json<SuccessResponse>, AppError> {
    let mut rooms = state.rooms.write().await;
    rooms
        .vote_quest(&code, &query.player_id, body.vote)
        .map_err(|e| rejected("vote_quest", &code, e))?;
    Ok(ok())
}

/// POST /api/rooms/{code}/guess-seer
pub async fn guess_seer(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(body): Json<GuessSeerBody>,
) -> Result<Json<SuccessResponse>, AppError> {
    let mut rooms = state.rooms.write().await;
    rooms
        .guess_seer(&code, &body.seer_id)
        .map_err(|e| rejected("guess_seer", &code, e))?;
    Ok(ok())
}

/// POST /api/rooms/{code}/chat?playerId=
///
/// Only members may post; anyone else gets 403 rather than 404.
pub async fn send_chat(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<PlayerQuery>,
    Json(body): Json<ChatBody>,
) -> Result<Json<SuccessResponse>, AppError> {
    let mut rooms = state.rooms.write().await;
    rooms
        .add_chat_message(&code, &query.player_id, &body.message)
        .map_err(|e| match e {
            GameError::PlayerNotFound(_) => {
                AppError::Forbidden("not a member of this room".to_string())
            },
            other => rejected("chat", &code, other),
        })?;
    Ok(ok())
}

/// POST /api/rooms/{code}/kick?playerId=
pub async fn kick_player(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<PlayerQuery>,
    Json(body): Json<KickBody>,
) -> Result<Json<SuccessResponse>, AppError> {
    let mut rooms = state.rooms.write().await;
    rooms
        .kick_player(&code, &query.player_id, &body.target_id)
        .map_err(|e| rejected("kick_player", &code, e))?;
    Ok(ok())
}

/// POST /api/rooms/{code}/leave?playerId=
pub async fn leave_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<PlayerQuery>,
) -> Result<Json<SuccessResponse>, AppError> {
    let mut rooms = state.rooms.write().await;
    rooms
        .leave_room(&code, &query.player_id)
        .map_err(|e| rejected("leave_room", &code, e))?;
    Ok(ok())
}
