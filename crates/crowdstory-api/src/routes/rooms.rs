//! Routes for rooms: membership, game start, votes and state.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use crowdstory_core::choice::ChoiceId;
use crowdstory_core::theme::Theme;
use crowdstory_party::application::command_handlers::{self, RoomCreated};
use crowdstory_party::application::query_handlers::{self, RoomSummary};
use crowdstory_party::application::round_driver::RoundDriver;
use crowdstory_party::domain::code::RoomCode;
use crowdstory_party::domain::commands;
use crowdstory_party::domain::room::{LeaveOutcome, Room, RoomView};
use crowdstory_voting::domain::{BallotId, Tally};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /api/v1/rooms.
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    /// Name of the host.
    pub display_name: String,
    /// Story theme; the server default when absent.
    pub theme: Option<Theme>,
}

/// Request body for POST /api/v1/rooms/{code}/join.
#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    /// Requested display name.
    pub display_name: String,
}

/// Request body identifying the acting member.
#[derive(Debug, Deserialize)]
pub struct PlayerRequest {
    /// The acting member.
    pub player_id: Uuid,
}

/// Request body for POST /api/v1/rooms/{code}/votes.
#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    /// The voter.
    pub player_id: Uuid,
    /// The chosen option.
    pub choice_id: ChoiceId,
    /// Ballot the voter saw.
    pub ballot_id: Option<BallotId>,
}

/// Request body for POST /api/v1/rooms/{code}/connection.
#[derive(Debug, Deserialize)]
pub struct ConnectionRequest {
    /// The member.
    pub player_id: Uuid,
    /// Whether the member is connected.
    pub connected: bool,
}

/// Query string for GET /api/v1/rooms/{code}/updates.
#[derive(Debug, Deserialize)]
pub struct UpdatesQuery {
    /// Last revision the caller has seen.
    #[serde(default)]
    pub after_version: u64,
}

/// Response body for a join.
#[derive(Debug, Serialize)]
pub struct JoinRoomResponse {
    /// The room joined.
    pub room_code: RoomCode,
    /// The new member's id.
    pub player_id: Uuid,
}

/// Response body for a leave.
#[derive(Debug, Serialize)]
pub struct LeaveRoomResponse {
    /// Whether the room closed because it emptied.
    pub room_closed: bool,
    /// The member promoted to host, if the host left.
    pub new_host: Option<Uuid>,
}

/// Response body for a vote.
#[derive(Debug, Serialize)]
pub struct CastVoteResponse {
    /// Counts after the vote; choices without votes are omitted.
    pub vote_counts: Tally,
}

/// Response body for a connection change.
#[derive(Debug, Serialize)]
pub struct ConnectionResponse {
    /// Whether the stored state changed.
    pub changed: bool,
}

/// POST /api/v1/rooms
#[instrument(skip(state, request))]
async fn create_room(
    State(state): State<AppState>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomCreated>), ApiError> {
    let command = commands::CreateRoom {
        correlation_id: Uuid::new_v4(),
        display_name: request.display_name,
        theme: request.theme,
    };

    info!(correlation_id = %command.correlation_id, "handling create_room command");

    let created = command_handlers::handle_create_room(
        &command,
        state.clock.as_ref(),
        &state.rng,
        &state.registry,
    )?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/rooms
async fn list_rooms(State(state): State<AppState>) -> Result<Json<Vec<RoomSummary>>, ApiError> {
    Ok(Json(query_handlers::list_rooms(&state.registry)?))
}

/// GET /api/v1/rooms/{code}
#[instrument(skip(state))]
async fn get_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<RoomView>, ApiError> {
    Ok(Json(query_handlers::get_room_state(&code, &state.registry)?))
}

/// GET /api/v1/rooms/{code}/updates
#[instrument(skip(state))]
async fn wait_for_update(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<UpdatesQuery>,
) -> Result<Json<RoomView>, ApiError> {
    let view = query_handlers::wait_for_update(
        &code,
        query.after_version,
        state.long_poll_timeout,
        &state.registry,
    )
    .await?;
    Ok(Json(view))
}

/// POST /api/v1/rooms/{code}/join
#[instrument(skip(state, request))]
async fn join_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<JoinRoomRequest>,
) -> Result<Json<JoinRoomResponse>, ApiError> {
    let command = commands::JoinRoom {
        correlation_id: Uuid::new_v4(),
        room_code: code,
        display_name: request.display_name,
    };

    info!(correlation_id = %command.correlation_id, "handling join_room command");

    let player_id = command_handlers::handle_join_room(
        &command,
        state.clock.as_ref(),
        &state.registry,
    )?;

    Ok(Json(JoinRoomResponse {
        room_code: RoomCode::parse(&command.room_code)?,
        player_id,
    }))
}

/// POST /api/v1/rooms/{code}/leave
#[instrument(skip(state, request), fields(player_id = %request.player_id))]
async fn leave_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<PlayerRequest>,
) -> Result<Json<LeaveRoomResponse>, ApiError> {
    let command = commands::LeaveRoom {
        correlation_id: Uuid::new_v4(),
        room_code: code,
        player_id: request.player_id,
    };

    info!(correlation_id = %command.correlation_id, "handling leave_room command");

    let outcome = command_handlers::handle_leave_room(&command, state.clock.as_ref(), &state.registry)?;

    let response = match outcome {
        LeaveOutcome::RoomClosed => LeaveRoomResponse {
            room_closed: true,
            new_host: None,
        },
        LeaveOutcome::Left { new_host } => LeaveRoomResponse {
            room_closed: false,
            new_host,
        },
    };
    Ok(Json(response))
}

/// POST /api/v1/rooms/{code}/start
#[instrument(skip(state, request), fields(player_id = %request.player_id))]
async fn start_game(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<PlayerRequest>,
) -> Result<Json<RoomView>, ApiError> {
    let command = commands::StartGame {
        correlation_id: Uuid::new_v4(),
        room_code: code,
        player_id: request.player_id,
    };

    info!(correlation_id = %command.correlation_id, "handling start_game command");

    let handle = command_handlers::handle_start_game(
        &command,
        state.clock.as_ref(),
        &state.registry,
        state.stories.as_ref(),
    )
    .await?;

    let view = handle.read(Room::view)?;
    RoundDriver::new(
        view.code.clone(),
        handle,
        state.driver_services(),
        state.registry.config().clone(),
    )
    .spawn_supervised();

    Ok(Json(view))
}

/// POST /api/v1/rooms/{code}/votes
#[instrument(skip(state, request), fields(player_id = %request.player_id))]
async fn cast_vote(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<CastVoteRequest>,
) -> Result<Json<CastVoteResponse>, ApiError> {
    let command = commands::CastVote {
        correlation_id: Uuid::new_v4(),
        room_code: code,
        player_id: request.player_id,
        choice_id: request.choice_id,
        ballot_id: request.ballot_id,
    };

    info!(correlation_id = %command.correlation_id, "handling cast_vote command");

    let vote_counts =
        command_handlers::handle_cast_vote(&command, state.clock.as_ref(), &state.registry)?;

    Ok(Json(CastVoteResponse { vote_counts }))
}

/// POST /api/v1/rooms/{code}/connection
#[instrument(skip(state, request), fields(player_id = %request.player_id))]
async fn set_connection(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<ConnectionRequest>,
) -> Result<Json<ConnectionResponse>, ApiError> {
    let command = commands::SetConnection {
        correlation_id: Uuid::new_v4(),
        room_code: code,
        player_id: request.player_id,
        connected: request.connected,
    };

    info!(correlation_id = %command.correlation_id, "handling set_connection command");

    let changed = command_handlers::handle_set_connection(&command, &state.registry)?;

    Ok(Json(ConnectionResponse { changed }))
}

/// Returns the router for rooms.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/rooms", post(create_room).get(list_rooms))
        .route("/api/v1/rooms/{code}", get(get_room))
        .route("/api/v1/rooms/{code}/updates", get(wait_for_update))
        .route("/api/v1/rooms/{code}/join", post(join_room))
        .route("/api/v1/rooms/{code}/leave", post(leave_room))
        .route("/api/v1/rooms/{code}/start", post(start_game))
        .route("/api/v1/rooms/{code}/votes", post(cast_vote))
        .route("/api/v1/rooms/{code}/connection", post(set_connection))
}
