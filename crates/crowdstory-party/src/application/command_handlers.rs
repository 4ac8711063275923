//! Command handlers for the Party context.
//!
//! Each handler resolves the room through the registry and runs the domain
//! operation inside that room's lock. Slow collaborators are only ever
//! awaited outside the lock.

use std::sync::{Arc, Mutex};

use crowdstory_core::clock::Clock;
use crowdstory_core::command::Command;
use crowdstory_core::error::DomainError;
use crowdstory_core::rng::DeterministicRng;
use crowdstory_story::domain::{StoryContext, StoryGenerator};
use crowdstory_voting::domain::Tally;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::application::round_driver::report_source;
use crate::domain::code::RoomCode;
use crate::domain::commands::{CastVote, CreateRoom, JoinRoom, LeaveRoom, SetConnection, StartGame};
use crate::domain::room::LeaveOutcome;
use crate::registry::{RoomHandle, RoomRegistry};

/// Result of creating a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomCreated {
    /// Code players join with.
    pub room_code: RoomCode,
    /// The host's player id.
    pub player_id: Uuid,
}

fn room_handle(
    command: &dyn Command,
    registry: &RoomRegistry,
) -> Result<(RoomCode, Arc<RoomHandle>), DomainError> {
    let raw = command.room_code().unwrap_or_default();
    let code = RoomCode::parse(raw)?;
    let handle = registry.get_room(&code)?;
    Ok((code, handle))
}

/// Handles the `CreateRoom` command.
///
/// The `Mutex` is locked only around the synchronous code draw.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an unusable name and
/// `DomainError::GenerationExhausted` if no free code could be drawn.
pub fn handle_create_room(
    command: &CreateRoom,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    registry: &RoomRegistry,
) -> Result<RoomCreated, DomainError> {
    let (room_code, player_id) = {
        let mut rng = rng
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("RNG mutex poisoned: {e}")))?;
        registry.create_room(&command.display_name, command.theme, clock, &mut *rng)?
    };

    info!(
        correlation_id = %command.correlation_id,
        room_code = %room_code,
        host_id = %player_id,
        "room created"
    );
    Ok(RoomCreated {
        room_code,
        player_id,
    })
}

/// Handles the `JoinRoom` command and returns the new player id.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound`, `DomainError::GameAlreadyStarted`,
/// `DomainError::RoomFull`, `DomainError::NameTaken` or
/// `DomainError::Validation`.
pub fn handle_join_room(
    command: &JoinRoom,
    clock: &dyn Clock,
    registry: &RoomRegistry,
) -> Result<Uuid, DomainError> {
    let code = RoomCode::parse(&command.room_code)?;
    let player_id = registry.join_room(&code, &command.display_name, clock)?;

    info!(
        correlation_id = %command.correlation_id,
        room_code = %code,
        player_id = %player_id,
        "player joined"
    );
    Ok(player_id)
}

/// Handles the `LeaveRoom` command.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound` or `DomainError::UnknownPlayer`.
pub fn handle_leave_room(
    command: &LeaveRoom,
    clock: &dyn Clock,
    registry: &RoomRegistry,
) -> Result<LeaveOutcome, DomainError> {
    let code = RoomCode::parse(&command.room_code)?;
    let outcome = registry.leave_room(&code, command.player_id, command.correlation_id, clock)?;

    match outcome {
        LeaveOutcome::RoomClosed => info!(
            correlation_id = %command.correlation_id,
            room_code = %code,
            "last player left, room closed"
        ),
        LeaveOutcome::Left { new_host } => info!(
            correlation_id = %command.correlation_id,
            room_code = %code,
            player_id = %command.player_id,
            new_host = ?new_host,
            "player left"
        ),
    }
    Ok(outcome)
}

/// Handles the `StartGame` command: checks the caller is the host, fetches
/// the opening scene and starts the session. Returns the room handle for
/// the caller to drive.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound`, `DomainError::UnknownPlayer`,
/// `DomainError::NotHost` or `DomainError::GameAlreadyStarted`.
pub async fn handle_start_game(
    command: &StartGame,
    clock: &dyn Clock,
    registry: &RoomRegistry,
    stories: &dyn StoryGenerator,
) -> Result<Arc<RoomHandle>, DomainError> {
    let (code, handle) = room_handle(command, registry)?;
    let theme = handle.read(|room| {
        room.ensure_can_start(command.player_id)
            .map(|()| room.session().theme())
    })??;

    let opening = stories.generate(&StoryContext::opening(theme)).await;
    report_source(&code, command.correlation_id, &opening);

    handle.with_room(|room| {
        room.start_game(
            command.player_id,
            opening.content,
            command.correlation_id,
            clock,
        )
    })?;

    info!(
        correlation_id = %command.correlation_id,
        room_code = %code,
        "game started"
    );
    Ok(handle)
}

/// Handles the `CastVote` command and returns the updated counts.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound`, `DomainError::UnknownPlayer`,
/// `DomainError::VotingClosed` or `DomainError::InvalidChoice`.
pub fn handle_cast_vote(
    command: &CastVote,
    clock: &dyn Clock,
    registry: &RoomRegistry,
) -> Result<Tally, DomainError> {
    let (code, handle) = room_handle(command, registry)?;
    let tally = handle.with_room(|room| {
        room.cast_vote(
            command.player_id,
            command.choice_id.clone(),
            command.ballot_id,
            command.correlation_id,
            clock,
        )
    })?;

    info!(
        correlation_id = %command.correlation_id,
        room_code = %code,
        player_id = %command.player_id,
        choice_id = %command.choice_id,
        "vote cast"
    );
    Ok(tally)
}

/// Handles the `SetConnection` command. Returns whether the state changed.
///
/// # Errors
///
/// Returns `DomainError::RoomNotFound` or `DomainError::UnknownPlayer`.
pub fn handle_set_connection(
    command: &SetConnection,
    registry: &RoomRegistry,
) -> Result<bool, DomainError> {
    let (code, handle) = room_handle(command, registry)?;
    let changed =
        handle.with_room(|room| room.set_connected(command.player_id, command.connected))?;

    if changed {
        info!(
            correlation_id = %command.correlation_id,
            room_code = %code,
            player_id = %command.player_id,
            connected = command.connected,
            "connection state changed"
        );
    }
    Ok(changed)
}
