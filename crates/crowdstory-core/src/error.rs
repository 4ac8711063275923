//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
///
/// Every variant is local and recoverable; the transport layer decides how
/// each one is presented to players.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// No live room has this code.
    #[error("room not found: {0}")]
    RoomNotFound(String),

    /// Another member of the room already uses this display name.
    #[error("display name already taken: {0}")]
    NameTaken(String),

    /// The room has reached its membership cap.
    #[error("room is full (max {max_players} players)")]
    RoomFull {
        /// The configured membership cap.
        max_players: usize,
    },

    /// The game has left the lobby; joining or restarting is not allowed.
    #[error("game already started")]
    GameAlreadyStarted,

    /// The operation is reserved for the room's host.
    #[error("only the host can do that")]
    NotHost,

    /// The session is not in a phase that permits the operation.
    #[error("{operation} is not allowed in phase {phase}")]
    InvalidPhase {
        /// The rejected operation.
        operation: &'static str,
        /// The phase the session was in.
        phase: &'static str,
    },

    /// No ballot is open, the referenced ballot is stale, or its deadline passed.
    #[error("voting is closed")]
    VotingClosed,

    /// The choice is not one of the current ballot's options.
    #[error("invalid choice: {0}")]
    InvalidChoice(String),

    /// The player is not a member of the room.
    #[error("unknown player: {0}")]
    UnknownPlayer(Uuid),

    /// No free room code could be found.
    #[error("room code generation exhausted after {attempts} attempts")]
    GenerationExhausted {
        /// Number of codes tried.
        attempts: u32,
    },

    /// Malformed input rejected before touching any state.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure failure such as a poisoned lock.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
