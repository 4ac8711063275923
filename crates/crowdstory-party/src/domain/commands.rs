//! Commands for the Party context.

use crowdstory_core::choice::ChoiceId;
use crowdstory_core::command::Command;
use crowdstory_core::theme::Theme;
use crowdstory_voting::domain::BallotId;
use uuid::Uuid;

/// Command to open a new room.
#[derive(Debug, Clone)]
pub struct CreateRoom {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Name of the host.
    pub display_name: String,
    /// Story theme; the configured default when absent.
    pub theme: Option<Theme>,
}

impl Command for CreateRoom {
    fn command_type(&self) -> &'static str {
        "party.create_room"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to join an existing room.
#[derive(Debug, Clone)]
pub struct JoinRoom {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Code as entered by the player.
    pub room_code: String,
    /// Requested display name.
    pub display_name: String,
}

impl Command for JoinRoom {
    fn command_type(&self) -> &'static str {
        "party.join_room"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn room_code(&self) -> Option<&str> {
        Some(&self.room_code)
    }
}

/// Command to leave a room.
#[derive(Debug, Clone)]
pub struct LeaveRoom {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room.
    pub room_code: String,
    /// The departing member.
    pub player_id: Uuid,
}

impl Command for LeaveRoom {
    fn command_type(&self) -> &'static str {
        "party.leave_room"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn room_code(&self) -> Option<&str> {
        Some(&self.room_code)
    }
}

/// Command to start the game.
#[derive(Debug, Clone)]
pub struct StartGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room.
    pub room_code: String,
    /// Member asking to start; must be the host.
    pub player_id: Uuid,
}

impl Command for StartGame {
    fn command_type(&self) -> &'static str {
        "party.start_game"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn room_code(&self) -> Option<&str> {
        Some(&self.room_code)
    }
}

/// Command to vote on the open ballot.
#[derive(Debug, Clone)]
pub struct CastVote {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room.
    pub room_code: String,
    /// The voter.
    pub player_id: Uuid,
    /// The chosen option.
    pub choice_id: ChoiceId,
    /// Ballot the voter saw, to reject votes aimed at a closed round.
    pub ballot_id: Option<BallotId>,
}

impl Command for CastVote {
    fn command_type(&self) -> &'static str {
        "party.cast_vote"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn room_code(&self) -> Option<&str> {
        Some(&self.room_code)
    }
}

/// Command to record a member's connection state.
#[derive(Debug, Clone)]
pub struct SetConnection {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room.
    pub room_code: String,
    /// The member.
    pub player_id: Uuid,
    /// Whether the member is connected.
    pub connected: bool,
}

impl Command for SetConnection {
    fn command_type(&self) -> &'static str {
        "party.set_connection"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn room_code(&self) -> Option<&str> {
        Some(&self.room_code)
    }
}
