//! Domain events for the Game Session context.

use chrono::{DateTime, Utc};
use crowdstory_core::choice::ChoiceId;
use crowdstory_core::event::{DomainEvent, EventMetadata};
use crowdstory_story::domain::StoryContent;
use crowdstory_voting::domain::{BallotId, BallotOutcome};
use serde::Serialize;
use uuid::Uuid;

/// Emitted when the host starts the game with its opening scene.
#[derive(Debug, Clone, Serialize)]
pub struct GameStarted {
    /// Round number of the opening scene.
    pub round: u32,
    /// The opening scene.
    pub story: StoryContent,
}

/// Emitted when a ballot opens for the current scene.
#[derive(Debug, Clone, Serialize)]
pub struct VotingOpened {
    /// The new ballot.
    pub ballot_id: BallotId,
    /// Choices the ballot accepts, in scene order.
    pub choice_ids: Vec<ChoiceId>,
    /// When voting opened.
    pub opened_at: DateTime<Utc>,
    /// Last instant a vote is accepted.
    pub deadline: DateTime<Utc>,
}

/// Emitted for every accepted vote, including overwrites.
#[derive(Debug, Clone, Serialize)]
pub struct VoteCast {
    /// Ballot the vote belongs to.
    pub ballot_id: BallotId,
    /// The voter.
    pub player_id: Uuid,
    /// The chosen option.
    pub choice_id: ChoiceId,
}

/// Emitted when a departing member's vote is removed from the open ballot.
#[derive(Debug, Clone, Serialize)]
pub struct VoteWithdrawn {
    /// Ballot the vote belonged to.
    pub ballot_id: BallotId,
    /// The departed voter.
    pub player_id: Uuid,
}

/// Emitted when a ballot is closed and resolved.
#[derive(Debug, Clone, Serialize)]
pub struct VotingClosed {
    /// The resolution.
    pub outcome: BallotOutcome,
}

/// Emitted when the next scene begins.
#[derive(Debug, Clone, Serialize)]
pub struct RoundAdvanced {
    /// Round number of the new scene.
    pub round: u32,
    /// The new scene.
    pub story: StoryContent,
}

/// Emitted when the story concludes.
#[derive(Debug, Clone, Serialize)]
pub struct GameEnded {
    /// Last round played.
    pub round: u32,
    /// Closing narrative.
    pub ending: String,
}

/// Emitted when an illustration arrives for the current scene.
#[derive(Debug, Clone, Serialize)]
pub struct IllustrationAttached {
    /// Round the illustration belongs to.
    pub round: u32,
    /// Image location.
    pub url: String,
}

/// Event type identifier for [`GameStarted`].
pub const GAME_STARTED_EVENT_TYPE: &str = "session.game_started";

/// Event type identifier for [`VotingOpened`].
pub const VOTING_OPENED_EVENT_TYPE: &str = "session.voting_opened";

/// Event type identifier for [`VoteCast`].
pub const VOTE_CAST_EVENT_TYPE: &str = "session.vote_cast";

/// Event type identifier for [`VoteWithdrawn`].
pub const VOTE_WITHDRAWN_EVENT_TYPE: &str = "session.vote_withdrawn";

/// Event type identifier for [`VotingClosed`].
pub const VOTING_CLOSED_EVENT_TYPE: &str = "session.voting_closed";

/// Event type identifier for [`RoundAdvanced`].
pub const ROUND_ADVANCED_EVENT_TYPE: &str = "session.round_advanced";

/// Event type identifier for [`GameEnded`].
pub const GAME_ENDED_EVENT_TYPE: &str = "session.game_ended";

/// Event type identifier for [`IllustrationAttached`].
pub const ILLUSTRATION_ATTACHED_EVENT_TYPE: &str = "session.illustration_attached";

/// Event payload variants for the Game Session context.
#[derive(Debug, Clone, Serialize)]
pub enum SessionEventKind {
    /// The game has started.
    GameStarted(GameStarted),
    /// A ballot has opened.
    VotingOpened(VotingOpened),
    /// A vote has been recorded.
    VoteCast(VoteCast),
    /// A vote has been withdrawn.
    VoteWithdrawn(VoteWithdrawn),
    /// A ballot has been resolved.
    VotingClosed(VotingClosed),
    /// A new scene has begun.
    RoundAdvanced(RoundAdvanced),
    /// The story has ended.
    GameEnded(GameEnded),
    /// An illustration has been attached.
    IllustrationAttached(IllustrationAttached),
}

impl SessionEventKind {
    /// Event type name of this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEventKind::GameStarted(_) => GAME_STARTED_EVENT_TYPE,
            SessionEventKind::VotingOpened(_) => VOTING_OPENED_EVENT_TYPE,
            SessionEventKind::VoteCast(_) => VOTE_CAST_EVENT_TYPE,
            SessionEventKind::VoteWithdrawn(_) => VOTE_WITHDRAWN_EVENT_TYPE,
            SessionEventKind::VotingClosed(_) => VOTING_CLOSED_EVENT_TYPE,
            SessionEventKind::RoundAdvanced(_) => ROUND_ADVANCED_EVENT_TYPE,
            SessionEventKind::GameEnded(_) => GAME_ENDED_EVENT_TYPE,
            SessionEventKind::IllustrationAttached(_) => ILLUSTRATION_ATTACHED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the Game Session context.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: SessionEventKind,
}

impl DomainEvent for SessionEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("SessionEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
