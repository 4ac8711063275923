//! Game phases.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Phase of a game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Players gather; the host has not started yet.
    Lobby,
    /// A scene is shown and voting is about to open.
    Story,
    /// A ballot is open.
    Voting,
    /// The ballot is closed and the next scene is being written.
    Resolving,
    /// The story has concluded.
    Ended,
}

impl Phase {
    /// Upper-case wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Lobby => "LOBBY",
            Phase::Story => "STORY",
            Phase::Voting => "VOTING",
            Phase::Resolving => "RESOLVING",
            Phase::Ended => "ENDED",
        }
    }

    /// Whether a scene is on screen in this phase.
    #[must_use]
    pub fn shows_story(self) -> bool {
        matches!(self, Phase::Story | Phase::Voting | Phase::Resolving)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
