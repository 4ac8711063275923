//! Read-only session view published to observers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use crowdstory_core::choice::ChoiceId;
use crowdstory_core::theme::Theme;
use crowdstory_story::domain::Choice;
use crowdstory_voting::domain::BallotId;
use serde::Serialize;

use super::phase::Phase;

/// Everything an observer needs to render the game.
///
/// `vote_counts` lists every choice of the open ballot, zeroes included.
/// While resolving it shows the final counts of the closed ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Current phase.
    pub phase: Phase,
    /// Current round number; 0 in the lobby.
    pub round: u32,
    /// The room's theme.
    pub theme: Theme,
    /// Scene text while one is on screen.
    pub story: Option<String>,
    /// Options of the scene on screen.
    pub choices: Vec<Choice>,
    /// Live or final counts per choice.
    pub vote_counts: BTreeMap<ChoiceId, u32>,
    /// Number of players who have voted on the open ballot.
    pub votes_cast: usize,
    /// The open ballot.
    pub ballot_id: Option<BallotId>,
    /// Deadline of the open ballot.
    pub deadline: Option<DateTime<Utc>>,
    /// Winner of the last resolved ballot.
    pub last_winning_choice: Option<ChoiceId>,
    /// Illustration for the scene on screen.
    pub illustration_url: Option<String>,
    /// Closing narrative once ended.
    pub ending: Option<String>,
    /// Session version this snapshot was taken at.
    pub version: u64,
}

impl SessionSnapshot {
    /// Snapshot of a session that has not started.
    #[must_use]
    pub fn lobby(theme: Theme) -> Self {
        Self {
            phase: Phase::Lobby,
            round: 0,
            theme,
            story: None,
            choices: Vec::new(),
            vote_counts: BTreeMap::new(),
            votes_cast: 0,
            ballot_id: None,
            deadline: None,
            last_winning_choice: None,
            illustration_url: None,
            ending: None,
            version: 0,
        }
    }
}
