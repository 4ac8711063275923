//! Game configuration shared by the registry, sessions and round driver.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::theme::Theme;

/// How a ballot picks a winner among choices tied for the most votes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreakPolicy {
    /// Uniform random pick among the tied choices.
    #[default]
    Random,
    /// The tied choice listed earliest in the scene.
    FirstListed,
}

impl FromStr for TieBreakPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "first-listed" | "first_listed" => Ok(Self::FirstListed),
            other => Err(DomainError::Validation(format!(
                "unknown tie-break policy: {other}"
            ))),
        }
    }
}

/// Longest accepted voting window: one hour.
pub const MAX_VOTING_DURATION_MS: u64 = 3_600_000;

/// Tunables for rooms and rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Membership cap per room.
    pub max_players: usize,
    /// How long each ballot stays open.
    pub voting_duration_ms: u64,
    /// Number of story segments before the game ends; `None` plays until the
    /// story generator signals an ending.
    pub max_rounds: Option<u32>,
    /// Tie resolution for ballots.
    pub tie_break: TieBreakPolicy,
    /// Theme used when a room is created without one.
    pub default_theme: Theme,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_players: 8,
            voting_duration_ms: 15_000,
            max_rounds: Some(5),
            tie_break: TieBreakPolicy::Random,
            default_theme: Theme::Scifi,
        }
    }
}

impl GameConfig {
    /// Voting window as a `chrono` duration.
    #[must_use]
    pub fn voting_duration(&self) -> chrono::Duration {
        i64::try_from(self.voting_duration_ms)
            .ok()
            .and_then(chrono::Duration::try_milliseconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}
