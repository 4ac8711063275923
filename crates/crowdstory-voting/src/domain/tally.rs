//! Vote counting and ballot outcomes.

use std::collections::BTreeMap;

use crowdstory_core::choice::ChoiceId;
use serde::{Deserialize, Serialize};

use super::ballot::BallotId;

/// Per-choice vote counts. Only choices that received at least one vote
/// appear; iteration is ordered by choice id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tally(BTreeMap<ChoiceId, u32>);

impl Tally {
    /// Counts `votes`, skipping any that name a choice outside `allowed`.
    pub fn count_votes<'a>(
        votes: impl IntoIterator<Item = &'a ChoiceId>,
        allowed: &[ChoiceId],
    ) -> Self {
        let mut counts = BTreeMap::new();
        for choice in votes {
            if allowed.contains(choice) {
                *counts.entry(choice.clone()).or_insert(0) += 1;
            }
        }
        Self(counts)
    }

    /// Votes received by `choice`.
    #[must_use]
    pub fn count(&self, choice: &ChoiceId) -> u32 {
        self.0.get(choice).copied().unwrap_or(0)
    }

    /// Total number of counted votes.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    /// Whether no vote was counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(choice, count)` pairs in choice-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&ChoiceId, u32)> {
        self.0.iter().map(|(choice, count)| (choice, *count))
    }

    /// Choices sharing the highest count, in the order they appear in `allowed`.
    /// Empty when no votes were counted.
    #[must_use]
    pub fn leaders(&self, allowed: &[ChoiceId]) -> Vec<ChoiceId> {
        let Some(top) = self.0.values().copied().max() else {
            return Vec::new();
        };
        allowed
            .iter()
            .filter(|choice| self.count(choice) == top)
            .cloned()
            .collect()
    }

    /// Counts for every choice in `allowed`, including those with zero votes.
    #[must_use]
    pub fn with_zeroes(&self, allowed: &[ChoiceId]) -> BTreeMap<ChoiceId, u32> {
        allowed
            .iter()
            .map(|choice| (choice.clone(), self.count(choice)))
            .collect()
    }
}

/// How the winner of a ballot was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// One choice strictly led the vote.
    Majority,
    /// Several choices tied and the tie-break policy picked one.
    TieBreak,
    /// Nobody voted; a random allowed choice was picked so the story moves on.
    NoVotes,
}

/// The resolved result of a closed ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotOutcome {
    /// The ballot that was resolved.
    pub ballot_id: BallotId,
    /// The winning choice.
    pub winner: ChoiceId,
    /// Final per-choice counts.
    pub counts: Tally,
    /// Number of counted votes.
    pub total_votes: u32,
    /// How the winner was decided.
    pub decision: Decision,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<ChoiceId> {
        raw.iter().map(|id| ChoiceId::from(*id)).collect()
    }

    #[test]
    fn test_count_votes_skips_unknown_choices() {
        // Arrange
        let allowed = ids(&["A", "B", "C"]);
        let votes = ids(&["A", "Z", "B", "A"]);

        // Act
        let tally = Tally::count_votes(&votes, &allowed);

        // Assert
        assert_eq!(tally.count(&"A".into()), 2);
        assert_eq!(tally.count(&"B".into()), 1);
        assert_eq!(tally.count(&"Z".into()), 0);
        assert_eq!(tally.total(), 3);
    }

    #[test]
    fn test_leaders_follow_scene_order() {
        let allowed = ids(&["C", "A", "B"]);
        let votes = ids(&["A", "C", "B"]);

        let tally = Tally::count_votes(&votes, &allowed);

        assert_eq!(tally.leaders(&allowed), ids(&["C", "A", "B"]));
    }

    #[test]
    fn test_with_zeroes_lists_every_choice() {
        let allowed = ids(&["A", "B", "C"]);
        let tally = Tally::count_votes(&ids(&["B"]), &allowed);

        let counts = tally.with_zeroes(&allowed);

        assert_eq!(counts.len(), 3);
        assert_eq!(counts[&ChoiceId::from("A")], 0);
        assert_eq!(counts[&ChoiceId::from("B")], 1);
    }
}
