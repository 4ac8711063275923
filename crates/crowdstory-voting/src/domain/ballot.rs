//! Ballots: one round's votes, bounded by a deadline.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use crowdstory_core::choice::ChoiceId;
use crowdstory_core::config::TieBreakPolicy;
use crowdstory_core::error::DomainError;
use crowdstory_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::tally::{BallotOutcome, Decision, Tally};

/// Identifier of one ballot opening. A fresh id is minted every time voting
/// opens, so a vote aimed at an earlier round's ballot is always detectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BallotId(Uuid);

impl BallotId {
    /// Mints a new random ballot id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for BallotId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for BallotId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for BallotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Votes for a single round.
#[derive(Debug, Clone)]
pub struct Ballot {
    id: BallotId,
    allowed_choice_ids: Vec<ChoiceId>,
    votes: HashMap<Uuid, ChoiceId>,
    opened_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
}

impl Ballot {
    /// Opens a ballot over `allowed_choice_ids` that accepts votes until
    /// `opened_at + duration` inclusive.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if there are no choices, if a choice
    /// id repeats, if `duration` is negative, or if the deadline falls
    /// outside the representable time range.
    pub fn open(
        id: BallotId,
        allowed_choice_ids: Vec<ChoiceId>,
        opened_at: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Self, DomainError> {
        if allowed_choice_ids.is_empty() {
            return Err(DomainError::Validation(
                "a ballot needs at least one choice".to_owned(),
            ));
        }
        for (i, choice) in allowed_choice_ids.iter().enumerate() {
            if allowed_choice_ids[..i].contains(choice) {
                return Err(DomainError::Validation(format!(
                    "duplicate choice id: {choice}"
                )));
            }
        }
        if duration < Duration::zero() {
            return Err(DomainError::Validation(
                "voting duration must not be negative".to_owned(),
            ));
        }

        let deadline = opened_at.checked_add_signed(duration).ok_or_else(|| {
            DomainError::Validation(format!("voting duration too long: {duration}"))
        })?;

        Ok(Self {
            id,
            allowed_choice_ids,
            votes: HashMap::new(),
            opened_at,
            deadline,
        })
    }

    /// Rebuilds an empty ballot from previously validated parts, as recorded
    /// in a voting-opened event. Performs no validation.
    #[must_use]
    pub fn from_parts(
        id: BallotId,
        allowed_choice_ids: Vec<ChoiceId>,
        opened_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            allowed_choice_ids,
            votes: HashMap::new(),
            opened_at,
            deadline,
        }
    }

    /// Returns the ballot id.
    #[must_use]
    pub fn id(&self) -> BallotId {
        self.id
    }

    /// Choices a vote may name, in scene order.
    #[must_use]
    pub fn allowed_choice_ids(&self) -> &[ChoiceId] {
        &self.allowed_choice_ids
    }

    /// When voting opened.
    #[must_use]
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Last instant a vote is accepted.
    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Whether a vote submitted at `now` is still in time.
    #[must_use]
    pub fn accepts_votes_at(&self, now: DateTime<Utc>) -> bool {
        now <= self.deadline
    }

    /// The current vote of `player_id`, if any.
    #[must_use]
    pub fn vote_of(&self, player_id: Uuid) -> Option<&ChoiceId> {
        self.votes.get(&player_id)
    }

    /// Number of players who have voted.
    #[must_use]
    pub fn voter_count(&self) -> usize {
        self.votes.len()
    }

    /// Checks that a vote for `choice_id` submitted at `now` may be recorded.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::VotingClosed` past the deadline and
    /// `DomainError::InvalidChoice` for a choice outside the allowed set.
    pub fn check_vote(&self, choice_id: &ChoiceId, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.accepts_votes_at(now) {
            return Err(DomainError::VotingClosed);
        }
        if !self.allowed_choice_ids.contains(choice_id) {
            return Err(DomainError::InvalidChoice(choice_id.to_string()));
        }
        Ok(())
    }

    /// Stores `choice_id` as the vote of `player_id`, replacing any earlier
    /// vote. Returns the replaced choice. Performs no validation; callers go
    /// through [`Ballot::check_vote`] first.
    pub fn record_vote(&mut self, player_id: Uuid, choice_id: ChoiceId) -> Option<ChoiceId> {
        self.votes.insert(player_id, choice_id)
    }

    /// Drops the vote of `player_id`. Returns the withdrawn choice.
    pub fn withdraw_vote(&mut self, player_id: Uuid) -> Option<ChoiceId> {
        self.votes.remove(&player_id)
    }

    /// Validates and records a vote, returning the updated counts.
    ///
    /// # Errors
    ///
    /// See [`Ballot::check_vote`].
    pub fn cast(
        &mut self,
        player_id: Uuid,
        choice_id: ChoiceId,
        now: DateTime<Utc>,
    ) -> Result<Tally, DomainError> {
        self.check_vote(&choice_id, now)?;
        self.record_vote(player_id, choice_id);
        Ok(self.tally())
    }

    /// Counts the votes for allowed choices.
    #[must_use]
    pub fn tally(&self) -> Tally {
        Tally::count_votes(self.votes.values(), &self.allowed_choice_ids)
    }

    /// Picks the winning choice.
    ///
    /// A strict leader always wins. Ties go through `policy`. With no votes
    /// at all, a uniformly random allowed choice wins so the story always
    /// progresses.
    pub fn resolve(&self, policy: TieBreakPolicy, rng: &mut dyn DeterministicRng) -> BallotOutcome {
        let counts = self.tally();
        let mut leaders = counts.leaders(&self.allowed_choice_ids);

        let (winner, decision) = match leaders.len() {
            0 => {
                let mut all = self.allowed_choice_ids.clone();
                let index = rng.pick_index(all.len());
                (all.swap_remove(index), Decision::NoVotes)
            }
            1 => (leaders.swap_remove(0), Decision::Majority),
            tied => {
                let index = match policy {
                    TieBreakPolicy::Random => rng.pick_index(tied),
                    TieBreakPolicy::FirstListed => 0,
                };
                (leaders.swap_remove(index), Decision::TieBreak)
            }
        };

        BallotOutcome {
            ballot_id: self.id,
            total_votes: counts.total(),
            winner,
            counts,
            decision,
        }
    }
}

#[cfg(test)]
mod tests {
    use crowdstory_test_support::{MockRng, SequenceRng, fixed_now};

    use super::*;

    fn abc_ballot() -> Ballot {
        Ballot::open(
            BallotId::new(),
            vec!["A".into(), "B".into(), "C".into()],
            fixed_now(),
            Duration::milliseconds(1000),
        )
        .unwrap()
    }

    #[test]
    fn test_open_rejects_empty_choice_set() {
        // Act
        let result = Ballot::open(BallotId::new(), Vec::new(), fixed_now(), Duration::seconds(1));

        // Assert
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_open_rejects_duplicate_choice_ids() {
        let result = Ballot::open(
            BallotId::new(),
            vec!["A".into(), "A".into()],
            fixed_now(),
            Duration::seconds(1),
        );

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_open_rejects_deadline_past_representable_time() {
        // Act
        let result = Ballot::open(
            BallotId::new(),
            vec!["A".into(), "B".into()],
            fixed_now(),
            Duration::MAX,
        );

        // Assert
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_withdrawn_vote_no_longer_counts() {
        // Arrange
        let mut ballot = abc_ballot();
        let stays = Uuid::new_v4();
        let leaves = Uuid::new_v4();
        ballot.cast(stays, "A".into(), fixed_now()).unwrap();
        ballot.cast(leaves, "B".into(), fixed_now()).unwrap();

        // Act
        let withdrawn = ballot.withdraw_vote(leaves);

        // Assert
        assert_eq!(withdrawn, Some(ChoiceId::from("B")));
        assert_eq!(ballot.voter_count(), 1);
        assert_eq!(ballot.tally().count(&"B".into()), 0);
        assert_eq!(ballot.withdraw_vote(leaves), None);
    }

    #[test]
    fn test_open_sets_deadline_from_duration() {
        let ballot = abc_ballot();

        assert_eq!(ballot.opened_at(), fixed_now());
        assert_eq!(ballot.deadline(), fixed_now() + Duration::milliseconds(1000));
    }

    #[test]
    fn test_last_vote_of_a_player_wins() {
        // Arrange
        let sequences: [&[&str]; 4] = [&["A"], &["A", "B"], &["C", "A", "C"], &["B", "B", "A", "C"]];

        for sequence in sequences {
            let mut ballot = abc_ballot();
            let player = Uuid::new_v4();

            // Act
            for choice in sequence {
                ballot.cast(player, (*choice).into(), fixed_now()).unwrap();
            }

            // Assert
            let last: ChoiceId = (*sequence.last().unwrap()).into();
            let tally = ballot.tally();
            assert_eq!(tally.total(), 1);
            assert_eq!(tally.count(&last), 1);
            assert_eq!(ballot.vote_of(player), Some(&last));
        }
    }

    #[test]
    fn test_cast_returns_updated_counts() {
        let mut ballot = abc_ballot();
        let h1 = Uuid::new_v4();
        let p1 = Uuid::new_v4();

        ballot.cast(h1, "A".into(), fixed_now()).unwrap();
        ballot.cast(p1, "B".into(), fixed_now()).unwrap();
        let tally = ballot.cast(h1, "B".into(), fixed_now()).unwrap();

        assert_eq!(tally.count(&"B".into()), 2);
        assert_eq!(tally.count(&"A".into()), 0);
        assert_eq!(tally.iter().count(), 1);
    }

    #[test]
    fn test_vote_after_deadline_is_rejected() {
        let mut ballot = abc_ballot();
        let late = fixed_now() + Duration::milliseconds(1001);

        let result = ballot.cast(Uuid::new_v4(), "A".into(), late);

        assert_eq!(result, Err(DomainError::VotingClosed));
        assert_eq!(ballot.voter_count(), 0);
    }

    #[test]
    fn test_vote_exactly_at_deadline_is_accepted() {
        let mut ballot = abc_ballot();
        let at_deadline = ballot.deadline();

        assert!(ballot.cast(Uuid::new_v4(), "A".into(), at_deadline).is_ok());
    }

    #[test]
    fn test_vote_for_unknown_choice_is_rejected() {
        let mut ballot = abc_ballot();

        let result = ballot.cast(Uuid::new_v4(), "D".into(), fixed_now());

        assert_eq!(result, Err(DomainError::InvalidChoice("D".to_owned())));
    }

    #[test]
    fn test_tally_ignores_unchecked_foreign_votes() {
        let mut ballot = abc_ballot();
        ballot.record_vote(Uuid::new_v4(), "X".into());
        ballot.record_vote(Uuid::new_v4(), "A".into());

        let tally = ballot.tally();

        assert_eq!(tally.total(), 1);
        assert_eq!(tally.count(&"X".into()), 0);
    }

    #[test]
    fn test_strict_leader_wins_under_every_policy() {
        let mut ballot = abc_ballot();
        ballot.cast(Uuid::new_v4(), "C".into(), fixed_now()).unwrap();
        ballot.cast(Uuid::new_v4(), "C".into(), fixed_now()).unwrap();
        ballot.cast(Uuid::new_v4(), "A".into(), fixed_now()).unwrap();

        for policy in [TieBreakPolicy::Random, TieBreakPolicy::FirstListed] {
            for pick in 0..3 {
                let mut rng = SequenceRng::new(vec![pick; 4]);
                let outcome = ballot.resolve(policy, &mut rng);
                assert_eq!(outcome.winner, ChoiceId::from("C"));
                assert_eq!(outcome.decision, Decision::Majority);
                assert_eq!(outcome.total_votes, 3);
                // A strict leader never consults the RNG.
                assert_eq!(rng.consumed(), 0);
            }
        }
    }

    #[test]
    fn test_zero_votes_still_produce_an_allowed_winner() {
        let ballot = abc_ballot();

        for pick in 0..3 {
            let mut rng = SequenceRng::new(vec![pick]);
            let outcome = ballot.resolve(TieBreakPolicy::Random, &mut rng);

            assert!(ballot.allowed_choice_ids().contains(&outcome.winner));
            assert_eq!(outcome.decision, Decision::NoVotes);
            assert_eq!(outcome.total_votes, 0);
        }

        let mut rng = SequenceRng::new(vec![2]);
        assert_eq!(
            ballot.resolve(TieBreakPolicy::FirstListed, &mut rng).winner,
            ChoiceId::from("C")
        );
    }

    #[test]
    fn test_random_tie_break_picks_among_tied_choices() {
        // Arrange
        let mut ballot = abc_ballot();
        ballot.cast(Uuid::new_v4(), "A".into(), fixed_now()).unwrap();
        ballot.cast(Uuid::new_v4(), "C".into(), fixed_now()).unwrap();
        let mut rng = SequenceRng::new(vec![1]);

        // Act
        let outcome = ballot.resolve(TieBreakPolicy::Random, &mut rng);

        // Assert
        assert_eq!(outcome.winner, ChoiceId::from("C"));
        assert_eq!(outcome.decision, Decision::TieBreak);
    }

    #[test]
    fn test_first_listed_tie_break_picks_earliest_choice() {
        let mut ballot = abc_ballot();
        ballot.cast(Uuid::new_v4(), "C".into(), fixed_now()).unwrap();
        ballot.cast(Uuid::new_v4(), "B".into(), fixed_now()).unwrap();

        let outcome = ballot.resolve(TieBreakPolicy::FirstListed, &mut MockRng);

        assert_eq!(outcome.winner, ChoiceId::from("B"));
        assert_eq!(outcome.decision, Decision::TieBreak);
    }

    #[test]
    fn test_arbitrary_choice_cardinality() {
        let choices: Vec<ChoiceId> = ["north", "south", "east", "west", "stay"]
            .into_iter()
            .map(ChoiceId::from)
            .collect();
        let mut ballot =
            Ballot::open(BallotId::new(), choices, fixed_now(), Duration::seconds(5)).unwrap();

        ballot.cast(Uuid::new_v4(), "stay".into(), fixed_now()).unwrap();
        let outcome = ballot.resolve(TieBreakPolicy::Random, &mut MockRng);

        assert_eq!(outcome.winner, ChoiceId::from("stay"));
    }
}
