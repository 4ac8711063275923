//! Aggregate root for the Game Session context.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use crowdstory_core::aggregate::AggregateRoot;
use crowdstory_core::choice::ChoiceId;
use crowdstory_core::clock::Clock;
use crowdstory_core::config::TieBreakPolicy;
use crowdstory_core::error::DomainError;
use crowdstory_core::event::EventMetadata;
use crowdstory_core::rng::DeterministicRng;
use crowdstory_core::theme::Theme;
use crowdstory_story::domain::{StoryContent, StoryContext};
use crowdstory_voting::domain::{Ballot, BallotId, BallotOutcome, Tally};
use uuid::Uuid;

use super::events::{
    GameEnded, GameStarted, IllustrationAttached, RoundAdvanced, SessionEvent, SessionEventKind,
    VoteCast, VoteWithdrawn, VotingClosed, VotingOpened,
};
use super::phase::Phase;
use super::snapshot::SessionSnapshot;

/// A resolved round kept for story continuity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// Round number.
    pub round: u32,
    /// Narrative shown that round.
    pub text: String,
    /// The winning choice.
    pub winner: ChoiceId,
    /// Label of the winning choice.
    pub winner_label: Option<String>,
}

/// The aggregate root for one room's game.
///
/// Invariants: a ballot exists exactly while the phase is `Voting`, and a
/// current story exists exactly while the phase is `Story`, `Voting` or
/// `Resolving`. Every accepted operation records one event and bumps
/// `version`.
#[derive(Debug)]
pub struct GameSession {
    /// Aggregate identifier.
    pub id: Uuid,
    version: u64,
    phase: Phase,
    round: u32,
    theme: Theme,
    max_rounds: Option<u32>,
    current_story: Option<StoryContent>,
    illustration_url: Option<String>,
    ballot: Option<Ballot>,
    last_outcome: Option<BallotOutcome>,
    history: Vec<Chapter>,
    ending: Option<String>,
    uncommitted_events: Vec<SessionEvent>,
}

impl GameSession {
    /// Creates a session in the lobby.
    #[must_use]
    pub fn new(id: Uuid, theme: Theme, max_rounds: Option<u32>) -> Self {
        Self {
            id,
            version: 0,
            phase: Phase::Lobby,
            round: 0,
            theme,
            max_rounds,
            current_story: None,
            illustration_url: None,
            ballot: None,
            last_outcome: None,
            history: Vec::new(),
            ending: None,
            uncommitted_events: Vec::new(),
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of story segments begun so far.
    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    /// The room's theme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// The scene on screen, if any.
    #[must_use]
    pub fn current_story(&self) -> Option<&StoryContent> {
        self.current_story.as_ref()
    }

    /// The open ballot, if any.
    #[must_use]
    pub fn ballot(&self) -> Option<&Ballot> {
        self.ballot.as_ref()
    }

    /// Winner of the most recently resolved ballot.
    #[must_use]
    pub fn last_winning_choice(&self) -> Option<&ChoiceId> {
        self.last_outcome.as_ref().map(|outcome| &outcome.winner)
    }

    /// Resolved rounds, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Chapter] {
        &self.history
    }

    /// Closing narrative once the game has ended.
    #[must_use]
    pub fn ending(&self) -> Option<&str> {
        self.ending.as_deref()
    }

    /// Whether the configured round limit has been reached.
    #[must_use]
    pub fn is_final_round(&self) -> bool {
        self.max_rounds.is_some_and(|max| self.round >= max)
    }

    /// Whether the open ballot's deadline has passed at `now`. False when no
    /// ballot is open.
    #[must_use]
    pub fn voting_deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.ballot
            .as_ref()
            .is_some_and(|ballot| !ballot.accepts_votes_at(now))
    }

    /// Context for generating the next segment: the opening scene while in
    /// the lobby, the follow-up to the last resolved ballot otherwise.
    #[must_use]
    pub fn story_context(&self) -> StoryContext {
        let last = self.history.last();
        StoryContext {
            round_index: self.round,
            previous_choice: last.map(|chapter| chapter.winner.clone()),
            previous_choice_label: last.and_then(|chapter| chapter.winner_label.clone()),
            theme: self.theme,
            history: self.history.iter().map(|chapter| chapter.text.clone()).collect(),
            final_round: self.is_final_round(),
        }
    }

    fn invalid_phase(&self, operation: &'static str) -> DomainError {
        DomainError::InvalidPhase {
            operation,
            phase: self.phase.as_str(),
        }
    }

    fn record(&mut self, kind: SessionEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let event = SessionEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                aggregate_id: self.id,
                sequence_number: self.version + 1,
                correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        };
        self.apply(&event);
        self.uncommitted_events.push(event);
    }

    /// Starts the game with its opening scene, moving from `Lobby` to `Story`.
    ///
    /// Host checks belong to the owning room.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::GameAlreadyStarted` outside the lobby and
    /// `DomainError::Validation` if the opening scene has no choices.
    pub fn start(
        &mut self,
        story: StoryContent,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.phase != Phase::Lobby {
            return Err(DomainError::GameAlreadyStarted);
        }
        if story.ending || story.choices.is_empty() {
            return Err(DomainError::Validation(
                "the opening scene needs choices".to_owned(),
            ));
        }

        self.record(
            SessionEventKind::GameStarted(GameStarted { round: 1, story }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Opens a ballot over the current scene's choices, moving from `Story`
    /// to `Voting`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPhase` outside `Story` and
    /// `DomainError::Validation` if the ballot cannot be opened.
    pub fn begin_voting(
        &mut self,
        duration: Duration,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<BallotId, DomainError> {
        if self.phase != Phase::Story {
            return Err(self.invalid_phase("begin_voting"));
        }
        let Some(story) = &self.current_story else {
            return Err(self.invalid_phase("begin_voting"));
        };

        let ballot = Ballot::open(BallotId::new(), story.choice_ids(), clock.now(), duration)?;
        let ballot_id = ballot.id();

        self.record(
            SessionEventKind::VotingOpened(VotingOpened {
                ballot_id,
                choice_ids: ballot.allowed_choice_ids().to_vec(),
                opened_at: ballot.opened_at(),
                deadline: ballot.deadline(),
            }),
            correlation_id,
            clock,
        );
        Ok(ballot_id)
    }

    /// Records `player_id`'s vote, replacing any earlier vote on the same
    /// ballot, and returns the updated counts. Membership checks belong to
    /// the owning room.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::VotingClosed` when no ballot is open, when
    /// `expected_ballot` names a different ballot, or past the deadline, and
    /// `DomainError::InvalidChoice` for a choice outside the ballot.
    pub fn cast_vote(
        &mut self,
        player_id: Uuid,
        choice_id: ChoiceId,
        expected_ballot: Option<BallotId>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Tally, DomainError> {
        let Some(ballot) = &self.ballot else {
            return Err(DomainError::VotingClosed);
        };
        if expected_ballot.is_some_and(|expected| expected != ballot.id()) {
            return Err(DomainError::VotingClosed);
        }
        ballot.check_vote(&choice_id, clock.now())?;
        let ballot_id = ballot.id();

        self.record(
            SessionEventKind::VoteCast(VoteCast {
                ballot_id,
                player_id,
                choice_id,
            }),
            correlation_id,
            clock,
        );
        Ok(self.ballot.as_ref().map(Ballot::tally).unwrap_or_default())
    }

    /// Removes `player_id`'s vote from the open ballot, as when the voter
    /// leaves the room. Returns whether a vote was removed.
    pub fn withdraw_vote(&mut self, player_id: Uuid, correlation_id: Uuid, clock: &dyn Clock) -> bool {
        let Some(ballot) = &self.ballot else {
            return false;
        };
        if ballot.vote_of(player_id).is_none() {
            return false;
        }
        let ballot_id = ballot.id();

        self.record(
            SessionEventKind::VoteWithdrawn(VoteWithdrawn {
                ballot_id,
                player_id,
            }),
            correlation_id,
            clock,
        );
        true
    }

    /// Closes the open ballot and resolves its winner, moving from `Voting`
    /// to `Resolving`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPhase` outside `Voting`.
    pub fn close_voting_and_resolve(
        &mut self,
        policy: TieBreakPolicy,
        rng: &mut dyn DeterministicRng,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<BallotOutcome, DomainError> {
        let Some(ballot) = self.ballot.as_ref().filter(|_| self.phase == Phase::Voting) else {
            return Err(self.invalid_phase("close_voting_and_resolve"));
        };

        let outcome = ballot.resolve(policy, rng);
        self.record(
            SessionEventKind::VotingClosed(VotingClosed {
                outcome: outcome.clone(),
            }),
            correlation_id,
            clock,
        );
        Ok(outcome)
    }

    /// Moves from `Resolving` to the next scene, or to `Ended` when `next`
    /// is an ending or the round limit has been reached. Returns the new
    /// phase.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPhase` outside `Resolving` and
    /// `DomainError::Validation` for a non-ending scene without choices.
    pub fn advance_round(
        &mut self,
        next: StoryContent,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Phase, DomainError> {
        if self.phase != Phase::Resolving {
            return Err(self.invalid_phase("advance_round"));
        }

        if next.ending || self.is_final_round() {
            self.record(
                SessionEventKind::GameEnded(GameEnded {
                    round: self.round,
                    ending: next.text,
                }),
                correlation_id,
                clock,
            );
        } else {
            if next.choices.is_empty() {
                return Err(DomainError::Validation(
                    "a continuing scene needs choices".to_owned(),
                ));
            }
            self.record(
                SessionEventKind::RoundAdvanced(RoundAdvanced {
                    round: self.round + 1,
                    story: next,
                }),
                correlation_id,
                clock,
            );
        }
        Ok(self.phase)
    }

    /// Attaches an illustration to the scene of `round`. Returns `false`, and
    /// changes nothing, when that scene is no longer on screen.
    pub fn attach_illustration(
        &mut self,
        round: u32,
        url: String,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> bool {
        if round != self.round || !self.phase.shows_story() {
            return false;
        }
        self.record(
            SessionEventKind::IllustrationAttached(IllustrationAttached { round, url }),
            correlation_id,
            clock,
        );
        true
    }

    /// Read-only view for observers.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let vote_counts = match (&self.ballot, &self.last_outcome, &self.current_story) {
            (Some(ballot), _, _) => ballot.tally().with_zeroes(ballot.allowed_choice_ids()),
            (None, Some(outcome), Some(story)) if self.phase == Phase::Resolving => {
                outcome.counts.with_zeroes(&story.choice_ids())
            }
            _ => BTreeMap::new(),
        };

        SessionSnapshot {
            phase: self.phase,
            round: self.round,
            theme: self.theme,
            story: self.current_story.as_ref().map(|story| story.text.clone()),
            choices: self
                .current_story
                .as_ref()
                .map(|story| story.choices.clone())
                .unwrap_or_default(),
            vote_counts,
            votes_cast: self.ballot.as_ref().map_or(0, Ballot::voter_count),
            ballot_id: self.ballot.as_ref().map(Ballot::id),
            deadline: self.ballot.as_ref().map(Ballot::deadline),
            last_winning_choice: self.last_winning_choice().cloned(),
            illustration_url: self.illustration_url.clone(),
            ending: self.ending.clone(),
            version: self.version,
        }
    }
}

impl AggregateRoot for GameSession {
    type Event = SessionEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            SessionEventKind::GameStarted(e) => {
                self.round = e.round;
                self.current_story = Some(e.story.clone());
                self.illustration_url = None;
                self.phase = Phase::Story;
            }
            SessionEventKind::VotingOpened(e) => {
                self.ballot = Some(Ballot::from_parts(
                    e.ballot_id,
                    e.choice_ids.clone(),
                    e.opened_at,
                    e.deadline,
                ));
                self.phase = Phase::Voting;
            }
            SessionEventKind::VoteCast(e) => {
                if let Some(ballot) = self.ballot.as_mut() {
                    ballot.record_vote(e.player_id, e.choice_id.clone());
                }
            }
            SessionEventKind::VoteWithdrawn(e) => {
                if let Some(ballot) = self.ballot.as_mut() {
                    ballot.withdraw_vote(e.player_id);
                }
            }
            SessionEventKind::VotingClosed(e) => {
                if let Some(story) = &self.current_story {
                    self.history.push(Chapter {
                        round: self.round,
                        text: story.text.clone(),
                        winner: e.outcome.winner.clone(),
                        winner_label: story.choice(&e.outcome.winner).map(|c| c.label.clone()),
                    });
                }
                self.last_outcome = Some(e.outcome.clone());
                self.ballot = None;
                self.phase = Phase::Resolving;
            }
            SessionEventKind::RoundAdvanced(e) => {
                self.round = e.round;
                self.current_story = Some(e.story.clone());
                self.illustration_url = None;
                self.phase = Phase::Story;
            }
            SessionEventKind::GameEnded(e) => {
                self.current_story = None;
                self.illustration_url = None;
                self.ending = Some(e.ending.clone());
                self.phase = Phase::Ended;
            }
            SessionEventKind::IllustrationAttached(e) => {
                self.illustration_url = Some(e.url.clone());
            }
        }
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn take_uncommitted_events(&mut self) -> Vec<Self::Event> {
        std::mem::take(&mut self.uncommitted_events)
    }
}
