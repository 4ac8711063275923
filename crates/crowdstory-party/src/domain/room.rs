//! Rooms: membership plus the game session they own.

use chrono::{DateTime, Utc};
use crowdstory_core::aggregate::AggregateRoot;
use crowdstory_core::choice::ChoiceId;
use crowdstory_core::clock::Clock;
use crowdstory_core::config::GameConfig;
use crowdstory_core::error::DomainError;
use crowdstory_core::theme::Theme;
use crowdstory_session::domain::{GameSession, Phase, SessionSnapshot};
use crowdstory_story::domain::StoryContent;
use crowdstory_voting::domain::{BallotId, Tally};
use serde::Serialize;
use uuid::Uuid;

use super::code::RoomCode;
use super::player::{Player, normalize_display_name};

/// What happened to the room after a member left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Others remain. Carries the new host if the host changed.
    Left {
        /// The member promoted to host, if any.
        new_host: Option<Uuid>,
    },
    /// The last member left and the room is closed.
    RoomClosed,
}

/// A party: its members and the game they play.
///
/// Members are kept in join order. The host is always a current member, and
/// a closed room accepts no further operations.
#[derive(Debug)]
pub struct Room {
    code: RoomCode,
    host_id: Uuid,
    players: Vec<Player>,
    session: GameSession,
    max_players: usize,
    created_at: DateTime<Utc>,
    membership_revision: u64,
    closed: bool,
}

/// Read-only view of a room for observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomView {
    /// The room code.
    pub code: RoomCode,
    /// Current host.
    pub host_id: Uuid,
    /// Members in join order.
    pub players: Vec<PlayerView>,
    /// The game state.
    pub session: SessionSnapshot,
    /// Increases on every membership or game change.
    pub revision: u64,
}

/// A member as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerView {
    /// Player identifier.
    pub id: Uuid,
    /// Display name.
    pub display_name: String,
    /// Whether the player has a live connection.
    pub is_connected: bool,
    /// Whether the player is the host.
    pub is_host: bool,
    /// Whether the player has voted on the open ballot.
    pub has_voted: bool,
}

impl Room {
    /// Creates a room in the lobby with its host as the only member.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an unusable host name.
    pub fn create(
        code: RoomCode,
        host_display_name: &str,
        theme: Theme,
        config: &GameConfig,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        let name = normalize_display_name(host_display_name)?;
        let now = clock.now();
        let host = Player::new(name, now);
        Ok(Self {
            code,
            host_id: host.id,
            players: vec![host],
            session: GameSession::new(Uuid::new_v4(), theme, config.max_rounds),
            max_players: config.max_players,
            created_at: now,
            membership_revision: 0,
            closed: false,
        })
    }

    /// The room code.
    #[must_use]
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Current host.
    #[must_use]
    pub fn host_id(&self) -> Uuid {
        self.host_id
    }

    /// Members in join order.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// When the room was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The game session.
    #[must_use]
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Mutable access to the game session.
    pub fn session_mut(&mut self) -> &mut GameSession {
        &mut self.session
    }

    /// Whether the last member has left.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Monotonic counter covering membership and game changes.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.membership_revision + self.session.version()
    }

    fn member(&self, player_id: Uuid) -> Result<&Player, DomainError> {
        self.players
            .iter()
            .find(|p| p.id == player_id)
            .ok_or(DomainError::UnknownPlayer(player_id))
    }

    /// Adds a member and returns the new player id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an unusable name,
    /// `DomainError::GameAlreadyStarted` once the game has left the lobby,
    /// `DomainError::RoomFull` at capacity and `DomainError::NameTaken` when
    /// another member already uses the name.
    pub fn join(&mut self, display_name: &str, clock: &dyn Clock) -> Result<Uuid, DomainError> {
        let name = normalize_display_name(display_name)?;
        if self.session.phase() != Phase::Lobby {
            return Err(DomainError::GameAlreadyStarted);
        }
        if self.players.len() >= self.max_players {
            return Err(DomainError::RoomFull {
                max_players: self.max_players,
            });
        }
        if self.players.iter().any(|p| p.display_name == name) {
            return Err(DomainError::NameTaken(name));
        }

        let player = Player::new(name, clock.now());
        let player_id = player.id;
        self.players.push(player);
        self.membership_revision += 1;
        Ok(player_id)
    }

    /// Removes a member and withdraws their vote from any open ballot. A
    /// departing host is succeeded by the earliest remaining joiner; the last
    /// member out closes the room.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownPlayer` if `player_id` is not a member.
    pub fn leave(
        &mut self,
        player_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<LeaveOutcome, DomainError> {
        let index = self
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or(DomainError::UnknownPlayer(player_id))?;
        self.players.remove(index);
        self.membership_revision += 1;
        self.session.withdraw_vote(player_id, correlation_id, clock);

        let Some(successor) = self.players.first() else {
            self.closed = true;
            return Ok(LeaveOutcome::RoomClosed);
        };
        let new_host = if player_id == self.host_id {
            self.host_id = successor.id;
            Some(successor.id)
        } else {
            None
        };
        Ok(LeaveOutcome::Left { new_host })
    }

    /// Marks a member's connection state. Returns whether it changed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownPlayer` if `player_id` is not a member.
    pub fn set_connected(&mut self, player_id: Uuid, connected: bool) -> Result<bool, DomainError> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or(DomainError::UnknownPlayer(player_id))?;
        if player.is_connected == connected {
            return Ok(false);
        }
        player.is_connected = connected;
        self.membership_revision += 1;
        Ok(true)
    }

    /// Checks that `player_id` may start the game.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownPlayer` for a non-member,
    /// `DomainError::NotHost` for anyone but the host and
    /// `DomainError::GameAlreadyStarted` outside the lobby.
    pub fn ensure_can_start(&self, player_id: Uuid) -> Result<(), DomainError> {
        self.member(player_id)?;
        if player_id != self.host_id {
            return Err(DomainError::NotHost);
        }
        if self.session.phase() != Phase::Lobby {
            return Err(DomainError::GameAlreadyStarted);
        }
        Ok(())
    }

    /// Starts the game with its opening scene on behalf of `player_id`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Room::ensure_can_start`] and of
    /// [`GameSession::start`].
    pub fn start_game(
        &mut self,
        player_id: Uuid,
        opening: StoryContent,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_can_start(player_id)?;
        self.session.start(opening, correlation_id, clock)
    }

    /// Records a member's vote on the open ballot.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownPlayer` for a non-member and the errors
    /// of [`GameSession::cast_vote`].
    pub fn cast_vote(
        &mut self,
        player_id: Uuid,
        choice_id: ChoiceId,
        expected_ballot: Option<BallotId>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Tally, DomainError> {
        self.member(player_id)?;
        self.session
            .cast_vote(player_id, choice_id, expected_ballot, correlation_id, clock)
    }

    /// Whether every connected member has voted on the open ballot.
    #[must_use]
    pub fn all_eligible_voted(&self) -> bool {
        let Some(ballot) = self.session.ballot() else {
            return false;
        };
        let mut eligible = self.players.iter().filter(|p| p.is_connected).peekable();
        eligible.peek().is_some() && eligible.all(|p| ballot.vote_of(p.id).is_some())
    }

    /// Read-only view for observers.
    #[must_use]
    pub fn view(&self) -> RoomView {
        let ballot = self.session.ballot();
        RoomView {
            code: self.code.clone(),
            host_id: self.host_id,
            players: self
                .players
                .iter()
                .map(|p| PlayerView {
                    id: p.id,
                    display_name: p.display_name.clone(),
                    is_connected: p.is_connected,
                    is_host: p.id == self.host_id,
                    has_voted: ballot.is_some_and(|b| b.vote_of(p.id).is_some()),
                })
                .collect(),
            session: self.session.snapshot(),
            revision: self.revision(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use crowdstory_core::config::TieBreakPolicy;
    use crowdstory_story::domain::Choice;
    use crowdstory_test_support::{FixedClock, ManualClock, MockRng, fixed_now};

    use super::*;

    fn room_with_host(config: &GameConfig) -> Room {
        let clock = FixedClock(fixed_now());
        Room::create(
            RoomCode::parse("ABC123").unwrap(),
            "Host",
            Theme::Scifi,
            config,
            &clock,
        )
        .unwrap()
    }

    fn opening() -> StoryContent {
        StoryContent::scene(
            "opening",
            vec![
                Choice::new("A", "left"),
                Choice::new("B", "right"),
                Choice::new("C", "back"),
            ],
        )
    }

    #[test]
    fn test_create_makes_host_the_only_member() {
        // Arrange / Act
        let room = room_with_host(&GameConfig::default());

        // Assert
        assert_eq!(room.players().len(), 1);
        assert_eq!(room.players()[0].id, room.host_id());
        assert_eq!(room.session().phase(), Phase::Lobby);
        assert_eq!(room.revision(), 0);
    }

    #[test]
    fn test_join_rejects_duplicate_name() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let mut room = room_with_host(&GameConfig::default());
        room.join("Sam", &clock).unwrap();

        // Act
        let result = room.join(" Sam ", &clock);

        // Assert
        assert_eq!(result, Err(DomainError::NameTaken("Sam".to_owned())));
        assert_eq!(room.players().len(), 2);
    }

    #[test]
    fn test_join_rejects_when_full() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let config = GameConfig {
            max_players: 2,
            ..GameConfig::default()
        };
        let mut room = room_with_host(&config);
        room.join("Sam", &clock).unwrap();

        // Act
        let result = room.join("Kim", &clock);

        // Assert
        assert_eq!(result, Err(DomainError::RoomFull { max_players: 2 }));
    }

    #[test]
    fn test_join_after_start_fails_with_game_already_started() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let mut room = room_with_host(&GameConfig::default());
        let host = room.host_id();
        room.start_game(host, opening(), Uuid::new_v4(), &clock).unwrap();

        // Act
        let result = room.join("Late", &clock);

        // Assert
        assert_eq!(result, Err(DomainError::GameAlreadyStarted));
    }

    #[test]
    fn test_host_leaving_promotes_earliest_joiner() {
        // Arrange
        let clock = ManualClock::new(fixed_now());
        let mut room = room_with_host(&GameConfig::default());
        let host = room.host_id();
        clock.advance(Duration::seconds(1));
        let first = room.join("First", &clock).unwrap();
        clock.advance(Duration::seconds(1));
        room.join("Second", &clock).unwrap();

        // Act
        let outcome = room.leave(host, Uuid::new_v4(), &clock).unwrap();

        // Assert
        assert_eq!(outcome, LeaveOutcome::Left { new_host: Some(first) });
        assert_eq!(room.host_id(), first);
        let hosts = room.view().players.iter().filter(|p| p.is_host).count();
        assert_eq!(hosts, 1);
    }

    #[test]
    fn test_non_host_leaving_keeps_host() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let mut room = room_with_host(&GameConfig::default());
        let host = room.host_id();
        let sam = room.join("Sam", &clock).unwrap();

        // Act
        let outcome = room.leave(sam, Uuid::new_v4(), &clock).unwrap();

        // Assert
        assert_eq!(outcome, LeaveOutcome::Left { new_host: None });
        assert_eq!(room.host_id(), host);
    }

    #[test]
    fn test_last_member_leaving_closes_room() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let mut room = room_with_host(&GameConfig::default());
        let host = room.host_id();

        // Act
        let outcome = room.leave(host, Uuid::new_v4(), &clock).unwrap();

        // Assert
        assert_eq!(outcome, LeaveOutcome::RoomClosed);
        assert!(room.is_closed());
    }

    #[test]
    fn test_leave_unknown_player_fails() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let mut room = room_with_host(&GameConfig::default());
        let stranger = Uuid::new_v4();

        // Act
        let result = room.leave(stranger, Uuid::new_v4(), &clock);

        // Assert
        assert_eq!(result, Err(DomainError::UnknownPlayer(stranger)));
    }

    #[test]
    fn test_leaving_mid_ballot_withdraws_vote() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let mut room = room_with_host(&GameConfig::default());
        let host = room.host_id();
        let sam = room.join("Sam", &clock).unwrap();
        room.start_game(host, opening(), Uuid::new_v4(), &clock).unwrap();
        room.session_mut()
            .begin_voting(Duration::seconds(15), Uuid::new_v4(), &clock)
            .unwrap();
        room.cast_vote(sam, ChoiceId::from("B"), None, Uuid::new_v4(), &clock)
            .unwrap();

        // Act
        room.leave(sam, Uuid::new_v4(), &clock).unwrap();

        // Assert
        let ballot = room.session().ballot().unwrap();
        assert_eq!(ballot.vote_of(sam), None);
        assert_eq!(ballot.tally().total(), 0);
        assert!(!room.all_eligible_voted());
        let outcome = room
            .session_mut()
            .close_voting_and_resolve(TieBreakPolicy::FirstListed, &mut MockRng, Uuid::new_v4(), &clock)
            .unwrap();
        assert_eq!(outcome.total_votes, 0);
    }

    #[test]
    fn test_start_game_by_non_host_fails_with_not_host() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let mut room = room_with_host(&GameConfig::default());
        let sam = room.join("Sam", &clock).unwrap();

        // Act
        let result = room.start_game(sam, opening(), Uuid::new_v4(), &clock);

        // Assert
        assert_eq!(result, Err(DomainError::NotHost));
        assert_eq!(room.session().phase(), Phase::Lobby);
    }

    #[test]
    fn test_cast_vote_by_non_member_fails_with_unknown_player() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let mut room = room_with_host(&GameConfig::default());
        let host = room.host_id();
        room.start_game(host, opening(), Uuid::new_v4(), &clock).unwrap();
        room.session_mut()
            .begin_voting(Duration::seconds(15), Uuid::new_v4(), &clock)
            .unwrap();
        let stranger = Uuid::new_v4();

        // Act
        let result = room.cast_vote(stranger, ChoiceId::from("A"), None, Uuid::new_v4(), &clock);

        // Assert
        assert_eq!(result, Err(DomainError::UnknownPlayer(stranger)));
    }

    #[test]
    fn test_all_eligible_voted_ignores_disconnected_members() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let mut room = room_with_host(&GameConfig::default());
        let host = room.host_id();
        let sam = room.join("Sam", &clock).unwrap();
        room.start_game(host, opening(), Uuid::new_v4(), &clock).unwrap();
        room.session_mut()
            .begin_voting(Duration::seconds(15), Uuid::new_v4(), &clock)
            .unwrap();
        room.cast_vote(host, ChoiceId::from("A"), None, Uuid::new_v4(), &clock)
            .unwrap();
        assert!(!room.all_eligible_voted());

        // Act
        room.set_connected(sam, false).unwrap();

        // Assert
        assert!(room.all_eligible_voted());
    }

    #[test]
    fn test_all_eligible_voted_is_false_outside_voting() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let mut room = room_with_host(&GameConfig::default());
        let host = room.host_id();
        room.start_game(host, opening(), Uuid::new_v4(), &clock).unwrap();
        room.session_mut()
            .begin_voting(Duration::seconds(15), Uuid::new_v4(), &clock)
            .unwrap();
        room.cast_vote(host, ChoiceId::from("B"), None, Uuid::new_v4(), &clock)
            .unwrap();

        // Act
        room.session_mut()
            .close_voting_and_resolve(TieBreakPolicy::Random, &mut MockRng, Uuid::new_v4(), &clock)
            .unwrap();

        // Assert
        assert!(!room.all_eligible_voted());
    }

    #[test]
    fn test_revision_grows_with_membership_and_game_changes() {
        // Arrange
        let clock = FixedClock(fixed_now());
        let mut room = room_with_host(&GameConfig::default());
        let host = room.host_id();

        // Act
        room.join("Sam", &clock).unwrap();
        room.start_game(host, opening(), Uuid::new_v4(), &clock).unwrap();

        // Assert
        assert_eq!(room.revision(), 2);
        assert_eq!(room.view().revision, 2);
    }
}
