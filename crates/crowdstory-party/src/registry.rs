//! The owned registry of live rooms.
//!
//! The code map is guarded by an `RwLock`; each room by its own `Mutex`.
//! The two are never held together, and neither is held across an await.
//! A room that has emptied is flagged closed inside its own lock before its
//! map entry goes, so a caller still holding the handle cannot mutate it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crowdstory_core::aggregate::AggregateRoot;
use crowdstory_core::clock::Clock;
use crowdstory_core::config::GameConfig;
use crowdstory_core::error::DomainError;
use crowdstory_core::event::DomainEvent;
use crowdstory_core::rng::DeterministicRng;
use crowdstory_core::theme::Theme;
use tokio::sync::{Notify, watch};
use tracing::debug;
use uuid::Uuid;

use crate::domain::code::RoomCode;
use crate::domain::player::normalize_display_name;
use crate::domain::room::{LeaveOutcome, Room, RoomView};

/// Attempts at drawing an unused room code before giving up.
pub const MAX_CODE_ATTEMPTS: u32 = 64;

/// A live room with its change notifications.
#[derive(Debug)]
pub struct RoomHandle {
    room: Mutex<Room>,
    voting_complete: Notify,
    updates: watch::Sender<RoomView>,
}

impl RoomHandle {
    fn new(room: Room) -> Self {
        let (updates, _) = watch::channel(room.view());
        Self {
            room: Mutex::new(room),
            voting_complete: Notify::new(),
            updates,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Room>, DomainError> {
        self.room
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("room mutex poisoned: {e}")))
    }

    /// Runs `f` against the room under its lock. Publishes a new view when
    /// anything changed and wakes the round driver once every eligible
    /// member has voted or the room has closed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound` if the room has closed, and
    /// whatever `f` returns.
    pub fn with_room<T>(
        &self,
        f: impl FnOnce(&mut Room) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        let mut room = self.lock()?;
        if room.is_closed() {
            return Err(DomainError::RoomNotFound(room.code().to_string()));
        }

        let before = room.revision();
        let result = f(&mut *room);
        if room.revision() != before {
            for event in room.session_mut().take_uncommitted_events() {
                let meta = event.metadata();
                debug!(
                    room_code = %room.code(),
                    event_type = event.event_type(),
                    sequence_number = meta.sequence_number,
                    correlation_id = %meta.correlation_id,
                    "session event recorded"
                );
            }
            self.updates.send_replace(room.view());
            if room.is_closed() || room.all_eligible_voted() {
                self.voting_complete.notify_one();
            }
        }
        result
    }

    /// Reads the room under its lock.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound` if the room has closed.
    pub fn read<T>(&self, f: impl FnOnce(&Room) -> T) -> Result<T, DomainError> {
        let room = self.lock()?;
        if room.is_closed() {
            return Err(DomainError::RoomNotFound(room.code().to_string()));
        }
        Ok(f(&*room))
    }

    /// Subscribes to room views published after each change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RoomView> {
        self.updates.subscribe()
    }

    /// Resolves after a mutation left every eligible member voted or closed
    /// the room. Permits can be stale, so callers re-check under the lock.
    pub async fn voting_complete(&self) {
        self.voting_complete.notified().await;
    }
}

/// Every live room, keyed by code.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomCode, Arc<RoomHandle>>>,
    config: GameConfig,
}

impl RoomRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Game settings applied to new rooms.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Creates a room with a fresh code and its host as first member.
    /// Returns the code and the host's player id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an unusable host name,
    /// `DomainError::GenerationExhausted` if no unused code was drawn within
    /// [`MAX_CODE_ATTEMPTS`], and `DomainError::Infrastructure` on a poisoned
    /// lock.
    pub fn create_room(
        &self,
        host_display_name: &str,
        theme: Option<Theme>,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<(RoomCode, Uuid), DomainError> {
        let theme = theme.unwrap_or(self.config.default_theme);
        let host_name = normalize_display_name(host_display_name)?;

        let mut rooms = self
            .rooms
            .write()
            .map_err(|e| DomainError::Infrastructure(format!("registry lock poisoned: {e}")))?;
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = RoomCode::generate(rng);
            if rooms.contains_key(&code) {
                debug!(room_code = %code, "room code collision, drawing again");
                continue;
            }
            let room = Room::create(code.clone(), &host_name, theme, &self.config, clock)?;
            let host_id = room.host_id();
            rooms.insert(code.clone(), Arc::new(RoomHandle::new(room)));
            return Ok((code, host_id));
        }
        Err(DomainError::GenerationExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }

    fn rooms_read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<RoomCode, Arc<RoomHandle>>>, DomainError>
    {
        self.rooms
            .read()
            .map_err(|e| DomainError::Infrastructure(format!("registry lock poisoned: {e}")))
    }

    /// Looks up a live room.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound` if no room has `code`.
    pub fn get_room(&self, code: &RoomCode) -> Result<Arc<RoomHandle>, DomainError> {
        self.rooms_read()?
            .get(code)
            .cloned()
            .ok_or_else(|| DomainError::RoomNotFound(code.to_string()))
    }

    /// Adds a member to the room and returns the new player id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound` for an unknown or closed room and
    /// the errors of [`Room::join`].
    pub fn join_room(
        &self,
        code: &RoomCode,
        display_name: &str,
        clock: &dyn Clock,
    ) -> Result<Uuid, DomainError> {
        self.get_room(code)?
            .with_room(|room| room.join(display_name, clock))
    }

    /// Removes a member. The room is dropped from the registry once its last
    /// member has left.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound` for an unknown or closed room and
    /// `DomainError::UnknownPlayer` for a non-member.
    pub fn leave_room(
        &self,
        code: &RoomCode,
        player_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<LeaveOutcome, DomainError> {
        let handle = self.get_room(code)?;
        let outcome = handle.with_room(|room| room.leave(player_id, correlation_id, clock))?;
        if outcome == LeaveOutcome::RoomClosed {
            let mut rooms = self
                .rooms
                .write()
                .map_err(|e| DomainError::Infrastructure(format!("registry lock poisoned: {e}")))?;
            if rooms.get(code).is_some_and(|current| Arc::ptr_eq(current, &handle)) {
                rooms.remove(code);
            }
        }
        Ok(outcome)
    }

    /// Number of live rooms.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on a poisoned lock.
    pub fn room_count(&self) -> Result<usize, DomainError> {
        Ok(self.rooms_read()?.len())
    }

    /// Every live room, ordered by code.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on a poisoned lock.
    pub fn rooms(&self) -> Result<Vec<(RoomCode, Arc<RoomHandle>)>, DomainError> {
        let mut rooms: Vec<_> = self
            .rooms_read()?
            .iter()
            .map(|(code, handle)| (code.clone(), Arc::clone(handle)))
            .collect();
        rooms.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(rooms)
    }
}
