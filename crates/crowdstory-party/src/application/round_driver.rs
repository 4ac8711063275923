//! The round driver: one task per started room.
//!
//! Each round it opens a ballot, waits for the deadline or for every
//! eligible member to vote, resolves the ballot, fetches the next scene and
//! advances the session, until the story ends or the room closes. Every
//! mutation goes through the room handle, so a room that closed while the
//! driver was waiting is never written to.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use crowdstory_core::clock::Clock;
use crowdstory_core::config::GameConfig;
use crowdstory_core::error::DomainError;
use crowdstory_core::rng::DeterministicRng;
use crowdstory_session::domain::Phase;
use crowdstory_story::domain::{ContentSource, FallbackReason, GeneratedContent, StoryGenerator};
use crowdstory_story::image::{ImageGenerator, ImageRequest};
use crowdstory_voting::domain::Ballot;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::code::RoomCode;
use crate::domain::room::Room;
use crate::registry::RoomHandle;

/// Why a driver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverExit {
    /// The story reached its ending.
    Ended {
        /// Rounds played.
        rounds: u32,
    },
    /// The room closed underneath the driver.
    RoomClosed,
}

/// Collaborators shared by every driver.
#[derive(Clone)]
pub struct DriverServices {
    /// Time source.
    pub clock: Arc<dyn Clock + Send + Sync>,
    /// Tie-break and no-vote randomness.
    pub rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    /// Scene source.
    pub stories: Arc<dyn StoryGenerator>,
    /// Illustration source.
    pub images: Arc<dyn ImageGenerator>,
}

impl std::fmt::Debug for DriverServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverServices").finish_non_exhaustive()
    }
}

/// Drives one room's game from its first ballot to its ending.
#[derive(Debug)]
pub struct RoundDriver {
    code: RoomCode,
    handle: Arc<RoomHandle>,
    services: DriverServices,
    config: GameConfig,
}

impl RoundDriver {
    /// Creates a driver for a room whose game has started.
    #[must_use]
    pub fn new(
        code: RoomCode,
        handle: Arc<RoomHandle>,
        services: DriverServices,
        config: GameConfig,
    ) -> Self {
        Self {
            code,
            handle,
            services,
            config,
        }
    }

    /// Runs the driver on its own task.
    pub fn spawn(self) -> JoinHandle<Result<DriverExit, DomainError>> {
        tokio::spawn(self.run())
    }

    /// Runs the driver on its own task, watched by a second task that logs
    /// the driver panicking or being cancelled.
    pub fn spawn_supervised(self) -> JoinHandle<Option<DriverExit>> {
        let code = self.code.clone();
        tokio::spawn(supervise(code, self.spawn()))
    }

    /// Runs rounds until the story ends or the room closes.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` for failures other than the room closing, such
    /// as a poisoned lock or a session in an unexpected phase.
    #[instrument(skip(self), fields(room_code = %self.code))]
    pub async fn run(self) -> Result<DriverExit, DomainError> {
        match self.drive().await {
            Err(DomainError::RoomNotFound(_)) => {
                info!("room closed, round driver stopping");
                Ok(DriverExit::RoomClosed)
            }
            Err(e) => {
                warn!(error = %e, "round driver failed");
                Err(e)
            }
            Ok(exit) => Ok(exit),
        }
    }

    async fn drive(&self) -> Result<DriverExit, DomainError> {
        let clock = self.services.clock.as_ref();
        loop {
            let correlation_id = Uuid::new_v4();
            self.illustrate_current_scene()?;

            let deadline = self.handle.with_room(|room| {
                room.session_mut().begin_voting(
                    self.config.voting_duration(),
                    correlation_id,
                    clock,
                )?;
                room.session()
                    .ballot()
                    .map(Ballot::deadline)
                    .ok_or_else(|| {
                        DomainError::Infrastructure("ballot missing after opening".to_owned())
                    })
            })?;
            debug!(%correlation_id, %deadline, "voting opened");

            self.wait_for_votes(deadline).await?;

            let outcome = self.handle.with_room(|room| {
                let mut rng = self
                    .services
                    .rng
                    .lock()
                    .map_err(|e| DomainError::Infrastructure(format!("RNG mutex poisoned: {e}")))?;
                room.session_mut().close_voting_and_resolve(
                    self.config.tie_break,
                    &mut *rng,
                    correlation_id,
                    clock,
                )
            })?;
            info!(
                %correlation_id,
                winner = %outcome.winner,
                total_votes = outcome.total_votes,
                decision = ?outcome.decision,
                "ballot resolved"
            );

            let context = self.handle.read(|room| room.session().story_context())?;
            let next = self.services.stories.generate(&context).await;
            report_source(&self.code, correlation_id, &next);

            let (phase, round) = self.handle.with_room(|room| {
                let phase = room
                    .session_mut()
                    .advance_round(next.content, correlation_id, clock)?;
                Ok((phase, room.session().round()))
            })?;

            if phase == Phase::Ended {
                info!(%correlation_id, rounds = round, "story ended");
                return Ok(DriverExit::Ended { rounds: round });
            }
            info!(%correlation_id, round, "round advanced");
        }
    }

    /// Waits for the deadline, returning early once every eligible member
    /// has voted.
    async fn wait_for_votes(&self, deadline: DateTime<Utc>) -> Result<(), DomainError> {
        let sleep = tokio::time::sleep(self.services.clock.remaining_until(deadline));
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                () = &mut sleep => return Ok(()),
                () = self.handle.voting_complete() => {
                    if self.handle.read(Room::all_eligible_voted)? {
                        debug!("every eligible player voted, closing early");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Requests an illustration for the scene on screen without waiting
    /// for it.
    fn illustrate_current_scene(&self) -> Result<(), DomainError> {
        let request = self.handle.read(|room| {
            let session = room.session();
            session.current_story().map(|story| {
                let label = session
                    .history()
                    .last()
                    .and_then(|chapter| chapter.winner_label.clone());
                (
                    session.round(),
                    ImageRequest::for_scene(session.theme(), story.text.clone(), label),
                )
            })
        })?;
        let Some((round, request)) = request else {
            return Ok(());
        };

        let handle = Arc::clone(&self.handle);
        let images = Arc::clone(&self.services.images);
        let clock = Arc::clone(&self.services.clock);
        let code = self.code.clone();
        tokio::spawn(async move {
            let Some(url) = images.generate(&request).await else {
                return;
            };
            let attached = handle.with_room(|room| {
                Ok(room
                    .session_mut()
                    .attach_illustration(round, url, Uuid::new_v4(), clock.as_ref()))
            });
            match attached {
                Ok(true) => debug!(room_code = %code, round, "illustration attached"),
                Ok(false) => debug!(room_code = %code, round, "illustration arrived after scene moved on"),
                Err(e) => debug!(room_code = %code, round, error = %e, "illustration dropped"),
            }
        });
        Ok(())
    }
}

/// Awaits a driver task. Returns how it stopped, or `None` when it failed,
/// panicked or was cancelled.
pub async fn supervise(
    code: RoomCode,
    driver: JoinHandle<Result<DriverExit, DomainError>>,
) -> Option<DriverExit> {
    match driver.await {
        Ok(Ok(exit)) => Some(exit),
        Ok(Err(_)) => None,
        Err(e) => {
            warn!(
                room_code = %code,
                panicked = e.is_panic(),
                error = %e,
                "round driver task aborted"
            );
            None
        }
    }
}

/// Logs scenes that had to be served from the offline table after a
/// generator failure.
pub(crate) fn report_source(code: &RoomCode, correlation_id: Uuid, content: &GeneratedContent) {
    match &content.source {
        ContentSource::Fallback { reason } if *reason != FallbackReason::Offline => warn!(
            room_code = %code,
            %correlation_id,
            reason = ?reason,
            "scene served from fallback content"
        ),
        source => debug!(room_code = %code, %correlation_id, source = ?source, "scene ready"),
    }
}
