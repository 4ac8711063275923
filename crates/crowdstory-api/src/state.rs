//! Shared application state.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crowdstory_core::clock::Clock;
use crowdstory_core::rng::DeterministicRng;
use crowdstory_party::application::round_driver::DriverServices;
use crowdstory_party::registry::RoomRegistry;
use crowdstory_story::domain::StoryGenerator;
use crowdstory_story::image::ImageGenerator;

/// Longest a long-poll request waits for a change.
pub const DEFAULT_LONG_POLL_TIMEOUT: Duration = Duration::from_secs(25);

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Every live room.
    pub registry: Arc<RoomRegistry>,
    /// Injectable clock for deterministic timestamps.
    pub clock: Arc<dyn Clock + Send + Sync>,
    /// Injectable RNG for room codes and tie-breaks.
    pub rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    /// Scene source.
    pub stories: Arc<dyn StoryGenerator>,
    /// Illustration source.
    pub images: Arc<dyn ImageGenerator>,
    /// Upper bound for long-poll requests.
    pub long_poll_timeout: Duration,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("registry", &self.registry)
            .field("long_poll_timeout", &self.long_poll_timeout)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        registry: Arc<RoomRegistry>,
        clock: Arc<dyn Clock + Send + Sync>,
        rng: Arc<Mutex<dyn DeterministicRng + Send>>,
        stories: Arc<dyn StoryGenerator>,
        images: Arc<dyn ImageGenerator>,
    ) -> Self {
        Self {
            registry,
            clock,
            rng,
            stories,
            images,
            long_poll_timeout: DEFAULT_LONG_POLL_TIMEOUT,
        }
    }

    /// Replaces the long-poll bound.
    #[must_use]
    pub fn with_long_poll_timeout(mut self, timeout: Duration) -> Self {
        self.long_poll_timeout = timeout;
        self
    }

    /// Collaborators handed to each round driver.
    #[must_use]
    pub fn driver_services(&self) -> DriverServices {
        DriverServices {
            clock: Arc::clone(&self.clock),
            rng: Arc::clone(&self.rng),
            stories: Arc::clone(&self.stories),
            images: Arc::clone(&self.images),
        }
    }
}
