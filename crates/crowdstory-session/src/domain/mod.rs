//! Domain model for the Game Session context.

pub mod aggregates;
pub mod events;
pub mod phase;
pub mod snapshot;

pub use aggregates::{Chapter, GameSession};
pub use phase::Phase;
pub use snapshot::SessionSnapshot;
