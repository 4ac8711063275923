//! Shared test doubles and utilities for the Crowdstory party game.

mod clock;
mod rng;
mod story;

pub use clock::{FixedClock, ManualClock, fixed_now};
pub use rng::{MockRng, SequenceRng};
pub use story::{RecordingImageGenerator, ScriptedStoryGenerator};
