//! Domain model for the Story context.

pub mod content;
pub mod generator;

pub use content::{Choice, StoryContent, StoryContext};
pub use generator::{ContentSource, FallbackReason, GeneratedContent, StoryGenerator};
