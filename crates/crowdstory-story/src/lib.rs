//! Crowdstory — Story & Illustration collaborators.
//!
//! Supplies the narrative for each round. The game core only sees the
//! [`domain::StoryGenerator`] and [`image::ImageGenerator`] traits; this crate
//! also ships the offline story table and a generator that drives a hosted
//! language model, falling back to the table whenever the model misbehaves.

pub mod chat;
pub mod domain;
pub mod fallback;
pub mod image;
pub mod model;
