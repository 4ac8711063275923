//! Crowdstory — Party bounded context.
//!
//! Responsible for rooms and their membership, the registry that owns every
//! live room, and the round driver that moves a started game from scene to
//! ballot to resolution until the story ends.

pub mod application;
pub mod domain;
pub mod registry;
