//! Crowdstory — Game Session bounded context.
//!
//! Responsible for the phase state machine of one game: lobby, story,
//! voting, resolving and ending, together with the round counter, the
//! current scene and the open ballot.

pub mod domain;
