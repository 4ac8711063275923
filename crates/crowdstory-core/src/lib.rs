//! Crowdstory Core — shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that every bounded
//! context of the party game depends on: error taxonomy, time and randomness
//! seams, command and event envelopes, and game configuration. It contains no
//! infrastructure code.

pub mod aggregate;
pub mod choice;
pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod rng;
pub mod theme;
