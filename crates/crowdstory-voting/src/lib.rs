//! Crowdstory — Ballot & Tally bounded context.
//!
//! Responsible for collecting one vote per player for a single round,
//! counting them, and picking a winner with a tie-break policy.

pub mod domain;
