//! Domain model for the Ballot & Tally context.

pub mod ballot;
pub mod tally;

pub use ballot::{Ballot, BallotId};
pub use tally::{BallotOutcome, Decision, Tally};
