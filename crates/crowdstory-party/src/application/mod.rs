//! Application services for the Party context.

pub mod command_handlers;
pub mod query_handlers;
pub mod round_driver;
