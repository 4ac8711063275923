//! Domain model for the Party context.

pub mod code;
pub mod commands;
pub mod player;
pub mod room;

pub use code::RoomCode;
pub use player::Player;
pub use room::Room;
