//! Indoor Navigation
//!
//! - Room classification from the set of currently visible objects
//! - Static house layout
//! - Coordinate-delta direction hints between rooms
//!
//! Directions are hints derived from room coordinates only. They do not
//! account for walls, doors or obstacles.

pub mod layout;
pub mod planner;
pub mod room;

pub use layout::{LayoutEntry, LayoutTable};
pub use planner::{describe, plan, Instruction};
pub use room::{RoomClassifier, RoomMatch, RoomProfile, RoomRule};

use thiserror::Error;

/// Indoor navigation error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndoorError {
    #[error("Unknown room: {0}")]
    UnknownRoom(String),

    #[error("Room table is empty")]
    EmptyTable,

    #[error("Room {0} has no required objects")]
    EmptyRoom(String),

    #[error("Room {0} is listed more than once")]
    DuplicateRoom(String),
}
