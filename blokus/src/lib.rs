//! Rules, scheduling, AI and client synchronization for a four-color
//! territory placement game with an optional creative overlay of special
//! tiles and item cards.

pub use ai::*;
pub use board::*;
pub use effects::*;
pub use errors::*;
pub use game::*;
pub use items::*;
pub use piece_set::*;
pub use pieces::*;
pub use protocol::*;
pub use scoring::*;
pub use snapshot::*;
pub use status::*;
pub use sync::*;
pub use visualization::*;

mod ai;
#[cfg(test)]
mod arbitrary;
mod board;
mod effects;
mod errors;
mod game;
mod items;
mod piece_set;
mod pieces;
mod protocol;
mod scoring;
mod snapshot;
mod status;
mod sync;
mod visualization;
