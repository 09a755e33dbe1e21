mod game;
mod player;
mod recording;
mod room;
pub use game::*;
pub use player::*;
pub use recording::*;
pub use room::*;
