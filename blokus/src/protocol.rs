use serde::{Deserialize, Serialize};

use crate::{
    Board, CellDelta, Color, GameSnapshot, ItemCardKind, ItemPhaseEnd, PieceSet, PieceToPlace, PlayerResult,
    PlayerView, TriggeredEffect,
};

/// Why a turn passed without a placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A skip-turn status was consumed.
    Status,
    /// Only pieces of five cells fit, and those are banned for now.
    BigPieceBan,
    /// The countdown ran out. `strikes` counts consecutive timeouts.
    Timeout { strikes: u32 },
}

/// Something that happened in a game, as broadcast by the host.
///
/// Scores and piece sets are carried as absolute values, so replaying an event
/// yields the same state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    Started {
        snapshot: GameSnapshot,
    },
    TurnChanged {
        player: usize,
        turn: u32,
        /// Seconds on the placement countdown.
        remaining: u32,
    },
    ItemPhaseStarted {
        player: usize,
        remaining: u32,
    },
    ItemPhaseEnded {
        player: usize,
        reason: ItemPhaseEnd,
    },
    TimeUpdate {
        turn: u32,
        remaining: u32,
        /// Whether this is the item phase countdown rather than the placement one.
        item_phase: bool,
    },
    MoveApplied {
        player: usize,
        placement: PieceToPlace,
        deltas: Vec<CellDelta>,
        #[serde(default)]
        triggered: Vec<TriggeredEffect>,
        /// The whole board, present when effects changed more than `deltas`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        board: Option<Board>,
        players: Vec<PlayerView>,
        extra_turn: bool,
    },
    TurnSkipped {
        player: usize,
        turn: u32,
        reason: SkipReason,
    },
    PlayerSettled {
        player: usize,
        forced: bool,
    },
    /// A seat went offline and is played by the AI, or came back.
    PlayerConnectivity {
        player: usize,
        offline: bool,
    },
    ItemUsed {
        player: usize,
        card: ItemCardKind,
        target: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        board: Option<Board>,
        players: Vec<PlayerView>,
    },
    Finished {
        results: Vec<PlayerResult>,
    },
}

/// A command sent by a client to the host of a room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Move {
        room_id: String,
        /// Chosen by the client, echoed in the [`ServerMessage::Ack`].
        request_id: u64,
        placement: PieceToPlace,
    },
    Settle {
        room_id: String,
    },
    UseItemCard {
        room_id: String,
        card_index: usize,
        target: Option<usize>,
    },
    SkipItemPhase {
        room_id: String,
    },
    /// Asks for a full [`ServerMessage::State`], e.g. after reconnecting.
    RequestState {
        room_id: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Answer to a command. `request_id` is set for moves.
    Ack {
        request_id: Option<u64>,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Event {
        seq: u64,
        event: GameEvent,
    },
    /// The full state as of event `seq`.
    State {
        seq: u64,
        snapshot: GameSnapshot,
    },
    Paused,
    Resumed,
}

/// How one player stands, as seen by a player deciding on an item card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub player: usize,
    pub total: i32,
    /// Not settled.
    pub active: bool,
    pub shielded: bool,
    /// Whether the player has a placement that could be undone.
    pub has_placed: bool,
    pub pieces_left: u32,
}

/// Everything needed to decide on an item card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemContext {
    pub me: usize,
    pub hand: Vec<ItemCardKind>,
    pub standings: Vec<Standing>,
    pub has_negative_status: bool,
}

/// Request for a bot to do something.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Request to reset the bot's state for a new game.
    ///
    /// The response should be an [`Okay`].
    NewGame { color: Color },
    /// The bot holds item cards and may use one.
    ///
    /// The response should be an [`ItemChoice`](crate::ItemChoice).
    ItemPhase { context: ItemContext },
    /// Request to place a piece.
    ///
    /// The response should be a [`PlayTurnResponse`].
    PlayTurn {
        board: Board,
        /// The bot's unused pieces.
        pieces: PieceSet,
        /// Cells that cannot be covered.
        blocked: Vec<(i8, i8)>,
        /// Five-cell pieces may not be placed this turn.
        big_piece_ban: bool,
    },
    /// The bot should shut down.
    Bye,
}

/// Dummy struct for use in bot communication.
///
/// Used to signal an acknowledgement without data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Okay();

/// The placement a bot wants to make. `None` settles the bot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayTurnResponse(pub Option<PieceToPlace>);
