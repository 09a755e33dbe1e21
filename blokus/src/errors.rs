use crate::{IllegalPlacement, PieceId};

/// The error type for requests to [`GameState`](crate::GameState).
///
/// These are always recoverable: the state is left untouched and the player
/// can be asked again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IllegalAction {
    InvalidPlayerCount { count: usize },
    AlreadyStarted,
    GameNotRunning,
    UnknownPlayer { player: usize },
    NotYourTurn { current: usize },
    AlreadySettled,
    PieceNotAvailable { piece: PieceId },
    BigPieceBanned { piece: PieceId },
    ItemPhaseActive,
    NoItemPhase,
    NotCreative,
    NoSuchCard { index: usize },
    TargetRequired,
    InvalidTarget { target: usize },
    TargetShielded { target: usize },
    CardHasNoEffect,
    IllegalPlacement(IllegalPlacement),
}

impl std::error::Error for IllegalAction {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IllegalAction::IllegalPlacement(err) => Some(err),
            _ => None,
        }
    }
}

impl From<IllegalPlacement> for IllegalAction {
    fn from(err: IllegalPlacement) -> Self {
        IllegalAction::IllegalPlacement(err)
    }
}

impl std::fmt::Display for IllegalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IllegalAction::InvalidPlayerCount { count } => {
                write!(f, "A game needs 2 to 4 players, got {}", count)
            }
            IllegalAction::AlreadyStarted => write!(f, "The game has already been started"),
            IllegalAction::GameNotRunning => write!(f, "The game is not running"),
            IllegalAction::UnknownPlayer { player } => write!(f, "There is no player {}", player),
            IllegalAction::NotYourTurn { current } => {
                write!(f, "It is player {}'s turn", current)
            }
            IllegalAction::AlreadySettled => write!(f, "The player has already settled"),
            IllegalAction::PieceNotAvailable { piece } => {
                write!(f, "Piece {} has already been used or lost", piece)
            }
            IllegalAction::BigPieceBanned { piece } => {
                write!(f, "Piece {} is too big while the big piece ban is active", piece)
            }
            IllegalAction::ItemPhaseActive => {
                write!(f, "No piece can be placed during the item phase")
            }
            IllegalAction::NoItemPhase => write!(f, "There is no item phase right now"),
            IllegalAction::NotCreative => write!(f, "Item cards only exist in creative games"),
            IllegalAction::NoSuchCard { index } => write!(f, "There is no item card at index {}", index),
            IllegalAction::TargetRequired => write!(f, "This card must be played on an opponent"),
            IllegalAction::InvalidTarget { target } => {
                write!(f, "Player {} is not an active opponent", target)
            }
            IllegalAction::TargetShielded { target } => {
                write!(f, "Player {} is protected by a steel shield", target)
            }
            IllegalAction::CardHasNoEffect => write!(f, "The card would have no effect"),
            IllegalAction::IllegalPlacement(_) => write!(f, "The placement is not legal"),
        }
    }
}
