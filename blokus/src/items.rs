use serde::{Deserialize, Serialize};

use crate::{EffectResult, PieceRemoval, StatusKind};

/// Most cards a player can hold. Cards granted beyond this are discarded.
pub const MAX_HAND_SIZE: usize = 3;

/// The consumable cards of creative mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCardKind {
    /// +4 bonus points for the user.
    ScoreBoost,
    /// Steel shield for the user for two turns.
    Shield,
    /// The user's next placement scores double.
    Momentum,
    /// Takes up to 3 points from the target and gives them to the user.
    Steal,
    /// The target skips their next turn.
    Freeze,
    /// Moves one negative status from the user to the target.
    Blame,
    /// Undoes the target's most recent placement.
    Rewind,
    /// The target loses their largest unplaced piece.
    Sabotage,
}

impl ItemCardKind {
    pub const ALL: [ItemCardKind; 8] = [
        ItemCardKind::ScoreBoost,
        ItemCardKind::Shield,
        ItemCardKind::Momentum,
        ItemCardKind::Steal,
        ItemCardKind::Freeze,
        ItemCardKind::Blame,
        ItemCardKind::Rewind,
        ItemCardKind::Sabotage,
    ];

    /// Whether the card is played on an opponent rather than on oneself.
    pub fn requires_target(self) -> bool {
        matches!(
            self,
            ItemCardKind::Steal
                | ItemCardKind::Freeze
                | ItemCardKind::Blame
                | ItemCardKind::Rewind
                | ItemCardKind::Sabotage
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ItemCardKind::ScoreBoost => "Score Boost",
            ItemCardKind::Shield => "Steel Shield",
            ItemCardKind::Momentum => "Momentum",
            ItemCardKind::Steal => "Steal",
            ItemCardKind::Freeze => "Freeze",
            ItemCardKind::Blame => "Blame",
            ItemCardKind::Rewind => "Rewind",
            ItemCardKind::Sabotage => "Sabotage",
        }
    }

    /// What the card does, relative to its recipient (the target, or the user
    /// for self-targeted cards).
    pub fn effect(self) -> EffectResult {
        match self {
            ItemCardKind::ScoreBoost => EffectResult {
                score_delta: 4,
                ..EffectResult::default()
            },
            ItemCardKind::Shield => EffectResult::with_status(StatusKind::SteelShield, 2),
            ItemCardKind::Momentum => EffectResult::with_status(StatusKind::DoubleNext, 1),
            ItemCardKind::Steal => EffectResult {
                score_delta: -3,
                user_score_delta: 3,
                ..EffectResult::default()
            },
            ItemCardKind::Freeze => EffectResult::with_status(StatusKind::SkipTurn, 1),
            ItemCardKind::Blame => EffectResult {
                transfer_negative_status: true,
                ..EffectResult::default()
            },
            ItemCardKind::Rewind => EffectResult {
                undo_last_move: true,
                ..EffectResult::default()
            },
            ItemCardKind::Sabotage => EffectResult {
                remove_piece: Some(PieceRemoval::Largest),
                ..EffectResult::default()
            },
        }
    }
}

impl std::fmt::Display for ItemCardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The cards one player holds, in the order they were received.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hand(Vec<ItemCardKind>);

impl Hand {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds a card. Returns `false` and drops the card when the hand is full.
    pub fn push(&mut self, card: ItemCardKind) -> bool {
        if self.0.len() >= MAX_HAND_SIZE {
            return false;
        }
        self.0.push(card);
        true
    }

    pub fn get(&self, index: usize) -> Option<ItemCardKind> {
        self.0.get(index).copied()
    }

    pub fn remove(&mut self, index: usize) -> Option<ItemCardKind> {
        if index < self.0.len() {
            Some(self.0.remove(index))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn cards(&self) -> &[ItemCardKind] {
        &self.0
    }
}

/// The time-boxed window before placement in which a card may be used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPhase {
    pub player: usize,
    pub remaining: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemPhaseEnd {
    Used,
    Skipped,
    TimedOut,
}

/// What a player decided to do during the item phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemChoice {
    /// `None` skips the phase.
    #[serde(default)]
    pub card_index: Option<usize>,
    #[serde(default)]
    pub target: Option<usize>,
}
