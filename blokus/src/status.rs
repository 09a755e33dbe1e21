use serde::{Deserialize, Serialize};

/// Temporary conditions attached to a player in creative mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// The player's next turn is skipped.
    SkipTurn,
    /// The next placement only scores half (bonus ledger takes the other half back).
    HalfScore,
    /// The next placement scores double.
    DoubleNext,
    /// The turn countdown is halved.
    TimePressure,
    /// Opponent-targeted item cards cannot be used on this player.
    SteelShield,
    /// Pieces of size 5 may not be placed.
    BigPieceBan,
    /// Purple tiles roll on the upgraded table.
    PurpleUpgrade,
}

impl StatusKind {
    /// Whether the status hurts its owner. Only these can be moved by a blame card.
    pub fn is_negative(self) -> bool {
        matches!(
            self,
            StatusKind::SkipTurn
                | StatusKind::HalfScore
                | StatusKind::TimePressure
                | StatusKind::BigPieceBan
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    pub remaining_turns: i32,
    /// Turn counter value when the status was granted. The owner's turn that
    /// was running at that point does not count towards the duration.
    pub granted_on_turn: u32,
}

/// The active statuses of one player.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusEffects(Vec<StatusEffect>);

impl StatusEffects {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn has(&self, kind: StatusKind) -> bool {
        self.0.iter().any(|s| s.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Adds a status. Granting a kind that is already active extends it instead
    /// of stacking a second entry.
    pub fn grant(&mut self, kind: StatusKind, turns: i32, turn: u32) {
        if let Some(existing) = self.0.iter_mut().find(|s| s.kind == kind) {
            existing.remaining_turns = existing.remaining_turns.max(turns);
            existing.granted_on_turn = turn;
            return;
        }
        self.0.push(StatusEffect {
            kind,
            remaining_turns: turns,
            granted_on_turn: turn,
        });
    }

    /// Removes a status, returning it if it was active.
    pub fn take(&mut self, kind: StatusKind) -> Option<StatusEffect> {
        let idx = self.0.iter().position(|s| s.kind == kind)?;
        Some(self.0.remove(idx))
    }

    /// Removes the first negative status.
    pub fn take_negative(&mut self) -> Option<StatusEffect> {
        let idx = self.0.iter().position(|s| s.kind.is_negative())?;
        Some(self.0.remove(idx))
    }

    /// Called at the end of the owner's turn.
    ///
    /// Decrements every status that was granted before `turn`, then prunes
    /// those at zero or below.
    pub fn tick(&mut self, turn: u32) {
        for status in self.0.iter_mut() {
            if status.granted_on_turn < turn {
                status.remaining_turns -= 1;
            }
        }
        self.0.retain(|s| s.remaining_turns > 0);
    }
}
