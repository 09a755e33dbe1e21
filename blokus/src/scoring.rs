use serde::{Deserialize, Serialize};

use crate::{Board, Color};

/// Points derived from the board: one per owned cell.
pub fn base_score(board: &Board, color: Color) -> u32 {
    board.count(color)
}

/// A player's score, split into the board-derived part and the bonus ledger.
///
/// The two parts are kept apart so that board changes (such as undoing a move)
/// can be recomputed from the board without losing unrelated bonuses.
/// The displayed score is always `base + bonus`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub base: u32,
    pub bonus: i32,
}

impl Score {
    pub fn total(&self) -> i32 {
        self.base as i32 + self.bonus
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} + {})", self.total(), self.base, self.bonus)
    }
}

/// Adds `delta` to a bonus ledger without letting the total drop below zero.
///
/// Returns the delta that was actually applied.
pub fn adjust_bonus(bonus: &mut i32, base: u32, delta: i32) -> i32 {
    let floor = -(base as i32);
    let new_bonus = if delta < 0 {
        // Only clamp when this change is what pushes the total below zero.
        (*bonus + delta).max(floor.min(*bonus))
    } else {
        *bonus + delta
    };
    let applied = new_bonus - *bonus;
    *bonus = new_bonus;
    applied
}

/// Bonus change caused by a placement of `placed` cells under the given modifiers.
///
/// `double_next` adds the placed count again; `half_score` takes away half of it
/// (rounded down).
pub fn placement_modifier(placed: u32, double_next: bool, half_score: bool) -> i32 {
    let mut delta = 0;
    if double_next {
        delta += placed as i32;
    }
    if half_score {
        delta -= (placed / 2) as i32;
    }
    delta
}
