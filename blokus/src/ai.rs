use std::cmp::Reverse;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    Board, Color, GameState, IllegalAction, ItemCardKind, ItemChoice, ItemContext, PieceSet, PieceToPlace,
    Standing, StatusKind, BOARD_SIZE,
};

/// Weights of the positional terms. All terms are integers, so evaluation is exact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    /// Per cell of the piece.
    pub size: i32,
    /// Per cell, times closeness to the nearest board edge.
    pub edge: i32,
    /// Per cell, times closeness to the nearest board corner.
    pub corner: i32,
    /// Per own cell in the 3×3 neighbourhood of a piece cell.
    pub own_neighbor: i32,
    /// Per opponent cell in the neighbourhood. Subtracted.
    pub opponent_neighbor: i32,
    /// Per empty cell in the neighbourhood.
    pub empty_neighbor: i32,
    /// Per diagonal contact with an own cell.
    pub diagonal: i32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            size: 12,
            edge: 1,
            corner: 1,
            own_neighbor: 2,
            opponent_neighbor: 3,
            empty_neighbor: 1,
            diagonal: 4,
        }
    }
}

/// A greedy positional player. It does not search and uses no randomness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heuristic {
    pub weights: Weights,
}

impl Heuristic {
    pub fn new(weights: Weights) -> Self {
        Self { weights }
    }

    /// The best-scoring legal placement, or `None` if the color cannot move.
    ///
    /// Pieces are tried largest first. A candidate only replaces the best one
    /// if it scores strictly higher, so ties go to the earliest candidate.
    pub fn make_move(
        &self,
        board: &Board,
        color: Color,
        pieces: PieceSet,
        blocked: &[(i8, i8)],
        big_piece_ban: bool,
    ) -> Option<PieceToPlace> {
        let mut best: Option<(i32, PieceToPlace)> = None;
        for piece in pieces.largest_first() {
            if big_piece_ban && piece.size() == 5 {
                continue;
            }
            for placement in board.legal_placements(color, piece, blocked) {
                let score = self.evaluate(board, color, &placement.cells(), blocked);
                if best.map_or(true, |(top, _)| score > top) {
                    best = Some((score, placement));
                }
            }
        }
        best.map(|(_, placement)| placement)
    }

    /// Scores the cells a piece would cover.
    pub fn evaluate(&self, board: &Board, color: Color, cells: &[(i8, i8)], blocked: &[(i8, i8)]) -> i32 {
        let w = &self.weights;
        let max = BOARD_SIZE - 1;
        let mut score = w.size * cells.len() as i32;
        for &(i, j) in cells {
            let to_edge = i.min(j).min(max - i).min(max - j);
            let to_corner = i.min(max - i).max(j.min(max - j));
            score += w.edge * i32::from(BOARD_SIZE / 2 - 1 - to_edge);
            score += w.corner * i32::from(BOARD_SIZE / 2 - 1 - to_corner);

            for di in -1..=1 {
                for dj in -1..=1 {
                    let (ni, nj) = (i + di, j + dj);
                    if (di, dj) == (0, 0) || !Board::is_in_bounds(ni, nj) || cells.contains(&(ni, nj)) {
                        continue;
                    }
                    score += match board.get(ni, nj) {
                        Some(owner) if owner == color => w.own_neighbor,
                        Some(_) => -w.opponent_neighbor,
                        None if blocked.contains(&(ni, nj)) => 0,
                        None => w.empty_neighbor,
                    };
                }
            }
            score += w.diagonal * board.diagonal_contacts(i, j, color) as i32;
        }
        score
    }

    /// Picks a card that clearly helps, or skips.
    pub fn choose_item_card(&self, context: &ItemContext) -> ItemChoice {
        const PRIORITY: [ItemCardKind; 8] = [
            ItemCardKind::ScoreBoost,
            ItemCardKind::Steal,
            ItemCardKind::Blame,
            ItemCardKind::Momentum,
            ItemCardKind::Freeze,
            ItemCardKind::Sabotage,
            ItemCardKind::Rewind,
            ItemCardKind::Shield,
        ];
        let me = context.standings.iter().find(|s| s.player == context.me);
        for kind in PRIORITY {
            let Some(card_index) = context.hand.iter().position(|&c| c == kind) else {
                continue;
            };
            let target = match kind {
                ItemCardKind::ScoreBoost => None,
                ItemCardKind::Momentum => match me {
                    Some(me) if me.pieces_left > 0 => None,
                    _ => continue,
                },
                ItemCardKind::Shield => match me {
                    Some(me) if !me.shielded => None,
                    _ => continue,
                },
                ItemCardKind::Blame if !context.has_negative_status => continue,
                ItemCardKind::Rewind => match leader(context, |s| s.has_placed) {
                    Some(target) => Some(target),
                    None => continue,
                },
                ItemCardKind::Sabotage => match leader(context, |s| s.pieces_left > 0) {
                    Some(target) => Some(target),
                    None => continue,
                },
                _ => match leader(context, |_| true) {
                    Some(target) => Some(target),
                    None => continue,
                },
            };
            return ItemChoice {
                card_index: Some(card_index),
                target,
            };
        }
        ItemChoice::default()
    }
}

/// The highest-scoring opponent that can be targeted and passes `filter`.
fn leader(context: &ItemContext, filter: impl Fn(&Standing) -> bool) -> Option<usize> {
    context
        .standings
        .iter()
        .filter(|s| s.player != context.me && s.active && !s.shielded && filter(s))
        .max_by_key(|s| (s.total, Reverse(s.player)))
        .map(|s| s.player)
}

/// What `player` knows when deciding on an item card.
pub fn item_context(state: &GameState, player: usize) -> ItemContext {
    let hand = state
        .creative()
        .and_then(|c| c.players.get(player))
        .map(|c| c.hand.cards().to_vec())
        .unwrap_or_default();
    let has_negative_status = state
        .creative()
        .and_then(|c| c.players.get(player))
        .is_some_and(|c| c.statuses.iter().any(|s| s.kind.is_negative()));
    let standings = state
        .players()
        .iter()
        .map(|p| Standing {
            player: p.id,
            total: state.score(p.id).total(),
            active: !p.settled,
            shielded: state.has_status(p.id, StatusKind::SteelShield),
            has_placed: state.last_placement_of(p.id).is_some(),
            pieces_left: p.pieces.len(),
        })
        .collect();
    ItemContext {
        me: player,
        hand,
        standings,
        has_negative_status,
    }
}

/// Plays the current player's whole turn: the item phase if one is open,
/// then a placement. A player without a move is force-settled.
pub fn take_ai_turn<R: Rng + ?Sized>(
    state: &mut GameState,
    heuristic: &Heuristic,
    rng: &mut R,
) -> Result<(), IllegalAction> {
    if state.is_finished() {
        return Err(IllegalAction::GameNotRunning);
    }
    let player = state.current_player();

    if state.item_phase().is_some() {
        let choice = heuristic.choose_item_card(&item_context(state, player));
        let used = match choice.card_index {
            Some(index) => match state.use_item_card(player, index, choice.target, rng) {
                Ok(()) => true,
                Err(err) => {
                    warn!(player, %err, "AI item card was refused");
                    false
                }
            },
            None => false,
        };
        if !used {
            state.skip_item_phase(player)?;
        }
    }

    let Some(p) = state.player(player) else {
        return Err(IllegalAction::UnknownPlayer { player });
    };
    let placement = heuristic.make_move(
        state.board(),
        p.color,
        p.pieces,
        &state.blocked_cells(),
        state.has_status(player, StatusKind::BigPieceBan),
    );
    match placement {
        Some(placement) => match state.place(player, placement, rng) {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(player, %err, "AI placement was refused, settling");
                state.force_settle(player)
            }
        },
        None => {
            debug!(player, "AI has no move");
            state.force_settle(player)
        }
    }
}
