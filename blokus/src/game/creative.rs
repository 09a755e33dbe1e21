use std::cmp::Reverse;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{GameState, Move, MoveKind};
use crate::{
    adjust_bonus, base_score, placement_modifier, triggered_tiles, CellDelta, EffectResult, GameEvent, Hand,
    IllegalAction, ItemCardKind, ItemGrant, ItemPhaseEnd, PieceId, PieceRemoval, Redistribution, SpecialTile,
    StatusEffects, StatusKind, NUM_PIECES,
};

/// The creative-mode overlay of one player.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativePlayerState {
    pub hand: Hand,
    pub statuses: StatusEffects,
    /// The bonus ledger, see [`Score`](crate::Score).
    pub bonus_score: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeState {
    pub tiles: Vec<SpecialTile>,
    /// Indexed by seat.
    pub players: Vec<CreativePlayerState>,
}

impl CreativeState {
    pub fn new(num_players: usize) -> Self {
        Self {
            tiles: Vec::new(),
            players: vec![CreativePlayerState::default(); num_players],
        }
    }
}

/// What applying one or more effects did beyond the ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EffectOutcome {
    pub extra_turn: bool,
    /// Cells were changed by something other than the placement itself.
    pub board_changed: bool,
}

impl EffectOutcome {
    pub fn merge(&mut self, other: EffectOutcome) {
        self.extra_turn |= other.extra_turn;
        self.board_changed |= other.board_changed;
    }
}

impl GameState {
    /// Plays the card at `card_index` during the user's item phase.
    ///
    /// Opponent-targeted cards need a `target` that is still active and not
    /// shielded. Self-targeted cards ignore `target`.
    pub fn use_item_card<R: Rng + ?Sized>(
        &mut self,
        player: usize,
        card_index: usize,
        target: Option<usize>,
        rng: &mut R,
    ) -> Result<(), IllegalAction> {
        self.check_turn(player)?;
        let creative = self.creative.as_ref().ok_or(IllegalAction::NotCreative)?;
        if self.item_phase.map(|phase| phase.player) != Some(player) {
            return Err(IllegalAction::NoItemPhase);
        }
        let card = creative.players[player]
            .hand
            .get(card_index)
            .ok_or(IllegalAction::NoSuchCard { index: card_index })?;

        let recipient = if card.requires_target() {
            let target = target.ok_or(IllegalAction::TargetRequired)?;
            if target == player || self.players.get(target).map_or(true, |p| p.settled) {
                return Err(IllegalAction::InvalidTarget { target });
            }
            if creative.players[target].statuses.has(StatusKind::SteelShield) {
                return Err(IllegalAction::TargetShielded { target });
            }
            let has_effect = match card {
                ItemCardKind::Blame => creative.players[player]
                    .statuses
                    .iter()
                    .any(|s| s.kind.is_negative()),
                ItemCardKind::Rewind => self.last_placement_of(target).is_some(),
                ItemCardKind::Sabotage => !self.players[target].pieces.is_empty(),
                _ => true,
            };
            if !has_effect {
                return Err(IllegalAction::CardHasNoEffect);
            }
            target
        } else {
            player
        };

        if let Some(creative) = &mut self.creative {
            creative.players[player].hand.remove(card_index);
        }
        info!(player, %card, recipient, "Item card used");
        let outcome = self.apply_effect(player, recipient, &card.effect(), rng);
        self.events.push(GameEvent::ItemUsed {
            player,
            card,
            target: card.requires_target().then_some(recipient),
            board: outcome.board_changed.then(|| self.board.clone()),
            players: self.player_views(),
        });
        self.end_item_phase(ItemPhaseEnd::Used);
        Ok(())
    }

    /// Closes the item phase without using a card.
    pub fn skip_item_phase(&mut self, player: usize) -> Result<(), IllegalAction> {
        self.check_turn(player)?;
        if self.creative.is_none() {
            return Err(IllegalAction::NotCreative);
        }
        if self.item_phase.map(|phase| phase.player) != Some(player) {
            return Err(IllegalAction::NoItemPhase);
        }
        self.end_item_phase(ItemPhaseEnd::Skipped);
        Ok(())
    }

    /// Applies an effect caused by `user` to `recipient`.
    ///
    /// The steps run in a fixed order: score delta, global per-piece bonus,
    /// statuses, item card, piece removal, undo, redistribution, extra turn.
    pub fn apply_effect<R: Rng + ?Sized>(
        &mut self,
        user: usize,
        recipient: usize,
        effect: &EffectResult,
        rng: &mut R,
    ) -> EffectOutcome {
        let mut outcome = EffectOutcome::default();
        if self.creative.is_none() || recipient >= self.players.len() || user >= self.players.len() {
            return outcome;
        }

        let applied = if effect.score_delta != 0 {
            self.adjust_player_bonus(recipient, effect.score_delta)
        } else {
            0
        };
        if effect.user_score_delta != 0 {
            // A steal hands over no more than the recipient actually lost.
            let gain = if effect.score_delta < 0 {
                effect.user_score_delta.min(-applied)
            } else {
                effect.user_score_delta
            };
            if gain != 0 {
                self.adjust_player_bonus(user, gain);
            }
        }
        if effect.global_used_piece_bonus != 0 {
            let active: Vec<usize> = (0..self.players.len())
                .filter(|&p| !self.players[p].settled)
                .collect();
            for player in active {
                let used = NUM_PIECES as i32 - self.players[player].pieces.len() as i32;
                self.adjust_player_bonus(player, effect.global_used_piece_bonus * used);
            }
        }

        let turn = self.turn;
        if let Some(creative) = &mut self.creative {
            for grant in &effect.statuses {
                creative.players[recipient]
                    .statuses
                    .grant(grant.kind, grant.turns, turn);
            }
            if effect.transfer_negative_status {
                if let Some(status) = creative.players[user].statuses.take_negative() {
                    debug!(from = user, to = recipient, kind = ?status.kind, "Status transferred");
                    creative.players[recipient]
                        .statuses
                        .grant(status.kind, status.remaining_turns, turn);
                }
            }
            if let Some(grant) = effect.item_card {
                let card = match grant {
                    ItemGrant::Specific(card) => Some(card),
                    ItemGrant::Random => ItemCardKind::ALL.choose(rng).copied(),
                };
                if let Some(card) = card {
                    if !creative.players[user].hand.push(card) {
                        debug!(player = user, %card, "Hand is full, card discarded");
                    }
                }
            }
        }

        if let Some(removal) = effect.remove_piece {
            self.remove_piece(recipient, removal, rng);
        }
        if effect.undo_last_move {
            outcome.board_changed |= self.undo_last_move(recipient);
        }
        if let Some(redistribution) = effect.redistribution {
            self.redistribute(recipient, redistribution);
        }
        outcome.extra_turn = effect.extra_turn;
        outcome
    }

    pub(super) fn hand_size(&self, player: usize) -> usize {
        self.creative
            .as_ref()
            .map_or(0, |c| c.players[player].hand.len())
    }

    /// Consumes a pending skip, if any.
    pub(super) fn take_skip_status(&mut self, player: usize) -> bool {
        self.creative
            .as_mut()
            .is_some_and(|c| c.players[player].statuses.take(StatusKind::SkipTurn).is_some())
    }

    pub(super) fn tick_statuses(&mut self, player: usize) {
        let turn = self.turn;
        if let Some(creative) = &mut self.creative {
            creative.players[player].statuses.tick(turn);
        }
    }

    /// Applies and consumes the double and half score statuses for a placement.
    pub(super) fn apply_placement_modifiers(&mut self, player: usize, placed: u32) {
        let Some(creative) = &mut self.creative else {
            return;
        };
        let statuses = &mut creative.players[player].statuses;
        let double_next = statuses.take(StatusKind::DoubleNext).is_some();
        let half_score = statuses.take(StatusKind::HalfScore).is_some();
        let delta = placement_modifier(placed, double_next, half_score);
        if delta != 0 {
            self.adjust_player_bonus(player, delta);
        }
    }

    /// Marks the tiles under `cells` as used and returns them in coverage order.
    pub(super) fn trigger_tiles(&mut self, cells: &[(i8, i8)]) -> Vec<SpecialTile> {
        let Some(creative) = &mut self.creative else {
            return Vec::new();
        };
        triggered_tiles(&mut creative.tiles, cells)
            .into_iter()
            .map(|idx| creative.tiles[idx])
            .collect()
    }

    /// The index of the player's most recent placement that has not been undone.
    pub(crate) fn last_placement_of(&self, player: usize) -> Option<usize> {
        let undone: Vec<usize> = self
            .moves
            .iter()
            .filter_map(|m| match m.kind {
                MoveKind::Undo { of } => Some(of),
                MoveKind::Place => None,
            })
            .collect();
        (0..self.moves.len()).rev().find(|&idx| {
            let m = &self.moves[idx];
            m.player == player && m.kind == MoveKind::Place && !undone.contains(&idx)
        })
    }

    fn adjust_player_bonus(&mut self, player: usize, delta: i32) -> i32 {
        let base = base_score(&self.board, self.players[player].color);
        match &mut self.creative {
            Some(creative) => adjust_bonus(&mut creative.players[player].bonus_score, base, delta),
            None => 0,
        }
    }

    /// Moves the ledger so that the player's total becomes `total`.
    fn set_total(&mut self, player: usize, total: i32) {
        let base = base_score(&self.board, self.players[player].color) as i32;
        if let Some(creative) = &mut self.creative {
            creative.players[player].bonus_score = total.max(0) - base;
        }
    }

    fn remove_piece<R: Rng + ?Sized>(&mut self, player: usize, removal: PieceRemoval, rng: &mut R) {
        let pieces = self.players[player].pieces;
        let piece = match removal {
            PieceRemoval::Largest => pieces.largest_first().first().copied(),
            PieceRemoval::Random => pieces.into_iter().collect::<Vec<PieceId>>().choose(rng).copied(),
        };
        if let Some(piece) = piece {
            debug!(player, %piece, "Piece removed");
            self.players[player].pieces = pieces.remove(piece);
        }
    }

    /// Takes the player's last placement off the board and returns the piece.
    ///
    /// The log keeps the original entry and gains a compensating one.
    fn undo_last_move(&mut self, player: usize) -> bool {
        let Some(idx) = self.last_placement_of(player) else {
            return false;
        };
        let original = &self.moves[idx];
        let deltas: Vec<CellDelta> = original
            .deltas
            .iter()
            .filter(|d| self.board.get(d.i, d.j) == d.color)
            .map(|d| CellDelta {
                i: d.i,
                j: d.j,
                color: None,
            })
            .collect();
        let (color, piece, placement) = (original.color, original.piece, original.placement);

        self.board.apply_deltas(&deltas);
        self.players[player].pieces = self.players[player].pieces.insert(piece);
        debug!(player, %piece, "Move undone");
        self.moves.push(Move {
            player,
            color,
            piece,
            placement,
            deltas,
            turn: self.turn,
            kind: MoveKind::Undo { of: idx },
        });

        // Losing cells must not drag the total below zero.
        let total = self.score(player).total();
        if total < 0 {
            self.set_total(player, 0);
        }
        true
    }

    /// Settled players keep their totals and take no part in either variant.
    fn redistribute(&mut self, recipient: usize, redistribution: Redistribution) {
        let totals: Vec<i32> = self.scores().iter().map(|s| s.total()).collect();
        let active: Vec<usize> = (0..self.players.len())
            .filter(|&p| !self.players[p].settled)
            .collect();
        match redistribution {
            Redistribution::SwapWithLeader => {
                if self.players[recipient].settled {
                    return;
                }
                let leader = active
                    .iter()
                    .copied()
                    .filter(|&p| p != recipient)
                    .max_by_key(|&p| (totals[p], Reverse(p)));
                if let Some(leader) = leader {
                    if totals[leader] > totals[recipient] {
                        debug!(recipient, leader, "Scores swapped");
                        self.set_total(recipient, totals[leader]);
                        self.set_total(leader, totals[recipient]);
                    }
                }
            }
            Redistribution::AverageAll => {
                if active.is_empty() {
                    return;
                }
                let average = active.iter().map(|&p| totals[p]).sum::<i32>() / active.len() as i32;
                debug!(average, "Scores averaged");
                for player in active {
                    self.set_total(player, average);
                }
            }
        }
    }
}
