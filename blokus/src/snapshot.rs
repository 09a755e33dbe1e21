use serde::{Deserialize, Serialize};

use crate::{
    base_score, Board, Color, Controller, CreativePlayerState, GameEvent, IllegalAction, ItemPhase, Phase,
    PieceSet, PieceToPlace, Score, SkipReason, SpecialTile, StatusKind, TileKind,
};

/// What everybody may know about one player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: usize,
    pub name: String,
    pub color: Color,
    pub controller: Controller,
    pub score: Score,
    pub pieces: PieceSet,
    pub settled: bool,
    pub offline: bool,
    pub timeouts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative: Option<CreativePlayerState>,
}

impl PlayerView {
    pub fn has_status(&self, kind: StatusKind) -> bool {
        self.creative.as_ref().is_some_and(|c| c.statuses.has(kind))
    }
}

/// A client-side mirror of a game.
///
/// It is built from a full snapshot sent by the host and kept current by
/// applying [`GameEvent`]s, which carry absolute values throughout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub game_id: u64,
    pub phase: Phase,
    pub board: Board,
    pub players: Vec<PlayerView>,
    pub current: usize,
    pub turn: u32,
    /// Seconds on the placement countdown.
    pub remaining: u32,
    pub item_phase: Option<ItemPhase>,
    pub tiles: Vec<SpecialTile>,
    pub creative: bool,
    #[serde(default)]
    pub paused: bool,
}

impl GameSnapshot {
    pub fn blocked_cells(&self) -> Vec<(i8, i8)> {
        self.tiles
            .iter()
            .filter(|t| t.kind == TileKind::Barrier)
            .map(|t| (t.i, t.j))
            .collect()
    }

    /// Updates the mirror with an authoritative event.
    pub fn apply(&mut self, event: &GameEvent) {
        match event {
            GameEvent::Started { snapshot } => *self = snapshot.clone(),
            GameEvent::TurnChanged {
                player,
                turn,
                remaining,
            } => {
                self.phase = Phase::Playing;
                self.current = *player;
                self.turn = *turn;
                self.remaining = *remaining;
                self.item_phase = None;
            }
            GameEvent::ItemPhaseStarted { player, remaining } => {
                self.item_phase = Some(ItemPhase {
                    player: *player,
                    remaining: *remaining,
                });
            }
            GameEvent::ItemPhaseEnded { .. } => self.item_phase = None,
            GameEvent::TimeUpdate {
                remaining,
                item_phase,
                ..
            } => {
                if *item_phase {
                    if let Some(phase) = &mut self.item_phase {
                        phase.remaining = *remaining;
                    }
                } else {
                    self.remaining = *remaining;
                }
            }
            GameEvent::MoveApplied {
                deltas,
                triggered,
                board,
                players,
                ..
            } => {
                match board {
                    Some(board) => self.board = board.clone(),
                    None => self.board.apply_deltas(deltas),
                }
                for effect in triggered {
                    if let Some(tile) = self
                        .tiles
                        .iter_mut()
                        .find(|t| t.i == effect.i && t.j == effect.j)
                    {
                        tile.used = true;
                    }
                }
                self.players = players.clone();
            }
            GameEvent::TurnSkipped { player, turn, reason } => {
                self.turn = *turn;
                if let (SkipReason::Timeout { strikes }, Some(p)) = (reason, self.players.get_mut(*player)) {
                    p.timeouts = *strikes;
                }
            }
            GameEvent::PlayerSettled { player, .. } => {
                if let Some(p) = self.players.get_mut(*player) {
                    p.settled = true;
                }
            }
            GameEvent::PlayerConnectivity { player, offline } => {
                if let Some(p) = self.players.get_mut(*player) {
                    p.offline = *offline;
                }
            }
            GameEvent::ItemUsed { board, players, .. } => {
                if let Some(board) = board {
                    self.board = board.clone();
                }
                self.players = players.clone();
            }
            GameEvent::Finished { results } => {
                self.phase = Phase::Finished;
                self.item_phase = None;
                self.remaining = 0;
                for result in results {
                    if let Some(p) = self.players.get_mut(result.player) {
                        p.score = result.score;
                        p.settled = true;
                    }
                }
            }
        }
    }

    /// Checks a placement the way the host would, as far as the mirror allows.
    pub fn validate_move(&self, player: usize, placement: PieceToPlace) -> Result<(), IllegalAction> {
        if self.phase != Phase::Playing || self.paused {
            return Err(IllegalAction::GameNotRunning);
        }
        let p = self
            .players
            .get(player)
            .ok_or(IllegalAction::UnknownPlayer { player })?;
        if p.settled {
            return Err(IllegalAction::AlreadySettled);
        }
        if self.current != player {
            return Err(IllegalAction::NotYourTurn {
                current: self.current,
            });
        }
        if self.item_phase.is_some() {
            return Err(IllegalAction::ItemPhaseActive);
        }
        let piece = placement.piece;
        if !p.pieces.contains(piece) {
            return Err(IllegalAction::PieceNotAvailable { piece });
        }
        if piece.size() == 5 && p.has_status(StatusKind::BigPieceBan) {
            return Err(IllegalAction::BigPieceBanned { piece });
        }
        self.board
            .calculate(p.color, placement, &self.blocked_cells())?;
        Ok(())
    }

    /// Predicts the board, piece set and base score after a placement.
    ///
    /// Tile effects and the turn change are left to the host.
    pub fn apply_local_move(&mut self, player: usize, placement: PieceToPlace) -> Result<(), IllegalAction> {
        self.validate_move(player, placement)?;
        let color = self.players[player].color;
        let blocked = self.blocked_cells();
        self.board = self.board.calculate(color, placement, &blocked)?.execute();
        let p = &mut self.players[player];
        p.pieces = p.pieces.remove(placement.piece);
        p.score.base = base_score(&self.board, color);
        Ok(())
    }
}
