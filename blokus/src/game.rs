mod creative;

pub use creative::*;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    base_score, Board, CellDelta, Color, CreativeConfig, GameEvent, GameSnapshot, IllegalAction, ItemPhase,
    ItemPhaseEnd, PieceId, PieceSet, PieceToPlace, PlayerView, Score, SkipReason, SpecialTile, StatusKind,
    TileKind, ALL_COLORS, FULL_PIECE_SET,
};

/// Rules and clock settings of one game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub turn_seconds: u32,
    pub item_phase_seconds: u32,
    /// Timeouts in a row after which a player is settled.
    pub max_consecutive_timeouts: u32,
    /// Enables special tiles and item cards.
    pub creative: Option<CreativeConfig>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            turn_seconds: 60,
            item_phase_seconds: 30,
            max_consecutive_timeouts: 3,
            creative: None,
        }
    }
}

/// The phase of the whole game.
///
/// Settling happens per player, so `Settling` is never entered by [`GameState`];
/// it exists for compatibility with clients that display it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Waiting,
    Playing,
    Settling,
    Finished,
}

/// Who makes the decisions for a seat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Controller {
    Human,
    Ai,
    Remote,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSetup {
    pub name: String,
    pub controller: Controller,
}

impl PlayerSetup {
    pub fn new(name: impl Into<String>, controller: Controller) -> Self {
        Self {
            name: name.into(),
            controller,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// The seat index.
    pub id: usize,
    pub name: String,
    pub color: Color,
    pub controller: Controller,
    /// Pieces not placed (or lost) yet.
    pub pieces: PieceSet,
    pub settled: bool,
    /// A remote player whose seat is temporarily driven by the AI.
    pub offline: bool,
    /// Consecutive turn timeouts.
    pub timeouts: u32,
}

impl Player {
    /// Whether the AI should take this player's turns.
    pub fn is_ai_driven(&self) -> bool {
        self.controller == Controller::Ai || self.offline
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum MoveKind {
    Place,
    /// Takes back the move at index `of` in the log.
    Undo { of: usize },
}

/// An entry in the append-only move log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub player: usize,
    pub color: Color,
    pub piece: PieceId,
    pub placement: PieceToPlace,
    pub deltas: Vec<CellDelta>,
    /// The turn counter when the entry was made.
    pub turn: u32,
    pub kind: MoveKind,
}

/// Identifies the countdown a timer tick belongs to.
///
/// A new token is issued at every clock transition, so ticks scheduled for an
/// earlier turn, phase or game are recognized and dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerToken {
    pub game_id: u64,
    pub generation: u64,
}

/// Final standing of one player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerResult {
    pub player: usize,
    pub name: String,
    pub color: Color,
    pub score: Score,
    /// Cells of the pieces that were never placed.
    pub cells_left: u32,
    /// 1 for the winner. Equal totals share a rank.
    pub rank: usize,
}

/// The authoritative state of one game.
///
/// All changes go through the methods below; each of them either applies a
/// complete transition or returns an [`IllegalAction`] and leaves the state as it was.
/// The resulting [`GameEvent`]s are queued and can be collected with
/// [`GameState::take_events()`].
#[derive(Clone, Debug)]
pub struct GameState {
    game_id: u64,
    config: GameConfig,
    board: Board,
    players: Vec<Player>,
    current: usize,
    phase: Phase,
    turn: u32,
    turn_remaining: u32,
    item_phase: Option<ItemPhase>,
    generation: u64,
    moves: Vec<Move>,
    creative: Option<CreativeState>,
    events: Vec<GameEvent>,
}

impl GameState {
    /// Seats the players in order; seat `k` plays the `k`-th color.
    pub fn new(game_id: u64, config: GameConfig, setups: Vec<PlayerSetup>) -> Result<Self, IllegalAction> {
        if !(2..=ALL_COLORS.len()).contains(&setups.len()) {
            return Err(IllegalAction::InvalidPlayerCount { count: setups.len() });
        }
        let players: Vec<Player> = setups
            .into_iter()
            .zip(ALL_COLORS)
            .enumerate()
            .map(|(id, (setup, color))| Player {
                id,
                name: setup.name,
                color,
                controller: setup.controller,
                pieces: FULL_PIECE_SET,
                settled: false,
                offline: false,
                timeouts: 0,
            })
            .collect();
        let creative = config.creative.as_ref().map(|_| CreativeState::new(players.len()));
        Ok(Self {
            game_id,
            config,
            board: Board::new(),
            players,
            current: 0,
            phase: Phase::Waiting,
            turn: 0,
            turn_remaining: 0,
            item_phase: None,
            generation: 0,
            moves: Vec::new(),
            creative,
            events: Vec::new(),
        })
    }

    /// Picks a random first player, lays out the special tiles and begins the first turn.
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), IllegalAction> {
        if self.phase != Phase::Waiting {
            return Err(IllegalAction::AlreadyStarted);
        }
        if let (Some(config), Some(creative)) = (&self.config.creative, &mut self.creative) {
            creative.tiles = crate::generate_special_tiles(config, rng);
        }
        self.current = rng.gen_range(0..self.players.len());
        self.phase = Phase::Playing;
        info!(game_id = self.game_id, first_player = self.current, "Game started");
        self.events.push(GameEvent::Started {
            snapshot: self.snapshot(),
        });
        self.begin_turn();
        Ok(())
    }

    pub fn game_id(&self) -> u64 {
        self.game_id
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, player: usize) -> Option<&Player> {
        self.players.get(player)
    }

    pub fn current_player(&self) -> usize {
        self.current
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Seconds left for the current placement.
    pub fn turn_remaining(&self) -> u32 {
        self.turn_remaining
    }

    pub fn item_phase(&self) -> Option<ItemPhase> {
        self.item_phase
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn creative(&self) -> Option<&CreativeState> {
        self.creative.as_ref()
    }

    pub fn tiles(&self) -> &[SpecialTile] {
        self.creative.as_ref().map_or(&[], |c| c.tiles.as_slice())
    }

    /// Cells no piece may cover.
    pub fn blocked_cells(&self) -> Vec<(i8, i8)> {
        self.tiles()
            .iter()
            .filter(|t| t.kind == TileKind::Barrier)
            .map(|t| (t.i, t.j))
            .collect()
    }

    pub fn has_status(&self, player: usize, kind: StatusKind) -> bool {
        self.creative
            .as_ref()
            .and_then(|c| c.players.get(player))
            .is_some_and(|p| p.statuses.has(kind))
    }

    /// The token the next tick must carry to be applied.
    pub fn timer_token(&self) -> TimerToken {
        TimerToken {
            game_id: self.game_id,
            generation: self.generation,
        }
    }

    pub fn score(&self, player: usize) -> Score {
        let Some(p) = self.players.get(player) else {
            return Score::default();
        };
        Score {
            base: base_score(&self.board, p.color),
            bonus: self.creative.as_ref().map_or(0, |c| c.players[player].bonus_score),
        }
    }

    pub fn scores(&self) -> Vec<Score> {
        (0..self.players.len()).map(|p| self.score(p)).collect()
    }

    /// Drains the events produced since the last call.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn player_views(&self) -> Vec<PlayerView> {
        self.players
            .iter()
            .map(|p| PlayerView {
                id: p.id,
                name: p.name.clone(),
                color: p.color,
                controller: p.controller,
                score: self.score(p.id),
                pieces: p.pieces,
                settled: p.settled,
                offline: p.offline,
                timeouts: p.timeouts,
                creative: self.creative.as_ref().map(|c| c.players[p.id].clone()),
            })
            .collect()
    }

    /// Everything a client needs to show the game.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            game_id: self.game_id,
            phase: self.phase,
            board: self.board.clone(),
            players: self.player_views(),
            current: self.current,
            turn: self.turn,
            remaining: self.turn_remaining,
            item_phase: self.item_phase,
            tiles: self.tiles().to_vec(),
            creative: self.creative.is_some(),
            paused: false,
        }
    }

    /// Standings ordered by seat.
    pub fn results(&self) -> Vec<PlayerResult> {
        let scores = self.scores();
        self.players
            .iter()
            .map(|p| {
                let total = scores[p.id].total();
                PlayerResult {
                    player: p.id,
                    name: p.name.clone(),
                    color: p.color,
                    score: scores[p.id],
                    cells_left: p.pieces.cell_count(),
                    rank: 1 + scores.iter().filter(|s| s.total() > total).count(),
                }
            })
            .collect()
    }

    /// Places a piece for the current player and ends their turn.
    pub fn place<R: Rng + ?Sized>(
        &mut self,
        player: usize,
        placement: PieceToPlace,
        rng: &mut R,
    ) -> Result<(), IllegalAction> {
        self.check_turn(player)?;
        if self.item_phase.is_some() {
            return Err(IllegalAction::ItemPhaseActive);
        }
        let piece = placement.piece;
        if !self.players[player].pieces.contains(piece) {
            return Err(IllegalAction::PieceNotAvailable { piece });
        }
        if piece.size() == 5 && self.has_status(player, StatusKind::BigPieceBan) {
            return Err(IllegalAction::BigPieceBanned { piece });
        }
        let color = self.players[player].color;
        let blocked = self.blocked_cells();
        let calculation = self.board.calculate(color, placement, &blocked)?;
        let cells = calculation.cells.clone();
        let deltas = calculation.deltas();
        self.board = calculation.execute();

        let p = &mut self.players[player];
        p.pieces = p.pieces.remove(piece);
        p.timeouts = 0;
        self.moves.push(Move {
            player,
            color,
            piece,
            placement,
            deltas: deltas.clone(),
            turn: self.turn,
            kind: MoveKind::Place,
        });
        debug!(player, %piece, i = placement.i, j = placement.j, "Piece placed");

        let mut triggered = Vec::new();
        let mut outcome = EffectOutcome::default();
        if self.creative.is_some() {
            self.apply_placement_modifiers(player, cells.len() as u32);
            for tile in self.trigger_tiles(&cells) {
                let upgraded = self.has_status(player, StatusKind::PurpleUpgrade);
                let Some(effect) = crate::roll_effect(tile.kind, upgraded, rng) else {
                    continue;
                };
                debug!(player, effect = effect.name, "Tile effect triggered");
                triggered.push(crate::TriggeredEffect {
                    i: tile.i,
                    j: tile.j,
                    kind: tile.kind,
                    effect: effect.id,
                });
                let result = effect.id.result();
                outcome.merge(self.apply_effect(player, player, &result, rng));
            }
        }

        self.events.push(GameEvent::MoveApplied {
            player,
            placement,
            deltas,
            triggered,
            board: outcome.board_changed.then(|| self.board.clone()),
            players: self.player_views(),
            extra_turn: outcome.extra_turn,
        });
        self.end_turn(player, outcome.extra_turn);
        Ok(())
    }

    /// Voluntary settlement. Only allowed on one's own turn.
    pub fn settle(&mut self, player: usize) -> Result<(), IllegalAction> {
        self.check_turn(player)?;
        self.settle_player(player, false);
        self.end_turn(player, false);
        Ok(())
    }

    /// Settles a player regardless of whose turn it is, e.g. after an illegal bot move.
    pub fn force_settle(&mut self, player: usize) -> Result<(), IllegalAction> {
        if self.phase != Phase::Playing {
            return Err(IllegalAction::GameNotRunning);
        }
        let p = self
            .players
            .get(player)
            .ok_or(IllegalAction::UnknownPlayer { player })?;
        if p.settled {
            return Err(IllegalAction::AlreadySettled);
        }
        self.settle_player(player, true);
        if player == self.current {
            self.end_turn(player, false);
        } else if self.players.iter().all(|p| p.settled) {
            self.finish();
        }
        Ok(())
    }

    /// Hands a seat over to the AI, or back.
    pub fn set_offline(&mut self, player: usize, offline: bool) -> Result<(), IllegalAction> {
        let p = self
            .players
            .get_mut(player)
            .ok_or(IllegalAction::UnknownPlayer { player })?;
        if p.offline != offline {
            p.offline = offline;
            debug!(player, offline, "Seat connectivity changed");
            self.events.push(GameEvent::PlayerConnectivity { player, offline });
        }
        Ok(())
    }

    /// One second has passed on the live countdown.
    ///
    /// Returns `false` if the tick is stale and was ignored.
    pub fn tick(&mut self, token: TimerToken) -> bool {
        if self.phase != Phase::Playing || token != self.timer_token() {
            debug!(?token, "Ignoring stale timer tick");
            return false;
        }
        let player = self.current;
        let turn = self.turn;

        if let Some(phase) = &mut self.item_phase {
            phase.remaining = phase.remaining.saturating_sub(1);
            let remaining = phase.remaining;
            self.events.push(GameEvent::TimeUpdate {
                turn,
                remaining,
                item_phase: true,
            });
            if remaining == 0 {
                self.end_item_phase(ItemPhaseEnd::TimedOut);
            }
            return true;
        }

        self.turn_remaining = self.turn_remaining.saturating_sub(1);
        self.events.push(GameEvent::TimeUpdate {
            turn,
            remaining: self.turn_remaining,
            item_phase: false,
        });
        if self.turn_remaining == 0 {
            let p = &mut self.players[player];
            p.timeouts += 1;
            let strikes = p.timeouts;
            debug!(player, strikes, "Turn timed out");
            self.events.push(GameEvent::TurnSkipped {
                player,
                turn,
                reason: SkipReason::Timeout { strikes },
            });
            if strikes >= self.config.max_consecutive_timeouts {
                warn!(player, strikes, "Too many timeouts");
                self.settle_player(player, true);
            }
            self.end_turn(player, false);
        }
        true
    }

    /// The next player after the current one that has not settled, searching at
    /// most one lap. Returns the current player if nobody else is left, and
    /// `None` if everyone has settled.
    pub fn next_active_player(&self) -> Option<usize> {
        let n = self.players.len();
        (1..=n)
            .map(|offset| (self.current + offset) % n)
            .find(|&idx| !self.players[idx].settled)
    }

    /// Whether any unused piece of the player fits anywhere.
    ///
    /// Temporary statuses are not taken into account, so a big piece ban
    /// never makes a player look stuck for good.
    pub fn can_player_continue(&self, player: usize) -> bool {
        let Some(p) = self.players.get(player) else {
            return false;
        };
        !p.settled && self.board.has_legal_placement(p.color, p.pieces, &self.blocked_cells(), 5)
    }

    /// Whether the big piece ban leaves the player nothing to place this turn.
    fn held_back_by_ban(&self, player: usize) -> bool {
        let p = &self.players[player];
        self.has_status(player, StatusKind::BigPieceBan)
            && !self.board.has_legal_placement(p.color, p.pieces, &self.blocked_cells(), 4)
    }

    fn check_turn(&self, player: usize) -> Result<(), IllegalAction> {
        if self.phase != Phase::Playing {
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
        Ok(())
    }

    fn settle_player(&mut self, player: usize, forced: bool) {
        if self.players[player].settled {
            return;
        }
        self.players[player].settled = true;
        info!(player, forced, score = %self.score(player), "Player settled");
        self.events.push(GameEvent::PlayerSettled { player, forced });
    }

    fn end_item_phase(&mut self, reason: ItemPhaseEnd) {
        if let Some(phase) = self.item_phase.take() {
            self.generation += 1;
            debug!(player = phase.player, ?reason, "Item phase ended");
            self.events.push(GameEvent::ItemPhaseEnded {
                player: phase.player,
                reason,
            });
        }
    }

    fn end_turn(&mut self, player: usize, extra_turn: bool) {
        self.item_phase = None;
        self.tick_statuses(player);
        if self.phase != Phase::Playing {
            return;
        }
        if !extra_turn || self.players[player].settled {
            self.move_to_next();
        }
        self.begin_turn();
    }

    fn move_to_next(&mut self) {
        match self.next_active_player() {
            Some(next) if next != self.current => self.current = next,
            Some(last) => {
                debug!(player = last, "No other player is active");
                self.settle_player(last, true);
            }
            None => {}
        }
    }

    /// Starts the turn of the current player, or of the next one that can
    /// actually play. Skipped and stuck players are dealt with on the way.
    fn begin_turn(&mut self) {
        for _ in 0..4 * self.players.len() {
            if self.phase != Phase::Playing {
                return;
            }
            if self.players.iter().all(|p| p.settled) {
                self.finish();
                return;
            }
            let player = self.current;
            if self.players[player].settled {
                self.move_to_next();
                continue;
            }

            if !self.can_player_continue(player) {
                self.settle_player(player, true);
                self.move_to_next();
                continue;
            }

            self.turn += 1;
            self.generation += 1;
            self.item_phase = None;

            let skip = if self.take_skip_status(player) {
                Some(SkipReason::Status)
            } else if self.held_back_by_ban(player) {
                Some(SkipReason::BigPieceBan)
            } else {
                None
            };
            if let Some(reason) = skip {
                debug!(player, turn = self.turn, ?reason, "Turn skipped");
                self.events.push(GameEvent::TurnSkipped {
                    player,
                    turn: self.turn,
                    reason,
                });
                self.tick_statuses(player);
                self.move_to_next();
                continue;
            }

            let mut seconds = self.config.turn_seconds;
            if self.has_status(player, StatusKind::TimePressure) {
                seconds /= 2;
            }
            self.turn_remaining = seconds;
            debug!(player, turn = self.turn, seconds, "Turn begins");
            self.events.push(GameEvent::TurnChanged {
                player,
                turn: self.turn,
                remaining: seconds,
            });

            if self.hand_size(player) > 0 {
                let phase = ItemPhase {
                    player,
                    remaining: self.config.item_phase_seconds,
                };
                self.item_phase = Some(phase);
                self.events.push(GameEvent::ItemPhaseStarted {
                    player,
                    remaining: phase.remaining,
                });
            }
            return;
        }
        warn!(game_id = self.game_id, "No playable turn found, ending the game");
        self.finish();
    }

    fn finish(&mut self) {
        if self.phase == Phase::Finished {
            return;
        }
        self.phase = Phase::Finished;
        self.generation += 1;
        self.item_phase = None;
        self.turn_remaining = 0;
        let results = self.results();
        for result in &results {
            info!(player = result.player, rank = result.rank, score = %result.score, "Final standing");
        }
        self.events.push(GameEvent::Finished { results });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::{Orientation, NUM_PIECES};

    pub(crate) fn two_player_game(config: GameConfig) -> GameState {
        GameState::new(
            7,
            config,
            vec![
                PlayerSetup::new("alice", Controller::Human),
                PlayerSetup::new("bob", Controller::Ai),
            ],
        )
        .unwrap()
    }

    pub(crate) fn single(i: i8, j: i8) -> PieceToPlace {
        PieceToPlace {
            piece: PieceId(0),
            orientation: Orientation::default(),
            i,
            j,
        }
    }

    /// StepRng(0, 0) always yields zero, so player 0 starts.
    pub(crate) fn zero_rng() -> StepRng {
        StepRng::new(0, 0)
    }

    #[test]
    fn player_count_is_checked() {
        let one = vec![PlayerSetup::new("solo", Controller::Human)];
        assert_eq!(
            GameState::new(1, GameConfig::default(), one).err(),
            Some(IllegalAction::InvalidPlayerCount { count: 1 })
        );
    }

    #[test]
    fn turns_alternate() {
        let mut game = two_player_game(GameConfig::default());
        let mut rng = zero_rng();
        game.start(&mut rng).unwrap();
        assert_eq!(game.phase(), Phase::Playing);
        assert_eq!(game.current_player(), 0);
        assert_eq!(game.turn(), 1);

        assert_eq!(
            game.place(1, single(0, 19), &mut rng),
            Err(IllegalAction::NotYourTurn { current: 0 })
        );
        game.place(0, single(0, 0), &mut rng).unwrap();
        assert_eq!(game.current_player(), 1);
        assert_eq!(game.score(0), Score { base: 1, bonus: 0 });
        assert_eq!(
            game.place(1, single(0, 0), &mut rng),
            Err(IllegalAction::IllegalPlacement(crate::IllegalPlacement::Occupied {
                i: 0,
                j: 0,
                by: Color::Red
            }))
        );
        assert_eq!(game.current_player(), 1);
        game.place(1, single(0, 19), &mut rng).unwrap();
        assert_eq!(
            game.place(0, single(1, 1), &mut rng),
            Err(IllegalAction::PieceNotAvailable { piece: PieceId(0) })
        );
        assert_eq!(game.moves().len(), 2);
    }

    #[test]
    fn events_describe_the_turns() {
        let mut game = two_player_game(GameConfig::default());
        let mut rng = zero_rng();
        game.start(&mut rng).unwrap();
        let events = game.take_events();
        assert!(matches!(events[0], GameEvent::Started { .. }));
        assert!(matches!(events[1], GameEvent::TurnChanged { player: 0, turn: 1, remaining: 60 }));
        game.place(0, single(0, 0), &mut rng).unwrap();
        let events = game.take_events();
        assert!(matches!(&events[0], GameEvent::MoveApplied { player: 0, board: None, .. }));
        assert!(matches!(events[1], GameEvent::TurnChanged { player: 1, turn: 2, .. }));
        assert!(game.take_events().is_empty());
    }

    #[test]
    fn settling_finishes_the_game() {
        let mut game = two_player_game(GameConfig::default());
        let mut rng = zero_rng();
        game.start(&mut rng).unwrap();
        game.place(0, single(0, 0), &mut rng).unwrap();
        assert_eq!(game.settle(0), Err(IllegalAction::NotYourTurn { current: 1 }));
        game.settle(1).unwrap();
        // Nobody else is active after player 0's next turn, so they are settled then.
        assert_eq!(game.current_player(), 0);
        assert!(!game.is_finished());
        let domino = PieceToPlace {
            piece: PieceId(1),
            ..single(1, 1)
        };
        game.place(0, domino, &mut rng).unwrap();
        assert!(game.is_finished());
        let results = game.results();
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[1].rank, 2);
        assert_eq!(results[0].score.total(), 3);
        let events = game.take_events();
        assert!(matches!(events.last(), Some(GameEvent::Finished { .. })));
        assert_eq!(game.place(0, single(5, 5), &mut rng), Err(IllegalAction::GameNotRunning));
    }

    #[test]
    fn next_active_player_skips_settled() {
        let mut game = GameState::new(
            1,
            GameConfig::default(),
            (0..4).map(|k| PlayerSetup::new(format!("p{}", k), Controller::Ai)).collect(),
        )
        .unwrap();
        let mut rng = zero_rng();
        game.start(&mut rng).unwrap();
        game.force_settle(1).unwrap();
        game.force_settle(2).unwrap();
        assert_eq!(game.next_active_player(), Some(3));
        game.force_settle(3).unwrap();
        assert_eq!(game.next_active_player(), Some(0));
    }

    #[test]
    fn stuck_player_is_settled_when_the_turn_begins() {
        let mut game = two_player_game(GameConfig::default());
        let mut rng = zero_rng();
        game.start(&mut rng).unwrap();
        // Take every piece away from bob; he cannot continue any more.
        game.players[1].pieces = PieceSet::new();
        assert!(!game.can_player_continue(1));
        assert!(game.can_player_continue(0));
        game.place(0, single(0, 0), &mut rng).unwrap();
        assert!(game.players()[1].settled);
        let events = game.take_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::PlayerSettled { player: 1, forced: true })));
    }

    #[test]
    fn big_piece_ban_skips_instead_of_settling() {
        let mut game = two_player_game(GameConfig {
            creative: Some(CreativeConfig::default()),
            ..GameConfig::default()
        });
        let mut rng = zero_rng();
        game.start(&mut rng).unwrap();
        game.place(0, single(0, 0), &mut rng).unwrap();
        game.players[0].pieces = FULL_PIECE_SET
            .largest_first()
            .into_iter()
            .filter(|p| p.size() == 5)
            .fold(PieceSet::new(), |set, p| set.insert(p));
        game.apply_effect(0, 0, &crate::EffectResult::with_status(StatusKind::BigPieceBan, 2), &mut rng);
        game.take_events();

        game.place(1, single(0, 19), &mut rng).unwrap();
        assert!(game.can_player_continue(0));
        assert!(!game.players()[0].settled);
        assert_eq!(game.current_player(), 1);
        let events = game.take_events();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::TurnSkipped {
                player: 0,
                reason: SkipReason::BigPieceBan,
                ..
            }
        )));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::PlayerSettled { player: 0, .. })));

        let domino = PieceToPlace {
            piece: PieceId(1),
            ..single(1, 17)
        };
        game.place(1, domino, &mut rng).unwrap();
        assert_eq!(game.current_player(), 1);
        let tromino = PieceToPlace {
            piece: PieceId(2),
            ..single(2, 14)
        };
        game.place(1, tromino, &mut rng).unwrap();
        // The ban has run out and the five-cell pieces are playable again.
        assert_eq!(game.current_player(), 0);
        assert!(!game.has_status(0, StatusKind::BigPieceBan));
        let big = game.players()[0].pieces.largest_first()[0];
        let red = game.players()[0].color;
        assert!(!game.board().legal_placements(red, big, &game.blocked_cells()).is_empty());
    }

    #[test]
    fn timeouts_skip_then_settle() {
        let config = GameConfig {
            turn_seconds: 2,
            ..GameConfig::default()
        };
        let mut game = two_player_game(config);
        let mut rng = zero_rng();
        game.start(&mut rng).unwrap();

        let stale = game.timer_token();
        assert!(game.tick(stale));
        assert_eq!(game.turn_remaining(), 1);
        assert!(game.tick(game.timer_token()));
        // Player 0 timed out; it is player 1's turn now and the old token is stale.
        assert_eq!(game.current_player(), 1);
        assert!(!game.tick(stale));
        assert_eq!(game.players()[0].timeouts, 1);
        assert!(!game.players()[0].settled);

        for _ in 0..4 {
            game.place(1, single(0, 19), &mut rng).ok();
            while game.current_player() == 0 && !game.is_finished() {
                game.tick(game.timer_token());
            }
            game.settle(1).ok();
        }
        assert!(game.players()[0].settled);
        assert!(game.is_finished());
    }

    #[test]
    fn placing_resets_the_timeout_counter() {
        let config = GameConfig {
            turn_seconds: 1,
            ..GameConfig::default()
        };
        let mut game = two_player_game(config);
        let mut rng = zero_rng();
        game.start(&mut rng).unwrap();
        game.tick(game.timer_token());
        game.tick(game.timer_token());
        assert_eq!(game.players()[0].timeouts, 1);
        game.place(0, single(0, 0), &mut rng).unwrap();
        assert_eq!(game.players()[0].timeouts, 0);
    }

    #[test]
    fn score_is_cell_count_plus_bonus() {
        let config = GameConfig {
            creative: Some(CreativeConfig::default()),
            ..GameConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let mut game = two_player_game(config);
        game.start(&mut rng).unwrap();
        for _ in 0..200 {
            if game.is_finished() {
                break;
            }
            crate::take_ai_turn(&mut game, &crate::Heuristic::default(), &mut rng).unwrap();
            for p in 0..2 {
                let score = game.score(p);
                assert_eq!(score.base, game.board().count(game.players()[p].color));
                assert!(score.total() >= 0);
                assert_eq!(score.bonus, game.creative().unwrap().players[p].bonus_score);
            }
        }
        assert!(game.is_finished());
        let used: u32 = game.players().iter().map(|p| NUM_PIECES as u32 - p.pieces.len()).sum();
        assert!(used > 0);
    }
}
