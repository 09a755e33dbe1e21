use blokus::{
    item_context, take_ai_turn, Board, Controller, GameConfig, GameState, Heuristic, ItemChoice, Okay,
    PlayTurnResponse, PlayerResult, PlayerSetup, Request, StatusKind,
};
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::player::Player;
use crate::recording::Recorder;

/// Someone taking a seat in a game.
pub enum Participant<'a> {
    /// The heuristic, run in-process.
    Builtin { name: String, heuristic: Heuristic },
    /// An external bot.
    Bot(&'a mut Player),
}

impl Participant<'_> {
    pub fn name(&self) -> &str {
        match self {
            Participant::Builtin { name, .. } => name,
            Participant::Bot(player) => &player.name,
        }
    }
}

pub struct GameOutcome {
    pub results: Vec<PlayerResult>,
    /// Seats that were force-settled for an illegal action.
    pub illegal_moves: Vec<usize>,
    pub final_board: Board,
}

/// Plays one game to completion.
///
/// Returns an error only on communication failure. A bot that asks for
/// something illegal is settled on the spot and the game goes on.
pub fn play_game(
    game_id: u64,
    rng: &mut StdRng,
    participants: &mut [Participant<'_>],
    config: GameConfig,
    recorder: &mut Option<Recorder>,
) -> anyhow::Result<GameOutcome> {
    let setups = participants
        .iter()
        .map(|p| {
            let controller = match p {
                Participant::Builtin { .. } => Controller::Ai,
                Participant::Bot(_) => Controller::Remote,
            };
            PlayerSetup::new(p.name(), controller)
        })
        .collect();
    let mut state = GameState::new(game_id, config, setups)?;
    state.start(rng)?;

    // Inform the bots about the new game, so that they can reset their state
    for (seat, participant) in participants.iter_mut().enumerate() {
        if let Participant::Bot(player) = participant {
            let color = state.players()[seat].color;
            let _: Okay = player.perform_request(recorder, &Request::NewGame { color })?;
        }
    }

    let mut illegal_moves = Vec::new();
    while !state.is_finished() {
        let seat = state.current_player();
        match &mut participants[seat] {
            Participant::Builtin { heuristic, .. } => take_ai_turn(&mut state, heuristic, rng)?,
            Participant::Bot(player) => {
                if !play_bot_turn(&mut state, seat, player, rng, recorder)? {
                    illegal_moves.push(seat);
                }
            }
        }
    }

    let results = state.results();
    for result in &results {
        info!(
            player = %result.name,
            score = result.score.total(),
            rank = result.rank,
            "Game {} finished",
            game_id
        );
    }
    if let Some(rec) = recorder {
        let path = rec.write_game_recording(results.clone(), state.moves().to_vec(), state.board().clone())?;
        debug!(path = %path.display(), "Game recorded");
    }
    Ok(GameOutcome {
        results,
        illegal_moves,
        final_board: state.board().clone(),
    })
}

/// Returns `false` if the bot was settled for an illegal action.
fn play_bot_turn(
    state: &mut GameState,
    seat: usize,
    player: &mut Player,
    rng: &mut StdRng,
    recorder: &mut Option<Recorder>,
) -> anyhow::Result<bool> {
    if state.item_phase().is_some() {
        let req = Request::ItemPhase {
            context: item_context(state, seat),
        };
        let choice: ItemChoice = player.perform_request(recorder, &req)?;
        match choice.card_index {
            Some(index) => {
                if let Err(err) = state.use_item_card(seat, index, choice.target, rng) {
                    warn!(player = %player.name, %err, "Illegal item card use");
                    state.force_settle(seat)?;
                    return Ok(false);
                }
            }
            None => state.skip_item_phase(seat)?,
        }
    }

    let color = state.players()[seat].color;
    let req = Request::PlayTurn {
        board: state.board().clone(),
        pieces: state.players()[seat].pieces,
        blocked: state.blocked_cells(),
        big_piece_ban: state.has_status(seat, StatusKind::BigPieceBan),
    };
    let PlayTurnResponse(placement) = player.perform_request(recorder, &req)?;
    match placement {
        Some(placement) => {
            if let Err(err) = state.place(seat, placement, rng) {
                warn!(player = %player.name, ?color, %err, "Illegal move by player");
                let mut err_dyn = &err as &dyn std::error::Error;
                while let Some(src_err) = err_dyn.source() {
                    warn!("{}", src_err);
                    err_dyn = src_err;
                }
                state.force_settle(seat)?;
                return Ok(false);
            }
        }
        None => {
            debug!(player = %player.name, "Bot settles");
            state.settle(seat)?;
        }
    }
    Ok(true)
}
