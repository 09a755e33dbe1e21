use blokus::{
    take_ai_turn, ClientMessage, GameConfig, GameState, Heuristic, IllegalAction, PlayerSetup, ServerMessage,
    TimerToken,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

/// What the host sends after handling a command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Response {
    /// For the sender only.
    pub reply: Option<ServerMessage>,
    /// For every client, in order. Sent before the reply.
    pub broadcast: Vec<ServerMessage>,
}

/// The authoritative host of one game.
///
/// Every state change is broadcast as a numbered [`ServerMessage::Event`].
/// Seats driven by the AI, including remote players who are offline, are
/// played as soon as their turn comes up.
pub struct Room {
    id: String,
    game: GameState,
    seq: u64,
    paused: bool,
    heuristic: Heuristic,
    rng: StdRng,
}

impl Room {
    pub fn new(
        id: impl Into<String>,
        game_id: u64,
        config: GameConfig,
        setups: Vec<PlayerSetup>,
        seed: u64,
    ) -> Result<Self, IllegalAction> {
        Ok(Self {
            id: id.into(),
            game: GameState::new(game_id, config, setups)?,
            seq: 0,
            paused: false,
            heuristic: Heuristic::default(),
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn with_heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    /// Sequence number of the last broadcast event.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn timer_token(&self) -> TimerToken {
        self.game.timer_token()
    }

    pub fn start(&mut self) -> Result<Vec<ServerMessage>, IllegalAction> {
        self.game.start(&mut self.rng)?;
        info!(room = %self.id, "Game started");
        self.run_ai();
        Ok(self.flush())
    }

    pub fn state_message(&self) -> ServerMessage {
        let mut snapshot = self.game.snapshot();
        snapshot.paused = self.paused;
        ServerMessage::State {
            seq: self.seq,
            snapshot,
        }
    }

    pub fn handle(&mut self, player: usize, msg: ClientMessage) -> Response {
        let (room_id, request_id) = match &msg {
            ClientMessage::Move {
                room_id, request_id, ..
            } => (room_id, Some(*request_id)),
            ClientMessage::Settle { room_id }
            | ClientMessage::UseItemCard { room_id, .. }
            | ClientMessage::SkipItemPhase { room_id }
            | ClientMessage::RequestState { room_id } => (room_id, None),
        };
        if *room_id != self.id {
            return reject(request_id, format!("Unknown room '{}'", room_id));
        }
        if let ClientMessage::RequestState { .. } = msg {
            return Response {
                reply: Some(self.state_message()),
                broadcast: Vec::new(),
            };
        }
        if self.paused {
            return reject(request_id, String::from("The game is paused"));
        }

        let result = match msg {
            ClientMessage::Move { placement, .. } => self.game.place(player, placement, &mut self.rng),
            ClientMessage::Settle { .. } => self.game.settle(player),
            ClientMessage::UseItemCard {
                card_index, target, ..
            } => self.game.use_item_card(player, card_index, target, &mut self.rng),
            ClientMessage::SkipItemPhase { .. } => self.game.skip_item_phase(player),
            ClientMessage::RequestState { .. } => Ok(()),
        };
        match result {
            Ok(()) => {
                self.run_ai();
                Response {
                    reply: Some(ServerMessage::Ack {
                        request_id,
                        success: true,
                        error: None,
                    }),
                    broadcast: self.flush(),
                }
            }
            Err(err) => {
                warn!(room = %self.id, player, %err, "Command rejected");
                reject(request_id, err.to_string())
            }
        }
    }

    /// One second of the live countdown. Stale tokens and ticks while paused do nothing.
    pub fn tick(&mut self, token: TimerToken) -> Vec<ServerMessage> {
        if self.paused || !self.game.tick(token) {
            return Vec::new();
        }
        self.run_ai();
        self.flush()
    }

    pub fn pause(&mut self) -> Vec<ServerMessage> {
        if self.paused {
            return Vec::new();
        }
        self.paused = true;
        vec![ServerMessage::Paused]
    }

    pub fn resume(&mut self) -> Vec<ServerMessage> {
        if !self.paused {
            return Vec::new();
        }
        self.paused = false;
        let mut messages = vec![ServerMessage::Resumed];
        self.run_ai();
        messages.extend(self.flush());
        messages
    }

    /// The player's connection dropped. The AI takes over their seat.
    pub fn disconnect(&mut self, player: usize) -> Result<Vec<ServerMessage>, IllegalAction> {
        self.game.set_offline(player, true)?;
        info!(room = %self.id, player, "Player went offline");
        self.run_ai();
        Ok(self.flush())
    }

    /// The player is back. The reply is the full state to send to them.
    pub fn reconnect(&mut self, player: usize) -> Result<Response, IllegalAction> {
        self.game.set_offline(player, false)?;
        info!(room = %self.id, player, "Player is back online");
        let broadcast = self.flush();
        Ok(Response {
            reply: Some(self.state_message()),
            broadcast,
        })
    }

    fn run_ai(&mut self) {
        // Every AI turn places or settles, so this is bounded by the pieces left.
        while !self.paused && !self.game.is_finished() {
            let current = self.game.current_player();
            if !self.game.players()[current].is_ai_driven() {
                break;
            }
            if let Err(err) = take_ai_turn(&mut self.game, &self.heuristic, &mut self.rng) {
                warn!(room = %self.id, player = current, %err, "AI turn failed");
                break;
            }
        }
    }

    fn flush(&mut self) -> Vec<ServerMessage> {
        self.game
            .take_events()
            .into_iter()
            .map(|event| {
                self.seq += 1;
                debug!(room = %self.id, seq = self.seq, "Broadcasting event");
                ServerMessage::Event { seq: self.seq, event }
            })
            .collect()
    }
}

fn reject(request_id: Option<u64>, error: String) -> Response {
    Response {
        reply: Some(ServerMessage::Ack {
            request_id,
            success: false,
            error: Some(error),
        }),
        broadcast: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use blokus::{Controller, GameEvent, Orientation, PieceId, PieceToPlace};

    use super::*;

    fn room() -> Room {
        Room::new(
            "r1",
            1,
            GameConfig::default(),
            vec![
                PlayerSetup::new("a", Controller::Human),
                PlayerSetup::new("b", Controller::Remote),
            ],
            4,
        )
        .unwrap()
    }

    fn monomino(i: i8, j: i8) -> PieceToPlace {
        PieceToPlace {
            piece: PieceId(0),
            orientation: Orientation::default(),
            i,
            j,
        }
    }

    #[test]
    fn events_are_numbered_consecutively() {
        let mut room = room();
        let mut messages = room.start().unwrap();
        let current = room.game().current_player();
        let corner = room.game().players()[current].color.starting_corner();
        let response = room.handle(
            current,
            ClientMessage::Move {
                room_id: String::from("r1"),
                request_id: 5,
                placement: monomino(corner.0, corner.1),
            },
        );
        assert_eq!(
            response.reply,
            Some(ServerMessage::Ack {
                request_id: Some(5),
                success: true,
                error: None
            })
        );
        messages.extend(response.broadcast);
        let seqs: Vec<u64> = messages
            .iter()
            .map(|m| match m {
                ServerMessage::Event { seq, .. } => *seq,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(seqs, (1..=room.seq()).collect::<Vec<_>>());
    }

    #[test]
    fn illegal_commands_are_rejected() {
        let mut room = room();
        room.start().unwrap();
        let other = 1 - room.game().current_player();
        let response = room.handle(other, ClientMessage::Settle { room_id: String::from("r1") });
        assert!(matches!(response.reply, Some(ServerMessage::Ack { success: false, .. })));
        assert!(response.broadcast.is_empty());
        let response = room.handle(other, ClientMessage::Settle { room_id: String::from("nope") });
        assert!(matches!(response.reply, Some(ServerMessage::Ack { success: false, .. })));
    }

    #[test]
    fn pausing_freezes_the_clock() {
        let mut room = room();
        room.start().unwrap();
        assert_eq!(room.pause(), vec![ServerMessage::Paused]);
        assert!(room.tick(room.timer_token()).is_empty());
        assert_eq!(room.game().turn_remaining(), 60);
        let current = room.game().current_player();
        let response = room.handle(current, ClientMessage::Settle { room_id: String::from("r1") });
        assert!(matches!(response.reply, Some(ServerMessage::Ack { success: false, .. })));
        assert_eq!(room.resume(), vec![ServerMessage::Resumed]);
        let ticked = room.tick(room.timer_token());
        assert!(matches!(
            ticked.as_slice(),
            [ServerMessage::Event {
                event: GameEvent::TimeUpdate { remaining: 59, .. },
                ..
            }]
        ));
    }

    #[test]
    fn offline_seats_are_played_by_the_ai() {
        let mut room = room();
        room.start().unwrap();
        let current = room.game().current_player();
        let messages = room.disconnect(current).unwrap();
        assert!(messages.iter().any(|m| matches!(
            m,
            ServerMessage::Event {
                event: GameEvent::MoveApplied { player, .. },
                ..
            } if *player == current
        )));
        assert_ne!(room.game().current_player(), current);
        let response = room.reconnect(current).unwrap();
        assert!(matches!(
            response.broadcast.as_slice(),
            [ServerMessage::Event {
                event: GameEvent::PlayerConnectivity { offline: false, .. },
                ..
            }]
        ));
        let Some(ServerMessage::State { seq, snapshot }) = response.reply else {
            panic!("expected a full state");
        };
        assert_eq!(seq, room.seq());
        assert!(!snapshot.players[current].offline);
    }

    #[test]
    fn other_clients_see_seats_go_offline() {
        let mut room = room();
        room.start().unwrap();
        let ServerMessage::State { snapshot, .. } = room.state_message() else {
            panic!("expected a full state");
        };
        let mut mirror = snapshot;
        let waiting = 1 - room.game().current_player();
        for msg in room.disconnect(waiting).unwrap() {
            if let ServerMessage::Event { event, .. } = msg {
                mirror.apply(&event);
            }
        }
        assert!(mirror.players[waiting].offline);
        let ServerMessage::State { snapshot, .. } = room.state_message() else {
            panic!("expected a full state");
        };
        assert_eq!(mirror, snapshot);
    }
}
