use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::{ClientMessage, GameEvent, GameSnapshot, IllegalAction, PieceToPlace, ServerMessage};

/// How long a submitted move may wait for its acknowledgement.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Tolerance for countdown values that go up within one turn.
const TIME_TOLERANCE: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Reconnecting,
    Disconnected,
}

/// The error type for [`Reconciler::submit_move()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncError {
    NotConnected(ConnectionState),
    /// A full state is on its way; moves have to wait for it.
    Resyncing,
    /// Only one move can be in flight.
    MovePending,
    Rejected(IllegalAction),
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::NotConnected(state) => write!(f, "Not connected ({:?})", state),
            SyncError::Resyncing => write!(f, "Waiting for the full game state"),
            SyncError::MovePending => write!(f, "Another move is still waiting for confirmation"),
            SyncError::Rejected(_) => write!(f, "The move was rejected locally"),
        }
    }
}

/// A submitted move, with the state to return to if it fails.
#[derive(Clone, Debug)]
pub struct PendingMove {
    pub request_id: u64,
    pub placement: PieceToPlace,
    pub before: GameSnapshot,
    pub deadline: Instant,
}

/// What handling a message did to the local view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncUpdate {
    /// Duplicate, stale or dropped while resyncing.
    Ignored,
    Applied,
    /// Our pending move was accepted.
    Confirmed,
    /// Our pending move failed and the view was restored.
    RolledBack { error: String },
    /// The view was replaced by a full snapshot.
    Resynced,
    /// A gap in the event sequence was detected; send this to recover.
    Resync(ClientMessage),
    Paused,
    Resumed,
}

/// Keeps a locally predicted view consistent with the host's authoritative state.
///
/// Moves are applied to the view as soon as they are submitted. Everything
/// the host sends overwrites the prediction, and a failed move restores the
/// view captured before it.
#[derive(Clone, Debug)]
pub struct Reconciler {
    room_id: String,
    me: usize,
    view: GameSnapshot,
    pending: Option<PendingMove>,
    next_request_id: u64,
    last_seq: u64,
    connection: ConnectionState,
    awaiting_state: bool,
    request_timeout: Duration,
}

impl Reconciler {
    /// Starts from a full snapshot received as event number `seq`.
    pub fn new(room_id: impl Into<String>, me: usize, snapshot: GameSnapshot, seq: u64) -> Self {
        Self {
            room_id: room_id.into(),
            me,
            view: snapshot,
            pending: None,
            next_request_id: 1,
            last_seq: seq,
            connection: ConnectionState::Connected,
            awaiting_state: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn view(&self) -> &GameSnapshot {
        &self.view
    }

    pub fn pending(&self) -> Option<&PendingMove> {
        self.pending.as_ref()
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// Validates and predicts a move, returning the message to send to the host.
    pub fn submit_move(&mut self, placement: PieceToPlace, now: Instant) -> Result<ClientMessage, SyncError> {
        if self.connection != ConnectionState::Connected {
            return Err(SyncError::NotConnected(self.connection));
        }
        if self.awaiting_state {
            return Err(SyncError::Resyncing);
        }
        if self.pending.is_some() {
            return Err(SyncError::MovePending);
        }
        let before = self.view.clone();
        self.view
            .apply_local_move(self.me, placement)
            .map_err(SyncError::Rejected)?;

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        debug!(request_id, piece = %placement.piece, "Move submitted");
        self.pending = Some(PendingMove {
            request_id,
            placement,
            before,
            deadline: now + self.request_timeout,
        });
        Ok(ClientMessage::Move {
            room_id: self.room_id.clone(),
            request_id,
            placement,
        })
    }

    pub fn settle(&self) -> ClientMessage {
        ClientMessage::Settle {
            room_id: self.room_id.clone(),
        }
    }

    pub fn use_item_card(&self, card_index: usize, target: Option<usize>) -> ClientMessage {
        ClientMessage::UseItemCard {
            room_id: self.room_id.clone(),
            card_index,
            target,
        }
    }

    pub fn skip_item_phase(&self) -> ClientMessage {
        ClientMessage::SkipItemPhase {
            room_id: self.room_id.clone(),
        }
    }

    pub fn handle(&mut self, msg: ServerMessage) -> SyncUpdate {
        match msg {
            ServerMessage::Ack {
                request_id,
                success,
                error,
            } => self.handle_ack(request_id, success, error),
            ServerMessage::Event { seq, event } => self.handle_event(seq, event),
            ServerMessage::State { seq, snapshot } => {
                debug!(seq, "Full state received");
                self.view = snapshot;
                self.last_seq = seq;
                self.pending = None;
                self.awaiting_state = false;
                SyncUpdate::Resynced
            }
            ServerMessage::Paused => {
                self.view.paused = true;
                SyncUpdate::Paused
            }
            ServerMessage::Resumed => {
                self.view.paused = false;
                SyncUpdate::Resumed
            }
        }
    }

    /// Rolls back the pending move if its deadline has passed.
    pub fn expire_pending(&mut self, now: Instant) -> Option<SyncUpdate> {
        let expired = self.pending.as_ref().is_some_and(|p| p.deadline <= now);
        if !expired {
            return None;
        }
        warn!("Move was not acknowledged in time");
        self.rollback();
        Some(SyncUpdate::RolledBack {
            error: String::from("request timed out"),
        })
    }

    /// The connection dropped. Any pending move is rolled back.
    pub fn on_disconnect(&mut self) {
        debug!("Connection lost");
        self.rollback();
        self.connection = ConnectionState::Reconnecting;
        self.awaiting_state = true;
    }

    /// Reconnecting failed for good.
    pub fn on_give_up(&mut self) {
        self.rollback();
        self.connection = ConnectionState::Disconnected;
    }

    /// The connection is back. Events are dropped until the returned state
    /// request has been answered.
    pub fn on_reconnect(&mut self) -> ClientMessage {
        self.connection = ConnectionState::Connected;
        self.awaiting_state = true;
        ClientMessage::RequestState {
            room_id: self.room_id.clone(),
        }
    }

    fn rollback(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(request_id = pending.request_id, "Rolling back move");
            self.view = pending.before;
        }
    }

    fn handle_ack(&mut self, request_id: Option<u64>, success: bool, error: Option<String>) -> SyncUpdate {
        let matches = request_id.is_some() && self.pending.as_ref().map(|p| p.request_id) == request_id;
        if !matches {
            if !success {
                warn!(?request_id, ?error, "Command rejected");
            }
            return SyncUpdate::Ignored;
        }
        if success {
            // The prediction stays until the host's events overwrite it.
            self.pending = None;
            SyncUpdate::Confirmed
        } else {
            self.rollback();
            SyncUpdate::RolledBack {
                error: error.unwrap_or_default(),
            }
        }
    }

    fn handle_event(&mut self, seq: u64, event: GameEvent) -> SyncUpdate {
        if self.awaiting_state {
            return SyncUpdate::Ignored;
        }
        if seq <= self.last_seq {
            debug!(seq, last_seq = self.last_seq, "Duplicate event");
            return SyncUpdate::Ignored;
        }
        if seq > self.last_seq + 1 {
            warn!(seq, last_seq = self.last_seq, "Missed events, requesting state");
            self.rollback();
            self.awaiting_state = true;
            return SyncUpdate::Resync(ClientMessage::RequestState {
                room_id: self.room_id.clone(),
            });
        }
        self.last_seq = seq;

        if let GameEvent::TimeUpdate {
            turn,
            remaining,
            item_phase,
        } = event
        {
            let shown = if item_phase {
                self.view.item_phase.map(|p| p.remaining)
            } else {
                Some(self.view.remaining)
            };
            let regressed = shown.map_or(true, |shown| remaining > shown + TIME_TOLERANCE);
            if turn != self.view.turn || regressed {
                debug!(turn, remaining, "Ignoring out of order time update");
                return SyncUpdate::Ignored;
            }
        }

        let own_move = matches!(
            (&event, &self.pending),
            (GameEvent::MoveApplied { player, placement, .. }, Some(pending))
                if *player == self.me && *placement == pending.placement
        );
        if own_move {
            // The confirmed move replaces the prediction.
            if let Some(pending) = self.pending.take() {
                let mut view = pending.before;
                view.apply(&event);
                self.view = view;
            }
            return SyncUpdate::Confirmed;
        }

        if let Some(pending) = &mut self.pending {
            pending.before.apply(&event);
        }
        self.view.apply(&event);
        SyncUpdate::Applied
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::mock::StepRng;

    use super::*;
    use crate::{Controller, GameConfig, GameState, Orientation, PieceId, PlayerSetup};

    fn piece(piece: u8, i: i8, j: i8) -> PieceToPlace {
        PieceToPlace {
            piece: PieceId(piece),
            orientation: Orientation::default(),
            i,
            j,
        }
    }

    /// A host game and a reconciler for seat 0, fed with numbered events.
    struct Fixture {
        game: GameState,
        seq: u64,
        client: Reconciler,
    }

    impl Fixture {
        fn new() -> Self {
            let mut game = GameState::new(
                9,
                GameConfig::default(),
                vec![
                    PlayerSetup::new("me", Controller::Human),
                    PlayerSetup::new("them", Controller::Remote),
                ],
            )
            .unwrap();
            game.start(&mut StepRng::new(0, 0)).unwrap();
            game.take_events();
            let client = Reconciler::new("room", 0, game.snapshot(), 0);
            Self {
                game,
                seq: 0,
                client,
            }
        }

        fn broadcast(&mut self) -> Vec<ServerMessage> {
            self.game
                .take_events()
                .into_iter()
                .map(|event| {
                    self.seq += 1;
                    ServerMessage::Event {
                        seq: self.seq,
                        event,
                    }
                })
                .collect()
        }
    }

    fn bytes(snapshot: &GameSnapshot) -> String {
        serde_json::to_string(snapshot).unwrap()
    }

    #[test]
    fn rejected_move_is_fully_rolled_back() {
        let mut fx = Fixture::new();
        let before = bytes(fx.client.view());
        let now = Instant::now();
        let msg = fx.client.submit_move(piece(6, 0, 0), now).unwrap();
        let ClientMessage::Move { request_id, .. } = msg else {
            panic!("expected a move");
        };
        assert_ne!(bytes(fx.client.view()), before);
        assert_eq!(fx.client.view().board.count(crate::Color::Red), 4);

        let update = fx.client.handle(ServerMessage::Ack {
            request_id: Some(request_id),
            success: false,
            error: Some(String::from("nope")),
        });
        assert_eq!(update, SyncUpdate::RolledBack { error: String::from("nope") });
        assert_eq!(bytes(fx.client.view()), before);
        assert!(fx.client.pending().is_none());
    }

    #[test]
    fn locally_illegal_moves_are_not_sent() {
        let mut fx = Fixture::new();
        let before = fx.client.view().clone();
        let err = fx.client.submit_move(piece(6, 5, 5), Instant::now()).unwrap_err();
        assert!(matches!(err, SyncError::Rejected(IllegalAction::IllegalPlacement(_))));
        assert_eq!(fx.client.view(), &before);
    }

    #[test]
    fn confirmed_move_matches_the_host() {
        let mut fx = Fixture::new();
        let placement = piece(6, 0, 0);
        let msg = fx.client.submit_move(placement, Instant::now()).unwrap();
        assert_eq!(
            fx.client.submit_move(piece(0, 5, 5), Instant::now()),
            Err(SyncError::MovePending)
        );
        let ClientMessage::Move { request_id, .. } = msg else {
            panic!("expected a move");
        };
        let mut rng = StepRng::new(0, 0);
        fx.game.place(0, placement, &mut rng).unwrap();
        // Events before the ack.
        for msg in fx.broadcast() {
            fx.client.handle(msg);
        }
        assert!(fx.client.pending().is_none());
        assert_eq!(
            fx.client.handle(ServerMessage::Ack {
                request_id: Some(request_id),
                success: true,
                error: None
            }),
            SyncUpdate::Ignored
        );
        assert_eq!(fx.client.view(), &fx.game.snapshot());
    }

    #[test]
    fn timed_out_move_is_rolled_back() {
        let mut fx = Fixture::new();
        let before = fx.client.view().clone();
        let now = Instant::now();
        fx.client = Reconciler::new("room", 0, before.clone(), 0).with_request_timeout(Duration::from_secs(2));
        fx.client.submit_move(piece(6, 0, 0), now).unwrap();
        assert_eq!(fx.client.expire_pending(now + Duration::from_secs(1)), None);
        assert!(matches!(
            fx.client.expire_pending(now + Duration::from_secs(2)),
            Some(SyncUpdate::RolledBack { .. })
        ));
        assert_eq!(fx.client.view(), &before);
    }

    #[test]
    fn duplicates_and_stale_ticks_are_ignored() {
        let mut fx = Fixture::new();
        for _ in 0..3 {
            fx.game.tick(fx.game.timer_token());
        }
        let msgs = fx.broadcast();
        for msg in msgs.iter().cloned() {
            assert_eq!(fx.client.handle(msg), SyncUpdate::Applied);
        }
        assert_eq!(fx.client.view().remaining, 57);
        // Redelivery changes nothing.
        for msg in msgs {
            assert_eq!(fx.client.handle(msg), SyncUpdate::Ignored);
        }
        let seq = fx.client.last_seq() + 1;
        let late = ServerMessage::Event {
            seq,
            event: GameEvent::TimeUpdate {
                turn: 1,
                remaining: 59,
                item_phase: false,
            },
        };
        assert_eq!(fx.client.handle(late), SyncUpdate::Ignored);
        let other_turn = ServerMessage::Event {
            seq: seq + 1,
            event: GameEvent::TimeUpdate {
                turn: 0,
                remaining: 10,
                item_phase: false,
            },
        };
        assert_eq!(fx.client.handle(other_turn), SyncUpdate::Ignored);
        assert_eq!(fx.client.view().remaining, 57);
    }

    #[test]
    fn reconnect_resyncs_from_a_full_state() {
        let mut fx = Fixture::new();
        fx.client.submit_move(piece(6, 0, 0), Instant::now()).unwrap();
        fx.client.on_disconnect();
        assert_eq!(fx.client.connection(), ConnectionState::Reconnecting);
        assert!(fx.client.pending().is_none());
        assert_eq!(
            fx.client.submit_move(piece(6, 0, 0), Instant::now()),
            Err(SyncError::NotConnected(ConnectionState::Reconnecting))
        );

        // Meanwhile the seat was played by someone else.
        let mut rng = StepRng::new(0, 0);
        fx.game.place(0, piece(0, 0, 0), &mut rng).unwrap();
        let missed = fx.broadcast();

        let request = fx.client.on_reconnect();
        assert!(matches!(request, ClientMessage::RequestState { .. }));
        for msg in missed {
            assert_eq!(fx.client.handle(msg), SyncUpdate::Ignored);
        }
        let state = ServerMessage::State {
            seq: fx.seq,
            snapshot: fx.game.snapshot(),
        };
        assert_eq!(fx.client.handle(state), SyncUpdate::Resynced);
        assert_eq!(fx.client.view(), &fx.game.snapshot());

        fx.game.place(1, piece(0, 0, 19), &mut rng).unwrap();
        for msg in fx.broadcast() {
            assert_eq!(fx.client.handle(msg), SyncUpdate::Applied);
        }
        assert_eq!(fx.client.view(), &fx.game.snapshot());
    }

    #[test]
    fn gaps_trigger_a_resync() {
        let mut fx = Fixture::new();
        fx.game.tick(fx.game.timer_token());
        fx.game.tick(fx.game.timer_token());
        let mut msgs = fx.broadcast();
        let second = msgs.pop().unwrap();
        assert!(matches!(fx.client.handle(second), SyncUpdate::Resync(_)));
        assert_eq!(
            fx.client.submit_move(piece(6, 0, 0), Instant::now()),
            Err(SyncError::Resyncing)
        );
    }
}
