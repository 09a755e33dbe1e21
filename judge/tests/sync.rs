use std::time::Instant;

use blokus::{
    ClientMessage, Controller, GameConfig, Orientation, PieceId, PieceToPlace, PlayerSetup, Reconciler,
    ServerMessage, SyncUpdate,
};
use judge::{Response, Room};

/// One human client against an AI seat, wired to a room in memory.
struct Table {
    room: Room,
    client: Reconciler,
    seat: usize,
}

impl Table {
    fn new(seed: u64) -> Self {
        let mut room = Room::new(
            "table",
            42,
            GameConfig::default(),
            vec![
                PlayerSetup::new("human", Controller::Human),
                PlayerSetup::new("ai", Controller::Ai),
            ],
            seed,
        )
        .unwrap();
        room.start().unwrap();
        let ServerMessage::State { seq, snapshot } = room.state_message() else {
            panic!("expected a full state");
        };
        let client = Reconciler::new("table", 0, snapshot, seq);
        Self {
            room,
            client,
            seat: 0,
        }
    }

    fn deliver(&mut self, response: Response) -> Vec<SyncUpdate> {
        let mut updates: Vec<SyncUpdate> = response
            .broadcast
            .into_iter()
            .map(|msg| self.client.handle(msg))
            .collect();
        if let Some(reply) = response.reply {
            updates.push(self.client.handle(reply));
        }
        updates
    }

    fn send(&mut self, msg: ClientMessage) -> Vec<SyncUpdate> {
        let response = self.room.handle(self.seat, msg);
        self.deliver(response)
    }

    fn assert_in_sync(&self) {
        let ServerMessage::State { snapshot, .. } = self.room.state_message() else {
            panic!("expected a full state");
        };
        assert_eq!(self.client.view(), &snapshot);
    }
}

fn corner_piece(piece: u8) -> PieceToPlace {
    PieceToPlace {
        piece: PieceId(piece),
        orientation: Orientation::default(),
        i: 0,
        j: 0,
    }
}

#[test]
fn a_game_played_through_the_room_stays_in_sync() {
    // The AI seat may start; it has moved by the time the room is started.
    let mut table = Table::new(1);
    table.assert_in_sync();
    assert_eq!(table.room.game().current_player(), 0);

    let msg = table.client.submit_move(corner_piece(6), Instant::now()).unwrap();
    let updates = table.send(msg);
    assert!(updates.contains(&SyncUpdate::Confirmed));
    assert!(table.client.pending().is_none());
    table.assert_in_sync();

    // Keep playing with the heuristic until the game is over.
    let heuristic = blokus::Heuristic::default();
    for _ in 0..50 {
        if table.room.game().is_finished() {
            break;
        }
        let view = table.client.view();
        let me = &view.players[table.seat];
        let msg = match heuristic.make_move(&view.board, me.color, me.pieces, &view.blocked_cells(), false) {
            Some(placement) => table.client.submit_move(placement, Instant::now()).unwrap(),
            None => table.client.settle(),
        };
        table.send(msg);
        table.assert_in_sync();
    }
    assert!(table.room.game().is_finished());
    assert!(table.client.view().players.iter().all(|p| p.settled));
}

#[test]
fn a_rejected_move_leaves_no_trace() {
    let mut table = Table::new(1);
    let before = serde_json::to_string(table.client.view()).unwrap();

    // Locally fine, but the room is paused so the host refuses it.
    for msg in table.room.pause() {
        table.client.handle(msg);
    }
    let paused_view = serde_json::to_string(table.client.view()).unwrap();
    assert_ne!(paused_view, before);
    let mut local = table.client.clone();
    assert!(local.submit_move(corner_piece(6), Instant::now()).is_err());

    for msg in table.room.resume() {
        table.client.handle(msg);
    }
    assert_eq!(serde_json::to_string(table.client.view()).unwrap(), before);

    let msg = table.client.submit_move(corner_piece(6), Instant::now()).unwrap();
    // The host receives a different placement under the same request id.
    let ClientMessage::Move { request_id, .. } = msg else {
        panic!("expected a move");
    };
    let updates = table.send(ClientMessage::Move {
        room_id: String::from("table"),
        request_id,
        placement: PieceToPlace {
            i: 5,
            j: 5,
            ..corner_piece(6)
        },
    });
    assert!(matches!(updates.as_slice(), [SyncUpdate::RolledBack { .. }]));
    assert_eq!(serde_json::to_string(table.client.view()).unwrap(), before);
    table.assert_in_sync();
}

#[test]
fn a_reconnecting_client_catches_up() {
    let mut table = Table::new(1);
    table.client.on_disconnect();
    let broadcast = table.room.disconnect(table.seat).unwrap();
    assert!(!broadcast.is_empty());
    // The AI played the human seat while the client was away.
    assert!(table.room.game().moves().iter().any(|m| m.player == table.seat));

    let request = table.client.on_reconnect();
    let response = table.room.reconnect(table.seat).unwrap();
    for msg in broadcast.into_iter().chain(response.broadcast) {
        assert_eq!(table.client.handle(msg), SyncUpdate::Ignored);
    }
    let updates = table.send(request);
    assert_eq!(updates, vec![SyncUpdate::Resynced]);
    assert_eq!(table.client.handle(response.reply.unwrap()), SyncUpdate::Resynced);
    table.assert_in_sync();
}
