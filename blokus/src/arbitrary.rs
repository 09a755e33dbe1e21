use quickcheck::{Arbitrary, Gen};

use crate::{
    Board, CellDelta, Color, Orientation, PieceId, PieceSet, PieceToPlace, ALL_COLORS, BOARD_SIZE, NUM_PIECES,
};

/// A board with a random scattering of colored cells.
///
/// The cells do not necessarily form a reachable game position, which is
/// fine for checking placement rules.
#[derive(Clone, Debug)]
pub struct ArbitraryBoard(pub Board);

#[derive(Clone, Debug)]
pub struct ArbitraryPlacement {
    pub color: Color,
    pub piece_to_place: PieceToPlace,
}

impl Arbitrary for Color {
    fn arbitrary(g: &mut Gen) -> Self {
        *g.choose(&ALL_COLORS).unwrap()
    }
}

impl Arbitrary for PieceId {
    fn arbitrary(g: &mut Gen) -> Self {
        PieceId(u8::arbitrary(g) % NUM_PIECES)
    }
}

impl Arbitrary for PieceSet {
    fn arbitrary(g: &mut Gen) -> Self {
        let bits = u32::arbitrary(g);
        PieceId::all()
            .filter(|p| bits & (1 << p.0) != 0)
            .fold(PieceSet::new(), PieceSet::insert)
    }
}

impl Arbitrary for Orientation {
    fn arbitrary(g: &mut Gen) -> Self {
        Orientation {
            rotation: u8::arbitrary(g) % 4,
            flipped: bool::arbitrary(g),
        }
    }
}

fn coordinate(g: &mut Gen, margin: i8) -> i8 {
    let span = (BOARD_SIZE + 2 * margin) as u8;
    (u8::arbitrary(g) % span) as i8 - margin
}

impl Arbitrary for ArbitraryBoard {
    fn arbitrary(g: &mut Gen) -> Self {
        let mut board = Board::new();
        let num_cells = usize::arbitrary(g) % 60;
        let mut deltas = Vec::with_capacity(num_cells + 1);
        for _ in 0..num_cells {
            deltas.push(CellDelta {
                i: coordinate(g, 0),
                j: coordinate(g, 0),
                color: Some(Color::arbitrary(g)),
            });
        }
        board.apply_deltas(&deltas);
        ArbitraryBoard(board)
    }
}

impl Arbitrary for ArbitraryPlacement {
    fn arbitrary(g: &mut Gen) -> Self {
        ArbitraryPlacement {
            color: Color::arbitrary(g),
            piece_to_place: PieceToPlace {
                piece: PieceId::arbitrary(g),
                orientation: Orientation::arbitrary(g),
                i: coordinate(g, 2),
                j: coordinate(g, 2),
            },
        }
    }
}
