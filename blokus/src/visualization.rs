use crate::{Board, SpecialTile, TileKind, BOARD_SIZE};

fn tile_symbol(kind: TileKind) -> char {
    match kind {
        TileKind::Gold => '$',
        TileKind::Purple => '?',
        TileKind::Red => '!',
        TileKind::Barrier => '#',
    }
}

/// Draws the board as a boxed text grid.
///
/// Occupied cells show their color's letter, unused special tiles a symbol
/// (`$` gold, `?` purple, `!` red, `#` barrier) and empty cells a dot.
pub fn visualize_board(board: &Board, tiles: &[SpecialTile]) -> String {
    let mut result = String::from("    ");
    for j in 0..BOARD_SIZE {
        result += &format!("{:>2}", j);
    }
    result += "\n    ╭";
    for _ in 0..BOARD_SIZE {
        result += "──";
    }
    result += "╮\n";

    for i in 0..BOARD_SIZE {
        result += &format!("{:>3} │", i);
        for j in 0..BOARD_SIZE {
            let symbol = match board.get(i, j) {
                Some(color) => color.letter(),
                None => tiles
                    .iter()
                    .find(|t| t.i == i && t.j == j && !t.used)
                    .map_or('.', |t| tile_symbol(t.kind)),
            };
            result.push(symbol);
            result.push(' ');
        }
        result += "│\n";
    }

    result += "    ╰";
    for _ in 0..BOARD_SIZE {
        result += "──";
    }
    result += "╯";
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CellDelta, Color};

    #[test]
    fn cells_and_tiles_are_drawn() {
        let mut board = Board::new();
        board.apply_deltas(&[CellDelta {
            i: 0,
            j: 0,
            color: Some(Color::Red),
        }]);
        let tiles = [
            SpecialTile {
                i: 1,
                j: 1,
                kind: TileKind::Barrier,
                used: false,
            },
            SpecialTile {
                i: 1,
                j: 2,
                kind: TileKind::Gold,
                used: true,
            },
        ];
        let text = visualize_board(&board, &tiles);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2 + BOARD_SIZE as usize + 1);
        assert!(lines[2].starts_with("  0 │R . . "));
        assert!(lines[3].starts_with("  1 │. # . . "));
    }
}
