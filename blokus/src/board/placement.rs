use serde::{Deserialize, Serialize};

use crate::{Board, CellDelta, Color, IllegalPlacement, Orientation, PieceId, PieceSet, Shape, BOARD_SIZE};

/// Specifies which piece to place, how it is turned, and where its origin goes.
///
/// The origin is the top-left corner of the oriented shape's bounding box.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PieceToPlace {
    pub piece: PieceId,
    #[serde(default)]
    pub orientation: Orientation,
    pub i: i8,
    pub j: i8,
}

impl PieceToPlace {
    pub fn shape(&self) -> Shape {
        self.piece.shape().oriented(self.orientation)
    }

    /// The board cells this placement would cover.
    pub fn cells(&self) -> Vec<(i8, i8)> {
        self.shape().translated(self.i, self.j).collect()
    }
}

/// A validated placement, tied to the board it was validated against.
pub struct PlacementCalculation<'a> {
    board: &'a Board,
    pub color: Color,
    /// The covered cells, in the shape's row-major order.
    pub cells: Vec<(i8, i8)>,
}

impl<'a> PlacementCalculation<'a> {
    pub fn deltas(&self) -> Vec<CellDelta> {
        self.cells
            .iter()
            .map(|&(i, j)| CellDelta {
                i,
                j,
                color: Some(self.color),
            })
            .collect()
    }

    /// Apply the placement and return the resulting board.
    pub fn execute(self) -> Board {
        let mut board = self.board.clone();
        for &(i, j) in &self.cells {
            board.set(i, j, Some(self.color));
        }
        board
    }
}

impl Board {
    /// Whether `color` has not placed anything yet (or had everything undone).
    pub fn is_first_move(&self, color: Color) -> bool {
        !self.occupied().any(|(_, _, c)| c == color)
    }

    /// Checks a placement against the corner-touch rules and plans the board change.
    ///
    /// `blocked` lists cells no piece may cover, such as barrier tiles.
    ///
    /// This function does not validate that the piece is still available to the player.
    pub fn calculate(
        &self,
        color: Color,
        piece_to_place: PieceToPlace,
        blocked: &[(i8, i8)],
    ) -> Result<PlacementCalculation<'_>, IllegalPlacement> {
        let cells = piece_to_place.cells();
        check_cells(self, color, &cells, blocked)?;
        Ok(PlacementCalculation {
            board: self,
            color,
            cells,
        })
    }

    /// All legal placements of one piece, over its distinct orientations.
    ///
    /// Results are ordered by orientation, then row, then column.
    pub fn legal_placements(
        &self,
        color: Color,
        piece: PieceId,
        blocked: &[(i8, i8)],
    ) -> Vec<PieceToPlace> {
        let mut result = Vec::new();
        for (orientation, shape) in piece.unique_orientations() {
            let bbox = shape.bbox();
            for i in 0..=(BOARD_SIZE - bbox.height()) {
                for j in 0..=(BOARD_SIZE - bbox.width()) {
                    let cells: Vec<(i8, i8)> = shape.translated(i, j).collect();
                    if check_cells(self, color, &cells, blocked).is_ok() {
                        result.push(PieceToPlace {
                            piece,
                            orientation,
                            i,
                            j,
                        });
                    }
                }
            }
        }
        result
    }

    /// Is it possible to place any of `pieces` anywhere?
    ///
    /// Pieces bigger than `max_size` are not considered. This stops at the first
    /// legal placement, so it is cheaper than calling [`Self::legal_placements()`].
    pub fn has_legal_placement(
        &self,
        color: Color,
        pieces: PieceSet,
        blocked: &[(i8, i8)],
        max_size: u8,
    ) -> bool {
        for piece in pieces.into_iter().filter(|p| p.size() <= max_size) {
            for (_, shape) in piece.unique_orientations() {
                let bbox = shape.bbox();
                for i in 0..=(BOARD_SIZE - bbox.height()) {
                    for j in 0..=(BOARD_SIZE - bbox.width()) {
                        let cells: Vec<(i8, i8)> = shape.translated(i, j).collect();
                        if check_cells(self, color, &cells, blocked).is_ok() {
                            return true;
                        }
                    }
                }
            }
        }
        false
    }
}

/// Whether `shape` may be put on `origin` for `color`, ignoring barriers.
pub fn can_place(board: &Board, shape: &Shape, origin: (i8, i8), color: Color) -> bool {
    let cells: Vec<(i8, i8)> = shape.translated(origin.0, origin.1).collect();
    check_cells(board, color, &cells, &[]).is_ok()
}

fn check_cells(
    board: &Board,
    color: Color,
    cells: &[(i8, i8)],
    blocked: &[(i8, i8)],
) -> Result<(), IllegalPlacement> {
    for &(i, j) in cells {
        if !Board::is_in_bounds(i, j) {
            return Err(IllegalPlacement::OutOfBounds { i, j });
        }
        if let Some(by) = board.get(i, j) {
            return Err(IllegalPlacement::Occupied { i, j, by });
        }
        if blocked.contains(&(i, j)) {
            return Err(IllegalPlacement::Blocked { i, j });
        }
        if board.touches_edge_of(i, j, color) {
            return Err(IllegalPlacement::EdgeContact { i, j });
        }
    }

    if board.is_first_move(color) {
        let corner = color.starting_corner();
        if !cells.contains(&corner) {
            return Err(IllegalPlacement::MissesStartingCorner { corner });
        }
    } else if !cells
        .iter()
        .any(|&(i, j)| board.touches_corner_of(i, j, color))
    {
        return Err(IllegalPlacement::NoCornerContact);
    }
    Ok(())
}
