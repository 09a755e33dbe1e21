use crate::Color;

/// The error type for [`Board::calculate()`](crate::Board::calculate), i.e. for placing a single piece.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IllegalPlacement {
    OutOfBounds { i: i8, j: i8 },
    Occupied { i: i8, j: i8, by: Color },
    Blocked { i: i8, j: i8 },
    EdgeContact { i: i8, j: i8 },
    NoCornerContact,
    MissesStartingCorner { corner: (i8, i8) },
}

impl std::error::Error for IllegalPlacement {}

impl std::fmt::Display for IllegalPlacement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IllegalPlacement::OutOfBounds { i, j } =>
                write!(f, "Piece cell ({}, {}) lies outside of the board", i, j),
            IllegalPlacement::Occupied { i, j, by } =>
                write!(f, "Piece cell ({}, {}) is already occupied by {}", i, j, by),
            IllegalPlacement::Blocked { i, j } =>
                write!(f, "Piece cell ({}, {}) is covered by a barrier", i, j),
            IllegalPlacement::EdgeContact { i, j } =>
                write!(f, "Piece cell ({}, {}) shares an edge with a piece of the same color", i, j),
            IllegalPlacement::NoCornerContact =>
                write!(f, "Piece does not touch a piece of the same color at a corner"),
            IllegalPlacement::MissesStartingCorner { corner: (i, j) } =>
                write!(f, "The first piece must cover the starting corner ({}, {})", i, j),
        }
    }
}
