use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::BoundingBox;

/// Number of distinct pieces every color owns.
pub const NUM_PIECES: u8 = 21;

/// Identifies one of the 21 canonical pieces. Every color owns one copy of each.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PieceId(pub u8);

// Canonical cells of every piece, as (row, column) offsets.
static PIECE_CELLS: [&[(i8, i8)]; NUM_PIECES as usize] = [
    &[(0, 0)],
    &[(0, 0), (0, 1)],
    &[(0, 0), (0, 1), (0, 2)],
    &[(0, 0), (1, 0), (1, 1)],
    &[(0, 0), (0, 1), (0, 2), (0, 3)],
    &[(0, 0), (1, 0), (2, 0), (2, 1)],
    &[(0, 0), (0, 1), (1, 0), (1, 1)],
    &[(0, 0), (0, 1), (0, 2), (1, 1)],
    &[(0, 0), (0, 1), (1, 1), (1, 2)],
    &[(0, 1), (0, 2), (1, 0), (1, 1), (2, 1)],
    &[(0, 0), (0, 1), (0, 2), (0, 3), (0, 4)],
    &[(0, 0), (1, 0), (2, 0), (3, 0), (3, 1)],
    &[(0, 0), (0, 1), (1, 1), (1, 2), (1, 3)],
    &[(0, 0), (0, 1), (1, 0), (1, 1), (2, 0)],
    &[(0, 0), (0, 1), (0, 2), (1, 1), (2, 1)],
    &[(0, 0), (0, 2), (1, 0), (1, 1), (1, 2)],
    &[(0, 0), (1, 0), (2, 0), (2, 1), (2, 2)],
    &[(0, 0), (1, 0), (1, 1), (2, 1), (2, 2)],
    &[(0, 1), (1, 0), (1, 1), (1, 2), (2, 1)],
    &[(0, 1), (1, 0), (1, 1), (2, 1), (3, 1)],
    &[(0, 0), (0, 1), (1, 1), (2, 1), (2, 2)],
];

static PIECE_NAMES: [&str; NUM_PIECES as usize] = [
    "I1", "I2", "I3", "V3", "I4", "L4", "O4", "T4", "Z4", "F5", "I5", "L5", "N5", "P5", "T5",
    "U5", "V5", "W5", "X5", "Y5", "Z5",
];

impl PieceId {
    pub fn all() -> impl Iterator<Item = PieceId> {
        (0..NUM_PIECES).map(PieceId)
    }

    pub fn is_valid(self) -> bool {
        self.0 < NUM_PIECES
    }

    /// The number of cells, between 1 and 5.
    pub fn size(self) -> u8 {
        PIECE_CELLS[self.0 as usize].len() as u8
    }

    pub fn name(self) -> &'static str {
        PIECE_NAMES[self.0 as usize]
    }

    /// The canonical (unrotated, unflipped) shape.
    pub fn shape(self) -> Shape {
        Shape::from_cells(PIECE_CELLS[self.0 as usize].iter().copied())
    }

    /// The distinct shapes this piece can take, with the orientation producing each.
    ///
    /// Orientations producing structurally equal shapes are reported only once,
    /// so the O4 piece has one entry and the L5 piece has eight.
    pub fn unique_orientations(self) -> Vec<(Orientation, Shape)> {
        let canonical = self.shape();
        let mut result: Vec<(Orientation, Shape)> = Vec::with_capacity(8);
        for orientation in Orientation::all() {
            let shape = canonical.oriented(orientation);
            if !result.iter().any(|(_, s)| *s == shape) {
                result.push((orientation, shape));
            }
        }
        result
    }
}

impl std::fmt::Display for PieceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.name())
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// A rotation by quarter turns clockwise, applied after an optional mirror flip.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Orientation {
    pub rotation: u8,
    #[serde(default)]
    pub flipped: bool,
}

impl Orientation {
    pub fn all() -> impl Iterator<Item = Orientation> {
        [false, true].into_iter().flat_map(|flipped| {
            (0..4).map(move |rotation| Orientation { rotation, flipped })
        })
    }
}

/// A set of cells normalized so that the smallest row and column are 0.
///
/// Cells are kept sorted, which makes structural equality meaningful.
/// This is an immutable type: transformations return new shapes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    cells: Vec<(i8, i8)>,
}

impl Shape {
    pub fn from_cells(cells: impl IntoIterator<Item = (i8, i8)>) -> Self {
        let mut cells: Vec<(i8, i8)> = cells.into_iter().collect();
        if let Some(bbox) = BoundingBox::from_coordinates_iter(cells.iter().copied()) {
            for cell in cells.iter_mut() {
                cell.0 -= bbox.i_min;
                cell.1 -= bbox.j_min;
            }
        }
        cells.sort_unstable();
        cells.dedup();
        Self { cells }
    }

    pub fn cells(&self) -> &[(i8, i8)] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::from_coordinates_iter(self.cells.iter().copied())
            .unwrap_or(BoundingBox::singleton(0, 0))
    }

    /// Quarter turn clockwise.
    #[must_use]
    pub fn rotated(&self) -> Shape {
        Shape::from_cells(self.cells.iter().map(|&(i, j)| (j, -i)))
    }

    /// Mirror along the vertical axis.
    #[must_use]
    pub fn flipped(&self) -> Shape {
        Shape::from_cells(self.cells.iter().map(|&(i, j)| (i, -j)))
    }

    #[must_use]
    pub fn oriented(&self, orientation: Orientation) -> Shape {
        let mut shape = if orientation.flipped {
            self.flipped()
        } else {
            self.clone()
        };
        for _ in 0..(orientation.rotation % 4) {
            shape = shape.rotated();
        }
        shape
    }

    /// The board cells covered when the shape's origin is put on `(i, j)`.
    pub fn translated(&self, i: i8, j: i8) -> impl Iterator<Item = (i8, i8)> + '_ {
        self.cells
            .iter()
            .map(move |&(di, dj)| (i.saturating_add(di), j.saturating_add(dj)))
    }
}

/// The error type for the [`FromStr`] instance of [`Shape`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeFromStrErr {
    InvalidChar(char),
    NoCells,
}

impl FromStr for Shape {
    type Err = ShapeFromStrErr;

    /// Parses rows of `#` (filled) and `.` (empty) separated by `/`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut cells = Vec::new();
        for (i, row) in s.split('/').enumerate() {
            for (j, c) in row.trim().chars().enumerate() {
                match c {
                    '#' => cells.push((i as i8, j as i8)),
                    '.' => {}
                    other => return Err(ShapeFromStrErr::InvalidChar(other)),
                }
            }
        }
        if cells.is_empty() {
            return Err(ShapeFromStrErr::NoCells);
        }
        Ok(Shape::from_cells(cells))
    }
}

/// Shorthand for creating shapes from row strings.
///
/// ```
/// # use blokus::{shape, PieceId};
/// assert_eq!(shape!("#./##"), PieceId(3).shape());
/// ```
#[macro_export]
macro_rules! shape {
    ($rows:literal) => {
        <$crate::Shape as std::str::FromStr>::from_str($rows)
            .expect("Invalid shape given to shape! macro")
    };
}
#[allow(unused_imports)]
pub(crate) use shape;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_sizes() {
        let sizes: Vec<u8> = PieceId::all().map(PieceId::size).collect();
        assert_eq!(sizes.iter().filter(|&&s| s == 1).count(), 1);
        assert_eq!(sizes.iter().filter(|&&s| s == 2).count(), 1);
        assert_eq!(sizes.iter().filter(|&&s| s == 3).count(), 2);
        assert_eq!(sizes.iter().filter(|&&s| s == 4).count(), 5);
        assert_eq!(sizes.iter().filter(|&&s| s == 5).count(), 12);
        assert_eq!(sizes.iter().map(|&s| s as u32).sum::<u32>(), 89);
    }

    #[test]
    fn shapes_are_pairwise_distinct() {
        let all: Vec<Vec<(Orientation, Shape)>> =
            PieceId::all().map(PieceId::unique_orientations).collect();
        for (a, orientations_a) in all.iter().enumerate() {
            for orientations_b in all.iter().skip(a + 1) {
                for (_, shape) in orientations_a {
                    assert!(!orientations_b.iter().any(|(_, s)| s == shape));
                }
            }
        }
    }

    #[test]
    fn orientation_counts() {
        let total: usize = PieceId::all().map(|p| p.unique_orientations().len()).sum();
        assert_eq!(total, 91);
        assert_eq!(PieceId(6).unique_orientations().len(), 1);
        assert_eq!(PieceId(18).unique_orientations().len(), 1);
        assert_eq!(PieceId(11).unique_orientations().len(), 8);
    }

    #[test]
    fn four_rotations_are_identity() {
        for piece in PieceId::all() {
            let shape = piece.shape();
            let turned = shape.rotated().rotated().rotated().rotated();
            assert_eq!(turned, shape);
            assert_eq!(shape.flipped().flipped(), shape);
        }
    }

    #[test]
    fn rotation_is_a_new_value() {
        let l = shape!("#./#./##");
        let rotated = l.rotated();
        assert_eq!(l, PieceId(5).shape());
        assert_eq!(rotated, shape!("###/#.."));
    }

    #[test]
    fn parse_errors() {
        assert_eq!(Shape::from_str("#x"), Err(ShapeFromStrErr::InvalidChar('x')));
        assert_eq!(Shape::from_str("../.."), Err(ShapeFromStrErr::NoCells));
    }
}
