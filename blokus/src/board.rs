mod bbox;
mod error;
mod placement;

pub use bbox::*;
pub use error::*;
pub use placement::*;

use serde::{Deserialize, Serialize};

/// Side length of the square board.
pub const BOARD_SIZE: i8 = 20;

/// The four player colors. The discriminant is the value stored in a board cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Color {
    Red = 1,
    Blue = 2,
    Yellow = 3,
    Green = 4,
}

pub const ALL_COLORS: [Color; 4] = [Color::Red, Color::Blue, Color::Yellow, Color::Green];

impl Color {
    pub fn from_index(value: u8) -> Option<Color> {
        match value {
            1 => Some(Color::Red),
            2 => Some(Color::Blue),
            3 => Some(Color::Yellow),
            4 => Some(Color::Green),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// The cell this color's first piece has to cover.
    pub fn starting_corner(self) -> (i8, i8) {
        match self {
            Color::Red => (0, 0),
            Color::Blue => (0, BOARD_SIZE - 1),
            Color::Yellow => (BOARD_SIZE - 1, BOARD_SIZE - 1),
            Color::Green => (BOARD_SIZE - 1, 0),
        }
    }

    pub fn letter(self) -> char {
        match self {
            Color::Red => 'R',
            Color::Blue => 'B',
            Color::Yellow => 'Y',
            Color::Green => 'G',
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Yellow => "yellow",
            Color::Green => "green",
        };
        write!(f, "{}", name)
    }
}

/// An absolute assignment of one cell. `None` clears the cell.
///
/// Applying the same delta twice has no further effect, which is what makes
/// server broadcasts safe to replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDelta {
    pub i: i8,
    pub j: i8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

/// The 20x20 grid of owner marks.
///
/// Row `i`, column `j`; a cell holds 0 when empty and the [`Color`] index otherwise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [[u8; BOARD_SIZE as usize]; BOARD_SIZE as usize],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self {
            cells: [[0; BOARD_SIZE as usize]; BOARD_SIZE as usize],
        }
    }

    pub fn is_in_bounds(i: i8, j: i8) -> bool {
        (0..BOARD_SIZE).contains(&i) && (0..BOARD_SIZE).contains(&j)
    }

    /// The color occupying a cell, or `None` for empty or out-of-bounds cells.
    pub fn get(&self, i: i8, j: i8) -> Option<Color> {
        if !Self::is_in_bounds(i, j) {
            return None;
        }
        Color::from_index(self.cells[i as usize][j as usize])
    }

    pub fn is_empty_at(&self, i: i8, j: i8) -> bool {
        Self::is_in_bounds(i, j) && self.cells[i as usize][j as usize] == 0
    }

    /// Number of cells owned by `color`.
    pub fn count(&self, color: Color) -> u32 {
        let value = color.index();
        self.cells
            .iter()
            .flat_map(|row| row.iter())
            .filter(|&&c| c == value)
            .count() as u32
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().flat_map(|row| row.iter()).all(|&c| c == 0)
    }

    /// Applies absolute cell assignments. Out-of-bounds deltas are skipped.
    pub fn apply_deltas(&mut self, deltas: &[CellDelta]) {
        for delta in deltas {
            if Self::is_in_bounds(delta.i, delta.j) {
                self.cells[delta.i as usize][delta.j as usize] =
                    delta.color.map(Color::index).unwrap_or(0);
            }
        }
    }

    /// Iterates over all occupied cells in row-major order.
    pub fn occupied(&self) -> impl Iterator<Item = (i8, i8, Color)> + '_ {
        self.cells.iter().enumerate().flat_map(|(i, row)| {
            row.iter().enumerate().filter_map(move |(j, &c)| {
                Color::from_index(c).map(|color| (i as i8, j as i8, color))
            })
        })
    }

    /// Whether `color` owns one of the four edge-neighbours of `(i, j)`.
    pub fn touches_edge_of(&self, i: i8, j: i8, color: Color) -> bool {
        [(i - 1, j), (i + 1, j), (i, j - 1), (i, j + 1)]
            .into_iter()
            .any(|(ni, nj)| self.get(ni, nj) == Some(color))
    }

    /// Whether `color` owns one of the four diagonal neighbours of `(i, j)`.
    pub fn touches_corner_of(&self, i: i8, j: i8, color: Color) -> bool {
        self.diagonal_contacts(i, j, color) > 0
    }

    pub fn diagonal_contacts(&self, i: i8, j: i8, color: Color) -> u32 {
        [(i - 1, j - 1), (i - 1, j + 1), (i + 1, j - 1), (i + 1, j + 1)]
            .into_iter()
            .filter(|&(ni, nj)| self.get(ni, nj) == Some(color))
            .count() as u32
    }

    pub(crate) fn set(&mut self, i: i8, j: i8, color: Option<Color>) {
        debug_assert!(Self::is_in_bounds(i, j));
        self.cells[i as usize][j as usize] = color.map(Color::index).unwrap_or(0);
    }
}
