use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use crate::{PieceId, NUM_PIECES};

/// A compact set of [`PieceId`]s, used for the pieces a player has not placed yet.
///
/// Allows intersection/union with other such sets via bitwise ops.
/// Also implements [`IntoIterator`], yielding pieces by ascending id.
///
/// ```
/// use blokus::{PieceId, PieceSet};
/// let mut set = PieceSet::new();
/// // This is an immutable data type, so functions like `insert` return a new `PieceSet`.
/// set = set.insert(PieceId(4));
/// set = set.insert(PieceId(4)); // Inserting a second time has no effect
/// set = set.insert(PieceId(0));
/// assert_eq!(Vec::from_iter(set), vec![PieceId(0), PieceId(4)]);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PieceSet {
    // Only the low 21 bits are used.
    bits: u32,
}

const VALID_BITS: u32 = (1u32 << NUM_PIECES) - 1;

/// All 21 pieces, i.e. a player's hand at the start of the game.
pub const FULL_PIECE_SET: PieceSet = PieceSet { bits: VALID_BITS };

impl PieceSet {
    /// Creates a new, empty set.
    pub fn new() -> Self {
        Self { bits: 0 }
    }

    pub fn len(self) -> u32 {
        self.bits.count_ones()
    }

    pub fn contains(self, piece: PieceId) -> bool {
        piece.is_valid() && (self.bits & (1u32 << piece.0)) != 0
    }

    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    #[must_use] // Because users might expect this to be a mutating method
    pub fn insert(self, piece: PieceId) -> Self {
        if !piece.is_valid() {
            return self;
        }
        Self {
            bits: self.bits | (1u32 << piece.0),
        }
    }

    #[must_use] // Because users might expect this to be a mutating method
    pub fn remove(self, piece: PieceId) -> Self {
        if !piece.is_valid() {
            return self;
        }
        Self {
            bits: self.bits & !(1u32 << piece.0),
        }
    }

    /// Total number of cells over all pieces in the set.
    pub fn cell_count(self) -> u32 {
        self.into_iter().map(|p| p.size() as u32).sum()
    }

    /// The pieces ordered by size, largest first; equal sizes by ascending id.
    pub fn largest_first(self) -> Vec<PieceId> {
        let mut pieces: Vec<PieceId> = self.into_iter().collect();
        pieces.sort_by(|a, b| b.size().cmp(&a.size()).then(a.cmp(b)));
        pieces
    }
}

impl std::ops::BitAnd for PieceSet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self {
            bits: self.bits & rhs.bits,
        }
    }
}

impl std::ops::BitOr for PieceSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self {
            bits: self.bits | rhs.bits,
        }
    }
}

impl std::ops::Not for PieceSet {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self {
            bits: !self.bits & VALID_BITS,
        }
    }
}

impl Default for PieceSet {
    fn default() -> Self {
        Self { bits: 0 }
    }
}

impl FromIterator<PieceId> for PieceSet {
    fn from_iter<T: IntoIterator<Item = PieceId>>(iter: T) -> Self {
        iter.into_iter().fold(PieceSet::new(), PieceSet::insert)
    }
}

impl IntoIterator for PieceSet {
    type Item = PieceId;

    type IntoIter = PieceSetIter;

    fn into_iter(self) -> Self::IntoIter {
        PieceSetIter {
            bits: self.bits & VALID_BITS,
        }
    }
}

/// Iterator for a [`PieceSet`] that returns pieces by ascending id.
#[derive(Clone, Copy, Debug)]
pub struct PieceSetIter {
    bits: u32,
}

impl Iterator for PieceSetIter {
    type Item = PieceId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bits == 0 {
            None
        } else {
            // The number of trailing zeros is the piece id
            let idx = self.bits.trailing_zeros() as u8;
            self.bits ^= 1u32 << idx;
            Some(PieceId(idx))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let size = self.bits.count_ones() as usize;
        (size, Some(size))
    }
}

impl ExactSizeIterator for PieceSetIter {
    fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }
}

impl FusedIterator for PieceSetIter {}
